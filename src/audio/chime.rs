//! Audible cue played on recording state transitions.
//!
//! Uses the platform's system-sound command on a throwaway thread so the
//! controller never blocks on playback. Platforms without a known command
//! stay silent.

/// Which transition the cue marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Recording started.
    Start,
    /// Recording stopped.
    Stop,
}

/// Plays the cue, fire-and-forget.
pub fn play(cue: Cue) {
    std::thread::spawn(move || spawn_player(cue));
}

#[cfg(target_os = "macos")]
fn spawn_player(cue: Cue) {
    let sound = match cue {
        Cue::Start => "/System/Library/Sounds/Tink.aiff",
        Cue::Stop => "/System/Library/Sounds/Pop.aiff",
    };
    let _ = std::process::Command::new("afplay").arg(sound).spawn();
}

#[cfg(target_os = "windows")]
fn spawn_player(cue: Cue) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;

    let tone = match cue {
        Cue::Start => "[console]::beep(800, 100)",
        Cue::Stop => "[console]::beep(600, 100)",
    };
    let _ = std::process::Command::new("powershell")
        .args(["-c", tone])
        .creation_flags(CREATE_NO_WINDOW)
        .spawn();
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn spawn_player(_cue: Cue) {}
