use enigo::{Enigo, Keyboard, Settings};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default pause between injected characters, so the receiving application
/// is not overwhelmed.
pub const DEFAULT_KEY_DELAY: Duration = Duration::from_micros(2500);

/// Keystroke injection errors.
#[derive(Debug, Error)]
pub enum InjectError {
    /// The platform input-synthesis connection could not be established.
    #[error("failed to initialize input synthesis: {0}")]
    Init(String),

    /// One character could not be encoded or delivered.
    #[error("could not inject character {character:?}: {message}")]
    Character {
        /// The character that failed.
        character: char,
        /// Platform error detail.
        message: String,
    },
}

/// Destination for one synthetic character at a time (enables testing
/// without touching the real input system).
pub trait KeySink {
    /// Emits one character into the focused application.
    ///
    /// # Errors
    /// Returns error if this character cannot be encoded or injected; the
    /// caller skips it and continues.
    fn send_char(&mut self, ch: char) -> Result<(), InjectError>;
}

/// Destination for finished transcripts.
pub trait TextOutput: Send + Sync {
    /// Emits the transcript into the active foreground application.
    fn output_text(&self, text: &str);
}

/// Real sink backed by `enigo`.
pub struct EnigoSink {
    enigo: Enigo,
}

impl EnigoSink {
    /// Connects to the platform input system.
    ///
    /// # Errors
    /// Returns error if the connection cannot be established (e.g. missing
    /// accessibility permission).
    pub fn new() -> Result<Self, InjectError> {
        let enigo =
            Enigo::new(&Settings::default()).map_err(|e| InjectError::Init(format!("{e:?}")))?;
        Ok(Self { enigo })
    }
}

impl KeySink for EnigoSink {
    fn send_char(&mut self, ch: char) -> Result<(), InjectError> {
        let mut buf = [0_u8; 4];
        self.enigo
            .text(ch.encode_utf8(&mut buf))
            .map_err(|e| InjectError::Character {
                character: ch,
                message: format!("{e:?}"),
            })
    }
}

/// Replays a transcript as paced synthetic keystrokes.
///
/// One event per character with a fixed delay in between. The shared cancel
/// flag is checked before every character so shutdown interrupts injection
/// cleanly instead of leaving the process typing. A character the sink
/// rejects is skipped on its own; the rest of the transcript continues.
pub struct KeystrokeInjector {
    delay: Duration,
    cancel: Arc<AtomicBool>,
}

impl KeystrokeInjector {
    /// Creates an injector pacing characters by `delay` and honoring `cancel`.
    #[must_use]
    pub const fn new(delay: Duration, cancel: Arc<AtomicBool>) -> Self {
        Self { delay, cancel }
    }

    /// Injects `text` through `sink`. Returns the number of characters
    /// actually emitted.
    pub fn inject_into(&self, sink: &mut dyn KeySink, text: &str) -> usize {
        let mut injected = 0;

        for ch in text.chars() {
            if self.cancel.load(Ordering::Acquire) {
                info!(injected, "injection cancelled mid-transcript");
                break;
            }
            match sink.send_char(ch) {
                Ok(()) => injected += 1,
                Err(e) => debug!(error = %e, "skipping character"),
            }
            std::thread::sleep(self.delay);
        }

        injected
    }
}

impl TextOutput for KeystrokeInjector {
    fn output_text(&self, text: &str) {
        // A fresh connection per transcript: the platform handle is cheap and
        // must live on the calling thread.
        match EnigoSink::new() {
            Ok(mut sink) => {
                let injected = self.inject_into(&mut sink, text);
                debug!(injected, total = text.chars().count(), "transcript injected");
            }
            Err(e) => warn!(error = %e, "input synthesis unavailable, transcript not injected"),
        }
    }
}
