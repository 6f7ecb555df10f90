use anyhow::Result;
use global_hotkey::{GlobalHotKeyEvent, HotKeyState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use voice_typer::audio::capture::CpalBackend;
use voice_typer::config::Config;
use voice_typer::controller::RecordingController;
use voice_typer::input::hotkey::HotkeyAdapter;
use voice_typer::input::inject::{KeystrokeInjector, TextOutput, DEFAULT_KEY_DELAY};
use voice_typer::recording::RecordingStore;
use voice_typer::sequence::SequenceIndex;
use voice_typer::telemetry;
use voice_typer::transcription::service::{DeepgramTranscriber, ServiceOptions, Transcriber};
use voice_typer::transcription::worker::{TranscriptionWorker, DEFAULT_POLL_INTERVAL};
use voice_typer::translog::TranscriptLog;
use voice_typer::ui::{LogUiSink, UiSink};

/// How long shutdown waits for the transcription worker to finish its
/// current step.
const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    telemetry::init(config.telemetry.enabled, &config.telemetry.log_path)?;
    tracing::info!("voice-typer starting");

    if config.transcription.api_key.trim().is_empty() {
        tracing::warn!("no API key configured; transcription will fail until one is set");
    }

    let store = Arc::new(RecordingStore::new(Config::expand_path(
        &config.recording.dir,
    )?)?);
    let swept = store.sweep()?;
    if swept > 0 {
        tracing::info!(swept, "removed stale recordings from a previous run");
    }

    let sequence = Arc::new(SequenceIndex::new());
    let ui: Arc<dyn UiSink> = Arc::new(LogUiSink);

    let transcriber = Arc::new(DeepgramTranscriber::new(ServiceOptions {
        api_key: config.transcription.api_key.clone(),
        model: config.transcription.model.clone(),
    }));

    let cancel = Arc::new(AtomicBool::new(false));
    let injector = Arc::new(KeystrokeInjector::new(
        DEFAULT_KEY_DELAY,
        Arc::clone(&cancel),
    ));
    let transcript_log = Arc::new(TranscriptLog::new(Config::expand_path(
        &config.log.transcript_path,
    )?)?);

    let worker = TranscriptionWorker::spawn(
        Arc::clone(&sequence),
        Arc::clone(&store),
        Arc::clone(&transcriber) as Arc<dyn Transcriber>,
        injector as Arc<dyn TextOutput>,
        Arc::clone(&ui),
        transcript_log,
        DEFAULT_POLL_INTERVAL,
    );

    let controller = RecordingController::new(
        Arc::new(CpalBackend::new()),
        store,
        sequence,
        Arc::clone(&ui),
        config.recording.chime,
    );

    let hotkeys = HotkeyAdapter::new(config.hotkey.combo)?;
    ui.set_status(&format!("Ready to record ({})", hotkeys.active_combo()));

    // Main event loop: poll the global hotkey channel, exit on Ctrl+C.
    let receiver = GlobalHotKeyEvent::receiver();
    loop {
        if let Ok(event) = receiver.try_recv() {
            if hotkeys.matches(&event) && matches!(event.state, HotKeyState::Pressed) {
                if let Err(e) = controller.toggle() {
                    tracing::error!(error = %e, "toggle failed");
                }
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
            () = tokio::time::sleep(Duration::from_millis(10)) => {
                // Poll interval for the hotkey channel.
            }
        }
    }

    // Orderly shutdown: interrupt injection, drain the active recording,
    // then give the worker a bounded window to finish its current step.
    cancel.store(true, Ordering::Release);
    controller.shutdown();
    if !worker.shutdown(WORKER_SHUTDOWN_TIMEOUT) {
        tracing::warn!("transcription worker did not stop in time");
    }

    tracing::info!("voice-typer stopped");
    Ok(())
}
