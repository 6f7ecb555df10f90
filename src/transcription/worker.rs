use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::input::inject::TextOutput;
use crate::recording::RecordingStore;
use crate::sequence::SequenceIndex;
use crate::transcription::service::Transcriber;
use crate::translog::TranscriptLog;
use crate::ui::UiSink;

/// Default interval between readiness polls of the sequence index.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Long-lived worker that consumes ready recordings strictly in order.
///
/// The cursor starts at 1 and advances by exactly one per recording, whether
/// the recording transcribed successfully or was skipped after a failure, so
/// recording N+1 is never started before N is finished. Failed recordings
/// stay on disk; successful ones are deleted after fan-out.
pub struct TranscriptionWorker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TranscriptionWorker {
    /// Spawns the worker thread.
    ///
    /// `poll_interval` is how long the worker sleeps between readiness checks
    /// while caught up with the capture side.
    #[must_use]
    pub fn spawn(
        sequence: Arc<SequenceIndex>,
        store: Arc<RecordingStore>,
        transcriber: Arc<dyn Transcriber>,
        output: Arc<dyn TextOutput>,
        ui: Arc<dyn UiSink>,
        log: Arc<TranscriptLog>,
        poll_interval: Duration,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = std::thread::Builder::new()
            .name("transcription-worker".to_owned())
            .spawn(move || {
                run_loop(
                    &flag,
                    &sequence,
                    &store,
                    transcriber.as_ref(),
                    output.as_ref(),
                    ui.as_ref(),
                    &log,
                    poll_interval,
                );
            })
            .ok();

        if handle.is_none() {
            error!("failed to spawn transcription worker thread");
        }

        Self { running, handle }
    }

    /// Signals the worker to stop and waits up to `timeout` for it to exit.
    ///
    /// The worker checks the flag once per iteration and finishes the
    /// recording it is on, so it never leaves a file half-processed.
    /// Returns `true` if the thread exited within the timeout.
    pub fn shutdown(mut self, timeout: Duration) -> bool {
        self.running.store(false, Ordering::Release);

        let Some(handle) = self.handle.take() else {
            return true;
        };

        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!("transcription worker still running at shutdown timeout");
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        if handle.join().is_err() {
            warn!("transcription worker panicked");
        }
        true
    }
}

#[allow(clippy::too_many_arguments)]
fn run_loop(
    running: &AtomicBool,
    sequence: &SequenceIndex,
    store: &RecordingStore,
    transcriber: &dyn Transcriber,
    output: &dyn TextOutput,
    ui: &dyn UiSink,
    log: &TranscriptLog,
    poll_interval: Duration,
) {
    let mut next: u64 = 1;
    info!("transcription worker started");

    while running.load(Ordering::Acquire) {
        if sequence.ready() < next {
            std::thread::sleep(poll_interval);
            continue;
        }

        process_one(next, store, transcriber, output, ui, log);
        next += 1;
    }

    info!(cursor = next, "transcription worker stopped");
}

fn process_one(
    seq: u64,
    store: &RecordingStore,
    transcriber: &dyn Transcriber,
    output: &dyn TextOutput,
    ui: &dyn UiSink,
    log: &TranscriptLog,
) {
    let result = store
        .load_bytes(seq)
        .map_err(|e| e.to_string())
        .and_then(|bytes| transcriber.transcribe(&bytes).map_err(|e| e.to_string()));

    match result {
        Ok(transcript) => {
            info!(seq, text_len = transcript.len(), "recording transcribed");

            ui.append_log_line(&format!(
                "{}: {}",
                chrono::Local::now().format("%H:%M:%S"),
                transcript
            ));
            if let Err(e) = log.append(&transcript) {
                warn!(seq, error = %e, "failed to append to transcript log");
            }
            output.output_text(&transcript);

            if let Err(e) = store.remove(seq) {
                warn!(seq, error = %e, "failed to delete consumed recording");
            }
            ui.set_status("Ready to record");
        }
        Err(message) => {
            // No retry; the file stays on disk for inspection.
            error!(seq, error = %message, "transcription failed");
            ui.set_status(&format!("Error transcribing recording {seq}: {message}"));
        }
    }
}
