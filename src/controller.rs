use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use tracing::{error, info, warn};

use crate::audio::capture::{CaptureBackend, CaptureError};
use crate::audio::chime::{self, Cue};
use crate::recording::RecordingStore;
use crate::sequence::SequenceIndex;
use crate::ui::UiSink;

/// Externally visible recording state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No capture session is active.
    Idle,
    /// Exactly one capture worker is recording.
    Recording,
}

enum Session {
    Idle,
    Recording {
        stop: Arc<AtomicBool>,
        worker: JoinHandle<()>,
    },
}

/// Two-state toggle guarding capture start/stop.
///
/// All transitions happen under one mutex, so at most one capture worker
/// exists at any time and a `toggle` racing a draining stop blocks until the
/// prior worker has fully terminated.
pub struct RecordingController {
    session: Mutex<Session>,
    backend: Arc<dyn CaptureBackend>,
    store: Arc<RecordingStore>,
    sequence: Arc<SequenceIndex>,
    ui: Arc<dyn UiSink>,
    chime: bool,
}

impl RecordingController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        store: Arc<RecordingStore>,
        sequence: Arc<SequenceIndex>,
        ui: Arc<dyn UiSink>,
        chime: bool,
    ) -> Self {
        Self {
            session: Mutex::new(Session::Idle),
            backend,
            store,
            sequence,
            ui,
            chime,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        match *self.session.lock().unwrap_or_else(PoisonError::into_inner) {
            Session::Idle => ControllerState::Idle,
            Session::Recording { .. } => ControllerState::Recording,
        }
    }

    /// Flips between Idle and Recording, returning the new state.
    ///
    /// Idle → Recording spawns a capture worker and returns once its input
    /// stream is live. Recording → Idle sets the session's stop flag and
    /// waits for the worker to drain, flush `recording-<N>.wav` and publish
    /// N before returning.
    ///
    /// # Errors
    /// Returns error if the input device cannot be opened; no file is
    /// produced, the sequence index is untouched and the state stays Idle.
    pub fn toggle(&self) -> Result<ControllerState, CaptureError> {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);

        match std::mem::replace(&mut *session, Session::Idle) {
            Session::Idle => match self.start_session() {
                Ok(running) => {
                    *session = running;
                    if self.chime {
                        chime::play(Cue::Start);
                    }
                    self.ui.set_status("Recording…");
                    info!("recording started");
                    Ok(ControllerState::Recording)
                }
                Err(e) => {
                    self.ui.set_status(&format!("Recording failed: {e}"));
                    Err(e)
                }
            },
            Session::Recording { stop, worker } => {
                stop.store(true, Ordering::Release);
                // Status first; a flush failure reported by the worker during
                // the join stays the most recent status.
                self.ui.set_status("Processing transcription…");
                if worker.join().is_err() {
                    warn!("capture worker panicked");
                }
                if self.chime {
                    chime::play(Cue::Stop);
                }
                info!("recording stopped");
                Ok(ControllerState::Idle)
            }
        }
    }

    /// Stops any active session without a transition cue.
    pub fn shutdown(&self) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if let Session::Recording { stop, worker } = std::mem::replace(&mut *session, Session::Idle)
        {
            stop.store(true, Ordering::Release);
            if worker.join().is_err() {
                warn!("capture worker panicked during shutdown");
            }
            info!("active recording stopped at shutdown");
        }
    }

    fn start_session(&self) -> Result<Session, CaptureError> {
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel();

        let backend = Arc::clone(&self.backend);
        let store = Arc::clone(&self.store);
        let sequence = Arc::clone(&self.sequence);
        let ui = Arc::clone(&self.ui);
        let stop_flag = Arc::clone(&stop);

        let worker = std::thread::Builder::new()
            .name("capture-worker".to_owned())
            .spawn(move || {
                // The stream must be opened and dropped on this thread.
                let opened = match backend.open() {
                    Ok(opened) => {
                        let _ = ready_tx.send(Ok(()));
                        opened
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                match opened.record(&stop_flag) {
                    Ok(audio) => {
                        // The number is claimed only on a successful flush.
                        let seq = sequence.next();
                        match store.write(seq, &audio) {
                            Ok(_) => {
                                sequence.publish(seq);
                                info!(seq, "recording ready for transcription");
                            }
                            Err(e) => {
                                error!(seq, error = %e, "failed to flush recording");
                                ui.set_status(&format!("Failed to save recording: {e}"));
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "capture session failed");
                        ui.set_status(&format!("Recording failed: {e}"));
                    }
                }
            })
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Session::Recording { stop, worker }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(CaptureError::WorkerGone)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::capture::OpenedCapture;
    use crate::recording::RecordedAudio;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Backend whose sessions return fixed samples, tracking how many
    /// sessions are open at once.
    struct ScriptedBackend {
        open_now: Arc<AtomicUsize>,
        max_open: Arc<AtomicUsize>,
        opened_total: Arc<AtomicUsize>,
    }

    impl ScriptedBackend {
        fn new() -> Self {
            Self {
                open_now: Arc::new(AtomicUsize::new(0)),
                max_open: Arc::new(AtomicUsize::new(0)),
                opened_total: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl CaptureBackend for ScriptedBackend {
        fn open(&self) -> Result<Box<dyn OpenedCapture>, CaptureError> {
            let now = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_open.fetch_max(now, Ordering::SeqCst);
            self.opened_total.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedSession {
                open_now: Arc::clone(&self.open_now),
            }))
        }
    }

    struct ScriptedSession {
        open_now: Arc<AtomicUsize>,
    }

    impl OpenedCapture for ScriptedSession {
        fn record(self: Box<Self>, stop: &AtomicBool) -> Result<RecordedAudio, CaptureError> {
            while !stop.load(Ordering::Acquire) {
                std::thread::sleep(Duration::from_millis(1));
            }
            self.open_now.fetch_sub(1, Ordering::SeqCst);
            Ok(RecordedAudio {
                channels: 2,
                sample_rate: 44_100,
                samples: vec![7; 32],
            })
        }
    }

    /// Backend with no usable device.
    struct DeadBackend;

    impl CaptureBackend for DeadBackend {
        fn open(&self) -> Result<Box<dyn OpenedCapture>, CaptureError> {
            Err(CaptureError::NoDevice)
        }
    }

    #[derive(Default)]
    struct StatusSink {
        status: Mutex<Vec<String>>,
    }

    impl UiSink for StatusSink {
        fn set_status(&self, text: &str) {
            self.status.lock().unwrap().push(text.to_owned());
        }

        fn append_log_line(&self, _text: &str) {}
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<RecordingStore>,
        sequence: Arc<SequenceIndex>,
        ui: Arc<StatusSink>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        Fixture {
            store: Arc::new(RecordingStore::new(dir.path()).unwrap()),
            sequence: Arc::new(SequenceIndex::new()),
            ui: Arc::new(StatusSink::default()),
            _dir: dir,
        }
    }

    fn controller(fx: &Fixture, backend: Arc<dyn CaptureBackend>) -> RecordingController {
        RecordingController::new(
            backend,
            Arc::clone(&fx.store),
            Arc::clone(&fx.sequence),
            fx.ui.clone() as Arc<dyn UiSink>,
            false,
        )
    }

    #[test]
    fn toggle_cycles_idle_recording_idle() {
        let fx = fixture();
        let ctl = controller(&fx, Arc::new(ScriptedBackend::new()));

        assert_eq!(ctl.state(), ControllerState::Idle);
        assert_eq!(ctl.toggle().unwrap(), ControllerState::Recording);
        assert_eq!(ctl.state(), ControllerState::Recording);
        assert_eq!(ctl.toggle().unwrap(), ControllerState::Idle);
        assert_eq!(ctl.state(), ControllerState::Idle);
    }

    #[test]
    fn rapid_toggle_produces_exactly_one_recording() {
        let fx = fixture();
        let backend = Arc::new(ScriptedBackend::new());
        let ctl = controller(&fx, Arc::clone(&backend) as Arc<dyn CaptureBackend>);

        ctl.toggle().unwrap();
        ctl.toggle().unwrap();

        assert_eq!(backend.opened_total.load(Ordering::SeqCst), 1);
        assert_eq!(fx.sequence.ready(), 1);
        assert!(fx.store.path(1).exists());
        assert!(!fx.store.path(2).exists());
    }

    #[test]
    fn workers_never_overlap_across_sessions() {
        let fx = fixture();
        let backend = Arc::new(ScriptedBackend::new());
        let ctl = controller(&fx, Arc::clone(&backend) as Arc<dyn CaptureBackend>);

        for _ in 0..3 {
            ctl.toggle().unwrap();
            ctl.toggle().unwrap();
        }

        assert_eq!(backend.max_open.load(Ordering::SeqCst), 1);
        assert_eq!(backend.opened_total.load(Ordering::SeqCst), 3);
        assert_eq!(fx.sequence.ready(), 3);
        for seq in 1..=3 {
            assert!(fx.store.path(seq).exists());
        }
    }

    #[test]
    fn concurrent_toggles_keep_a_single_worker() {
        let fx = fixture();
        let backend = Arc::new(ScriptedBackend::new());
        let ctl = Arc::new(controller(
            &fx,
            Arc::clone(&backend) as Arc<dyn CaptureBackend>,
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctl = Arc::clone(&ctl);
                std::thread::spawn(move || {
                    let _ = ctl.toggle();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        // Land back on Idle regardless of how the toggles interleaved.
        if ctl.state() == ControllerState::Recording {
            ctl.toggle().unwrap();
        }

        assert_eq!(backend.max_open.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn device_failure_reports_and_leaves_everything_untouched() {
        let fx = fixture();
        let ctl = controller(&fx, Arc::new(DeadBackend));

        let result = ctl.toggle();
        assert!(matches!(result, Err(CaptureError::NoDevice)));
        assert_eq!(ctl.state(), ControllerState::Idle);
        assert_eq!(fx.sequence.ready(), 0);
        assert!(!fx.store.path(1).exists());

        let status = fx.ui.status.lock().unwrap();
        assert!(status.iter().any(|s| s.contains("Recording failed")));
    }

    #[test]
    fn device_failure_does_not_block_the_next_attempt() {
        let fx = fixture();
        let ctl = controller(&fx, Arc::new(DeadBackend));

        assert!(ctl.toggle().is_err());
        // The next toggle retries the device instead of being stuck.
        assert!(ctl.toggle().is_err());
        assert_eq!(ctl.state(), ControllerState::Idle);
    }

    #[test]
    fn shutdown_stops_an_active_session() {
        let fx = fixture();
        let ctl = controller(&fx, Arc::new(ScriptedBackend::new()));

        ctl.toggle().unwrap();
        ctl.shutdown();
        assert_eq!(ctl.state(), ControllerState::Idle);
        assert_eq!(fx.sequence.ready(), 1);
    }

    #[test]
    fn shutdown_when_idle_is_a_noop() {
        let fx = fixture();
        let ctl = controller(&fx, Arc::new(ScriptedBackend::new()));
        ctl.shutdown();
        assert_eq!(ctl.state(), ControllerState::Idle);
        assert_eq!(fx.sequence.ready(), 0);
    }
}
