use tracing::info;

/// Sink for user-facing status text and log lines.
///
/// The pipeline calls these from worker threads; implementations backed by a
/// real UI are responsible for marshaling onto their UI thread.
pub trait UiSink: Send + Sync {
    /// Replaces the status line. Always reflects the most recent event,
    /// including the most recent failure.
    fn set_status(&self, text: &str);

    /// Appends one line to the visible transcript log.
    fn append_log_line(&self, text: &str);
}

/// Headless sink that routes status and log lines to tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogUiSink;

impl UiSink for LogUiSink {
    fn set_status(&self, text: &str) {
        info!(status = text, "status");
    }

    fn append_log_line(&self, text: &str) {
        info!(line = text, "transcript");
    }
}
