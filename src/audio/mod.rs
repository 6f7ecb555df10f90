/// Audio input backend and session capture
pub mod capture;
/// Recording transition cues
pub mod chime;

pub use capture::{CaptureBackend, CaptureError, CpalBackend, OpenedCapture};
