/// Cloud transcription service client
pub mod service;
/// In-order transcription worker
pub mod worker;

pub use service::{DeepgramTranscriber, ServiceOptions, TranscribeError, Transcriber};
pub use worker::TranscriptionWorker;
