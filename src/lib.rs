//! Voice Typer - hotkey-toggled voice typing
//!
//! This library exports the recording/transcription pipeline and the seams
//! its external collaborators (settings form, tray, UI) plug into.

/// Audio capture and transition cues
pub mod audio;
/// Configuration management
pub mod config;
/// Recording state machine
pub mod controller;
/// Input handling (hotkeys, keystroke injection)
pub mod input;
/// On-disk recording store
pub mod recording;
/// Capture → transcription handoff counter
pub mod sequence;
/// Telemetry and logging
pub mod telemetry;
/// Transcription service client and worker
pub mod transcription;
/// Persistent transcript log
pub mod translog;
/// UI status/log sink
pub mod ui;
