/// Global hotkey adapter
pub mod hotkey;
/// Keystroke injection
pub mod inject;

pub use hotkey::{HotkeyAdapter, HotkeyCombo, HotkeyError};
pub use inject::{InjectError, KeySink, KeystrokeInjector, TextOutput};
