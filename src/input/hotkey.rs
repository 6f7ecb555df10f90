use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{error, info, warn};

/// Toggle key combinations available to the user.
///
/// The set is closed: these four are the combinations the settings form
/// offers, and the config file stores them by the same names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HotkeyCombo {
    /// Plain F2.
    #[serde(rename = "f2")]
    F2,
    /// Alt (Option) + F2.
    #[serde(rename = "alt+f2")]
    AltF2,
    /// Ctrl + F12.
    #[serde(rename = "ctrl+f12")]
    CtrlF12,
    /// Alt (Option) + F12.
    #[serde(rename = "alt+f12")]
    AltF12,
}

impl HotkeyCombo {
    /// Every supported combination, in display order.
    pub const ALL: [Self; 4] = [Self::F2, Self::AltF2, Self::CtrlF12, Self::AltF12];

    /// Human-readable label, e.g. `Alt+F2`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::F2 => "F2",
            Self::AltF2 => "Alt+F2",
            Self::CtrlF12 => "Ctrl+F12",
            Self::AltF12 => "Alt+F12",
        }
    }

    fn to_hotkey(self) -> HotKey {
        match self {
            Self::F2 => HotKey::new(None, Code::F2),
            Self::AltF2 => HotKey::new(Some(Modifiers::ALT), Code::F2),
            Self::CtrlF12 => HotKey::new(Some(Modifiers::CONTROL), Code::F12),
            Self::AltF12 => HotKey::new(Some(Modifiers::ALT), Code::F12),
        }
    }
}

impl fmt::Display for HotkeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for HotkeyCombo {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f2" => Ok(Self::F2),
            "alt+f2" => Ok(Self::AltF2),
            "ctrl+f12" => Ok(Self::CtrlF12),
            "alt+f12" => Ok(Self::AltF12),
            other => Err(HotkeyError::UnknownCombo(other.to_owned())),
        }
    }
}

/// Hotkey registration errors.
#[derive(Debug, Error)]
pub enum HotkeyError {
    /// The configured name is not one of the supported combinations.
    #[error("unknown hotkey combination: {0}")]
    UnknownCombo(String),

    /// The global hotkey manager could not be created.
    #[error("failed to initialize global hotkey manager: {0}")]
    Manager(String),

    /// Registering a combination with the OS failed.
    #[error("failed to register {combo}: {message}")]
    Register {
        /// The combination that failed to register.
        combo: HotkeyCombo,
        /// Platform error detail.
        message: String,
    },
}

/// Maps the configured key combination onto the global event stream.
///
/// Owns the OS registration; `rebind` tears down the old combination and
/// installs the new one. Events already queued in the global channel at
/// rebind time are matched against whichever binding is active when they
/// are drained.
pub struct HotkeyAdapter {
    manager: GlobalHotKeyManager,
    active: Mutex<(HotkeyCombo, HotKey)>,
}

impl HotkeyAdapter {
    /// Creates the manager and registers `combo`.
    ///
    /// # Errors
    /// Returns error if the manager cannot be created or registration fails.
    pub fn new(combo: HotkeyCombo) -> Result<Self, HotkeyError> {
        let manager =
            GlobalHotKeyManager::new().map_err(|e| HotkeyError::Manager(e.to_string()))?;

        let hotkey = combo.to_hotkey();
        manager.register(hotkey).map_err(|e| HotkeyError::Register {
            combo,
            message: e.to_string(),
        })?;

        info!(combo = %combo, "hotkey registered");

        Ok(Self {
            manager,
            active: Mutex::new((combo, hotkey)),
        })
    }

    /// Currently bound combination.
    #[must_use]
    pub fn active_combo(&self) -> HotkeyCombo {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).0
    }

    /// Swaps the binding to `combo` at runtime.
    ///
    /// The old combination stops triggering before the new one is installed.
    /// If registering the new combination fails, the old one is restored.
    ///
    /// # Errors
    /// Returns error if the new combination cannot be registered.
    pub fn rebind(&self, combo: HotkeyCombo) -> Result<(), HotkeyError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let (old_combo, old_hotkey) = *active;
        if old_combo == combo {
            return Ok(());
        }

        if let Err(e) = self.manager.unregister(old_hotkey) {
            warn!(combo = %old_combo, error = %e, "failed to unregister previous hotkey");
        }

        let new_hotkey = combo.to_hotkey();
        match self.manager.register(new_hotkey) {
            Ok(()) => {
                *active = (combo, new_hotkey);
                info!(from = %old_combo, to = %combo, "hotkey rebound");
                Ok(())
            }
            Err(e) => {
                if let Err(restore) = self.manager.register(old_hotkey) {
                    error!(combo = %old_combo, error = %restore, "failed to restore previous hotkey");
                }
                Err(HotkeyError::Register {
                    combo,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Whether `event` belongs to the active binding.
    #[must_use]
    pub fn matches(&self, event: &GlobalHotKeyEvent) -> bool {
        event.id
            == self
                .active
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .1
                .id()
    }
}

impl Drop for HotkeyAdapter {
    fn drop(&mut self) {
        let (combo, hotkey) = *self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.manager.unregister(hotkey) {
            error!(combo = %combo, error = %e, "failed to unregister hotkey");
        }
    }
}
