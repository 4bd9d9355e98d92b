//! Game settings and preferences
//!
//! Persisted as JSON next to the game data, separately from race results.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Engine class: the difficulty/handicap knob. Heavier classes raise the
/// stat handicap fed into stat derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EngineClass {
    Cc50,
    #[default]
    Cc100,
    Cc150,
}

impl EngineClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineClass::Cc50 => "50cc",
            EngineClass::Cc100 => "100cc",
            EngineClass::Cc150 => "150cc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "50cc" | "50" => Some(EngineClass::Cc50),
            "100cc" | "100" => Some(EngineClass::Cc100),
            "150cc" | "150" => Some(EngineClass::Cc150),
            _ => None,
        }
    }

    /// Stat handicap fed into stat derivation
    pub fn handicap(&self) -> i32 {
        match self {
            EngineClass::Cc50 => 0,
            EngineClass::Cc100 => 1,
            EngineClass::Cc150 => 2,
        }
    }
}

/// Which input devices are honored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InputMode {
    #[default]
    Any,
    KeyboardOnly,
    GamepadOnly,
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Windowed (false) or fullscreen (true)
    pub fullscreen: bool,
    /// Far draw distance halves the frame rate on weak machines
    pub far_draw_distance: bool,

    // === Audio ===
    pub music: bool,
    pub sound_effects: bool,

    // === Input ===
    pub input_mode: InputMode,
    /// Gamepad button mapping; -1 = unbound
    pub gamepad: [i32; 7],

    // === Race ===
    pub engine_class: EngineClass,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fullscreen: false,
            far_draw_distance: false,
            music: true,
            sound_effects: true,
            input_mode: InputMode::Any,
            gamepad: [-1; 7],
            engine_class: EngineClass::Cc100,
        }
    }
}

impl Settings {
    /// Segments drawn ahead of the camera for the current preference
    pub fn draw_distance(&self) -> usize {
        if self.far_draw_distance {
            crate::consts::DRAW_DISTANCE * 2
        } else {
            crate::consts::DRAW_DISTANCE
        }
    }

    /// Load from disk, falling back to defaults on any failure
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("corrupt settings file {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("no settings file at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}
