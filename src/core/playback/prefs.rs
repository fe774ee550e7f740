//! Durable user preferences.
//!
//! Speed, voice selection, engine choice, and the guest-banner flag are
//! written through to a JSON file on every change and restored at session
//! start. The stored voice is a composite `"<id>:<tier>"` key; values
//! written by older versions carry only the voice id, and are upgraded by
//! assuming the default tier.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default playback speed.
pub const DEFAULT_SPEED: f32 = 1.0;
/// Documented default voice + tier pair.
pub const DEFAULT_VOICE_KEY: &str = "Ruth:neural";
/// Tier assumed for legacy voice-only stored values.
pub const DEFAULT_TIER: &str = "neural";

/// Speed bounds; out-of-range values are clamped, not rejected.
pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 4.0;
/// Step applied by the speed up/down controls.
pub const SPEED_INCREMENT: f32 = 0.1;

/// Which synthesis engine the user prefers when both are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineChoice {
    Local,
    #[default]
    Remote,
}

/// The persisted preference set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default)]
    pub engine: EngineChoice,
    #[serde(default)]
    pub banner_dismissed: bool,
}

fn default_speed() -> f32 {
    DEFAULT_SPEED
}

fn default_voice() -> String {
    DEFAULT_VOICE_KEY.to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            voice: DEFAULT_VOICE_KEY.to_string(),
            engine: EngineChoice::default(),
            banner_dismissed: false,
        }
    }
}

/// Upgrade a stored voice value: bare voice ids from the legacy format
/// get the default tier appended.
pub fn normalize_voice_key(stored: &str) -> String {
    if stored.contains(':') {
        stored.to_string()
    } else {
        format!("{stored}:{DEFAULT_TIER}")
    }
}

/// Clamp a speed into the supported range.
pub fn clamp_speed(speed: f32) -> f32 {
    speed.clamp(MIN_SPEED, MAX_SPEED)
}

/// Preference store bound to a JSON file.
///
/// Reads once on open; every setter writes the file immediately (no
/// batching), so preferences survive whatever happens to the process.
pub struct PrefStore {
    path: PathBuf,
    current: Preferences,
}

impl PrefStore {
    /// Default preference file location under the platform config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxread")
            .join("prefs.json")
    }

    /// Open the store, restoring prior values. Missing or corrupt files
    /// yield defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut current = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Corrupt preference file, using defaults");
                Preferences::default()
            }),
            Err(_) => Preferences::default(),
        };

        current.voice = normalize_voice_key(&current.voice);
        current.speed = clamp_speed(current.speed);

        Self { path, current }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.current
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.current.speed = clamp_speed(speed);
        self.save();
    }

    pub fn set_voice(&mut self, voice: &str) {
        self.current.voice = normalize_voice_key(voice);
        self.save();
    }

    pub fn set_engine(&mut self, engine: EngineChoice) {
        self.current.engine = engine;
        self.save();
    }

    pub fn set_banner_dismissed(&mut self, dismissed: bool) {
        self.current.banner_dismissed = dismissed;
        self.save();
    }

    fn save(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(path = %self.path.display(), error = %e, "Failed to create preference dir");
                return;
            }
        }
        match serde_json::to_string_pretty(&self.current) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %e, "Failed to write preferences");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize preferences"),
        }
    }
}
