//! Application configuration constants and user settings.
//!
//! Fixed product values live here as constants; the tunable subset is exposed
//! through [`Settings`], read from `config.toml` in the platform config dir.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Store key holding the ordered reminder list
pub const REMINDERS_KEY: &str = "reminders_v1";

/// Store key holding the last fired reminder, read by the prompt surface
pub const CURRENT_REMINDER_KEY: &str = "current_reminder";

/// Store key holding the UI theme preference
pub const THEME_KEY: &str = "theme";

/// Timer names are `<prefix><delimiter><id>`
pub const TIMER_PREFIX: &str = "reminder";
pub const TIMER_DELIMITER: char = ':';

/// Maximum title length, in characters, so cards stay legible
pub const TITLE_MAX_CHARS: usize = 35;

/// How far a snooze pushes the reminder out
pub const SNOOZE_MINUTES: i64 = 5;

/// The tab prompt closes itself after this long without a response
pub const PROMPT_TIMEOUT_SECS: u64 = 60;

/// Beep pattern played when a reminder fires
pub const BEEP_COUNT: u32 = 8;
pub const BEEP_FREQUENCY_HZ: f32 = 880.0;
pub const BEEP_TONE_MS: u64 = 400;
pub const BEEP_GAP_MS: u64 = 150;

/// Fallback notification text
pub const NOTIFICATION_TITLE: &str = "⏰ Reminder";
pub const SNOOZE_BUTTON_LABEL: &str = "Snooze (5 min)";
pub const DONE_BUTTON_LABEL: &str = "Mark Done";

/// The form pre-fills the next multiple of this many minutes
pub const FORM_PREFILL_STEP_MINUTES: u32 = 5;

/// Folder name used under the platform data/config dirs
pub const APP_DIR_NAME: &str = "ReminderAlerts";

/// Tunable settings, every field optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: i64,
    #[serde(default = "default_prompt_timeout_secs")]
    pub prompt_timeout_secs: u64,
    #[serde(default)]
    pub beep: BeepSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeepSettings {
    #[serde(default = "default_beep_count")]
    pub count: u32,
    #[serde(default = "default_beep_frequency")]
    pub frequency_hz: f32,
    #[serde(default = "default_beep_tone_ms")]
    pub tone_ms: u64,
    #[serde(default = "default_beep_gap_ms")]
    pub gap_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            snooze_minutes: default_snooze_minutes(),
            prompt_timeout_secs: default_prompt_timeout_secs(),
            beep: BeepSettings::default(),
        }
    }
}

impl Default for BeepSettings {
    fn default() -> Self {
        Self {
            count: default_beep_count(),
            frequency_hz: default_beep_frequency(),
            tone_ms: default_beep_tone_ms(),
            gap_ms: default_beep_gap_ms(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_snooze_minutes() -> i64 {
    SNOOZE_MINUTES
}

fn default_prompt_timeout_secs() -> u64 {
    PROMPT_TIMEOUT_SECS
}

fn default_beep_count() -> u32 {
    BEEP_COUNT
}

fn default_beep_frequency() -> f32 {
    BEEP_FREQUENCY_HZ
}

fn default_beep_tone_ms() -> u64 {
    BEEP_TONE_MS
}

fn default_beep_gap_ms() -> u64 {
    BEEP_GAP_MS
}

impl Settings {
    /// Default location: `<config dir>/ReminderAlerts/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join("config.toml"))
    }

    /// Load settings from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("{}: {}", path.display(), e)))?;
        let settings = Self::parse(&content)?;
        info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn parse(content: &str) -> AppResult<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> AppResult<()> {
        if self.snooze_minutes <= 0 {
            return Err(AppError::config("snooze_minutes must be positive"));
        }
        if self.prompt_timeout_secs == 0 {
            return Err(AppError::config("prompt_timeout_secs must be positive"));
        }
        if self.beep.count == 0 {
            return Err(AppError::config("beep.count must be at least 1"));
        }
        Ok(())
    }

    pub fn snooze(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.snooze_minutes)
    }

    pub fn prompt_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.prompt_timeout_secs)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }
}
