//! TOML-based application configuration.
//!
//! Stores:
//! - Timer behavior (skip support, workday cutoff)
//! - Notification backend and timeline settings
//! - Alarm sound player
//! - Schedule generator endpoint
//!
//! Configuration is stored at `~/.config/tasktimer/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::data_dir;
use crate::error::{ConfigError, ScheduleError};
use crate::schedule::parse_cutoff;
use crate::timer::RunnerConfig;

/// Timer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_true")]
    pub allow_skip: bool,
    /// End of the workday as `HH:MM`. Tasks starting at or after it are dropped.
    #[serde(default)]
    pub workday_end_time: Option<String>,
}

/// Which notification transport a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    NotifySend,
    Log,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::NotifySend => "notify-send",
            Backend::Log => "log",
        }
    }
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_backend")]
    pub backend: Backend,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_true")]
    pub timeline: bool,
    #[serde(default = "default_timeline_delay_ms")]
    pub timeline_delay_ms: u64,
    #[serde(default = "default_final_expire_secs")]
    pub final_expire_secs: u64,
    /// Run `dunstctl close-all` before the timeline is shown.
    #[serde(default)]
    pub clear_on_start: bool,
}

/// Alarm configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_player")]
    pub player: String,
    #[serde(default = "default_sound_path")]
    pub sound_path: PathBuf,
}

/// Schedule generator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/tasktimer/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_backend() -> Backend {
    Backend::NotifySend
}
fn default_app_name() -> String {
    "Task Countdown Timer".into()
}
fn default_timeline_delay_ms() -> u64 {
    100
}
fn default_final_expire_secs() -> u64 {
    5
}
fn default_player() -> String {
    "paplay".into()
}
fn default_sound_path() -> PathBuf {
    PathBuf::from("/usr/share/sounds/freedesktop/stereo/alarm-clock-elapsed.oga")
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            allow_skip: true,
            workday_end_time: None,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            app_name: default_app_name(),
            timeline: true,
            timeline_delay_ms: default_timeline_delay_ms(),
            final_expire_secs: default_final_expire_secs(),
            clear_on_start: false,
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            player: default_player(),
            sound_path: default_sound_path(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    let n = value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                    serde_json::Value::Number(n.into())
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    return Err(invalid("not a single value".into()));
                }
                // Strings and unset optionals.
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/tasktimer"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the user's config directory, writing defaults when the
    /// file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Same as [`Config::load`] for an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                debug!(path = %path.display(), "config loaded");
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                info!(path = %path.display(), "wrote default config");
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the user's config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Every leaf key with its value, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit
    /// the key's type.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated
            .workday_end()
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        *self = updated;
        Ok(())
    }

    /// Set a value by dot-separated key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// The configured workday cutoff, if any.
    pub fn workday_end(&self) -> Result<Option<NaiveTime>, ScheduleError> {
        self.timer
            .workday_end_time
            .as_deref()
            .map(parse_cutoff)
            .transpose()
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            allow_skip: self.timer.allow_skip,
            timeline: self.notifications.timeline,
            timeline_delay: Duration::from_millis(self.notifications.timeline_delay_ms),
            final_expiry: Duration::from_secs(self.notifications.final_expire_secs),
            ..RunnerConfig::default()
        }
    }
}
