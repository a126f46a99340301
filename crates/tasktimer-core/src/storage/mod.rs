mod config;

pub use config::{
    AlarmConfig, Backend, Config, GeneratorConfig, NotificationsConfig, TimerConfig,
};

use std::path::PathBuf;

/// Returns `~/.config/tasktimer[-dev]/` based on TASKTIMER_ENV.
///
/// Set TASKTIMER_ENV=dev to use a development config directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TASKTIMER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("tasktimer-dev")
    } else {
        base_dir.join("tasktimer")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
