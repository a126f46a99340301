//! Core error types for tasktimer-core.
//!
//! Only startup-class failures (schedule, config, transport initialization)
//! are meant to reach the operator. Everything raised while a countdown is
//! running is logged and absorbed by the caller.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::notify::SlotId;

/// Core error type for tasktimer-core.
///
/// What a command reports to the operator before exiting 1.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The run surface was invoked without a schedule file
    #[error("Usage: tasktimer <SCHEDULE>")]
    MissingSchedule,

    /// An input file named on the command line does not exist
    #[error("The file '{}' was not found.", path.display())]
    NotFound { path: PathBuf },

    /// Schedule loading errors
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// The notification transport could not be started
    #[error(
        "Failed to initialize notification system: {0}\n\
         Ensure a notification daemon like 'dunst' is running, or use --backend log."
    )]
    Notify(#[from] NotifyError),

    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Schedule generator errors
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while reading a schedule file.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("The file '{}' was not found.", path.display())]
    NotFound { path: PathBuf },

    #[error("Could not read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("The file '{}' is not a valid JSON schedule: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Workday cutoff is not a valid `HH:MM` time
    #[error("Invalid workday end time '{0}', expected HH:MM")]
    InvalidCutoff(String),
}

/// Notification transport errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The transport binary is missing or could not be started
    #[error("'{program}' is not available: {source}")]
    Unavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The transport ran but reported failure
    #[error("'{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The transport did not answer in time
    #[error("'{program}' did not finish within {after:?}")]
    Timeout { program: String, after: Duration },

    /// `update` on a slot with no open notification
    #[error("No open notification in slot '{slot}'")]
    ChannelClosed { slot: SlotId },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Schedule generator errors.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// API key environment variable not set
    #[error("API key not found; set {env_var} (a .env file is honored)")]
    MissingApiKey { env_var: String },

    /// Invalid base URL
    #[error("Invalid generator URL: {0}")]
    Url(#[from] url::ParseError),

    /// Transport-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The API answered without any message content
    #[error("API response contained no schedule")]
    EmptyResponse,

    /// The message content is not a schedule
    #[error("API response is not a valid schedule: {0}")]
    InvalidSchedule(#[source] serde_json::Error),
}

/// Result type alias for CoreError.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_operator_text() {
        let err: CoreError = ScheduleError::NotFound {
            path: PathBuf::from("today.json"),
        }
        .into();
        assert_eq!(err.to_string(), "The file 'today.json' was not found.");

        let err: CoreError = ConfigError::UnknownKey("timer.colour".into()).into();
        assert_eq!(err.to_string(), "unknown config key: timer.colour");
    }

    #[test]
    fn transport_startup_failure_suggests_a_fallback() {
        let err: CoreError = NotifyError::Unavailable {
            program: "notify-send".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into();
        let text = err.to_string();
        assert!(text.starts_with("Failed to initialize notification system: 'notify-send'"));
        assert!(text.contains("--backend log"));
    }
}
