//! Error types for the alarm clock daemon.

use std::path::PathBuf;

use uuid::Uuid;

/// Result type for `pi_clockd` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the daemon and its client helpers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing a file failed.
    #[error("IO error on {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Socket or pipe IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The alarms document or a protocol message could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No alarm with this id.
    #[error("alarm not found: {0}")]
    AlarmNotFound(Uuid),

    /// No alarm id starts with the given prefix.
    #[error("no alarm id starts with '{0}'")]
    UnknownId(String),

    /// More than one alarm matches an id prefix.
    #[error("alarm id prefix '{0}' is ambiguous")]
    AmbiguousId(String),

    /// A time of day could not be parsed.
    #[error("invalid time '{0}': expected HH:MM")]
    InvalidTime(String),

    /// A set of weekdays could not be parsed.
    #[error("invalid days '{0}'")]
    InvalidDays(String),

    /// An alert backend failed to start or stop.
    #[error("alert error: {0}")]
    Alert(String),

    /// Writing the display brightness failed.
    #[error("backlight error on {path}: {source}")]
    Backlight {
        path: PathBuf,
        source: std::io::Error,
    },

    /// HTTP request to an external service failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The hardware clock tool failed.
    #[error("hwclock failed: {0}")]
    Rtc(String),

    /// The peer closed the connection or sent something unexpected.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidTime("25:00".to_string());
        assert_eq!(err.to_string(), "invalid time '25:00': expected HH:MM");

        let id = Uuid::nil();
        let err = Error::AlarmNotFound(id);
        assert_eq!(
            err.to_string(),
            "alarm not found: 00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_file_error_keeps_path() {
        let err = Error::file(
            "/tmp/alarms.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/alarms.json"));
        assert!(matches!(err, Error::File { .. }));
    }
}
