//! Error taxonomy for controller operations
//!
//! Precondition and configuration failures are errors. Attempts that simply
//! did not succeed (connect refused, save not verified, a file that could not
//! be deleted) are reported as `false` or in a report instead.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Errors returned by the controller and its guards
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// A remote operation was attempted without a live connection
    #[error("Not connected to OBS WebSocket")]
    NotConnected,

    /// An operation requires the OBS process, which is not running
    #[error("OBS process '{0}' is not running")]
    ProcessNotRunning(String),

    /// A required setting is missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The host cannot answer a query the controller depends on
    #[error("Host environment error: {0}")]
    Environment(String),

    /// An OBS settings file could not be read or written
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An OBS settings file has content the controller cannot edit
    #[error("Malformed settings file {path}: {message}")]
    MalformedIni { path: PathBuf, message: String },
}

impl ControllerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ControllerError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::Configuration(err.to_string())
    }
}
