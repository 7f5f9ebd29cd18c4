//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
///
/// Note that a tool invocation reporting a non-zero exit code is NOT an error:
/// subprocess failures travel as the terminal boolean of an operation so the
/// user can retry the step. Only conditions that must stop the session (bad
/// device definitions, unknown commands, missing inputs) live here.
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ─────────────────────────────────────────────────────────────
    // Device Definition Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid device definition at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    #[error("No device definition found for device code '{device_code}'")]
    ConfigNotFound { device_code: String },

    // ─────────────────────────────────────────────────────────────
    // Dispatch Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Unknown tool '{name}'. Use adb, fastboot or heimdall.")]
    UnknownTool { name: String },

    #[error("Unknown command '{name}' in step definition")]
    UnknownCommand { name: String },

    #[error("Step '{title}' requires a command but none is set")]
    MissingCommand { title: String },

    #[error("Missing required input: {what}")]
    MissingInput { what: String },

    // ─────────────────────────────────────────────────────────────
    // Device Detection Errors
    // ─────────────────────────────────────────────────────────────
    #[error("No device found. Connect your device via USB and try again.")]
    NoDeviceFound,

    // ─────────────────────────────────────────────────────────────
    // Settings Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Settings error: {message}")]
    Settings { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn config_invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config_not_found(device_code: impl Into<String>) -> Self {
        Self::ConfigNotFound {
            device_code: device_code.into(),
        }
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    pub fn unknown_command(name: impl Into<String>) -> Self {
        Self::UnknownCommand { name: name.into() }
    }

    pub fn missing_command(title: impl Into<String>) -> Self {
        Self::MissingCommand {
            title: title.into(),
        }
    }

    pub fn missing_input(what: impl Into<String>) -> Self {
        Self::MissingInput { what: what.into() }
    }

    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors keep the session alive: the user can reconnect the
    /// device or pick another definition and try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. } | Error::NoDeviceFound | Error::Settings { .. }
        )
    }

    /// Check if this error indicates a corrupt or unsupported definition
    ///
    /// Fatal errors stop the session immediately rather than proceeding with
    /// undefined behavior; they are never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigInvalid { .. }
                | Error::UnknownTool { .. }
                | Error::UnknownCommand { .. }
                | Error::MissingCommand { .. }
                | Error::MissingInput { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
