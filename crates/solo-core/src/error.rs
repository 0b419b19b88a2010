//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur while building or loading configuration.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// Port outside the usable range. The reply send socket binds port + 1,
    /// so the configured port must leave room for it.
    #[error("Invalid discovery port {port}: must be between 1 and 65534")]
    InvalidPort { port: u16 },

    /// Zero response timeout
    #[error("Invalid response timeout: must be greater than zero")]
    InvalidTimeout,

    /// Settings file could not be read
    #[error("Failed to read settings file {path}: {reason}")]
    SettingsRead { path: String, reason: String },

    /// Settings file could not be parsed
    #[error("Failed to parse settings file {path}: {reason}")]
    SettingsParse { path: String, reason: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
