//! Error types for CLI operations.

use contracts::{ConnectError, ContractError};
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be parsed or failed validation
    #[error("Invalid configuration: {0}")]
    Config(#[from] ContractError),

    /// The hub refused the configured credential
    #[error("Hub rejected the credential: {0}")]
    HubRejected(ConnectError),

    /// Startup failure (listener, client, metrics)
    #[error("Startup failed: {message}")]
    Startup { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn startup(message: impl Into<String>) -> Self {
        Self::Startup {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
