//! Layered error definitions
//!
//! Categorized by source: config / upstream connect / upstream stream /
//! downstream channel / client parse

use thiserror::Error;

/// Unified error type for configuration and general failures
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure opening the hub event feed
///
/// Reported and retried by the rotation scheduler; never fatal.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Network-level failure reaching the hub
    #[error("hub at '{address}' unreachable: {message}")]
    Unreachable { address: String, message: String },

    /// The hub refused the credential
    #[error("hub at '{address}' rejected the credential (status {status})")]
    Rejected { address: String, status: u16 },

    /// The hub answered with an unexpected status
    #[error("hub at '{address}' answered with status {status}")]
    Status { address: String, status: u16 },

    /// The configured address cannot form a URL
    #[error("invalid hub address '{address}': {message}")]
    InvalidAddress { address: String, message: String },
}

impl ConnectError {
    pub fn unreachable(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Map an HTTP status to the matching connect error
    pub fn from_status(address: impl Into<String>, status: u16) -> Self {
        let address = address.into();
        match status {
            401 | 403 => Self::Rejected { address, status },
            _ => Self::Status { address, status },
        }
    }
}

/// Failure on an already-open upstream connection
///
/// The connection is dead afterwards; nothing is recoverable from it.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Transport failure while reading
    #[error("upstream transport error: {message}")]
    Transport { message: String },

    /// A message arrived that is not a batch of hub envelopes
    #[error("upstream payload decode error: {message}")]
    Decode { message: String },

    /// The hub closed the stream
    #[error("upstream stream ended")]
    Ended,
}

impl StreamError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Failure writing to one downstream channel
///
/// Isolated to that channel: triggers its removal and nothing else.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChannelWriteError {
    /// The viewer went away
    #[error("channel closed")]
    Closed,

    /// The viewer's queue is full
    #[error("channel queue full")]
    Full,

    /// No channel with this id is registered
    #[error("channel not registered")]
    UnknownChannel,
}

/// Malformed payload on the viewer side
#[derive(Debug, Error)]
#[error("payload parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}
