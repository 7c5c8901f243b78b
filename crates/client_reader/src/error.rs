//! Client reader errors

use contracts::{ConnectError, ParseError, StreamError};
use thiserror::Error;

/// Why a connection attempt or an open connection ended
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Could not connect to the bridge
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// The open connection failed or closed
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// A payload was not valid JSON
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The HTTP client could not be built
    #[error("failed to build http client: {message}")]
    Client { message: String },
}

pub type Result<T> = std::result::Result<T, ReaderError>;
