//! ChannelSink trait - broadcaster output interface
//!
//! The writable end of one viewer connection.

use std::sync::Arc;

use crate::ChannelWriteError;

/// Writable end of an output channel
///
/// Writes must never block: the broadcaster calls them while holding its
/// registry lock.
pub trait ChannelSink: Send + Sync {
    /// Queue one JSON payload; the transport does its own framing
    ///
    /// # Errors
    /// `Closed` when the viewer is gone, `Full` when it cannot keep up
    fn try_write(&self, payload: Arc<str>) -> Result<(), ChannelWriteError>;

    /// Whether the viewer side is still attached
    fn is_connected(&self) -> bool;
}
