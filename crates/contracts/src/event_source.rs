//! EventSource trait - viewer-side transport
//!
//! Opens one connection to the bridge's event stream and yields decoded SSE
//! blocks. The reader owns reconnect policy; a source only connects once per
//! call.

use futures::stream::BoxStream;

use crate::{ConnectError, SseEvent, StreamError};

/// Decoded SSE blocks from one connection
pub type SseEventStream = BoxStream<'static, Result<SseEvent, StreamError>>;

#[trait_variant::make(EventSource: Send)]
pub trait LocalEventSource {
    /// Open a fresh connection
    async fn connect(&self) -> Result<SseEventStream, ConnectError>;
}
