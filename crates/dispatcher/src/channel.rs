//! OutputChannel - one registered viewer connection

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use contracts::{ChannelId, ChannelSink, ChannelWriteError};

/// One live downstream connection as held by the broadcaster
pub struct OutputChannel {
    /// Channel id
    id: ChannelId,
    /// Writable end of the connection
    sink: Box<dyn ChannelSink>,
}

impl OutputChannel {
    /// Wrap a sink under a freshly generated id
    pub fn new<S: ChannelSink + 'static>(sink: S) -> Self {
        Self::with_id(ChannelId::generate(), sink)
    }

    /// Wrap a sink under a caller-chosen id
    pub fn with_id<S: ChannelSink + 'static>(id: ChannelId, sink: S) -> Self {
        Self {
            id,
            sink: Box::new(sink),
        }
    }

    /// Create a channel backed by a bounded queue
    ///
    /// The receiver is the viewer side: it yields payloads until the channel
    /// is dropped from the registry.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(QueueSink::new(tx)), rx)
    }

    /// Get channel id
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Whether the viewer side is still attached
    pub fn is_connected(&self) -> bool {
        self.sink.is_connected()
    }

    pub(crate) fn try_write(&self, payload: Arc<str>) -> Result<(), ChannelWriteError> {
        self.sink.try_write(payload)
    }
}

impl fmt::Debug for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputChannel")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Sink backed by a bounded tokio queue
///
/// A full queue is reported as a write failure; the viewer is too slow to keep.
#[derive(Debug, Clone)]
pub struct QueueSink {
    tx: mpsc::Sender<Arc<str>>,
}

impl QueueSink {
    pub fn new(tx: mpsc::Sender<Arc<str>>) -> Self {
        Self { tx }
    }
}

impl ChannelSink for QueueSink {
    fn try_write(&self, payload: Arc<str>) -> Result<(), ChannelWriteError> {
        self.tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ChannelWriteError::Full,
            mpsc::error::TrySendError::Closed(_) => ChannelWriteError::Closed,
        })
    }

    fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}
