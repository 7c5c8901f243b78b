//! Scripted event source
//!
//! Each `connect` pops the next script entry. When the script runs out the
//! connection stays open and silent.

use std::collections::VecDeque;
use std::sync::Arc;

use contracts::{ConnectError, EventSource, SseEvent, SseEventStream, StreamError};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::time::Instant;

/// One scripted connection attempt
#[derive(Debug)]
pub enum ScriptedConnection {
    /// Connect fails
    Refuse(ConnectError),
    /// Connect succeeds and yields these items, then stays silent
    Items(Vec<Result<SseEvent, StreamError>>),
}

impl ScriptedConnection {
    /// A connection delivering `data` payloads, then failing
    pub fn data_then_fail(payloads: &[&str], error: StreamError) -> Self {
        let mut items: Vec<_> = payloads.iter().map(|p| Ok(data_event(p))).collect();
        items.push(Err(error));
        Self::Items(items)
    }

    /// A connection delivering `data` payloads, then staying open
    pub fn data(payloads: &[&str]) -> Self {
        Self::Items(payloads.iter().map(|p| Ok(data_event(p))).collect())
    }
}

/// SSE block carrying only a data field
pub fn data_event(payload: &str) -> SseEvent {
    SseEvent {
        data: Some(payload.to_string()),
        ..SseEvent::default()
    }
}

#[derive(Default)]
struct ScriptInner {
    script: VecDeque<ScriptedConnection>,
    connects: Vec<Instant>,
}

#[derive(Clone, Default)]
pub struct ScriptedEventSource {
    inner: Arc<Mutex<ScriptInner>>,
}

impl ScriptedEventSource {
    pub fn new(script: impl IntoIterator<Item = ScriptedConnection>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScriptInner {
                script: script.into_iter().collect(),
                connects: Vec::new(),
            })),
        }
    }

    /// Number of connect calls so far
    pub fn connect_count(&self) -> usize {
        self.inner.lock().connects.len()
    }

    /// When each connect call happened
    pub fn connect_times(&self) -> Vec<Instant> {
        self.inner.lock().connects.clone()
    }
}

impl EventSource for ScriptedEventSource {
    async fn connect(&self) -> Result<SseEventStream, ConnectError> {
        let next = {
            let mut inner = self.inner.lock();
            inner.connects.push(Instant::now());
            inner.script.pop_front()
        };

        match next {
            Some(ScriptedConnection::Refuse(e)) => Err(e),
            Some(ScriptedConnection::Items(items)) => {
                Ok(stream::iter(items).chain(stream::pending()).boxed())
            }
            None => Ok(stream::pending().boxed()),
        }
    }
}
