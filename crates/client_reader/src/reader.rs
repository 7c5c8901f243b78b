//! ClientReader - reconnecting consumer of the bridge's event stream

use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use contracts::{EventSource, ReaderConfig, SseEventStream, StreamError};
use futures::StreamExt;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::ReaderError;
use crate::message::ViewerMessage;

/// Callback invoked for every decoded message, pings included
pub type Handler = Arc<dyn Fn(&ViewerMessage) + Send + Sync>;

/// Steps before the reconnect delay stays pinned at its maximum
const BACKOFF_STEPS: usize = 16;

/// Floor for every reconnect delay, whatever the configuration says
const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(100);

/// Reads the bridge stream and hands every message to registered handlers
///
/// On any error the connection is dropped and exactly one new attempt is
/// made after a backoff delay.
pub struct ClientReader<S> {
    source: S,
    config: ReaderConfig,
    handlers: RwLock<Vec<Handler>>,
}

/// Handle to a spawned reader
pub struct ReaderHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ReaderHandle {
    /// Ask the reader to stop
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop and wait for the read loop to exit
    pub async fn join(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "reader task failed");
        }
    }
}

impl<S> ClientReader<S>
where
    S: EventSource + Send + Sync + 'static,
{
    pub fn new(source: S, config: ReaderConfig) -> Self {
        Self {
            source,
            config,
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register a handler; handlers run in registration order
    pub fn add_handler<F>(&self, handler: F)
    where
        F: Fn(&ViewerMessage) + Send + Sync + 'static,
    {
        self.handlers.write().push(Arc::new(handler));
    }

    /// Spawn the read loop
    pub fn start(self: Arc<Self>) -> ReaderHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(token).await });
        ReaderHandle { cancel, task }
    }

    /// Read until `cancel` fires
    #[instrument(name = "client_reader_run", skip_all)]
    pub async fn run(&self, cancel: CancellationToken) {
        let mut retry_hint: Option<Duration> = None;
        let mut backoff: Option<ExponentialBackoff> = None;

        loop {
            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                connected = self.source.connect() => connected,
            };

            let error = match connected {
                Ok(stream) => {
                    info!("Connected to event stream");
                    backoff = None;
                    match self.read(stream, &cancel, &mut retry_hint).await {
                        Some(error) => error,
                        None => break,
                    }
                }
                Err(e) => ReaderError::from(e),
            };

            let delay = backoff
                .get_or_insert_with(|| self.backoff(retry_hint))
                .next()
                .unwrap_or_else(|| self.max_delay())
                .clamp(MIN_RECONNECT_DELAY, self.max_delay());
            observability::record_reader_reconnect(delay.as_millis() as u64);
            warn!(error = %error, delay_ms = delay.as_millis() as u64, "Event stream lost, reconnecting");

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Client reader stopped");
    }

    /// Consume one connection; returns the error that ended it, or `None` if cancelled
    async fn read(
        &self,
        mut stream: SseEventStream,
        cancel: &CancellationToken,
        retry_hint: &mut Option<Duration>,
    ) -> Option<ReaderError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                next = stream.next() => next,
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(e)) => return Some(e.into()),
                None => return Some(StreamError::Ended.into()),
            };

            if let Some(ms) = event.retry {
                debug!(retry_ms = ms, "Server retry hint");
                *retry_hint = Some(Duration::from_millis(ms));
            }
            let Some(data) = event.data else {
                continue;
            };

            match ViewerMessage::parse(&data) {
                Ok(message) => self.dispatch(&message),
                Err(e) => {
                    observability::record_reader_parse_dropped();
                    debug!(error = %e, "Dropping unparsable payload");
                }
            }
        }
    }

    fn dispatch(&self, message: &ViewerMessage) {
        let handlers = self.handlers.read().clone();
        for handler in &handlers {
            handler(message);
        }
    }

    /// Backoff starting at the larger of the configured minimum and the server hint
    fn backoff(&self, retry_hint: Option<Duration>) -> ExponentialBackoff {
        let max = self.max_delay();
        let min = retry_hint
            .map_or(self.config.min_backoff(), |hint| hint.max(self.config.min_backoff()))
            .clamp(MIN_RECONNECT_DELAY, max);

        ExponentialBuilder::default()
            .with_min_delay(min)
            .with_max_delay(max)
            .with_max_times(BACKOFF_STEPS)
            .with_jitter()
            .build()
    }

    fn max_delay(&self) -> Duration {
        self.config.max_backoff().max(MIN_RECONNECT_DELAY)
    }
}
