//! UpstreamSubscriber - one long-lived subscription to the hub feed

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use contracts::{
    BridgeMessage, ConnectError, HubBatchStream, HubClient, HubConfig, StreamError, UpstreamStatus,
};
use dispatcher::Broadcaster;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info, instrument, warn};

/// Per-handle bookkeeping shared with its forwarding task
struct HandleState {
    id: u64,
    open: AtomicBool,
    died: CancellationToken,
    live: Arc<AtomicUsize>,
}

impl HandleState {
    /// Leave the live set; only the first call counts
    fn release(&self) -> bool {
        if self.open.swap(false, Ordering::SeqCst) {
            let live = self.live.fetch_sub(1, Ordering::SeqCst) - 1;
            observability::record_live_upstreams(live);
            true
        } else {
            false
        }
    }
}

/// An open subscription
///
/// Dropping the handle closes it.
pub struct SubscriptionHandle {
    state: Arc<HandleState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.state.id
    }

    /// Whether the subscription is still delivering events
    pub fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    /// Whether the connection failed or ended on its own
    pub fn is_dead(&self) -> bool {
        self.state.died.is_cancelled()
    }

    /// Resolves when the connection fails or ends on its own
    ///
    /// Never resolves for a handle closed through `close`.
    pub fn died(&self) -> WaitForCancellationFuture<'_> {
        self.state.died.cancelled()
    }

    fn close(&self) -> bool {
        self.cancel.cancel();
        self.state.release()
    }

    /// Close and wait for the forwarding task to release the connection
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(handle = self.state.id, error = %e, "forwarding task failed");
            }
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.state.id)
            .field("open", &self.is_open())
            .field("dead", &self.is_dead())
            .finish()
    }
}

/// Opens hub subscriptions and forwards their events to the broadcaster
pub struct UpstreamSubscriber<C> {
    client: Arc<C>,
    broadcaster: Broadcaster,
    hub: HubConfig,
    live: Arc<AtomicUsize>,
    next_id: AtomicU64,
}

impl<C> UpstreamSubscriber<C>
where
    C: HubClient + Send + Sync + 'static,
{
    pub fn new(client: Arc<C>, broadcaster: Broadcaster, hub: HubConfig) -> Self {
        Self {
            client,
            broadcaster,
            hub,
            live: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Open a subscription
    ///
    /// Returns once the hub accepted the connection; events are forwarded
    /// from then on by a background task.
    #[instrument(name = "upstream_open", skip(self), fields(address = %self.hub.address))]
    pub async fn open(&self) -> Result<SubscriptionHandle, ConnectError> {
        let stream = self
            .client
            .subscribe(&self.hub.address, &self.hub.credential)
            .await?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        observability::record_live_upstreams(live);

        let state = Arc::new(HandleState {
            id,
            open: AtomicBool::new(true),
            died: CancellationToken::new(),
            live: self.live.clone(),
        });
        let cancel = CancellationToken::new();
        let task = tokio::spawn(forward(
            stream,
            self.broadcaster.clone(),
            cancel.clone(),
            state.clone(),
        ));

        info!(handle = id, live, "Upstream subscription open");
        Ok(SubscriptionHandle {
            state,
            cancel,
            task: Some(task),
        })
    }

    /// Close a subscription; closing twice is a no-op
    pub fn close(&self, handle: &SubscriptionHandle) {
        if handle.close() {
            info!(handle = handle.id(), live = self.live_handles(), "Upstream subscription closed");
        } else {
            debug!(handle = handle.id(), "Subscription already closed");
        }
    }

    /// Number of subscriptions currently open
    pub fn live_handles(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl<C> UpstreamStatus for UpstreamSubscriber<C>
where
    C: HubClient + Send + Sync + 'static,
{
    fn live_handles(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

fn error_kind(error: &StreamError) -> &'static str {
    match error {
        StreamError::Transport { .. } => "transport",
        StreamError::Decode { .. } => "decode",
        StreamError::Ended => "ended",
    }
}

/// Forward every batch item, in order, until closed or the stream fails
async fn forward(
    mut stream: HubBatchStream,
    broadcaster: Broadcaster,
    cancel: CancellationToken,
    state: Arc<HandleState>,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(handle = state.id, "Forwarding stopped");
                break;
            }
            next = stream.next() => {
                let error = match next {
                    Some(Ok(batch)) => {
                        observability::record_hub_batch(batch.envelopes.len(), batch.item_count());
                        for event in batch.normalize() {
                            broadcaster.broadcast(&BridgeMessage::Event(event));
                        }
                        continue;
                    }
                    Some(Err(e)) => e,
                    None => StreamError::Ended,
                };

                observability::record_upstream_stream_error(error_kind(&error));
                warn!(handle = state.id, error = %error, "Upstream subscription died");
                state.release();
                state.died.cancel();
                break;
            }
        }
    }
}
