//! Per-viewer event stream
//!
//! Each request gets its own channel in the broadcaster and its own liveness
//! ticker. The response is the channel's queue as SSE events, prefixed by
//! the reconnect hint.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use contracts::{BridgeMessage, ChannelId, PingMessage};
use dispatcher::{Broadcaster, OutputChannel};
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::EndpointState;

/// Tears a viewer channel down exactly once
///
/// Lives inside the response body, so it runs both when the client goes away
/// (body dropped) and when the channel queue ends (channel removed elsewhere).
pub(crate) struct ChannelGuard {
    id: ChannelId,
    broadcaster: Broadcaster,
    cancel: CancellationToken,
    opened_at: Instant,
    torn_down: AtomicBool,
}

impl ChannelGuard {
    fn new(id: ChannelId, broadcaster: Broadcaster, cancel: CancellationToken) -> Self {
        Self {
            id,
            broadcaster,
            cancel,
            opened_at: Instant::now(),
            torn_down: AtomicBool::new(false),
        }
    }

    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        self.broadcaster.unregister(self.id);

        let secs = self.opened_at.elapsed().as_secs_f64();
        observability::record_viewer_session_secs(secs);
        info!(channel = %self.id, session_secs = secs, "Viewer disconnected");
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// `GET <server.path>`: open a viewer stream
///
/// `Sse` sets `Content-Type: text/event-stream` and `Cache-Control: no-cache`.
pub async fn event_stream(State(state): State<EndpointState>) -> impl IntoResponse {
    let server = &state.server;
    let (channel, rx) = OutputChannel::bounded(server.channel_capacity);
    let id = state.broadcaster.register(channel);
    info!(channel = %id, "Viewer connected");

    let cancel = state.shutdown.child_token();
    tokio::spawn(ping_loop(
        id,
        state.broadcaster.clone(),
        server.ping_interval(),
        cancel.clone(),
    ));

    let guard = ChannelGuard::new(id, state.broadcaster.clone(), cancel);
    let events = viewer_events(Duration::from_millis(server.client_retry_ms), rx, guard);
    ([(header::CONNECTION, "keep-alive")], Sse::new(events))
}

/// Retry hint first, then every payload the broadcaster queues for this viewer
fn viewer_events(
    retry: Duration,
    rx: mpsc::Receiver<Arc<str>>,
    guard: ChannelGuard,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let events = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        match rx.recv().await {
            Some(payload) => Some((Ok(Event::default().data(&*payload)), (rx, guard))),
            None => {
                debug!(channel = %guard.id, "Channel queue ended");
                None
            }
        }
    });

    stream::once(async move { Ok(Event::default().retry(retry)) }).chain(events)
}

/// Write a ping to one channel every `period` until cancelled or a write fails
async fn ping_loop(
    id: ChannelId,
    broadcaster: Broadcaster,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match broadcaster.send_to(id, &BridgeMessage::Ping(PingMessage::now())) {
                    Ok(()) => {
                        observability::record_ping(true);
                        trace!(channel = %id, "Ping sent");
                    }
                    Err(e) => {
                        observability::record_ping(false);
                        debug!(channel = %id, error = %e, "Ping failed, stopping liveness loop");
                        break;
                    }
                }
            }
        }
    }
}
