//! Broadcaster - fan-out registry of viewer channels

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use contracts::{BridgeMessage, ChannelId, ChannelWriteError};

use crate::channel::OutputChannel;
use crate::metrics::{BroadcastMetrics, MetricsSnapshot};

/// Outcome of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Channels that accepted the message
    pub delivered: usize,
    /// Channels removed because their write failed
    pub removed: Vec<ChannelId>,
}

struct Shared {
    /// Registered channels, in registration order
    registry: Mutex<Vec<OutputChannel>>,
    metrics: BroadcastMetrics,
}

/// Registry of live output channels
///
/// Cheap to clone; every clone shares the same registry. Register, unregister
/// and broadcast are serialized by one lock, and writes under the lock never
/// block.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Shared>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Shared {
                registry: Mutex::new(Vec::new()),
                metrics: BroadcastMetrics::new(),
            }),
        }
    }

    /// Add a channel; each call creates a new entry
    #[instrument(name = "broadcaster_register", skip(self, channel), fields(channel = %channel.id()))]
    pub fn register(&self, channel: OutputChannel) -> ChannelId {
        let id = channel.id();
        let count = {
            let mut registry = self.inner.registry.lock();
            registry.push(channel);
            registry.len()
        };
        self.inner.metrics.inc_registered_count();
        observability::record_viewers(count);
        info!(channel = %id, viewers = count, "Channel registered");
        id
    }

    /// Remove a channel
    ///
    /// Unknown or already-removed ids are a no-op. Returns whether a channel
    /// was actually removed.
    #[instrument(name = "broadcaster_unregister", skip(self), fields(channel = %id))]
    pub fn unregister(&self, id: ChannelId) -> bool {
        let (removed, count) = {
            let mut registry = self.inner.registry.lock();
            let before = registry.len();
            registry.retain(|c| c.id() != id);
            (registry.len() != before, registry.len())
        };
        if removed {
            self.inner.metrics.inc_removed_count();
            observability::record_viewers(count);
            info!(channel = %id, viewers = count, "Channel unregistered");
        } else {
            debug!(channel = %id, "Unregister of unknown channel ignored");
        }
        removed
    }

    /// Write `message` to every registered channel
    ///
    /// A failed write removes that channel and never stops delivery to the
    /// others.
    pub fn broadcast(&self, message: &BridgeMessage) -> BroadcastReport {
        let payload = message.payload();
        let mut report = BroadcastReport::default();

        let count = {
            let mut registry = self.inner.registry.lock();
            registry.retain(|channel| match channel.try_write(payload.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(e) => {
                    warn!(channel = %channel.id(), error = %e, "Write failed, removing channel");
                    report.removed.push(channel.id());
                    false
                }
            });
            registry.len()
        };

        let metrics = &self.inner.metrics;
        metrics.inc_broadcast_count();
        metrics.add_write_count(report.delivered as u64);
        for _ in &report.removed {
            metrics.inc_failure_count();
            metrics.inc_removed_count();
        }
        observability::record_broadcast(message.kind(), report.delivered, report.removed.len());
        if !report.removed.is_empty() {
            observability::record_viewers(count);
        }

        debug!(
            kind = message.kind(),
            delivered = report.delivered,
            removed = report.removed.len(),
            "Broadcast complete"
        );
        report
    }

    /// Write `message` to a single channel
    ///
    /// Same failure semantics as `broadcast`: a failed write removes the
    /// channel.
    pub fn send_to(&self, id: ChannelId, message: &BridgeMessage) -> Result<(), ChannelWriteError> {
        let payload = message.payload();
        let mut registry = self.inner.registry.lock();
        let idx = registry
            .iter()
            .position(|c| c.id() == id)
            .ok_or(ChannelWriteError::UnknownChannel)?;

        match registry[idx].try_write(payload) {
            Ok(()) => {
                self.inner.metrics.add_write_count(1);
                Ok(())
            }
            Err(e) => {
                registry.remove(idx);
                let count = registry.len();
                drop(registry);

                self.inner.metrics.inc_failure_count();
                self.inner.metrics.inc_removed_count();
                observability::record_viewers(count);
                warn!(channel = %id, error = %e, "Write failed, removing channel");
                Err(e)
            }
        }
    }

    /// Drop every channel; their viewers see end-of-stream
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = self.inner.registry.lock().drain(..).collect();
        for _ in &drained {
            self.inner.metrics.inc_removed_count();
        }
        observability::record_viewers(0);
        info!(channels = drained.len(), "All channels closed");
        drained.len()
    }

    /// Number of registered channels
    pub fn len(&self) -> usize {
        self.inner.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ChannelId) -> bool {
        self.inner.registry.lock().iter().any(|c| c.id() == id)
    }

    /// Registered ids, in registration order
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.inner.registry.lock().iter().map(|c| c.id()).collect()
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ChannelSink, NormalizedEvent, PingMessage};
    use tokio::sync::mpsc;

    /// Sink that always rejects writes
    struct FailingSink;

    impl ChannelSink for FailingSink {
        fn try_write(&self, _payload: Arc<str>) -> Result<(), ChannelWriteError> {
            Err(ChannelWriteError::Closed)
        }

        fn is_connected(&self) -> bool {
            false
        }
    }

    fn event(json: &str) -> BridgeMessage {
        BridgeMessage::Event(NormalizedEvent::from_json(json).unwrap())
    }

    fn drain(rx: &mut mpsc::Receiver<Arc<str>>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(payload) = rx.try_recv() {
            out.push(payload.to_string());
        }
        out
    }

    #[tokio::test]
    async fn test_register_broadcast_unregister_scenario() {
        let broadcaster = Broadcaster::new();
        let (channel, mut rx) = OutputChannel::bounded(8);
        let c1 = broadcaster.register(channel);

        let report = broadcaster.broadcast(&event(r#"{"kind":"motion","value":true}"#));
        assert_eq!(report.delivered, 1);
        assert_eq!(drain(&mut rx), vec![r#"{"kind":"motion","value":true}"#]);

        assert!(broadcaster.unregister(c1));
        let report = broadcaster.broadcast(&event(r#"{"kind":"motion","value":true}"#));
        assert_eq!(report, BroadcastReport::default());
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let broadcaster = Broadcaster::new();
        let (channel, _rx) = OutputChannel::bounded(1);
        let id = broadcaster.register(channel);
        assert!(broadcaster.unregister(id));
        assert!(!broadcaster.unregister(id));
        assert!(!broadcaster.unregister(ChannelId::generate()));
        assert!(broadcaster.is_empty());
    }

    #[test]
    fn test_failure_isolated_and_removed() {
        let broadcaster = Broadcaster::new();
        let a = broadcaster.register(OutputChannel::new(FailingSink));
        let (channel_b, mut rx_b) = OutputChannel::bounded(4);
        let b = broadcaster.register(channel_b);

        let report = broadcaster.broadcast(&event(r#"{"n":1}"#));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.removed, vec![a]);
        assert!(!broadcaster.contains(a));
        assert!(broadcaster.contains(b));
        assert_eq!(drain(&mut rx_b).len(), 1);

        let snapshot = broadcaster.metrics();
        assert_eq!(snapshot.failure_count, 1);
        assert_eq!(snapshot.removed_count, 1);
    }

    #[test]
    fn test_full_queue_removes_channel() {
        let broadcaster = Broadcaster::new();
        let (channel, _rx) = OutputChannel::bounded(1);
        let id = broadcaster.register(channel);

        assert_eq!(broadcaster.broadcast(&event("1")).delivered, 1);
        let report = broadcaster.broadcast(&event("2"));
        assert_eq!(report.removed, vec![id]);
        assert!(broadcaster.is_empty());
    }

    #[test]
    fn test_interleaved_membership_exactly_once_in_order() {
        let broadcaster = Broadcaster::new();
        let (c1, mut rx1) = OutputChannel::bounded(16);
        let (c2, mut rx2) = OutputChannel::bounded(16);
        let (c3, mut rx3) = OutputChannel::bounded(16);

        let id1 = broadcaster.register(c1);
        broadcaster.broadcast(&event("1"));
        let id2 = broadcaster.register(c2);
        broadcaster.broadcast(&event("2"));
        broadcaster.unregister(id1);
        let _id3 = broadcaster.register(c3);
        broadcaster.broadcast(&event("3"));
        broadcaster.unregister(id2);
        broadcaster.broadcast(&event("4"));

        assert_eq!(drain(&mut rx1), vec!["1", "2"]);
        assert_eq!(drain(&mut rx2), vec!["2", "3"]);
        assert_eq!(drain(&mut rx3), vec!["3", "4"]);
    }

    #[test]
    fn test_send_to_single_channel() {
        let broadcaster = Broadcaster::new();
        let (c1, mut rx1) = OutputChannel::bounded(4);
        let (c2, mut rx2) = OutputChannel::bounded(4);
        let id1 = broadcaster.register(c1);
        broadcaster.register(c2);

        let ping = BridgeMessage::Ping(PingMessage {
            ping: "t".to_string(),
        });
        broadcaster.send_to(id1, &ping).unwrap();
        assert_eq!(drain(&mut rx1), vec![r#"{"ping":"t"}"#]);
        assert!(drain(&mut rx2).is_empty());

        assert_eq!(
            broadcaster.send_to(ChannelId::generate(), &ping),
            Err(ChannelWriteError::UnknownChannel)
        );
    }

    #[test]
    fn test_send_to_failure_removes_channel() {
        let broadcaster = Broadcaster::new();
        let id = broadcaster.register(OutputChannel::new(FailingSink));
        let ping = BridgeMessage::Ping(PingMessage::now());
        assert_eq!(broadcaster.send_to(id, &ping), Err(ChannelWriteError::Closed));
        assert!(!broadcaster.contains(id));
    }

    #[tokio::test]
    async fn test_concurrent_register_and_broadcast() {
        let broadcaster = Broadcaster::new();
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let b = broadcaster.clone();
            tasks.push(tokio::spawn(async move {
                let (channel, rx) = OutputChannel::bounded(64);
                let id = b.register(channel);
                b.broadcast(&event("1"));
                b.unregister(id);
                rx
            }));
        }
        for task in tasks {
            let mut rx = task.await.unwrap();
            assert!(!drain(&mut rx).is_empty());
        }
        assert!(broadcaster.is_empty());
        assert_eq!(broadcaster.metrics().registered_count, 8);
    }

    #[test]
    fn test_close_all() {
        let broadcaster = Broadcaster::new();
        let (c1, _rx1) = OutputChannel::bounded(1);
        let (c2, _rx2) = OutputChannel::bounded(1);
        broadcaster.register(c1);
        broadcaster.register(c2);
        assert_eq!(broadcaster.close_all(), 2);
        assert!(broadcaster.is_empty());
    }
}
