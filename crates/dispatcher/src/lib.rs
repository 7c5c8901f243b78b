//! # Dispatcher
//!
//! Fan-out of bridge messages to viewer channels.
//!
//! Responsibilities:
//! - Keep the registry of live `OutputChannel`s
//! - Deliver every broadcast to every registered channel, in order
//! - Isolate failing channels: a failed write removes only that channel

pub mod broadcaster;
pub mod channel;
pub mod metrics;

pub use broadcaster::{BroadcastReport, Broadcaster};
pub use channel::{OutputChannel, QueueSink};
pub use contracts::{BridgeMessage, ChannelId, ChannelSink, ChannelWriteError};
pub use metrics::{BroadcastMetrics, MetricsSnapshot};
