//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the bridge.
//! Business crates depend only on this crate, never on each other's internals.
//!
//! ## Message Model
//! - The hub delivers batches of `HubEventEnvelope`, each carrying one or more
//!   opaque `HubEventItem`s
//! - Each item becomes one `NormalizedEvent`; endpoints add `PingMessage`s
//! - Everything leaving the server is an SSE frame: `data: <JSON>\n\n`

mod blueprint;
mod channel_id;
mod error;
mod event_source;
mod hub_client;
mod hub_event;
mod message;
mod sensor;
mod sink;
pub mod sse;

pub use blueprint::*;
pub use channel_id::ChannelId;
pub use error::*;
pub use event_source::{EventSource, LocalEventSource, SseEventStream};
pub use hub_client::{HubBatchStream, HubClient, HubSession, LocalHubClient, UpstreamStatus};
pub use hub_event::*;
pub use message::*;
pub use sensor::*;
pub use sink::ChannelSink;
pub use sse::{SseDecoder, SseEvent};
