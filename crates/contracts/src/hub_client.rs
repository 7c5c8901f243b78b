//! HubClient trait - upstream hub collaborator
//!
//! Abstracts the hub's authentication check and event feed so the subscriber
//! can run against the real HTTP client or a scripted mock.

use futures::stream::BoxStream;

use crate::{ConnectError, HubEventBatch, StreamError};

/// Lazy, unbounded, non-restartable sequence of hub batches
///
/// An `Err` item means the connection is dead; nothing follows it.
pub type HubBatchStream = BoxStream<'static, Result<HubEventBatch, StreamError>>;

/// Result of a successful authentication check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubSession {
    /// Address the session was established against
    pub address: String,
    /// Hub identifier, when the hub reports one
    pub bridge_id: Option<String>,
}

/// Hub client trait
///
/// Implementations own transport details (TLS, headers, URL layout).
#[trait_variant::make(HubClient: Send)]
pub trait LocalHubClient {
    /// Check that the hub is reachable and accepts the credential
    ///
    /// # Errors
    /// `ConnectError::Rejected` when the credential is refused
    async fn authenticate(&self, address: &str, credential: &str)
        -> Result<HubSession, ConnectError>;

    /// Open the event feed
    ///
    /// Resolves once the connection is established; the returned stream then
    /// yields batches until it errors or is dropped.
    async fn subscribe(&self, address: &str, credential: &str)
        -> Result<HubBatchStream, ConnectError>;
}

/// Read-only view of the upstream side, for health reporting
pub trait UpstreamStatus: Send + Sync {
    /// Number of subscriptions currently delivering events
    fn live_handles(&self) -> usize;
}
