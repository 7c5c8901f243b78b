//! # Ingestion
//!
//! Upstream side of the bridge.
//!
//! Responsibilities:
//! - Open the hub event feed (real HTTPS client or scripted mock)
//! - Expand each batch into normalized events and hand them to the broadcaster
//! - Rotate the subscription on a fixed interval without a delivery gap
//! - Recover a subscription that dies mid-stream
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{HttpHubClient, RotationScheduler, UpstreamSubscriber};
//!
//! let client = Arc::new(HttpHubClient::new(&blueprint.hub)?);
//! let subscriber = UpstreamSubscriber::new(client, broadcaster.clone(), blueprint.hub.clone());
//! let scheduler = RotationScheduler::new(Arc::new(subscriber), blueprint.rotation.clone());
//! let task = scheduler.spawn(cancel.clone());
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::MockHubClient;
//!
//! let client = MockHubClient::new();
//! client.send_json(0, r#"[{"creationtime":"t","id":"e","type":"update","data":[]}]"#)?;
//! ```

mod error;
mod http_client;
mod mock;
mod rotation;
mod subscriber;

// Re-exports
pub use error::{IngestionError, Result};
pub use http_client::{decode_batches, HttpHubClient};
pub use mock::{MockEvent, MockHubClient};
pub use rotation::{RotationScheduler, RotationState};
pub use subscriber::{SubscriptionHandle, UpstreamSubscriber};
