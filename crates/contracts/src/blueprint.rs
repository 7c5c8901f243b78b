//! BridgeBlueprint - Config Loader output
//!
//! Describes the whole bridge: hub connection, rotation policy, the viewer
//! endpoint, and the viewer-side reader.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Hub connection
    pub hub: HubConfig,

    /// Upstream connection rotation
    #[serde(default)]
    pub rotation: RotationConfig,

    /// Viewer-facing event stream
    #[serde(default)]
    pub server: ServerConfig,

    /// Viewer-side reader (used by `watch`)
    #[serde(default)]
    pub reader: ReaderConfig,
}

/// Hub connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Hub IP or host name
    pub address: String,

    /// Application key issued by the hub
    #[serde(default)]
    pub credential: String,

    /// Hubs present self-signed certificates
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,

    /// Timeout for establishing the connection (seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl HubConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_accept_invalid_certs() -> bool {
    true
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Rotation and recovery policy for the upstream connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Replace the upstream connection this often (seconds)
    #[serde(default = "default_rotation_interval_secs")]
    pub interval_secs: u64,

    /// First delay when recovering a dead connection (milliseconds)
    #[serde(default = "default_recovery_min_ms")]
    pub recovery_min_ms: u64,

    /// Cap on the recovery delay (milliseconds)
    #[serde(default = "default_recovery_max_ms")]
    pub recovery_max_ms: u64,
}

impl RotationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn recovery_min(&self) -> Duration {
        Duration::from_millis(self.recovery_min_ms)
    }

    pub fn recovery_max(&self) -> Duration {
        Duration::from_millis(self.recovery_max_ms)
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_rotation_interval_secs(),
            recovery_min_ms: default_recovery_min_ms(),
            recovery_max_ms: default_recovery_max_ms(),
        }
    }
}

fn default_rotation_interval_secs() -> u64 {
    3600
}

fn default_recovery_min_ms() -> u64 {
    1000
}

fn default_recovery_max_ms() -> u64 {
    60_000
}

/// Viewer endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Route of the event stream
    #[serde(default = "default_path")]
    pub path: String,

    /// Liveness ping period (seconds)
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Reconnect interval advised to viewers (milliseconds)
    #[serde(default = "default_client_retry_ms")]
    pub client_retry_ms: u64,

    /// Per-viewer queue capacity (messages)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl ServerConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            path: default_path(),
            ping_interval_secs: default_ping_interval_secs(),
            client_retry_ms: default_client_retry_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5173".to_string()
}

fn default_path() -> String {
    "/eventstream".to_string()
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_client_retry_ms() -> u64 {
    5000
}

fn default_channel_capacity() -> usize {
    256
}

/// Viewer-side reader settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Event stream URL
    #[serde(default = "default_reader_url")]
    pub url: String,

    /// First reconnect delay (milliseconds)
    #[serde(default = "default_min_backoff_ms")]
    pub min_backoff_ms: u64,

    /// Cap on the reconnect delay (milliseconds)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl ReaderConfig {
    pub fn min_backoff(&self) -> Duration {
        Duration::from_millis(self.min_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            url: default_reader_url(),
            min_backoff_ms: default_min_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_reader_url() -> String {
    "http://localhost:5173/eventstream".to_string()
}

fn default_min_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let bp: BridgeBlueprint =
            serde_json::from_str(r#"{ "hub": { "address": "192.168.1.10" } }"#).unwrap();
        assert_eq!(bp.version, ConfigVersion::V1);
        assert!(bp.hub.accept_invalid_certs);
        assert_eq!(bp.rotation.interval(), Duration::from_secs(3600));
        assert_eq!(bp.server.ping_interval(), Duration::from_secs(30));
        assert_eq!(bp.server.client_retry_ms, 5000);
        assert_eq!(bp.server.path, "/eventstream");
        assert_eq!(bp.reader.max_backoff(), Duration::from_secs(30));
    }
}
