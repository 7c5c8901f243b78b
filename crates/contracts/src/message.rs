//! BridgeMessage - what the broadcaster delivers to viewers
//!
//! Either a normalized hub event or a locally generated liveness ping.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::sync::Arc;

use crate::{ParseError, SensorUpdate};

/// One hub event item as a self-contained JSON message
///
/// Immutable once created; cloning only bumps a reference count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent(Arc<str>);

impl NormalizedEvent {
    /// Wrap a hub item, keeping its JSON text verbatim
    pub fn from_item(item: &RawValue) -> Self {
        Self(Arc::from(item.get()))
    }

    /// Build from JSON text, rejecting anything that is not valid JSON
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        serde_json::from_str::<&RawValue>(json)?;
        Ok(Self(Arc::from(json)))
    }

    /// The JSON payload
    pub fn as_json(&self) -> &str {
        &self.0
    }

    /// Decode into a typed sensor update
    pub fn decode(&self) -> Result<SensorUpdate, ParseError> {
        SensorUpdate::from_json(&self.0)
    }
}

/// Liveness message `{"ping": "<timestamp>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PingMessage {
    pub ping: String,
}

impl PingMessage {
    /// Ping stamped with the current time
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Ping stamped with the given time
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            ping: time.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Parse the timestamp back, if it is RFC 3339
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.ping)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({ "ping": self.ping }).to_string()
    }
}

/// Unit handed to the broadcaster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeMessage {
    Event(NormalizedEvent),
    Ping(PingMessage),
}

impl BridgeMessage {
    /// Kind label (used for logging and metrics)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Event(_) => "event",
            Self::Ping(_) => "ping",
        }
    }

    /// JSON payload handed to every channel
    ///
    /// Events share their text with the original item; only pings allocate.
    pub fn payload(&self) -> Arc<str> {
        match self {
            Self::Event(event) => event.0.clone(),
            Self::Ping(ping) => Arc::from(ping.to_json()),
        }
    }
}

impl From<NormalizedEvent> for BridgeMessage {
    fn from(event: NormalizedEvent) -> Self {
        Self::Event(event)
    }
}

impl From<PingMessage> for BridgeMessage {
    fn from(ping: PingMessage) -> Self {
        Self::Ping(ping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_payload_is_verbatim() {
        let event = NormalizedEvent::from_json(r#"{"kind":"motion","value":true}"#).unwrap();
        let payload = BridgeMessage::from(event.clone()).payload();
        assert_eq!(&*payload, r#"{"kind":"motion","value":true}"#);
        assert!(Arc::ptr_eq(&payload, &event.0));
    }

    #[test]
    fn test_event_rejects_invalid_json() {
        assert!(NormalizedEvent::from_json("{not json").is_err());
    }

    #[test]
    fn test_ping_payload() {
        let time = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let ping = PingMessage::at(time);
        assert_eq!(ping.ping, "2024-01-02T03:04:05.000Z");
        assert_eq!(ping.timestamp(), Some(time));

        let payload = BridgeMessage::Ping(ping).payload();
        assert_eq!(&*payload, r#"{"ping":"2024-01-02T03:04:05.000Z"}"#);
    }

    #[test]
    fn test_ping_parse_rejects_extra_fields() {
        let parsed: Result<PingMessage, _> =
            serde_json::from_str(r#"{"ping":"x","type":"motion"}"#);
        assert!(parsed.is_err());
    }
}
