//! ViewerMessage - one decoded `data:` payload as seen by a viewer

use contracts::{ParseError, PingMessage, SensorUpdate};
use serde::Deserialize;
use serde_json::Value;

/// A payload received from the bridge
///
/// Pings are recognised by shape (`{"ping": "..."}` and nothing else);
/// anything else that is valid JSON is a hub event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ViewerMessage {
    Ping(PingMessage),
    Event(Value),
}

impl ViewerMessage {
    /// Parse a payload; malformed JSON is an error
    pub fn parse(data: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn is_ping(&self) -> bool {
        matches!(self, Self::Ping(_))
    }

    pub fn as_event(&self) -> Option<&Value> {
        match self {
            Self::Event(value) => Some(value),
            Self::Ping(_) => None,
        }
    }

    /// Decode an event payload as a typed sensor update
    pub fn sensor_update(&self) -> Option<Result<SensorUpdate, ParseError>> {
        self.as_event()
            .map(|value| SensorUpdate::from_value(value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ping() {
        let msg = ViewerMessage::parse(r#"{"ping":"2024-01-01T00:00:00.000Z"}"#).unwrap();
        assert!(msg.is_ping());
        assert!(msg.sensor_update().is_none());
    }

    #[test]
    fn test_parse_event() {
        let msg = ViewerMessage::parse(
            r#"{"id":"m1","motion":{"motion":true,"motion_valid":true},"type":"motion"}"#,
        )
        .unwrap();
        assert!(!msg.is_ping());
        let update = msg.sensor_update().unwrap().unwrap();
        assert_eq!(update.resource_id(), Some("m1"));
    }

    #[test]
    fn test_ping_with_extra_fields_is_event() {
        let msg = ViewerMessage::parse(r#"{"ping":"t","extra":1}"#).unwrap();
        assert!(!msg.is_ping());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(ViewerMessage::parse("{not json").is_err());
        assert!(ViewerMessage::parse("").is_err());
    }
}
