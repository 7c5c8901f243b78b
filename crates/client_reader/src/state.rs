//! ViewerState - what a viewer currently knows about the bridge

use std::sync::Arc;

use chrono::{DateTime, Utc};
use contracts::SensorUpdate;
use parking_lot::Mutex;
use serde_json::Value;

use crate::message::ViewerMessage;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerSnapshot {
    /// Timestamp carried by the most recent ping
    pub last_keepalive: Option<DateTime<Utc>>,
    /// Most recent event payload
    pub latest_event: Option<Value>,
    /// Events seen since start
    pub events_seen: u64,
}

/// Keeps the last keepalive and the latest event
#[derive(Debug, Default)]
pub struct ViewerState {
    inner: Mutex<ViewerSnapshot>,
}

impl ViewerState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Handler feeding this state, for `ClientReader::add_handler`
    pub fn handler(self: &Arc<Self>) -> impl Fn(&ViewerMessage) + Send + Sync + 'static {
        let state = self.clone();
        move |message: &ViewerMessage| state.apply(message)
    }

    pub fn apply(&self, message: &ViewerMessage) {
        let mut inner = self.inner.lock();
        match message {
            ViewerMessage::Ping(ping) => {
                // keep the previous value if the timestamp is not RFC 3339
                if let Some(at) = ping.timestamp() {
                    inner.last_keepalive = Some(at);
                }
            }
            ViewerMessage::Event(value) => {
                inner.latest_event = Some(value.clone());
                inner.events_seen += 1;
            }
        }
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        self.inner.lock().clone()
    }

    /// The latest event decoded as a sensor update
    ///
    /// `None` when no event arrived yet or the payload is not a hub item.
    pub fn latest_sensor(&self) -> Option<SensorUpdate> {
        let latest = self.inner.lock().latest_event.clone()?;
        SensorUpdate::from_value(latest).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::PingMessage;

    #[test]
    fn test_tracks_keepalive_and_latest_event() {
        let state = ViewerState::new();
        let handler = state.handler();

        let at = DateTime::parse_from_rfc3339("2024-05-01T12:00:00.000Z")
            .unwrap()
            .with_timezone(&Utc);
        handler(&ViewerMessage::Ping(PingMessage::at(at)));
        handler(&ViewerMessage::parse(
            r#"{"id":"t1","temperature":{"temperature":21.5,"temperature_valid":true},"type":"temperature"}"#,
        )
        .unwrap());

        let snapshot = state.snapshot();
        assert_eq!(snapshot.last_keepalive, Some(at));
        assert_eq!(snapshot.events_seen, 1);
        assert!(matches!(
            state.latest_sensor(),
            Some(SensorUpdate::Temperature { ref id, .. }) if id == "t1"
        ));
    }

    #[test]
    fn test_unknown_payload_has_no_sensor() {
        let state = ViewerState::new();
        state.apply(&ViewerMessage::parse(r#"{"kind":"motion","value":true}"#).unwrap());
        assert!(state.snapshot().latest_event.is_some());
        assert!(state.latest_sensor().is_none());
    }
}
