//! HubEventEnvelope - upstream hub notification
//!
//! The hub sends one SSE message per batch; its data is a JSON array of
//! envelopes, each carrying one or more attribute-change items.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::{NormalizedEvent, StreamError};

/// One attribute change (motion, light level, temperature, ...)
///
/// Kept as the hub's verbatim JSON text; its shape is opaque to the bridge.
pub type HubEventItem = Box<RawValue>;

/// One notification from the hub
///
/// ```json
/// { "creationtime": "2022-11-12T18:29:19Z", "data": [ { ... } ],
///   "id": "a781bedb-c8cb-438f-b38c-a4ae6d50dfc1", "type": "update" }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct HubEventEnvelope {
    /// Creation timestamp as sent by the hub
    #[serde(rename = "creationtime")]
    pub creation_time: String,

    /// Opaque event identifier
    pub id: String,

    /// Event kind tag (`update`, `add`, `delete`, `error`)
    #[serde(rename = "type")]
    pub kind: String,

    /// Attribute changes, in hub order
    pub data: Vec<HubEventItem>,
}

impl HubEventEnvelope {
    /// Expand into normalized events, preserving item order
    pub fn normalize(&self) -> impl Iterator<Item = NormalizedEvent> + '_ {
        self.data.iter().map(|item| NormalizedEvent::from_item(item))
    }
}

/// A batch as delivered by one upstream SSE message
#[derive(Debug, Default)]
pub struct HubEventBatch {
    pub envelopes: Vec<HubEventEnvelope>,
}

impl HubEventBatch {
    /// Decode one SSE `data` payload into a batch
    pub fn from_json(data: &str) -> Result<Self, StreamError> {
        let envelopes: Vec<HubEventEnvelope> =
            serde_json::from_str(data).map_err(|e| StreamError::decode(e.to_string()))?;
        Ok(Self { envelopes })
    }

    /// Total item count across all envelopes
    pub fn item_count(&self) -> usize {
        self.envelopes.iter().map(|e| e.data.len()).sum()
    }

    /// Flatten envelopes into normalized events, envelope order then item order
    pub fn normalize(&self) -> impl Iterator<Item = NormalizedEvent> + '_ {
        self.envelopes.iter().flat_map(HubEventEnvelope::normalize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATCH: &str = r#"[
        {"creationtime":"2022-11-12T18:29:19Z","id":"e1","type":"update","data":[
            {"id":"m1","motion":{"motion":true,"motion_valid":true},"type":"motion"},
            {"id":"l1","light":{"light_level":12000,"light_level_valid":true},"type":"light_level"}
        ]},
        {"creationtime":"2022-11-12T18:29:20Z","id":"e2","type":"update","data":[
            {"id":"t1","temperature":{"temperature":21.5,"temperature_valid":true},"type":"temperature"}
        ]}
    ]"#;

    #[test]
    fn test_decode_batch() {
        let batch = HubEventBatch::from_json(BATCH).unwrap();
        assert_eq!(batch.envelopes.len(), 2);
        assert_eq!(batch.envelopes[0].kind, "update");
        assert_eq!(batch.envelopes[0].creation_time, "2022-11-12T18:29:19Z");
        assert_eq!(batch.item_count(), 3);
    }

    #[test]
    fn test_normalize_preserves_order_and_text() {
        let batch = HubEventBatch::from_json(BATCH).unwrap();
        let events: Vec<_> = batch.normalize().collect();
        assert_eq!(events.len(), 3);
        assert!(events[0].as_json().contains("\"m1\""));
        assert!(events[1].as_json().contains("\"l1\""));
        assert!(events[2].as_json().contains("\"t1\""));
        assert_eq!(
            events[0].as_json(),
            r#"{"id":"m1","motion":{"motion":true,"motion_valid":true},"type":"motion"}"#
        );
    }

    #[test]
    fn test_decode_rejects_non_array() {
        let err = HubEventBatch::from_json(r#"{"id":"x"}"#).unwrap_err();
        assert!(matches!(err, StreamError::Decode { .. }));
    }
}
