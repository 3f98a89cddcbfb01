use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// POST body sent to the collection endpoint.
///
/// Shape follows the GA4 Measurement Protocol: one client id, the static
/// user properties, and a single event per request.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventPayload {
    pub client_id: String,
    pub user_properties: BTreeMap<String, UserProperty>,
    pub events: Vec<Event>,
}

/// Wire format wraps each user property value in an object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProperty {
    pub value: String,
}

impl UserProperty {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub params: Map<String, Value>,
}

impl EventPayload {
    /// Convenience accessor for the single event's parameters.
    pub fn params(&self) -> Option<&Map<String, Value>> {
        self.events.first().map(|event| &event.params)
    }
}
