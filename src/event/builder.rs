use super::environment::Environment;
use super::payload::{Event, EventPayload, UserProperty};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Fixed engagement marker injected into every event.
///
/// The collection protocol expects this as a string, not a number. It
/// signals "user is present" rather than a measured dwell time.
const ENGAGEMENT_TIME_MSEC: &str = "100";

/// Assembles wire payloads from an event name and optional extra parameters.
///
/// The client id and user properties are captured once at construction and
/// reused for every event in the process lifetime.
pub struct PayloadBuilder {
    client_id: String,
    user_properties: BTreeMap<String, UserProperty>,
    debug_mode: bool,
}

impl PayloadBuilder {
    pub fn new(client_id: String, environment: &Environment, debug_mode: bool) -> Self {
        let user_properties = BTreeMap::from([
            (
                "device_region".to_string(),
                UserProperty::new(environment.device_region.as_str()),
            ),
            (
                "language".to_string(),
                UserProperty::new(environment.language.as_str()),
            ),
            (
                "app_version".to_string(),
                UserProperty::new(environment.app_version.as_str()),
            ),
            (
                "platform".to_string(),
                UserProperty::new(environment.platform.as_str()),
            ),
            (
                "screen_resolution".to_string(),
                UserProperty::new(environment.screen_resolution.as_str()),
            ),
        ]);

        Self {
            client_id,
            user_properties,
            debug_mode,
        }
    }

    /// Build the payload for one event.
    ///
    /// Built-in parameters go in first (`session_id`, the engagement
    /// marker, and the debug flag in debug mode); `extra` is merged on top,
    /// so extra keys win on collision. Anything other than a JSON object in
    /// `extra` is ignored — a malformed parameter set degrades to built-ins
    /// only, never to a dropped event.
    pub fn build(&self, name: &str, session_id: &str, extra: Option<Value>) -> EventPayload {
        let mut params = Map::new();
        params.insert("session_id".to_string(), json!(session_id));
        params.insert(
            "engagement_time_msec".to_string(),
            json!(ENGAGEMENT_TIME_MSEC),
        );

        // debug_mode makes events visible in the collector's debug view
        if self.debug_mode {
            params.insert("debug_mode".to_string(), json!(1));
        }

        match extra {
            Some(Value::Object(extra_params)) => {
                for (key, value) in extra_params {
                    params.insert(key, value);
                }
            }
            Some(other) => {
                debug!("Ignoring non-object extra parameters for {}: {}", name, other);
            }
            None => {}
        }

        EventPayload {
            client_id: self.client_id.clone(),
            user_properties: self.user_properties.clone(),
            events: vec![Event {
                name: name.to_string(),
                params,
            }],
        }
    }
}
