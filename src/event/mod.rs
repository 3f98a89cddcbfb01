//! Event construction
//!
//! This module builds the wire payload for each event: the durable client
//! id, the process-lifetime user properties, and the per-event parameter
//! set with the session id and engagement-time marker injected.

mod builder;
mod environment;
mod payload;

pub use builder::PayloadBuilder;
pub use environment::Environment;
pub use payload::{Event, EventPayload, UserProperty};

/// Event sent when a session begins (startup or rotation after expiry).
pub const SESSION_START: &str = "session_start";

/// Event sent once per launch, right after `session_start`.
pub const APP_START: &str = "app_start";
