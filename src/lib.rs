//! Telemetry identity and event dispatch for the Scribe desktop app
//!
//! This crate assigns a durable client identity, manages a rolling session
//! with inactivity-based expiry, and ships structured events to a remote
//! collection endpoint. It never blocks the host and never surfaces a
//! failure: the only observable artifact of anything going wrong is
//! missing analytics data.
//!
//! Hosts interact through two operations:
//!
//! ```no_run
//! use scribe_analytics::Analytics;
//! use serde_json::json;
//!
//! # async fn example() {
//! let analytics = Analytics::initialize("/opt/scribe");
//! analytics.track_event("app_launch");
//! analytics.track_event_with("transcribe_done", json!({ "duration_secs": 42 }));
//! # }
//! ```

pub mod analytics;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod session;
pub mod state;

pub use analytics::{Analytics, CONFIG_FILE, STATE_FILE};
pub use config::AnalyticsConfig;
pub use dispatch::Dispatcher;
pub use event::{Environment, Event, EventPayload, PayloadBuilder, UserProperty};
pub use session::{SessionCheck, SessionManager, SESSION_TIMEOUT_MINUTES};
pub use state::{PersistedState, StateStore};
