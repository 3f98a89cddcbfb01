//! Session lifecycle management
//!
//! A session is a bounded window of continuous activity. It expires after
//! 30 minutes without an event attempt and is superseded in place by a
//! freshly minted session id on the next use.

mod manager;

pub use manager::{SessionCheck, SessionManager, SESSION_TIMEOUT_MINUTES};
