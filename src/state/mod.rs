//! Durable analytics state
//!
//! This module owns the small JSON document that survives restarts:
//! - Client identity (minted once per installation)
//! - Current session identity and last-activity timestamp
//! - The user-facing enabled flag

mod store;

pub use store::{PersistedState, StateStore};
