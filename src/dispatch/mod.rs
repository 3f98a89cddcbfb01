//! Network dispatch
//!
//! Best-effort, at-most-once delivery of event payloads to the collection
//! endpoint. Failures are returned to the worker, which logs and drops
//! them; nothing here retries.

mod dispatcher;

pub use dispatcher::Dispatcher;
