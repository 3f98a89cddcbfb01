use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// The analytics record persisted between launches.
///
/// Field names match the historical on-disk format, so state files written
/// by earlier releases keep loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    /// Durable installation identifier; never regenerated once non-empty
    #[serde(rename = "ClientId")]
    pub client_id: String,

    /// Current session identifier (unix-millisecond mint time as a string)
    #[serde(rename = "SessionId")]
    pub session_id: String,

    /// Last time an event was attempted, UTC
    #[serde(rename = "LastActivity")]
    pub last_activity: DateTime<Utc>,

    /// User-facing opt-out flag; defaults to enabled
    #[serde(rename = "IsEnabled", default = "default_enabled")]
    pub is_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            session_id: String::new(),
            last_activity: Utc::now(),
            is_enabled: true,
        }
    }
}

/// Reads and writes the persisted analytics state at a fixed path.
///
/// Durability here is best-effort: a missing or unreadable file is the same
/// as no state at all, and write failures are reported to the caller who
/// logs and drops them. The host application never depends on this file.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Load the persisted state, treating any failure as "no state yet".
    pub fn load(&self) -> Option<PersistedState> {
        let raw = fs::read_to_string(&self.path).ok()?;

        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(
                    "Discarding unreadable analytics state at {}: {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    /// Write the state document. The caller decides what to do on failure;
    /// the next successful save supersedes whatever is on disk.
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;

        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write analytics state to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("analytics_state.json"));

        assert!(store.load().is_none());
    }

    #[test]
    fn corrupt_file_loads_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("analytics_state.json");
        fs::write(&path, "{not json").unwrap();

        let store = StateStore::new(path);
        assert!(store.load().is_none());
    }

    #[test]
    fn state_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("analytics_state.json"));

        let state = PersistedState {
            client_id: "11111111-2222-3333-4444-555555555555".to_string(),
            session_id: "1730000000000".to_string(),
            last_activity: Utc::now(),
            is_enabled: false,
        };
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.client_id, state.client_id);
        assert_eq!(loaded.session_id, state.session_id);
        assert_eq!(loaded.last_activity, state.last_activity);
        assert!(!loaded.is_enabled);
    }

    #[test]
    fn enabled_flag_defaults_true_when_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("analytics_state.json");
        fs::write(
            &path,
            r#"{
                "ClientId": "abc",
                "SessionId": "123",
                "LastActivity": "2025-10-27T14:30:00Z"
            }"#,
        )
        .unwrap();

        let loaded = StateStore::new(path).load().unwrap();
        assert!(loaded.is_enabled);
    }

    #[test]
    fn save_fails_when_directory_is_gone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("analytics_state.json");

        let store = StateStore::new(path);
        assert!(store.save(&PersistedState::default()).is_err());
    }
}
