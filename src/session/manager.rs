use crate::state::{PersistedState, StateStore};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

/// Inactivity window after which a session expires.
pub const SESSION_TIMEOUT_MINUTES: i64 = 30;

/// Outcome of a session validity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCheck {
    /// Whether a new session id was minted by this check
    pub rotated: bool,
}

/// Owns the live analytics state and writes it through to the state store.
///
/// All mutation of client/session identity goes through this type, and the
/// dispatch worker is its only caller, which gives the single-writer
/// discipline the persisted file needs.
pub struct SessionManager {
    state: PersistedState,
    store: StateStore,
}

impl SessionManager {
    /// Load persisted state (or mint defaults) and ensure a client id exists.
    ///
    /// The client id identifies the installation across launches. It is
    /// minted exactly once and never regenerated after that.
    pub fn load(store: StateStore) -> Self {
        let mut state = store.load().unwrap_or_default();

        if state.client_id.is_empty() {
            state.client_id = Uuid::new_v4().to_string();
            info!("Minted new analytics client id");

            if let Err(e) = store.save(&state) {
                warn!("Failed to persist new client id: {}", e);
            }
        }

        Self { state, store }
    }

    pub fn client_id(&self) -> &str {
        &self.state.client_id
    }

    pub fn session_id(&self) -> &str {
        &self.state.session_id
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.state.last_activity
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled
    }

    /// Flip the user-facing opt-out flag and persist it.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.state.is_enabled == enabled {
            return;
        }

        info!("Analytics enabled flag set to {}", enabled);
        self.state.is_enabled = enabled;
        self.persist();
    }

    /// Make sure the current session is still valid, minting a new one if
    /// it is absent or expired.
    pub fn ensure_valid_session(&mut self) -> SessionCheck {
        self.ensure_valid_session_at(Utc::now())
    }

    /// Validity rule: a session holds iff its id is non-empty and no more
    /// than 30 minutes have passed since the last activity. The boundary is
    /// strict — an event arriving at exactly 30 minutes keeps the session.
    pub fn ensure_valid_session_at(&mut self, now: DateTime<Utc>) -> SessionCheck {
        let elapsed = now.signed_duration_since(self.state.last_activity);

        if self.state.session_id.is_empty()
            || elapsed > Duration::minutes(SESSION_TIMEOUT_MINUTES)
        {
            self.state.session_id = now.timestamp_millis().to_string();
            self.state.last_activity = now;
            info!("Started analytics session {}", self.state.session_id);
            self.persist();

            return SessionCheck { rotated: true };
        }

        SessionCheck { rotated: false }
    }

    /// Refresh the activity timestamp after a dispatch attempt.
    ///
    /// This runs whether or not the send succeeded: the session window
    /// tracks attempted use, not confirmed delivery.
    pub fn touch_activity(&mut self) {
        self.state.last_activity = Utc::now();
        self.persist();
    }

    fn persist(&self) {
        // A failed save leaves the previous file in place; the next
        // successful save recovers.
        if let Err(e) = self.store.save(&self.state) {
            warn!("Failed to persist analytics state: {}", e);
        }
    }
}
