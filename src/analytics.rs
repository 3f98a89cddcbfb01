//! Analytics façade
//!
//! The two operations the host application uses: [`Analytics::initialize`]
//! at startup and [`Analytics::track_event`] everywhere else. Both return
//! immediately; a single background worker owns the session state, builds
//! payloads, and performs the network sends, so every write to the
//! persisted state file goes through one task.
//!
//! Nothing in this module ever returns an error to the host. Internal
//! results are logged and discarded here, at the outermost edge.

use crate::config::AnalyticsConfig;
use crate::dispatch::Dispatcher;
use crate::event::{Environment, PayloadBuilder, APP_START, SESSION_START};
use crate::session::SessionManager;
use crate::state::StateStore;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Measurement configuration file name, relative to the install directory.
pub const CONFIG_FILE: &str = "firebase_config.json";

/// Persisted state file name, relative to the install directory.
pub const STATE_FILE: &str = "analytics_state.json";

enum Command {
    Track { name: String, extra: Option<Value> },
    SetEnabled(bool),
}

/// Handle to the analytics subsystem.
///
/// Cheap to pass around by reference; a disabled handle accepts every call
/// as a no-op. Dropping the handle abandons any queued events, which is
/// fine — delivery is best-effort by contract.
pub struct Analytics {
    tx: Option<mpsc::UnboundedSender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl Analytics {
    /// Initialize analytics from the application install directory.
    ///
    /// Loads the measurement config and persisted state, mints identity
    /// defaults where absent, spawns the dispatch worker, and queues the
    /// two startup events (`session_start`, `app_start`). Never fails: any
    /// problem yields a disabled handle and a log line.
    ///
    /// Must be called from within the host's Tokio runtime.
    pub fn initialize(install_dir: impl AsRef<Path>) -> Self {
        let install_dir = install_dir.as_ref();

        let config = match AnalyticsConfig::load(&install_dir.join(CONFIG_FILE)) {
            Ok(config) => config,
            Err(e) => {
                warn!("Analytics disabled: {}", e);
                return Self::disabled();
            }
        };

        Self::initialize_with(config, install_dir.join(STATE_FILE), Environment::detect())
    }

    /// Initialize with an explicit config, state path, and environment.
    ///
    /// For hosts that manage their own configuration, and for test
    /// harnesses pointing at a local collector.
    pub fn initialize_with(
        config: AnalyticsConfig,
        state_path: PathBuf,
        environment: Environment,
    ) -> Self {
        let debug_mode = cfg!(debug_assertions);

        let sessions = SessionManager::load(StateStore::new(state_path));
        let builder = PayloadBuilder::new(sessions.client_id().to_string(), &environment, debug_mode);

        let dispatcher = match Dispatcher::new(&config, &environment, debug_mode) {
            Ok(dispatcher) => dispatcher,
            Err(e) => {
                warn!("Analytics disabled: {}", e);
                return Self::disabled();
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            sessions,
            builder,
            dispatcher,
        };
        let handle = tokio::spawn(worker.run(rx));

        let analytics = Self {
            tx: Some(tx),
            worker: Some(handle),
        };

        // Every launch announces itself; the worker resolves whether the
        // session_start is fresh or resumes an unexpired window.
        analytics.track_event(SESSION_START);
        analytics.track_event(APP_START);

        analytics
    }

    /// A permanently inert handle; every call is a no-op.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            worker: None,
        }
    }

    /// Queue an event for dispatch and return immediately.
    pub fn track_event(&self, name: &str) {
        self.enqueue(name, None);
    }

    /// Queue an event with extra parameters.
    ///
    /// `extra` should be a flat JSON object; anything else is dropped from
    /// the payload while the event itself still goes out.
    pub fn track_event_with(&self, name: &str, extra: Value) {
        self.enqueue(name, Some(extra));
    }

    /// Flip the persisted opt-out flag.
    pub fn set_enabled(&self, enabled: bool) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Command::SetEnabled(enabled));
        }
    }

    /// Drain queued events and stop the worker.
    ///
    /// Hosts that want a best-effort flush on exit can await this; skipping
    /// it simply abandons whatever is still in flight.
    pub async fn close(mut self) {
        drop(self.tx.take());

        if let Some(handle) = self.worker.take() {
            if let Err(e) = handle.await {
                error!("Analytics worker panicked: {}", e);
            }
        }
    }

    fn enqueue(&self, name: &str, extra: Option<Value>) {
        let Some(tx) = &self.tx else {
            return;
        };

        let command = Command::Track {
            name: name.to_string(),
            extra,
        };

        if tx.send(command).is_err() {
            debug!("Analytics worker gone; dropping event {}", name);
        }
    }
}

/// Single consumer of the command queue.
///
/// Owning the session manager here serializes every state mutation and
/// file write behind one task, which is the whole concurrency story:
/// callers enqueue, this loop drains in order.
struct Worker {
    sessions: SessionManager,
    builder: PayloadBuilder,
    dispatcher: Dispatcher,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            self.handle(command).await;
        }

        debug!("Analytics worker stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::SetEnabled(enabled) => self.sessions.set_enabled(enabled),
            Command::Track { name, extra } => self.track(&name, extra).await,
        }
    }

    async fn track(&mut self, name: &str, extra: Option<Value>) {
        if !self.sessions.is_enabled() {
            return;
        }

        let check = self.sessions.ensure_valid_session();

        // A rotation mid-run means the previous window expired; announce
        // the new session before the event that triggered it.
        if check.rotated && name != SESSION_START {
            self.send(SESSION_START, None).await;
        }

        self.send(name, extra).await;

        // Attempted use refreshes the window whether or not delivery
        // succeeded.
        self.sessions.touch_activity();
    }

    async fn send(&self, name: &str, extra: Option<Value>) {
        let payload = self.builder.build(name, self.sessions.session_id(), extra);

        if let Err(e) = self.dispatcher.send(&payload).await {
            warn!("Dropping analytics event {}: {}", name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PersistedState;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::Json;
    use axum::routing::post;
    use axum::Router;
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    type Received = Arc<Mutex<Vec<Value>>>;

    async fn collect(State(received): State<Received>, Json(body): Json<Value>) -> StatusCode {
        received.lock().await.push(body);
        StatusCode::NO_CONTENT
    }

    /// Local stand-in for the collection endpoint; returns its URL and the
    /// payloads it has accepted.
    async fn spawn_collector() -> (String, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/mp/collect", post(collect))
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/mp/collect", addr), received)
    }

    fn config(endpoint: &str) -> AnalyticsConfig {
        AnalyticsConfig {
            measurement_id: "G-TEST123".to_string(),
            api_secret: "s3cret".to_string(),
            endpoint: Some(endpoint.to_string()),
        }
    }

    fn worker(endpoint: &str, state_path: PathBuf) -> Worker {
        let environment = Environment::detect();
        let sessions = SessionManager::load(StateStore::new(state_path));
        let builder =
            PayloadBuilder::new(sessions.client_id().to_string(), &environment, false);
        let dispatcher = Dispatcher::new(&config(endpoint), &environment, false).unwrap();

        Worker {
            sessions,
            builder,
            dispatcher,
        }
    }

    fn write_stale_state(path: &Path, minutes_ago: i64) -> PersistedState {
        let state = PersistedState {
            client_id: "stale-client".to_string(),
            session_id: "1000000000000".to_string(),
            last_activity: Utc::now() - Duration::minutes(minutes_ago),
            is_enabled: true,
        };
        StateStore::new(path.to_path_buf()).save(&state).unwrap();
        state
    }

    #[tokio::test]
    async fn expired_session_emits_synthetic_session_start_first() {
        let (endpoint, received) = spawn_collector().await;
        let dir = TempDir::new().unwrap();
        let state_path = dir.path().join(STATE_FILE);
        let on_disk = write_stale_state(&state_path, 45);

        let mut worker = worker(&endpoint, state_path);
        worker
            .handle(Command::Track {
                name: "transcribe_done".to_string(),
                extra: None,
            })
            .await;

        let payloads = received.lock().await;
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0]["events"][0]["name"], "session_start");
        assert_eq!(payloads[1]["events"][0]["name"], "transcribe_done");

        // Both events ride the freshly minted session, not the stale one
        let new_session = &payloads[0]["events"][0]["params"]["session_id"];
        assert_eq!(&payloads[1]["events"][0]["params"]["session_id"], new_session);
        assert_ne!(new_session, &Value::String(on_disk.session_id));
    }

    #[tokio::test]
    async fn live_session_sends_only_the_requested_event() {
        let (endpoint, received) = spawn_collector().await;
        let dir = TempDir::new().unwrap();
        let state_path = dir.path().join(STATE_FILE);
        let on_disk = write_stale_state(&state_path, 5);

        let mut worker = worker(&endpoint, state_path);
        worker
            .handle(Command::Track {
                name: "transcribe_done".to_string(),
                extra: None,
            })
            .await;

        let payloads = received.lock().await;
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["events"][0]["name"], "transcribe_done");
        assert_eq!(
            payloads[0]["events"][0]["params"]["session_id"],
            Value::String(on_disk.session_id)
        );
    }

    #[tokio::test]
    async fn malformed_extra_still_dispatches_built_ins() {
        let (endpoint, received) = spawn_collector().await;
        let dir = TempDir::new().unwrap();
        let state_path = dir.path().join(STATE_FILE);
        write_stale_state(&state_path, 5);

        let mut worker = worker(&endpoint, state_path);
        worker
            .handle(Command::Track {
                name: "scan_done".to_string(),
                extra: Some(serde_json::json!(["not", "an", "object"])),
            })
            .await;

        let payloads = received.lock().await;
        assert_eq!(payloads.len(), 1);

        let params = payloads[0]["events"][0]["params"].as_object().unwrap();
        assert!(params.contains_key("session_id"));
        assert!(params.contains_key("engagement_time_msec"));
        assert_eq!(params.len(), 2);
    }

    #[tokio::test]
    async fn failed_send_still_refreshes_activity() {
        let dir = TempDir::new().unwrap();
        let state_path = dir.path().join(STATE_FILE);
        let on_disk = write_stale_state(&state_path, 5);

        // Nothing listens here; every send fails fast
        let mut worker = worker("http://127.0.0.1:1/mp/collect", state_path.clone());
        worker
            .handle(Command::Track {
                name: "transcribe_done".to_string(),
                extra: None,
            })
            .await;

        let reloaded = StateStore::new(state_path).load().unwrap();
        assert!(reloaded.last_activity > on_disk.last_activity);
    }

    #[tokio::test]
    async fn disabled_flag_drops_events_before_any_io() {
        let (endpoint, received) = spawn_collector().await;
        let dir = TempDir::new().unwrap();
        let state_path = dir.path().join(STATE_FILE);

        let mut state = write_stale_state(&state_path, 5);
        state.is_enabled = false;
        StateStore::new(state_path.clone()).save(&state).unwrap();

        let mut worker = worker(&endpoint, state_path.clone());
        worker
            .handle(Command::Track {
                name: "transcribe_done".to_string(),
                extra: None,
            })
            .await;

        assert!(received.lock().await.is_empty());

        // State untouched: no session rotation, no activity refresh
        let reloaded = StateStore::new(state_path).load().unwrap();
        assert_eq!(reloaded.last_activity, state.last_activity);
    }

    #[tokio::test]
    async fn set_enabled_round_trips_through_worker() {
        let (endpoint, received) = spawn_collector().await;
        let dir = TempDir::new().unwrap();
        let state_path = dir.path().join(STATE_FILE);
        write_stale_state(&state_path, 5);

        let mut worker = worker(&endpoint, state_path.clone());
        worker.handle(Command::SetEnabled(false)).await;
        worker
            .handle(Command::Track {
                name: "x".to_string(),
                extra: None,
            })
            .await;

        assert!(received.lock().await.is_empty());
        assert!(!StateStore::new(state_path).load().unwrap().is_enabled);
    }
}
