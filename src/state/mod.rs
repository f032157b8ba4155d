/// Scores, round winners and awards.
pub mod scoring;
/// Session model.
pub mod session;
mod sse;
/// Status table and action reducer.
pub mod state_machine;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};

use crate::{
    config::AppConfig,
    dao::session_store::SessionStore,
    error::ServiceError,
    questions::generator::QuestionGenerator,
    services::round_timer::RoundTimers,
};

pub use self::sse::{SseHub, SseState};

/// Application state shared by handlers and background tasks.
pub type SharedState = Arc<AppState>;

/// Capacity of each per-session broadcast channel.
const SSE_CAPACITY: usize = 32;

/// Central application state: storage handle, live subscriptions and per-session coordination.
pub struct AppState {
    session_store: RwLock<Option<Arc<dyn SessionStore>>>,
    config: AppConfig,
    generator: Option<Arc<dyn QuestionGenerator>>,
    sse: SseState,
    gates: DashMap<String, Arc<Mutex<()>>>,
    timers: RoundTimers,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_generator(config, None)
    }

    /// Same as [`AppState::new`] with a question generator for generated prompts.
    pub fn with_generator(
        config: AppConfig,
        generator: Option<Arc<dyn QuestionGenerator>>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            session_store: RwLock::new(None),
            config,
            generator,
            sse: SseState::new(SSE_CAPACITY),
            gates: DashMap::new(),
            timers: RoundTimers::default(),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Question generator, when one is configured.
    pub fn generator(&self) -> Option<Arc<dyn QuestionGenerator>> {
        self.generator.clone()
    }

    /// Obtain a handle to the current session store, if one is installed.
    pub async fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        let guard = self.session_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current session store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_session_store(&self) -> Result<Arc<dyn SessionStore>, ServiceError> {
        self.session_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new session store implementation and leave degraded mode.
    pub async fn set_session_store(&self, store: Arc<dyn SessionStore>) {
        {
            let mut guard = self.session_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current session store and enter degraded mode.
    pub async fn clear_session_store(&self) {
        {
            let mut guard = self.session_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Per-session SSE hubs.
    pub fn sse(&self) -> &SseState {
        &self.sse
    }

    /// Running round timers.
    pub fn round_timers(&self) -> &RoundTimers {
        &self.timers
    }

    /// Mutex serializing read-reduce-write cycles on one session.
    pub fn session_gate(&self, code: &str) -> Arc<Mutex<()>> {
        self.gates.entry(code.to_owned()).or_default().clone()
    }

    /// Drop `gate` if it is still the one registered for `code`.
    ///
    /// Used when the session turned out not to exist, so unknown codes leave nothing behind.
    pub fn discard_gate(&self, code: &str, gate: &Arc<Mutex<()>>) {
        self.gates.remove_if(code, |_, current| Arc::ptr_eq(current, gate));
    }

    /// Number of registered session gates.
    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    /// Forget every per-session resource after the session is deleted.
    pub fn forget_session(&self, code: &str) {
        self.gates.remove(code);
        self.timers.cancel(code);
        self.sse.close(code);
    }
}
