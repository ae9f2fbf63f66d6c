//! Engine facade: the single object surrounding components consume.
//!
//! Composes the user registry, settings, per-user dosage states, the
//! durable store, the notification sink, and a clock. All mutation
//! funnels through the active user's state and triggers an immediate
//! recomputation plus a fire-and-forget persistence write, so reads are
//! always consistent snapshots.

use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::notify::{LogSink, NotificationKind, NotificationSink};
use crate::registry::UserRegistry;
use crate::settings::{Settings, SettingsUpdate};
use crate::store::{DurableStore, FileStore};
use crate::types::{IntakeEvent, RiskLevel, Session, User, UserDosageState, UserUpdate};
use crate::{intake, risk, session};

/// Store key for the per-user dosage state map
pub const KEY_DOSAGE_STATE: &str = "dosage_state";
/// Store key for the settings record
pub const KEY_SETTINGS: &str = "settings";
/// Store key for the user registry record
pub const KEY_USERS: &str = "users";

/// Consistent snapshot of the active user's state
#[derive(Clone, Debug, Serialize)]
pub struct DosageView {
    pub user: User,
    pub events: Vec<IntakeEvent>,
    pub sessions: Vec<Session>,
    pub current_session: Option<Session>,
    pub active: bool,
    pub time_remaining_ms: i64,
    pub risk_level: RiskLevel,
    pub total_24h_ml: f64,
    pub last_event: Option<IntakeEvent>,
}

impl DosageView {
    pub fn time_remaining(&self) -> Duration {
        Duration::milliseconds(self.time_remaining_ms)
    }
}

/// The per-user dosage risk engine
pub struct Engine {
    registry: UserRegistry,
    settings: Settings,
    states: HashMap<Uuid, UserDosageState>,
    store: Box<dyn DurableStore>,
    notifier: Box<dyn NotificationSink>,
    clock: Box<dyn Clock>,
}

impl Engine {
    /// Build an engine over injected collaborators, loading the three
    /// persisted records (each falls back to defaults independently)
    pub fn new(
        store: Box<dyn DurableStore>,
        notifier: Box<dyn NotificationSink>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let settings: Settings = load_record(store.as_ref(), KEY_SETTINGS);
        let registry: UserRegistry = load_record(store.as_ref(), KEY_USERS);
        let mut states: HashMap<Uuid, UserDosageState> =
            load_record(store.as_ref(), KEY_DOSAGE_STATE);

        // Persisted derived fields are frozen at the last mutation; bring
        // the active user up to date before serving any view.
        let now = clock.now();
        if let Some(state) = states.get_mut(&registry.current_id()) {
            risk::evaluate(state, &settings, now, notifier.as_ref());
        }

        Self {
            registry,
            settings,
            states,
            store,
            notifier,
            clock,
        }
    }

    /// Engine with the default collaborators: file store under
    /// `data_dir`, log-backed notifications, wall-clock time
    pub fn open(data_dir: &Path) -> Self {
        Self::new(
            Box::new(FileStore::new(data_dir)),
            Box::new(LogSink),
            Box::new(SystemClock),
        )
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Snapshot of the active user's state
    pub fn view(&self) -> DosageView {
        let user = self.registry.current().clone();
        let state = self.states.get(&user.id).cloned().unwrap_or_default();
        let current_session = state.current_session().cloned();
        DosageView {
            user,
            current_session,
            events: state.events,
            sessions: state.sessions,
            active: state.active,
            time_remaining_ms: state.time_remaining_ms,
            risk_level: state.risk_level,
            total_24h_ml: state.total_24h_ml,
            last_event: state.last_event,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The engine's notion of "now", from the injected clock
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn users(&self) -> &[User] {
        self.registry.list()
    }

    pub fn current_user(&self) -> &User {
        self.registry.current()
    }

    pub fn find_user_by_name(&self, name: &str) -> Option<&User> {
        self.registry.find_by_name(name)
    }

    // ========================================================================
    // Mutators
    // ========================================================================

    /// Log an intake for the active user
    ///
    /// Invalid amounts degrade to the default dose; `backdate_minutes`
    /// allows retroactive logging. Recomputes derived state synchronously
    /// so the next read never lags behind the append.
    pub fn add_intake(
        &mut self,
        amount_ml: f64,
        note: Option<String>,
        backdate_minutes: Option<i64>,
    ) -> IntakeEvent {
        let now = self.clock.now();
        let default_dose = self.settings.default_dose_ml;
        let uid = self.registry.current_id();

        let state = self.states.entry(uid).or_default();
        let event = intake::append(state, amount_ml, note, backdate_minutes, default_dose, now);
        session::route_event(state, event.clone());
        risk::evaluate(state, &self.settings, now, self.notifier.as_ref());
        if state.time_remaining_ms > 0 {
            state.safe_notified = false;
        }

        self.persist();
        event
    }

    /// Wipe the active user's events and sessions entirely
    pub fn reset_session(&mut self) {
        let uid = self.registry.current_id();
        self.states.insert(uid, UserDosageState::default());
        tracing::info!("Reset dosage state for user {}", uid);
        self.persist();
    }

    /// Detach the open session without touching event history
    pub fn start_new_session(&mut self) {
        let uid = self.registry.current_id();
        if let Some(state) = self.states.get_mut(&uid) {
            session::start_new_session(state);
        }
        self.persist();
    }

    /// Apply a partial settings update; takes effect on the next tick
    pub fn update_settings(&mut self, update: SettingsUpdate) {
        self.settings.apply(update);
        self.persist();
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Add a user and make them active
    pub fn add_user(&mut self, name: Option<String>) -> User {
        let user = self.registry.add(name).clone();
        self.persist();
        user
    }

    /// Remove a user and their dosage data; no-op for the last user
    pub fn remove_user(&mut self, id: Uuid) -> bool {
        if !self.registry.remove(id) {
            return false;
        }
        self.states.remove(&id);
        self.persist();
        true
    }

    pub fn update_user(&mut self, id: Uuid, update: UserUpdate) {
        self.registry.update(id, update);
        self.persist();
    }

    /// Switch the active user and recompute their derived state so the
    /// first view after the switch is already fresh
    pub fn switch_user(&mut self, id: Uuid) -> bool {
        if !self.registry.switch_to(id) {
            return false;
        }
        let now = self.clock.now();
        if let Some(state) = self.states.get_mut(&id) {
            risk::evaluate(state, &self.settings, now, self.notifier.as_ref());
        }
        self.persist();
        true
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// One evaluation tick for the active user
    ///
    /// Recomputes risk, countdown, and the 24h total, then checks the
    /// idle-gap auto-split. Other users' derived fields stay stale until
    /// they become active again; no missed-tick backlog is replayed.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        let uid = self.registry.current_id();
        let Some(state) = self.states.get_mut(&uid) else {
            return;
        };
        if state.events.is_empty() {
            return;
        }

        let previous = state.risk_level;
        risk::evaluate(state, &self.settings, now, self.notifier.as_ref());
        let split = session::maybe_auto_split(state, self.settings.safe_interval(), now);
        let changed = split || state.risk_level != previous;

        if split {
            self.notifier.notify(
                NotificationKind::SessionStarted,
                "Long idle gap detected; the next intake starts a new session.",
            );
        }
        if changed {
            self.persist();
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the three records; failures are logged, never surfaced
    fn persist(&self) {
        save_record(self.store.as_ref(), KEY_SETTINGS, &self.settings);
        save_record(self.store.as_ref(), KEY_USERS, &self.registry);
        save_record(self.store.as_ref(), KEY_DOSAGE_STATE, &self.states);
    }
}

fn load_record<T: DeserializeOwned + Default>(store: &dyn DurableStore, key: &str) -> T {
    match store.load(key) {
        None => T::default(),
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    "Malformed record {:?}: {}. Falling back to defaults.",
                    key,
                    e
                );
                T::default()
            }
        },
    }
}

fn save_record<T: Serialize>(store: &dyn DurableStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.save(key, &raw),
        Err(e) => tracing::warn!("Failed to encode record {:?}: {}", key, e),
    }
}
