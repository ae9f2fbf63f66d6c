//! Session segmentation and derived statistics.
//!
//! Every appended event routes into the user's open session; derived
//! fields are recomputed from scratch on each append so they stay
//! idempotent under re-derivation. A session closes when the idle gap
//! since its last intake exceeds four times the safe interval, or on an
//! explicit manual split.

use chrono::{DateTime, Duration, Utc};

use crate::types::{IntakeEvent, Session, UserDosageState};

/// Idle-gap multiple of the safe interval that auto-closes a session
const AUTO_SPLIT_FACTOR: i32 = 4;

impl Session {
    /// Recompute all derived fields from the owned events
    pub fn recompute(&mut self) {
        self.events.sort_by_key(|e| e.taken_at);

        let (first, last) = match (self.events.first(), self.events.last()) {
            (Some(f), Some(l)) => (f.taken_at, l.taken_at),
            _ => return,
        };

        self.first_intake_at = first;
        self.last_intake_at = last;
        self.intake_count = self.events.len();
        self.total_ml = self.events.iter().map(|e| e.amount_ml).sum();
        self.ml_per_intake = self.total_ml / self.intake_count as f64;

        self.duration_hours = (last - first).num_milliseconds() as f64 / 3_600_000.0;
        if self.duration_hours > 0.0 {
            self.ml_per_hour = self.total_ml / self.duration_hours;
            self.ml_per_24h = self.ml_per_hour * 24.0;
        } else {
            // Degenerate single-instant session reports the total as the rate
            self.ml_per_hour = self.total_ml;
            self.ml_per_24h = 0.0;
        }
    }
}

/// Route a freshly appended event into the user's open session
///
/// Creates a new session when none is open; otherwise appends into the
/// open session and recomputes its derived fields in place.
pub fn route_event(state: &mut UserDosageState, event: IntakeEvent) {
    match state.current_session {
        Some(id) => {
            if let Some(session) = state.sessions.iter_mut().find(|s| s.id == id) {
                session.events.push(event);
                session.recompute();
                return;
            }
            // Dangling id; fall through and open a fresh session
            tracing::warn!("Open session {} missing from history, starting a new one", id);
            open_session(state, event);
        }
        None => open_session(state, event),
    }
}

fn open_session(state: &mut UserDosageState, event: IntakeEvent) {
    let session = Session::starting_with(event);
    tracing::info!("Started session {} at {}", session.id, session.started_at);
    state.current_session = Some(session.id);
    state.sessions.push(session);
}

/// Close the open session if the idle gap exceeds the auto-split threshold
///
/// Acts at most once per distinct last-intake timestamp. The closed
/// session stays in history unchanged; only the "current" link is
/// dropped. Returns true when a split happened.
pub fn maybe_auto_split(
    state: &mut UserDosageState,
    safe_interval: Duration,
    now: DateTime<Utc>,
) -> bool {
    let Some(session) = state.current_session() else {
        return false;
    };

    let last_intake = session.last_intake_at;
    if state.auto_split_mark == Some(last_intake) {
        return false;
    }

    let idle = now - last_intake;
    if idle <= safe_interval * AUTO_SPLIT_FACTOR {
        return false;
    }

    tracing::info!(
        "Idle gap of {}m exceeded auto-split threshold, closing session",
        idle.num_minutes()
    );
    state.auto_split_mark = Some(last_intake);
    state.current_session = None;
    true
}

/// Detach the open session unconditionally, keeping event history
pub fn start_new_session(state: &mut UserDosageState) {
    if state.current_session.take().is_some() {
        tracing::info!("Manually closed the open session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T20:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn event_at(offset_min: i64, amount: f64) -> IntakeEvent {
        IntakeEvent {
            id: Uuid::new_v4(),
            taken_at: base_time() + Duration::minutes(offset_min),
            amount_ml: amount,
            note: None,
        }
    }

    #[test]
    fn first_event_opens_a_session() {
        let mut state = UserDosageState::default();
        route_event(&mut state, event_at(0, 2.0));

        assert_eq!(state.sessions.len(), 1);
        let session = state.current_session().unwrap();
        assert_eq!(session.started_at, base_time());
        assert_eq!(session.intake_count, 1);
    }

    #[test]
    fn single_event_session_reports_degenerate_rates() {
        let mut state = UserDosageState::default();
        route_event(&mut state, event_at(0, 3.0));

        let session = state.current_session().unwrap();
        assert_eq!(session.duration_hours, 0.0);
        assert_eq!(session.total_ml, 3.0);
        assert_eq!(session.ml_per_hour, 3.0);
        assert_eq!(session.ml_per_24h, 0.0);
        assert_eq!(session.ml_per_intake, 3.0);
    }

    #[test]
    fn derived_fields_recomputed_on_each_append() {
        let mut state = UserDosageState::default();
        route_event(&mut state, event_at(0, 2.0));
        route_event(&mut state, event_at(120, 4.0));

        let session = state.current_session().unwrap();
        assert_eq!(session.intake_count, 2);
        assert_eq!(session.total_ml, 6.0);
        assert_eq!(session.duration_hours, 2.0);
        assert_eq!(session.ml_per_hour, 3.0);
        assert_eq!(session.ml_per_24h, 72.0);
        assert_eq!(session.ml_per_intake, 3.0);
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut state = UserDosageState::default();
        route_event(&mut state, event_at(0, 2.0));
        route_event(&mut state, event_at(90, 3.0));

        let id = state.current_session.unwrap();
        let before = state.sessions.iter().find(|s| s.id == id).unwrap().clone();

        let session = state.sessions.iter_mut().find(|s| s.id == id).unwrap();
        session.recompute();

        assert_eq!(session.total_ml, before.total_ml);
        assert_eq!(session.duration_hours, before.duration_hours);
        assert_eq!(session.ml_per_hour, before.ml_per_hour);
        assert_eq!(session.ml_per_24h, before.ml_per_24h);
        assert_eq!(session.ml_per_intake, before.ml_per_intake);
    }

    #[test]
    fn out_of_order_append_sorts_ascending() {
        let mut state = UserDosageState::default();
        route_event(&mut state, event_at(60, 2.0));
        route_event(&mut state, event_at(0, 2.0)); // backdated

        let session = state.current_session().unwrap();
        assert_eq!(session.first_intake_at, base_time());
        assert_eq!(session.last_intake_at, base_time() + Duration::minutes(60));
    }

    #[test]
    fn auto_split_fires_past_four_safe_intervals() {
        let mut state = UserDosageState::default();
        route_event(&mut state, event_at(0, 2.0));
        let safe = Duration::minutes(90);

        // Exactly at the threshold: no split
        let at_threshold = base_time() + safe * 4;
        assert!(!maybe_auto_split(&mut state, safe, at_threshold));
        assert!(state.current_session.is_some());

        // One second past: split, history preserved
        let past = at_threshold + Duration::seconds(1);
        assert!(maybe_auto_split(&mut state, safe, past));
        assert!(state.current_session.is_none());
        assert_eq!(state.sessions.len(), 1);
        assert_eq!(state.sessions[0].intake_count, 1);
    }

    #[test]
    fn auto_split_acts_once_per_last_intake() {
        let mut state = UserDosageState::default();
        route_event(&mut state, event_at(0, 2.0));
        let safe = Duration::minutes(90);
        let late = base_time() + safe * 4 + Duration::minutes(10);

        assert!(maybe_auto_split(&mut state, safe, late));
        // Current is gone and the mark is set; no further splits
        assert!(!maybe_auto_split(&mut state, safe, late + Duration::hours(1)));
    }

    #[test]
    fn manual_split_detaches_without_clearing_history() {
        let mut state = UserDosageState::default();
        route_event(&mut state, event_at(0, 2.0));
        route_event(&mut state, event_at(30, 2.0));

        start_new_session(&mut state);
        assert!(state.current_session.is_none());
        assert_eq!(state.sessions.len(), 1);
        assert_eq!(state.sessions[0].intake_count, 2);

        // Next event opens a fresh session
        route_event(&mut state, event_at(60, 2.0));
        assert_eq!(state.sessions.len(), 2);
        assert_eq!(state.current_session, Some(state.sessions[1].id));
    }
}
