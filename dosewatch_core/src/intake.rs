//! Event log operations: appending intakes and rolling totals.
//!
//! The event list is append-only and kept ordered newest-first for
//! history display. Risk evaluation never trusts list position; it always
//! resolves the true maximum-timestamp element, which matters once
//! backdated entries are in play.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::types::{IntakeEvent, UserDosageState};

/// Append a new intake event to a user's log
///
/// A non-finite or non-positive amount falls back to `default_dose_ml`.
/// `backdate_minutes` shifts the timestamp into the past for retroactive
/// logging; `None` means "now". Returns a clone of the stored event.
pub fn append(
    state: &mut UserDosageState,
    amount_ml: f64,
    note: Option<String>,
    backdate_minutes: Option<i64>,
    default_dose_ml: f64,
    now: DateTime<Utc>,
) -> IntakeEvent {
    let amount = if amount_ml.is_finite() && amount_ml > 0.0 {
        amount_ml
    } else {
        tracing::warn!(
            "Invalid intake amount {}, substituting default dose {} ml",
            amount_ml,
            default_dose_ml
        );
        default_dose_ml
    };

    let taken_at = match backdate_minutes {
        Some(minutes) if minutes > 0 => now - Duration::minutes(minutes),
        _ => now,
    };

    let event = IntakeEvent {
        id: Uuid::new_v4(),
        taken_at,
        amount_ml: amount,
        note: note.filter(|n| !n.is_empty()),
    };

    // Insert at timestamp position, newest first
    let idx = state
        .events
        .iter()
        .position(|e| e.taken_at <= taken_at)
        .unwrap_or(state.events.len());
    state.events.insert(idx, event.clone());

    state.active = true;
    state.last_event = latest_event(&state.events).cloned();

    tracing::info!("Logged intake of {} ml at {}", amount, taken_at);
    event
}

/// Resolve the event with the maximum timestamp
pub fn latest_event(events: &[IntakeEvent]) -> Option<&IntakeEvent> {
    events.iter().max_by_key(|e| e.taken_at)
}

/// Sum of amounts for events strictly within the trailing 24 hours
///
/// An event exactly at the boundary is excluded.
pub fn rolling_24h_total(events: &[IntakeEvent], now: DateTime<Utc>) -> f64 {
    let cutoff = now - Duration::hours(24);
    events
        .iter()
        .filter(|e| e.taken_at > cutoff)
        .map(|e| e.amount_ml)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T20:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn append_stores_event_and_updates_invariants() {
        let mut state = UserDosageState::default();
        let now = base_time();

        let event = append(&mut state, 3.0, Some("first".into()), None, 2.0, now);

        assert_eq!(event.amount_ml, 3.0);
        assert_eq!(event.taken_at, now);
        assert!(state.active);
        assert_eq!(state.last_event.as_ref().unwrap().id, event.id);
        assert_eq!(state.events.len(), 1);
    }

    #[test]
    fn invalid_amount_falls_back_to_default_dose() {
        let mut state = UserDosageState::default();
        let now = base_time();

        let zero = append(&mut state, 0.0, None, None, 2.0, now);
        let negative = append(&mut state, -1.5, None, None, 2.0, now);
        let nan = append(&mut state, f64::NAN, None, None, 2.0, now);

        assert_eq!(zero.amount_ml, 2.0);
        assert_eq!(negative.amount_ml, 2.0);
        assert_eq!(nan.amount_ml, 2.0);
    }

    #[test]
    fn backdated_event_lands_at_timestamp_position() {
        let mut state = UserDosageState::default();
        let now = base_time();

        let recent = append(&mut state, 2.0, None, None, 2.0, now);
        let older = append(&mut state, 2.0, None, Some(60), 2.0, now);

        // Newest-first ordering: the backdated event sits behind the recent one
        assert_eq!(state.events[0].id, recent.id);
        assert_eq!(state.events[1].id, older.id);
        assert_eq!(older.taken_at, now - Duration::minutes(60));

        // last_event still resolves the true maximum timestamp
        assert_eq!(state.last_event.as_ref().unwrap().id, recent.id);
    }

    #[test]
    fn rolling_total_excludes_boundary_event() {
        let now = base_time();
        let make = |minutes_ago: i64, amount: f64| IntakeEvent {
            id: Uuid::new_v4(),
            taken_at: now - Duration::minutes(minutes_ago),
            amount_ml: amount,
            note: None,
        };

        let events = vec![
            make(30, 3.0),
            make(23 * 60, 2.0),
            make(24 * 60, 5.0), // exactly at the boundary: excluded
            make(25 * 60, 7.0),
        ];

        assert_eq!(rolling_24h_total(&events, now), 5.0);
    }

    #[test]
    fn empty_note_is_dropped() {
        let mut state = UserDosageState::default();
        let event = append(&mut state, 2.0, Some(String::new()), None, 2.0, base_time());
        assert!(event.note.is_none());
    }
}
