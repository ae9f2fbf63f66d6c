//! Core domain types for the dosewatch system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Risk levels and their classification
//! - Intake events and sessions
//! - Per-user dosage state
//! - Users

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Risk Level
// ============================================================================

/// Three-valued safety classification derived from time-since-last-intake
/// and the daily-volume cap
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Safe,
    Warning,
    Danger,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Warning => "warning",
            RiskLevel::Danger => "danger",
        }
    }
}

// ============================================================================
// Intake Events and Sessions
// ============================================================================

/// One logged dose with timestamp and amount
///
/// Immutable once created: events are only ever appended, and removed
/// only by a full reset of the owning user's state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IntakeEvent {
    pub id: Uuid,
    pub taken_at: DateTime<Utc>,
    pub amount_ml: f64,
    pub note: Option<String>,
}

/// A contiguous run of intake events considered part of one continuous
/// use episode, auto-closed after a long idle gap
///
/// Derived fields are recomputed from `events` on every append; see
/// [`crate::session`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub first_intake_at: DateTime<Utc>,
    pub last_intake_at: DateTime<Utc>,
    pub duration_hours: f64,
    pub total_ml: f64,
    pub ml_per_hour: f64,
    pub ml_per_intake: f64,
    pub ml_per_24h: f64,
    pub intake_count: usize,
    /// Events owned by this session, kept sorted oldest-first
    pub events: Vec<IntakeEvent>,
}

impl Session {
    /// Create a session containing a single event
    pub fn starting_with(event: IntakeEvent) -> Self {
        let ts = event.taken_at;
        let mut session = Session {
            id: Uuid::new_v4(),
            started_at: ts,
            first_intake_at: ts,
            last_intake_at: ts,
            duration_hours: 0.0,
            total_ml: 0.0,
            ml_per_hour: 0.0,
            ml_per_intake: 0.0,
            ml_per_24h: 0.0,
            intake_count: 0,
            events: vec![event],
        };
        session.recompute();
        session
    }
}

// ============================================================================
// Per-User Dosage State
// ============================================================================

/// Aggregate dosage state for one user
///
/// Invariants:
/// - `last_event` is the event in `events` with the maximum timestamp,
///   or `None` iff `events` is empty
/// - `active` is true iff `events` is non-empty
/// - `events` is kept ordered newest-first for history display; risk
///   evaluation always resolves the true maximum-timestamp element
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDosageState {
    pub events: Vec<IntakeEvent>,
    pub sessions: Vec<Session>,
    pub current_session: Option<Uuid>,
    pub active: bool,
    pub time_remaining_ms: i64,
    pub risk_level: RiskLevel,
    pub total_24h_ml: f64,
    pub last_event: Option<IntakeEvent>,
    pub safe_notified: bool,
    /// Last-intake timestamp the idle-gap auto-split already acted on
    pub auto_split_mark: Option<DateTime<Utc>>,
}

impl UserDosageState {
    /// Countdown until the next safe window
    pub fn time_remaining(&self) -> Duration {
        Duration::milliseconds(self.time_remaining_ms)
    }

    /// The open session, if any
    pub fn current_session(&self) -> Option<&Session> {
        let id = self.current_session?;
        self.sessions.iter().find(|s| s.id == id)
    }
}

// ============================================================================
// Users
// ============================================================================

/// A tracked user; identity is stable, all dosage data is owned by `id`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub emoji: String,
}

/// Partial update for a user; `None` fields are left unchanged
#[derive(Clone, Debug, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub emoji: Option<String>,
}
