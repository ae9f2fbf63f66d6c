//! Risk classification and the per-tick evaluation.
//!
//! The classification ladder runs over elapsed time since the last
//! intake; the rolling 24-hour cap can force the result back to danger
//! regardless of elapsed time. Edge transitions emit one-shot
//! notifications guarded by per-user flags.

use chrono::{DateTime, Duration, Utc};

use crate::intake;
use crate::notify::{NotificationKind, NotificationSink};
use crate::settings::Settings;
use crate::types::{RiskLevel, UserDosageState};

/// Classify elapsed time since the last intake
///
/// Boundaries are inclusive on the upper side: exactly the warning
/// interval is warning, exactly the safe interval is safe.
pub fn classify(elapsed: Duration, settings: &Settings) -> RiskLevel {
    if elapsed < settings.warning_interval() {
        RiskLevel::Danger
    } else if elapsed < settings.safe_interval() {
        RiskLevel::Warning
    } else {
        RiskLevel::Safe
    }
}

/// Recompute a user's derived risk state from their event log
///
/// This is the body of the once-per-second tick, and also runs
/// synchronously after every mutation so the visible state never lags.
/// With an empty log the user is in the initial/terminal state: safe,
/// zero countdown, inactive.
pub fn evaluate(
    state: &mut UserDosageState,
    settings: &Settings,
    now: DateTime<Utc>,
    notifier: &dyn NotificationSink,
) {
    let Some(last) = intake::latest_event(&state.events).cloned() else {
        state.active = false;
        state.time_remaining_ms = 0;
        state.risk_level = RiskLevel::Safe;
        state.total_24h_ml = 0.0;
        state.last_event = None;
        return;
    };

    state.active = true;
    let elapsed = now - last.taken_at;
    state.last_event = Some(last);

    let remaining = std::cmp::max(settings.safe_interval() - elapsed, Duration::zero());
    state.time_remaining_ms = remaining.num_milliseconds();

    let total = intake::rolling_24h_total(&state.events, now);
    state.total_24h_ml = total;

    let previous = state.risk_level;
    let mut level = classify(elapsed, settings);
    if total > settings.max_daily_dose_ml {
        tracing::debug!(
            "24h total {:.1} ml exceeds cap {:.1} ml, forcing danger",
            total,
            settings.max_daily_dose_ml
        );
        level = RiskLevel::Danger;
    }

    if level == RiskLevel::Safe && !state.safe_notified {
        state.safe_notified = true;
        let full_wait = previous == RiskLevel::Danger;
        let message = if full_wait {
            "Safe window reached after a full wait."
        } else {
            "Safe window reached."
        };
        notifier.notify(NotificationKind::SafeReached { full_wait }, message);
        if settings.sound_enabled {
            notifier.play_sound("safe_window");
        }
    }

    if previous == RiskLevel::Warning && level == RiskLevel::Danger {
        notifier.notify(
            NotificationKind::UnsafeNow,
            "Daily limit exceeded. It is not safe to dose now.",
        );
    }

    state.risk_level = level;
}
