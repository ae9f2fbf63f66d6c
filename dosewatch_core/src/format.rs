//! Display and spoken formatting for durations and risk levels.
//!
//! Pure helpers consumed by the CLI and the voice adapter; the engine
//! itself never formats anything.

use chrono::Duration;

use crate::types::RiskLevel;

/// Compact elapsed-time string, e.g. "1h 30m" or "45m"
pub fn format_time(duration: Duration) -> String {
    if duration <= Duration::zero() {
        return "0m".into();
    }

    let minutes = duration.num_minutes();
    let hours = minutes / 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

/// Countdown string, e.g. "01:30:45" with hours or "05:09" without
pub fn format_countdown(duration: Duration) -> String {
    if duration <= Duration::zero() {
        return "00:00".into();
    }

    let total_seconds = duration.num_seconds();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Always-HH:MM:SS elapsed string for the live countdown display
pub fn format_elapsed_hms(duration: Duration) -> String {
    if duration <= Duration::zero() {
        return "00:00:00".into();
    }

    let total_seconds = duration.num_seconds();
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}

/// Spoken duration, e.g. "1 hour and 5 minutes" or "12 minutes"
pub fn format_time_spoken(duration: Duration) -> String {
    if duration <= Duration::zero() {
        return "0 minutes".into();
    }

    let minutes = duration.num_minutes();
    let hours = minutes / 60;

    if hours > 0 {
        let rem = minutes % 60;
        format!(
            "{} hour{} and {} minute{}",
            hours,
            if hours != 1 { "s" } else { "" },
            rem,
            if rem != 1 { "s" } else { "" }
        )
    } else {
        format!("{} minute{}", minutes, if minutes != 1 { "s" } else { "" })
    }
}

/// Short status label for a risk level
pub fn risk_label(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Safe => "Safe to dose",
        RiskLevel::Warning => "Caution Period",
        RiskLevel::Danger => "Unsafe Period",
    }
}
