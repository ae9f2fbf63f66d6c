//! Configurable thresholds shared by all users.
//!
//! Settings are a process-wide value holder persisted as a single record.
//! The one invariant is that the warning interval never exceeds the safe
//! interval; updates clamp rather than reject.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Configurable thresholds for the risk evaluator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Minimum elapsed minutes after which risk is classified safe
    pub safe_interval_min: i64,
    /// Elapsed-minute threshold below which risk is classified danger
    pub warning_interval_min: i64,
    /// Dose substituted for invalid intake amounts
    pub default_dose_ml: f64,
    /// Rolling 24-hour cap; exceeding it forces risk to danger
    pub max_daily_dose_ml: f64,
    /// Gate for notification sound playback
    pub sound_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            safe_interval_min: 90,
            warning_interval_min: 60,
            default_dose_ml: 2.0,
            max_daily_dose_ml: 10.0,
            sound_enabled: true,
        }
    }
}

/// Partial settings update; `None` fields are left unchanged
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    pub safe_interval_min: Option<i64>,
    pub warning_interval_min: Option<i64>,
    pub default_dose_ml: Option<f64>,
    pub max_daily_dose_ml: Option<f64>,
    pub sound_enabled: Option<bool>,
}

impl Settings {
    pub fn safe_interval(&self) -> Duration {
        Duration::minutes(self.safe_interval_min)
    }

    pub fn warning_interval(&self) -> Duration {
        Duration::minutes(self.warning_interval_min)
    }

    /// Apply a partial update, then re-establish the invariants
    ///
    /// Non-positive intervals and doses are ignored with a warning;
    /// a warning interval above the safe interval is clamped down.
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(v) = update.safe_interval_min {
            if v > 0 {
                self.safe_interval_min = v;
            } else {
                tracing::warn!("Ignoring non-positive safe interval: {}", v);
            }
        }
        if let Some(v) = update.warning_interval_min {
            if v > 0 {
                self.warning_interval_min = v;
            } else {
                tracing::warn!("Ignoring non-positive warning interval: {}", v);
            }
        }
        if let Some(v) = update.default_dose_ml {
            if v.is_finite() && v > 0.0 {
                self.default_dose_ml = v;
            } else {
                tracing::warn!("Ignoring invalid default dose: {}", v);
            }
        }
        if let Some(v) = update.max_daily_dose_ml {
            if v.is_finite() && v > 0.0 {
                self.max_daily_dose_ml = v;
            } else {
                tracing::warn!("Ignoring invalid max daily dose: {}", v);
            }
        }
        if let Some(v) = update.sound_enabled {
            self.sound_enabled = v;
        }

        if self.warning_interval_min > self.safe_interval_min {
            tracing::warn!(
                "Warning interval {}min exceeds safe interval {}min, clamping",
                self.warning_interval_min,
                self.safe_interval_min
            );
            self.warning_interval_min = self.safe_interval_min;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_app_defaults() {
        let s = Settings::default();
        assert_eq!(s.safe_interval_min, 90);
        assert_eq!(s.warning_interval_min, 60);
        assert_eq!(s.default_dose_ml, 2.0);
        assert_eq!(s.max_daily_dose_ml, 10.0);
        assert!(s.sound_enabled);
    }

    #[test]
    fn warning_interval_clamped_to_safe() {
        let mut s = Settings::default();
        s.apply(SettingsUpdate {
            warning_interval_min: Some(120),
            ..Default::default()
        });
        assert_eq!(s.warning_interval_min, 90);
    }

    #[test]
    fn lowering_safe_interval_drags_warning_down() {
        let mut s = Settings::default();
        s.apply(SettingsUpdate {
            safe_interval_min: Some(45),
            ..Default::default()
        });
        assert_eq!(s.safe_interval_min, 45);
        assert_eq!(s.warning_interval_min, 45);
    }

    #[test]
    fn invalid_values_are_ignored() {
        let mut s = Settings::default();
        s.apply(SettingsUpdate {
            safe_interval_min: Some(0),
            default_dose_ml: Some(f64::NAN),
            max_daily_dose_ml: Some(-3.0),
            ..Default::default()
        });
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn partial_record_deserializes_with_defaults() {
        let s: Settings = serde_json::from_str(r#"{"safe_interval_min": 120}"#).unwrap();
        assert_eq!(s.safe_interval_min, 120);
        assert_eq!(s.warning_interval_min, 60);
    }
}
