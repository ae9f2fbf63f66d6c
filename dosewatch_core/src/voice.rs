//! Voice-assistant adapter over the engine facade.
//!
//! Exposes three read-style queries (status summary, session summary,
//! help) and one write-style command (add an intake with a spoken or
//! default amount). The adapter only calls the engine's public contract;
//! it never duplicates risk logic.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::engine::Engine;
use crate::format::{format_time_spoken, format_countdown};
use crate::types::RiskLevel;

/// Incoming voice request, already parsed off the platform envelope
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceRequest {
    Launch,
    Intent {
        name: String,
        #[serde(default)]
        slots: HashMap<String, String>,
    },
    SessionEnded,
}

/// Spoken response plus the end-of-conversation flag
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct VoiceResponse {
    pub speech: String,
    pub end_session: bool,
}

impl VoiceResponse {
    fn speak(text: impl Into<String>) -> Self {
        Self {
            speech: text.into(),
            end_session: false,
        }
    }

    fn goodbye(text: impl Into<String>) -> Self {
        Self {
            speech: text.into(),
            end_session: true,
        }
    }
}

const FALLBACK: &str = "I'm not sure how to help with that. You can say: \
check my status, log a new dose, or get session information.";

/// Dispatch a voice request against the engine
pub fn handle_request(engine: &mut Engine, request: &VoiceRequest) -> VoiceResponse {
    match request {
        VoiceRequest::Launch => VoiceResponse::speak(
            "Welcome to dosewatch. You can ask me to check your status, \
             log a new dose, or get session information.",
        ),
        VoiceRequest::SessionEnded => VoiceResponse::goodbye(""),
        VoiceRequest::Intent { name, slots } => match name.as_str() {
            "StatusIntent" => VoiceResponse::speak(status_summary(engine)),
            "SessionInfoIntent" => VoiceResponse::speak(session_summary(engine)),
            "AddDoseIntent" => VoiceResponse::speak(add_dose(engine, slots)),
            "HelpIntent" => VoiceResponse::speak(
                "You can say: \"check my status\", \"log a new dose\", \
                 or \"get session information\".",
            ),
            "StopIntent" | "CancelIntent" => VoiceResponse::goodbye("Goodbye!"),
            _ => VoiceResponse::speak(FALLBACK),
        },
    }
}

/// Spoken status summary for the current user
fn status_summary(engine: &Engine) -> String {
    let view = engine.view();

    let Some(last) = view.last_event.as_ref() else {
        return "You haven't recorded any doses yet. \
                You can say 'log a new dose' to get started."
            .into();
    };

    let elapsed = engine.now() - last.taken_at;
    let mut text = format!(
        "Your last dose was {} ml, taken {} ago. ",
        last.amount_ml,
        format_time_spoken(elapsed)
    );

    match view.risk_level {
        RiskLevel::Safe => {
            text.push_str("It's safe to take another dose now if needed.");
        }
        RiskLevel::Warning => {
            text.push_str(&format!(
                "You're approaching the safe window. Please wait another {} \
                 for complete safety.",
                format_time_spoken(view.time_remaining())
            ));
        }
        RiskLevel::Danger => {
            text.push_str(&format!(
                "It's not safe to take another dose yet. Please wait another {} \
                 for safety.",
                format_time_spoken(view.time_remaining())
            ));
        }
    }

    text
}

/// Spoken statistics for the current session
fn session_summary(engine: &Engine) -> String {
    let view = engine.view();

    let Some(session) = view.current_session.as_ref() else {
        return "You don't have an active session at the moment.".into();
    };

    format!(
        "Your current session started at {}. Your last intake was at {}. \
         The session has lasted {:.1} hours. You've taken {} dose{} totaling {:.1} ml. \
         That's {:.1} ml per intake and {:.1} ml per hour.",
        session.first_intake_at.format("%H:%M"),
        session.last_intake_at.format("%H:%M"),
        session.duration_hours,
        session.intake_count,
        if session.intake_count != 1 { "s" } else { "" },
        session.total_ml,
        session.ml_per_intake,
        session.ml_per_hour,
    )
}

/// Record a dose with the spoken amount, or the default dose
fn add_dose(engine: &mut Engine, slots: &HashMap<String, String>) -> String {
    let amount = slots
        .get("amount")
        .and_then(|raw| raw.parse::<f64>().ok())
        .unwrap_or(engine.settings().default_dose_ml);

    let event = engine.add_intake(amount, None, None);
    let view = engine.view();

    let mut text = format!("I've recorded a new dose of {} ml.", event.amount_ml);
    if view.time_remaining_ms > 0 {
        text.push_str(&format!(
            " Your next safe window opens in {}.",
            format_countdown(view.time_remaining())
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::LogSink;
    use crate::store::MemoryStore;
    use chrono::{DateTime, Duration, Utc};

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T20:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn test_engine() -> (Engine, ManualClock) {
        let clock = ManualClock::new(base_time());
        let engine = Engine::new(
            Box::new(MemoryStore::new()),
            Box::new(LogSink),
            Box::new(clock.clone()),
        );
        (engine, clock)
    }

    fn intent(name: &str) -> VoiceRequest {
        VoiceRequest::Intent {
            name: name.into(),
            slots: HashMap::new(),
        }
    }

    #[test]
    fn launch_greets_without_ending() {
        let (mut engine, _) = test_engine();
        let response = handle_request(&mut engine, &VoiceRequest::Launch);
        assert!(response.speech.contains("Welcome to dosewatch"));
        assert!(!response.end_session);
    }

    #[test]
    fn status_with_empty_log_prompts_to_start() {
        let (mut engine, _) = test_engine();
        let response = handle_request(&mut engine, &intent("StatusIntent"));
        assert!(response.speech.contains("haven't recorded any doses"));
    }

    #[test]
    fn status_reports_elapsed_and_wait() {
        let (mut engine, clock) = test_engine();
        engine.add_intake(3.0, None, None);
        clock.advance(Duration::minutes(30));
        engine.tick();

        let response = handle_request(&mut engine, &intent("StatusIntent"));
        assert!(response.speech.contains("Your last dose was 3 ml"));
        assert!(response.speech.contains("30 minutes ago"));
        assert!(response.speech.contains("not safe"));
        assert!(response.speech.contains("1 hour and 0 minutes"));
    }

    #[test]
    fn status_when_safe_offers_another_dose() {
        let (mut engine, clock) = test_engine();
        engine.add_intake(2.0, None, None);
        clock.advance(Duration::minutes(95));
        engine.tick();

        let response = handle_request(&mut engine, &intent("StatusIntent"));
        assert!(response.speech.contains("safe to take another dose"));
    }

    #[test]
    fn add_dose_uses_spoken_amount() {
        let (mut engine, _) = test_engine();
        let request = VoiceRequest::Intent {
            name: "AddDoseIntent".into(),
            slots: HashMap::from([("amount".into(), "1.5".into())]),
        };

        let response = handle_request(&mut engine, &request);
        assert!(response.speech.contains("1.5 ml"));
        assert_eq!(engine.view().events.len(), 1);
        assert_eq!(engine.view().events[0].amount_ml, 1.5);
    }

    #[test]
    fn add_dose_falls_back_to_default_amount() {
        let (mut engine, _) = test_engine();
        let response = handle_request(&mut engine, &intent("AddDoseIntent"));
        assert!(response.speech.contains("2 ml"));
        assert_eq!(engine.view().events[0].amount_ml, 2.0);
    }

    #[test]
    fn session_info_with_no_session() {
        let (mut engine, _) = test_engine();
        let response = handle_request(&mut engine, &intent("SessionInfoIntent"));
        assert!(response.speech.contains("don't have an active session"));
    }

    #[test]
    fn session_info_reports_statistics() {
        let (mut engine, clock) = test_engine();
        engine.add_intake(2.0, None, None);
        clock.advance(Duration::hours(2));
        engine.add_intake(4.0, None, None);

        let response = handle_request(&mut engine, &intent("SessionInfoIntent"));
        assert!(response.speech.contains("started at 20:00"));
        assert!(response.speech.contains("last intake was at 22:00"));
        assert!(response.speech.contains("lasted 2.0 hours"));
        assert!(response.speech.contains("2 doses totaling 6.0 ml"));
        assert!(response.speech.contains("3.0 ml per intake"));
        assert!(response.speech.contains("3.0 ml per hour"));
    }

    #[test]
    fn stop_ends_the_conversation() {
        let (mut engine, _) = test_engine();
        let response = handle_request(&mut engine, &intent("StopIntent"));
        assert!(response.end_session);
    }

    #[test]
    fn unknown_intent_gets_fallback() {
        let (mut engine, _) = test_engine();
        let response = handle_request(&mut engine, &intent("MysteryIntent"));
        assert!(response.speech.contains("not sure how to help"));
    }
}
