#![forbid(unsafe_code)]

//! Core domain model and business logic for the dosewatch system.
//!
//! This crate provides:
//! - Domain types (intake events, sessions, users, risk levels)
//! - The per-user dosage risk engine and its periodic tick
//! - Session segmentation and statistics
//! - Persistence (durable key/value store, config, CSV export)
//! - A voice-assistant adapter over the engine facade

pub mod types;
pub mod error;
pub mod settings;
pub mod config;
pub mod logging;
pub mod clock;
pub mod store;
pub mod notify;
pub mod intake;
pub mod session;
pub mod risk;
pub mod registry;
pub mod engine;
pub mod scheduler;
pub mod format;
pub mod voice;
pub mod csv_export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use settings::{Settings, SettingsUpdate};
pub use config::Config;
pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{DurableStore, FileStore, MemoryStore};
pub use notify::{LogSink, NotificationKind, NotificationSink};
pub use registry::UserRegistry;
pub use engine::{DosageView, Engine};
pub use scheduler::Ticker;
pub use voice::{handle_request, VoiceRequest, VoiceResponse};
