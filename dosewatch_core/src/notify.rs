//! Notification sink for one-shot risk transitions.
//!
//! The evaluator emits edge-transition events through this seam; playback
//! mechanics (toasts, sounds, voice) live entirely on the consumer side.

use std::sync::Mutex;

/// Kind of one-shot transition event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    /// First entry into the safe window since the last intake.
    /// `full_wait` is true when the previous level was danger, i.e. the
    /// user sat out the whole interval rather than arriving from warning.
    SafeReached { full_wait: bool },
    /// Forced back into danger by the rolling 24-hour cap
    UnsafeNow,
    /// Idle-gap policy closed the open session
    SessionStarted,
}

/// Sink for transition notifications and sound cues
pub trait NotificationSink: Send {
    fn notify(&self, kind: NotificationKind, message: &str);

    /// Sound playback request; only called when sound is enabled
    fn play_sound(&self, tag: &str);
}

impl<T: NotificationSink + Sync + ?Sized> NotificationSink for std::sync::Arc<T> {
    fn notify(&self, kind: NotificationKind, message: &str) {
        (**self).notify(kind, message)
    }

    fn play_sound(&self, tag: &str) {
        (**self).play_sound(tag)
    }
}

/// Default sink that routes notifications through tracing
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, kind: NotificationKind, message: &str) {
        tracing::info!("Notification {:?}: {}", kind, message);
    }

    fn play_sound(&self, tag: &str) {
        tracing::debug!("Sound cue: {}", tag);
    }
}

/// Sink that records everything it receives, for tests
#[derive(Default)]
pub struct RecordingSink {
    pub notifications: Mutex<Vec<(NotificationKind, String)>>,
    pub sounds: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.notifications
            .lock()
            .expect("sink poisoned")
            .iter()
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn sound_tags(&self) -> Vec<String> {
        self.sounds.lock().expect("sink poisoned").clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, kind: NotificationKind, message: &str) {
        self.notifications
            .lock()
            .expect("sink poisoned")
            .push((kind, message.to_string()));
    }

    fn play_sound(&self, tag: &str) {
        self.sounds.lock().expect("sink poisoned").push(tag.to_string());
    }
}
