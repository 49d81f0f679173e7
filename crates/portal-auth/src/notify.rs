//! User-facing notifications raised by the sign-in flows.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

/// Sink for toast-style messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);

    fn success(&self, message: &str) {
        self.notify(NotificationKind::Success, message);
    }

    fn error(&self, message: &str) {
        self.notify(NotificationKind::Error, message);
    }

    fn warning(&self, message: &str) {
        self.notify(NotificationKind::Warning, message);
    }

    fn info(&self, message: &str) {
        self.notify(NotificationKind::Info, message);
    }
}

/// Notifier that forwards to `tracing` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Error => tracing::error!(message, "notification"),
            NotificationKind::Warning => tracing::warn!(message, "notification"),
            NotificationKind::Success | NotificationKind::Info => {
                tracing::info!(kind = ?kind, message, "notification")
            }
        }
    }
}

/// Notifier that keeps every message, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<(NotificationKind, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(NotificationKind, String)> {
        self.messages.lock().clone()
    }

    pub fn last(&self) -> Option<(NotificationKind, String)> {
        self.messages.lock().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        self.messages.lock().push((kind, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.success("one");
        notifier.warning("two");

        assert_eq!(
            notifier.messages(),
            vec![
                (NotificationKind::Success, "one".to_string()),
                (NotificationKind::Warning, "two".to_string()),
            ]
        );
        assert_eq!(notifier.last().unwrap().0, NotificationKind::Warning);
    }

    #[test]
    fn test_clones_share_messages() {
        let notifier = RecordingNotifier::new();
        let clone = notifier.clone();
        clone.error("boom");
        assert_eq!(notifier.messages().len(), 1);
    }
}
