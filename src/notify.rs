//! User-facing notification sink.
//!
//! The engine never talks to a toast widget directly; it hands messages to a
//! [`Notifier`] and moves on. Fire-and-forget, no acknowledgment.

/// Notification severity, mapped by the shell to toast styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Default sink: routes notifications through the log facade. Headless
/// consumers and tests that don't care about toasts use this.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Success => log::info!("notify: {}", message),
            Severity::Error => log::error!("notify: {}", message),
        }
    }
}

/// Test double that records every notification.
#[cfg(test)]
pub struct RecordingNotifier {
    pub messages: parking_lot::Mutex<Vec<(String, Severity)>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            messages: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn recorded(&self) -> Vec<(String, Severity)> {
        self.messages.lock().clone()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.messages.lock().push((message.to_string(), severity));
    }
}
