use std::time::{Duration, Instant};

/// How long a message stays up before auto-dismissing.
pub const DISMISS_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub posted_at: Instant,
}

impl Notification {
    pub fn is_expired(&self) -> bool {
        self.posted_at.elapsed() > DISMISS_AFTER
    }
}

/// Single-slot user-facing message channel. Posting a new message
/// immediately discards whatever is currently displayed; there is no
/// queueing or stacking.
#[derive(Debug, Default)]
pub struct NotificationBus {
    active: Option<Notification>,
    next_id: u64,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, message: impl Into<String>, severity: Severity) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.active = Some(Notification {
            id,
            message: message.into(),
            severity,
            posted_at: Instant::now(),
        });
        id
    }

    pub fn active(&self) -> Option<&Notification> {
        self.active.as_ref()
    }

    /// Drop the active message once its display window has elapsed.
    pub fn tick(&mut self) {
        if self.active.as_ref().is_some_and(Notification::is_expired) {
            self.active = None;
        }
    }

    /// User dismissal; ignored when the id no longer matches the
    /// displayed message.
    pub fn dismiss(&mut self, id: u64) {
        if self.active.as_ref().is_some_and(|n| n.id == id) {
            self.active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posting_replaces_active_message() {
        let mut bus = NotificationBus::new();
        let first = bus.post("Added 2 files to queue", Severity::Success);
        let second = bus.post("Failed to move job", Severity::Error);
        assert_ne!(first, second);

        let active = bus.active().unwrap();
        assert_eq!(active.id, second);
        assert_eq!(active.message, "Failed to move job");
        assert_eq!(active.severity, Severity::Error);
    }

    #[test]
    fn test_tick_expires_after_timeout() {
        let mut bus = NotificationBus::new();
        bus.post("Queue cleared", Severity::Success);

        bus.tick();
        assert!(bus.active().is_some());

        // Backdate past the dismiss window.
        if let Some(n) = bus.active.as_mut() {
            n.posted_at = Instant::now() - (DISMISS_AFTER + Duration::from_millis(10));
        }
        bus.tick();
        assert!(bus.active().is_none());
    }

    #[test]
    fn test_dismiss_ignores_stale_id() {
        let mut bus = NotificationBus::new();
        let old = bus.post("first", Severity::Info);
        let current = bus.post("second", Severity::Info);

        bus.dismiss(old);
        assert!(bus.active().is_some());
        bus.dismiss(current);
        assert!(bus.active().is_none());
    }
}
