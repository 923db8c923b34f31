use std::sync::Arc;

use futures::future::join_all;
use tracing::info;

use crate::api::{ApiClient, MoveDirection};
use crate::core::queue::QueueSynchronizer;
use crate::core::selection::{BulkOutcome, SelectionStore};
use crate::notify::{NotificationBus, Severity};

/// Thin command layer over the server boundary. Every command is checked
/// against the latest snapshot before dispatch; validation failures go to
/// the notification bus without a request ever being issued. Commands never
/// touch the snapshot themselves: the effect shows up on the next poll.
pub struct OrderingService {
    api: Arc<ApiClient>,
}

/// One message covers the whole bulk add: the bus holds a single slot, so
/// a mixed outcome must not post success and failure separately.
fn bulk_summary(outcome: BulkOutcome) -> (String, Severity) {
    let plural = |n: usize| if n == 1 { "" } else { "s" };
    match (outcome.succeeded, outcome.failed) {
        (s, 0) => (
            format!("Added {s} file{} to queue", plural(s)),
            Severity::Success,
        ),
        (0, f) => (
            format!("Failed to add {f} file{}", plural(f)),
            Severity::Error,
        ),
        (s, f) => (
            format!("Added {s} file{} to queue, {f} failed", plural(s)),
            Severity::Warning,
        ),
    }
}

impl OrderingService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// One independent add request per selected file. Outcomes are counted
    /// separately and the selection clears whatever the results were.
    pub async fn add_selected(
        &self,
        selection: &mut SelectionStore,
        preset: &str,
        format: &str,
        bus: &mut NotificationBus,
    ) -> Option<BulkOutcome> {
        if preset.is_empty() {
            bus.post("Please select a preset", Severity::Error);
            return None;
        }
        if selection.is_empty() {
            bus.post("Please select at least one file", Severity::Error);
            return None;
        }

        let paths: Vec<String> = selection.paths().map(str::to_string).collect();
        let requests = paths.iter().map(|path| {
            let filename = path.rsplit('/').next().unwrap_or(path.as_str());
            self.api
                .queue_add(filename, Some(path.as_str()), preset, format)
        });
        let outcome = BulkOutcome::from_results(
            join_all(requests).await.into_iter().map(|r| r.map(|_| ())),
        );

        let (message, severity) = bulk_summary(outcome);
        bus.post(message, severity);

        selection.deselect_all();
        info!(succeeded = outcome.succeeded, failed = outcome.failed, "bulk add finished");
        Some(outcome)
    }

    /// Add a single file outside the selection flow (the preview path).
    pub async fn add_one(
        &self,
        path: &str,
        preset: &str,
        format: &str,
        bus: &mut NotificationBus,
    ) -> bool {
        if preset.is_empty() {
            bus.post("Please select a preset first", Severity::Error);
            return false;
        }
        let filename = path.rsplit('/').next().unwrap_or(path);
        match self.api.queue_add(filename, Some(path), preset, format).await {
            Ok(_) => {
                bus.post(format!("Added \"{filename}\" to queue"), Severity::Success);
                true
            }
            Err(e) => {
                bus.post(e, Severity::Error);
                false
            }
        }
    }

    pub async fn move_job(
        &self,
        sync: &QueueSynchronizer,
        id: i64,
        direction: MoveDirection,
        bus: &mut NotificationBus,
    ) {
        let movable = sync.queue_index(id).is_some_and(|index| match direction {
            MoveDirection::Up => sync.can_move_up(index),
            MoveDirection::Down => sync.can_move_down(index),
        });
        if !movable {
            bus.post("Job cannot be moved", Severity::Warning);
            return;
        }
        match self.api.queue_move(id, direction).await {
            Ok(()) => {
                bus.post(format!("Job moved {}", direction.as_str()), Severity::Info);
            }
            Err(e) => {
                bus.post(e, Severity::Error);
            }
        }
    }

    pub async fn remove(&self, sync: &QueueSynchronizer, id: i64, bus: &mut NotificationBus) {
        if !sync.queue_index(id).is_some_and(|index| sync.can_remove(index)) {
            bus.post("Cannot remove this job", Severity::Warning);
            return;
        }
        match self.api.queue_remove(id).await {
            Ok(()) => {
                bus.post("Removed from queue", Severity::Success);
            }
            Err(e) => {
                bus.post(e, Severity::Error);
            }
        }
    }

    pub async fn clear(&self, bus: &mut NotificationBus) {
        match self.api.queue_clear().await {
            Ok(()) => {
                bus.post("Queue cleared", Severity::Success);
            }
            Err(e) => {
                bus.post(e, Severity::Error);
            }
        }
    }

    pub async fn start(&self, sync: &QueueSynchronizer, bus: &mut NotificationBus) {
        if !sync.can_start() {
            bus.post("Nothing to start", Severity::Warning);
            return;
        }
        match self.api.start().await {
            Ok(()) => {
                bus.post("Started encoding queue", Severity::Success);
            }
            Err(e) => {
                bus.post(e, Severity::Error);
            }
        }
    }

    pub async fn pause(&self, bus: &mut NotificationBus) {
        match self.api.pause().await {
            Ok(()) => {
                bus.post("Encoding paused", Severity::Info);
            }
            Err(e) => {
                bus.post(e, Severity::Error);
            }
        }
    }

    pub async fn resume(&self, bus: &mut NotificationBus) {
        match self.api.resume().await {
            Ok(()) => {
                bus.post("Encoding resumed", Severity::Info);
            }
            Err(e) => {
                bus.post(e, Severity::Error);
            }
        }
    }

    pub async fn cancel(&self, sync: &QueueSynchronizer, bus: &mut NotificationBus) {
        if !sync.can_cancel() {
            bus.post("No active encoding job", Severity::Warning);
            return;
        }
        match self.api.cancel().await {
            Ok(()) => {
                bus.post("Encoding cancelled", Severity::Warning);
            }
            Err(e) => {
                bus.post(e, Severity::Error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> OrderingService {
        OrderingService::new(Arc::new(ApiClient::new("http://127.0.0.1:1")))
    }

    #[tokio::test]
    async fn test_empty_preset_short_circuits_without_request() {
        let svc = service();
        let mut selection = SelectionStore::new();
        let mut bus = NotificationBus::new();

        // The API target is unroutable, so reaching the network would fail
        // differently; the validation message proves no request was made.
        let outcome = svc.add_selected(&mut selection, "", "mp4", &mut bus).await;
        assert!(outcome.is_none());
        assert_eq!(bus.active().unwrap().message, "Please select a preset");
    }

    #[tokio::test]
    async fn test_empty_selection_short_circuits() {
        let svc = service();
        let mut selection = SelectionStore::new();
        let mut bus = NotificationBus::new();

        let outcome = svc
            .add_selected(&mut selection, "Fast 720p", "mp4", &mut bus)
            .await;
        assert!(outcome.is_none());
        assert_eq!(bus.active().unwrap().message, "Please select at least one file");
    }

    #[test]
    fn test_bulk_summary_reports_mixed_outcome_in_one_message() {
        let (msg, sev) = bulk_summary(BulkOutcome { succeeded: 2, failed: 0 });
        assert_eq!(msg, "Added 2 files to queue");
        assert_eq!(sev, Severity::Success);

        let (msg, sev) = bulk_summary(BulkOutcome { succeeded: 0, failed: 1 });
        assert_eq!(msg, "Failed to add 1 file");
        assert_eq!(sev, Severity::Error);

        // A partial failure keeps the succeeded count visible.
        let (msg, sev) = bulk_summary(BulkOutcome { succeeded: 2, failed: 1 });
        assert_eq!(msg, "Added 2 files to queue, 1 failed");
        assert_eq!(sev, Severity::Warning);
    }

    #[tokio::test]
    async fn test_unmovable_job_never_dispatches() {
        let svc = service();
        let sync = QueueSynchronizer::new(); // empty queue
        let mut bus = NotificationBus::new();

        svc.move_job(&sync, 42, MoveDirection::Up, &mut bus).await;
        assert_eq!(bus.active().unwrap().severity, Severity::Warning);

        svc.remove(&sync, 42, &mut bus).await;
        assert_eq!(bus.active().unwrap().message, "Cannot remove this job");

        svc.start(&sync, &mut bus).await;
        assert_eq!(bus.active().unwrap().message, "Nothing to start");

        svc.cancel(&sync, &mut bus).await;
        assert_eq!(bus.active().unwrap().message, "No active encoding job");
    }
}
