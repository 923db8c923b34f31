use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use crate::notify::{NotificationBus, Severity};

// ── Job lifecycle ──

/// Server-enforced job lifecycle, client-observed only:
/// `Queued → Encoding → {Completed, Failed, Cancelled}`,
/// `Encoding ↔ Paused`, `Encoding|Paused → Cancelled`,
/// `Queued → Cancelled`. The last three states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Queued,
    Encoding,
    Paused,
    Completed,
    Failed,
    #[serde(alias = "stopped")]
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Encoding => "encoding",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Encoding | Self::Paused)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of transcode work as the server reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub filename: String,
    #[serde(default)]
    pub path: Option<String>,
    pub preset: String,
    pub format: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub input_size: u64,
    #[serde(default)]
    pub output_size: u64,
    #[serde(default)]
    pub current_output_size: Option<u64>,
}

/// The output size the reduction figure is computed from: the live
/// in-progress size while the job is active, the final size once it is not.
/// Zero means the server has nothing to report yet and counts as absent.
pub fn effective_output_size(job: &Job) -> Option<u64> {
    let size = if job.status.is_active() {
        job.current_output_size.unwrap_or(0)
    } else {
        job.output_size
    };
    (size > 0).then_some(size)
}

/// `(input − output) / input × 100` to one decimal, or `"-"` when either
/// side is missing.
pub fn reduction_display(input_size: u64, effective_output: Option<u64>) -> String {
    let Some(output) = effective_output else {
        return "-".to_string();
    };
    if input_size == 0 {
        return "-".to_string();
    }
    let reduction = (input_size as f64 - output as f64) / input_size as f64 * 100.0;
    format!("{reduction:.1}%")
}

pub fn job_reduction(job: &Job) -> String {
    reduction_display(job.input_size, effective_output_size(job))
}

// ── Snapshot ──

/// Wholesale server state at one poll: the active job is held apart from the
/// pending queue and is never a member of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QueueSnapshot {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub current: Option<Job>,
    #[serde(default)]
    pub queue: Vec<Job>,
    #[serde(default)]
    pub paused: bool,
}

/// Coarse state for the header indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Queued,
    Encoding,
}

// ── Synchronizer ──

/// Mirrors the server-authoritative queue. Every poll result replaces the
/// previous snapshot by value; poll responses carry a per-stream sequence
/// number and anything at or below the last applied one is discarded, so a
/// slow early request can never overwrite a faster later one.
#[derive(Debug, Default)]
pub struct QueueSynchronizer {
    last_seq: Option<u64>,
    snapshot: QueueSnapshot,
    observed: HashMap<i64, JobStatus>,
}

impl QueueSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &QueueSnapshot {
        &self.snapshot
    }

    /// Apply one poll result in arrival order. Returns false when the
    /// response is stale and was dropped. Re-applying an identical snapshot
    /// is a no-op apart from the sequence bookkeeping: the observable state
    /// is unchanged and no notification repeats.
    pub fn apply(&mut self, seq: u64, snapshot: QueueSnapshot, bus: &mut NotificationBus) -> bool {
        if self.last_seq.is_some_and(|last| seq <= last) {
            debug!(seq, last = ?self.last_seq, "discarding stale queue poll");
            return false;
        }
        self.last_seq = Some(seq);

        let mut observed = HashMap::new();
        for job in snapshot.current.iter().chain(snapshot.queue.iter()) {
            if let Some(&previous) = self.observed.get(&job.id) {
                if previous.is_terminal() && previous != job.status {
                    warn!(
                        job = job.id,
                        from = %previous,
                        to = %job.status,
                        "server reported a transition out of a terminal state"
                    );
                }
                if previous != job.status && job.status.is_terminal() {
                    self.notify_terminal(job, bus);
                }
            }
            observed.insert(job.id, job.status);
        }
        // Jobs no longer reported leave the client's view entirely.
        self.observed = observed;
        self.snapshot = snapshot;
        true
    }

    fn notify_terminal(&self, job: &Job, bus: &mut NotificationBus) {
        match job.status {
            JobStatus::Completed => {
                bus.post(format!("Completed: {}", job.filename), Severity::Success)
            }
            JobStatus::Failed => bus.post(format!("Failed: {}", job.filename), Severity::Error),
            JobStatus::Cancelled => {
                bus.post(format!("Cancelled: {}", job.filename), Severity::Warning)
            }
            _ => return,
        };
    }

    // ── Derived view rules ──

    pub fn can_move_up(&self, index: usize) -> bool {
        index > 0
            && self
                .snapshot
                .queue
                .get(index)
                .is_some_and(|job| job.status == JobStatus::Queued)
    }

    pub fn can_move_down(&self, index: usize) -> bool {
        index + 1 < self.snapshot.queue.len()
            && self
                .snapshot
                .queue
                .get(index)
                .is_some_and(|job| job.status == JobStatus::Queued)
    }

    pub fn can_remove(&self, index: usize) -> bool {
        self.snapshot
            .queue
            .get(index)
            .is_some_and(|job| !job.status.is_active())
    }

    pub fn can_start(&self) -> bool {
        self.snapshot.current.is_none() && !self.snapshot.queue.is_empty()
    }

    pub fn can_cancel(&self) -> bool {
        self.snapshot.current.is_some()
    }

    pub fn queue_index(&self, id: i64) -> Option<usize> {
        self.snapshot.queue.iter().position(|job| job.id == id)
    }

    pub fn activity(&self) -> Activity {
        if self.snapshot.current.is_some() {
            Activity::Encoding
        } else if !self.snapshot.queue.is_empty() {
            Activity::Queued
        } else {
            Activity::Idle
        }
    }
}
