use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sentinel the encoder emits while it has no ETA to report.
pub const ETA_UNKNOWN: &str = "--:--";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    #[default]
    Info,
    Warning,
    Error,
    Success,
}

/// One line of the encoder log, arrival-ordered and append-only on the
/// server side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: String,
    pub message: String,
    #[serde(rename = "type", default)]
    pub severity: LogSeverity,
}

/// Fine-grained metrics for the active job, polled on a shorter interval
/// than the queue snapshot. Size fields arrive as the server's display
/// strings (`"123 MB"` or `"-"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    #[serde(default)]
    pub current_fps: f64,
    #[serde(default)]
    pub average_fps: f64,
    #[serde(default)]
    pub eta: String,
    #[serde(default, rename = "eta_from_output")]
    pub eta_from_encoder: String,
    #[serde(default)]
    pub time_elapsed: String,
    #[serde(default)]
    pub time_remaining: String,
    #[serde(default)]
    pub encoding_log: Vec<LogEntry>,
    #[serde(default)]
    pub frames_processed: u64,
    #[serde(default)]
    pub total_frames: u64,
    #[serde(default)]
    pub input_file: String,
    #[serde(default)]
    pub input_size: String,
    #[serde(default)]
    pub output_size: String,
    #[serde(default)]
    pub size_reduction: String,
    #[serde(default)]
    pub preset: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub paused: bool,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            current_fps: 0.0,
            average_fps: 0.0,
            eta: ETA_UNKNOWN.to_string(),
            eta_from_encoder: ETA_UNKNOWN.to_string(),
            time_elapsed: "00:00".to_string(),
            time_remaining: ETA_UNKNOWN.to_string(),
            encoding_log: Vec::new(),
            frames_processed: 0,
            total_frames: 0,
            input_file: "-".to_string(),
            input_size: "-".to_string(),
            output_size: "-".to_string(),
            size_reduction: "-".to_string(),
            preset: "-".to_string(),
            format: "-".to_string(),
            paused: false,
        }
    }
}

impl TelemetrySnapshot {
    /// Prefer the encoder-reported ETA unless it is the unknown sentinel,
    /// then fall back to the locally computed one.
    pub fn resolved_eta(&self) -> &str {
        if !self.eta_from_encoder.is_empty() && self.eta_from_encoder != ETA_UNKNOWN {
            &self.eta_from_encoder
        } else {
            &self.eta
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FpsClass {
    High,
    Low,
    #[default]
    Neutral,
}

pub fn classify_fps(fps: f64) -> FpsClass {
    if fps > 30.0 {
        FpsClass::High
    } else if fps > 0.0 && fps < 15.0 {
        FpsClass::Low
    } else {
        FpsClass::Neutral
    }
}

/// What one applied poll changed, so the render layer restyles only when
/// the displayed number actually moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryDelta {
    pub applied: bool,
    pub fps_changed: bool,
    pub fps_class: FpsClass,
}

/// Tracks the active job's live metrics. Snapshots replace state wholesale
/// under the same arrival-order sequence rule as the queue synchronizer;
/// the server owns log truncation and ordering.
#[derive(Debug, Default)]
pub struct TelemetryPoller {
    last_seq: Option<u64>,
    snapshot: TelemetrySnapshot,
    displayed_fps: Option<i64>,
    fps_class: FpsClass,
}

impl TelemetryPoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    pub fn fps_class(&self) -> FpsClass {
        self.fps_class
    }

    /// The FPS figure as displayed, one decimal.
    pub fn fps_display(&self) -> String {
        format!("{:.1}", self.displayed_fps.unwrap_or(0) as f64 / 10.0)
    }

    /// The log view replaces wholesale each poll and always shows the
    /// newest entry.
    pub fn latest_log(&self) -> Option<&LogEntry> {
        self.snapshot.encoding_log.last()
    }

    pub fn apply(&mut self, seq: u64, snapshot: TelemetrySnapshot) -> TelemetryDelta {
        if self.last_seq.is_some_and(|last| seq <= last) {
            debug!(seq, last = ?self.last_seq, "discarding stale telemetry poll");
            return TelemetryDelta {
                applied: false,
                fps_changed: false,
                fps_class: self.fps_class,
            };
        }
        self.last_seq = Some(seq);

        // Compare at display precision: re-classification happens only when
        // the rendered value moves.
        let displayed = (snapshot.current_fps * 10.0).round() as i64;
        let fps_changed = self.displayed_fps != Some(displayed);
        if fps_changed {
            self.displayed_fps = Some(displayed);
            self.fps_class = classify_fps(displayed as f64 / 10.0);
        }

        self.snapshot = snapshot;
        TelemetryDelta {
            applied: true,
            fps_changed,
            fps_class: self.fps_class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(fps: f64) -> TelemetrySnapshot {
        TelemetrySnapshot {
            current_fps: fps,
            ..TelemetrySnapshot::default()
        }
    }

    #[test]
    fn test_eta_prefers_encoder_value() {
        let mut s = TelemetrySnapshot::default();
        s.eta = "02:30".to_string();
        assert_eq!(s.resolved_eta(), "02:30");

        s.eta_from_encoder = "01:45".to_string();
        assert_eq!(s.resolved_eta(), "01:45");

        s.eta_from_encoder = ETA_UNKNOWN.to_string();
        assert_eq!(s.resolved_eta(), "02:30");
    }

    #[test]
    fn test_fps_classification_boundaries() {
        assert_eq!(classify_fps(31.0), FpsClass::High);
        assert_eq!(classify_fps(30.0), FpsClass::Neutral);
        assert_eq!(classify_fps(15.0), FpsClass::Neutral);
        assert_eq!(classify_fps(14.9), FpsClass::Low);
        assert_eq!(classify_fps(0.1), FpsClass::Low);
        assert_eq!(classify_fps(0.0), FpsClass::Neutral);
    }

    #[test]
    fn test_fps_change_reported_only_on_displayed_change() {
        let mut poller = TelemetryPoller::new();

        let delta = poller.apply(1, snap(24.02));
        assert!(delta.applied && delta.fps_changed);

        // Same value at display precision: no visual churn.
        let delta = poller.apply(2, snap(24.04));
        assert!(delta.applied);
        assert!(!delta.fps_changed);
        assert_eq!(poller.fps_display(), "24.0");

        let delta = poller.apply(3, snap(35.5));
        assert!(delta.fps_changed);
        assert_eq!(delta.fps_class, FpsClass::High);
    }

    #[test]
    fn test_stale_telemetry_discarded() {
        let mut poller = TelemetryPoller::new();
        poller.apply(3, snap(20.0));

        let delta = poller.apply(2, snap(99.0));
        assert!(!delta.applied);
        assert_eq!(poller.snapshot().current_fps, 20.0);
    }

    #[test]
    fn test_log_view_advances_to_newest() {
        let mut poller = TelemetryPoller::new();
        let mut s = snap(10.0);
        s.encoding_log = vec![
            LogEntry {
                timestamp: String::new(),
                message: "Started encoding".to_string(),
                severity: LogSeverity::Info,
            },
            LogEntry {
                timestamp: String::new(),
                message: "Pass 1 complete".to_string(),
                severity: LogSeverity::Success,
            },
        ];
        poller.apply(1, s);
        assert_eq!(poller.latest_log().map(|l| l.message.as_str()), Some("Pass 1 complete"));
    }

    #[test]
    fn test_wire_severity_key_is_type() {
        let entry: LogEntry =
            serde_json::from_str(r#"{"timestamp":"t","message":"m","type":"warning"}"#).unwrap();
        assert_eq!(entry.severity, LogSeverity::Warning);
    }
}
