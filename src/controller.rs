use std::collections::HashSet;
use tracing::{debug, warn};

use crate::api::{HistoryRecord, SystemStats};
use crate::core::queue::{Job, QueueSnapshot, QueueSynchronizer};
use crate::core::selection::SelectionStore;
use crate::core::telemetry::{TelemetryDelta, TelemetryPoller, TelemetrySnapshot};
use crate::core::tree::{
    flatten, rebuild_hierarchy, sort_entries, FlatEntry, MediaEntry, SortField, SortSpec,
};
use crate::notify::{NotificationBus, Severity};
use crate::prefs::PreferenceStore;

// ── Events ──

/// Everything the dashboard reacts to. Poll results carry their per-stream
/// sequence number so slow responses can be recognized and dropped.
#[derive(Debug, Clone)]
pub enum Event {
    FilesLoaded(u64, Result<Vec<MediaEntry>, String>),
    PresetsLoaded(u64, Result<Vec<String>, String>),
    HistoryLoaded(u64, Result<Vec<HistoryRecord>, String>),
    QueuePolled(u64, Result<QueueSnapshot, String>),
    TelemetryPolled(u64, Result<TelemetrySnapshot, String>),
    StatsPolled(u64, Result<SystemStats, String>),
    PresetUploaded(Result<String, String>),
    NotifyTick,
}

/// Follow-up work an update asks the runtime to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RefreshFiles,
    RefreshPresets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Tree,
    Queue,
    History,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Queue => "queue",
            Self::History => "history",
        }
    }
}

// ── Dashboard state ──

/// The whole client-side controller state. The render layer (out of scope
/// here) is a pure function of this struct; every mutation happens through
/// `update` or one of the user-action methods.
pub struct Dashboard {
    // Media browser
    pub entries: Vec<MediaEntry>,
    pub expanded: HashSet<String>,
    pub selection: SelectionStore,

    // Server-owned state mirrors
    pub queue: QueueSynchronizer,
    pub telemetry: TelemetryPoller,
    pub history: Vec<HistoryRecord>,
    pub stats: Option<SystemStats>,

    // Encode setup
    pub presets: Vec<String>,
    pub preset: String,
    pub format: String,

    // Presentation
    pub tree_sort: SortSpec,
    pub queue_sort: SortSpec,
    pub history_sort: SortSpec,
    pub bus: NotificationBus,
    pub prefs: PreferenceStore,
    pub loading: bool,

    // Arrival-order guards for the streams not owned by a component
    files_seq: Option<u64>,
    presets_seq: Option<u64>,
    history_seq: Option<u64>,
    stats_seq: Option<u64>,
}

impl Dashboard {
    pub fn new(prefs: PreferenceStore) -> Self {
        Self {
            entries: Vec::new(),
            expanded: prefs.expanded_paths(),
            selection: SelectionStore::new(),
            queue: QueueSynchronizer::new(),
            telemetry: TelemetryPoller::new(),
            history: Vec::new(),
            stats: None,
            presets: Vec::new(),
            preset: String::new(),
            format: "mp4".to_string(),
            tree_sort: prefs.sort_spec(Table::Tree.as_str()),
            queue_sort: prefs.sort_spec(Table::Queue.as_str()),
            history_sort: prefs.sort_spec(Table::History.as_str()),
            bus: NotificationBus::new(),
            prefs,
            loading: true,
            files_seq: None,
            presets_seq: None,
            history_seq: None,
            stats_seq: None,
        }
    }

    pub fn update(&mut self, event: Event) -> Option<Command> {
        match event {
            Event::FilesLoaded(seq, Ok(entries)) => {
                if !advance(&mut self.files_seq, seq) {
                    debug!(seq, "discarding stale files response");
                    return None;
                }
                self.entries = entries;
                self.selection.prune(&self.entries);
                self.loading = false;
                None
            }
            Event::FilesLoaded(_, Err(e)) => {
                warn!("files load failed: {e}");
                self.loading = false;
                self.bus.post("Failed to load files", Severity::Error);
                None
            }

            Event::PresetsLoaded(seq, Ok(presets)) => {
                if !advance(&mut self.presets_seq, seq) {
                    debug!(seq, "discarding stale presets response");
                    return None;
                }
                // Keep the chosen preset only while the server still has it.
                if !self.preset.is_empty() && !presets.contains(&self.preset) {
                    self.preset.clear();
                }
                self.presets = presets;
                None
            }
            Event::PresetsLoaded(_, Err(e)) => {
                warn!("presets load failed: {e}");
                self.bus.post("Failed to load presets", Severity::Error);
                None
            }

            Event::HistoryLoaded(seq, Ok(history)) => {
                if advance(&mut self.history_seq, seq) {
                    self.history = history;
                }
                None
            }
            Event::HistoryLoaded(_, Err(e)) => {
                warn!("history load failed: {e}");
                None
            }

            Event::QueuePolled(seq, Ok(snapshot)) => {
                self.queue.apply(seq, snapshot, &mut self.bus);
                None
            }
            Event::QueuePolled(_, Err(e)) => {
                // Transport failure: the poller retries on its next tick.
                warn!("queue poll failed: {e}");
                None
            }

            Event::TelemetryPolled(seq, Ok(snapshot)) => {
                let _: TelemetryDelta = self.telemetry.apply(seq, snapshot);
                None
            }
            Event::TelemetryPolled(_, Err(e)) => {
                warn!("telemetry poll failed: {e}");
                None
            }

            Event::StatsPolled(seq, Ok(stats)) => {
                if advance(&mut self.stats_seq, seq) {
                    self.stats = Some(stats);
                }
                None
            }
            Event::StatsPolled(_, Err(e)) => {
                warn!("stats poll failed: {e}");
                None
            }

            Event::PresetUploaded(Ok(filename)) => {
                self.bus
                    .post(format!("Preset uploaded: {filename}"), Severity::Success);
                Some(Command::RefreshPresets)
            }
            Event::PresetUploaded(Err(e)) => {
                self.bus.post(e, Severity::Error);
                None
            }

            Event::NotifyTick => {
                self.bus.tick();
                None
            }
        }
    }

    // ── Media browser ──

    /// Manual refresh of the media listing. The fresh tree arrives as a
    /// later-sequenced `FilesLoaded`, pruning any vanished selections.
    pub fn refresh_files(&mut self) -> Command {
        self.loading = true;
        Command::RefreshFiles
    }

    /// flatten → sort → rebuild → flatten-visible: the rows the render
    /// layer draws, with sibling order sorted and collapse state honored.
    pub fn visible_rows(&self) -> Vec<FlatEntry> {
        let flat = flatten(&self.entries, &self.expanded, true);
        let sorted = sort_entries(flat, self.tree_sort);
        let tree = rebuild_hierarchy(&sorted);
        flatten(&tree, &self.expanded, false)
    }

    pub fn toggle_expanded(&mut self, path: &str) {
        if !self.expanded.remove(path) {
            self.expanded.insert(path.to_string());
        }
        if let Err(e) = self.prefs.set_expanded_paths(&self.expanded) {
            warn!("failed to persist expansion state: {e}");
        }
    }

    /// Clicking a column header: same field flips the direction, a new
    /// field starts ascending. The choice persists across reloads.
    pub fn toggle_sort(&mut self, table: Table, field: SortField) {
        let spec = match table {
            Table::Tree => &mut self.tree_sort,
            Table::Queue => &mut self.queue_sort,
            Table::History => &mut self.history_sort,
        };
        if spec.field == field {
            spec.direction = spec.direction.toggled();
        } else {
            *spec = SortSpec::new(field, Default::default());
        }
        let spec = *spec;
        if let Err(e) = self.prefs.set_sort_spec(table.as_str(), spec) {
            warn!("failed to persist sort spec: {e}");
        }
    }

    // ── Derived tables ──

    /// Queue rows in display order. The server owns the true queue order;
    /// this sort is a pure presentation preference.
    pub fn queue_rows(&self) -> Vec<Job> {
        let mut rows = self.queue.snapshot().queue.clone();
        rows.sort_by(|a, b| {
            let ord = match self.queue_sort.field {
                SortField::Name => a.filename.to_lowercase().cmp(&b.filename.to_lowercase()),
                SortField::Size => a.input_size.cmp(&b.input_size),
                // Job ids are creation-ordered, standing in for a date.
                SortField::Date => a.id.cmp(&b.id),
                SortField::Type => a.format.cmp(&b.format),
            };
            match self.queue_sort.direction {
                crate::core::tree::SortDirection::Asc => ord,
                crate::core::tree::SortDirection::Desc => ord.reverse(),
            }
        });
        rows
    }

    /// History rows in display order. The default (date descending) matches
    /// the newest-first rendering of the original dashboard.
    pub fn history_rows(&self) -> Vec<HistoryRecord> {
        let mut rows = self.history.clone();
        rows.sort_by(|a, b| {
            let ord = match self.history_sort.field {
                SortField::Name => a.filename.to_lowercase().cmp(&b.filename.to_lowercase()),
                SortField::Size => a.input_size.cmp(&b.input_size),
                SortField::Date => a.started_at().cmp(&b.started_at()),
                SortField::Type => a.preset.cmp(&b.preset),
            };
            match self.history_sort.direction {
                crate::core::tree::SortDirection::Asc => ord,
                crate::core::tree::SortDirection::Desc => ord.reverse(),
            }
        });
        rows
    }
}

/// Advance a per-stream sequence guard; false means the response is stale.
fn advance(last: &mut Option<u64>, seq: u64) -> bool {
    if last.is_some_and(|l| seq <= l) {
        return false;
    }
    *last = Some(seq);
    true
}
