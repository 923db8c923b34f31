use std::collections::HashSet;

use crate::core::tree::{flatten, FlatEntry, MediaEntry};

/// Set of selected file paths. Directories are never members, and selection
/// is independent of folder expand/collapse state: select-all and prune
/// operate over the fully expanded flatten of the tree.
#[derive(Debug, Default)]
pub struct SelectionStore {
    selected: HashSet<String>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle one entry. Directory rows are rejected; returns whether the
    /// toggle was accepted.
    pub fn toggle(&mut self, entry: &FlatEntry, selected: bool) -> bool {
        if !entry.is_file() {
            return false;
        }
        if selected {
            self.selected.insert(entry.path.clone());
        } else {
            self.selected.remove(&entry.path);
        }
        true
    }

    /// Select every file leaf in the tree, collapsed folders included.
    pub fn select_all(&mut self, tree: &[MediaEntry]) {
        for entry in flatten(tree, &HashSet::new(), true) {
            if entry.is_file() {
                self.selected.insert(entry.path);
            }
        }
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.selected.contains(path)
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    /// Drop selections whose path no longer exists in a freshly fetched
    /// tree, keeping `count() ≤ file leaves` across refreshes.
    pub fn prune(&mut self, tree: &[MediaEntry]) {
        let live: HashSet<String> = flatten(tree, &HashSet::new(), true)
            .into_iter()
            .filter(|e| e.is_file())
            .map(|e| e.path)
            .collect();
        self.selected.retain(|path| live.contains(path));
    }
}

/// Aggregated result of a bulk submission: each add request is independent,
/// so partial failure is reported, never treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkOutcome {
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Result<(), String>>,
    {
        let mut outcome = Self::default();
        for result in results {
            match result {
                Ok(()) => outcome.succeeded += 1,
                Err(_) => outcome.failed += 1,
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::EntryKind;

    fn file(path: &str) -> MediaEntry {
        MediaEntry {
            name: path.rsplit('/').next().unwrap().to_string(),
            kind: EntryKind::File,
            path: path.to_string(),
            size: 1,
            size_display: "1 MB".to_string(),
            modified: None,
            extension: "mkv".to_string(),
            children: Vec::new(),
        }
    }

    fn dir(path: &str, children: Vec<MediaEntry>) -> MediaEntry {
        MediaEntry {
            name: path.rsplit('/').next().unwrap().to_string(),
            kind: EntryKind::Directory,
            path: path.to_string(),
            size: 0,
            size_display: "-".to_string(),
            modified: None,
            extension: "folder".to_string(),
            children,
        }
    }

    fn flat(entry: &MediaEntry) -> FlatEntry {
        flatten(std::slice::from_ref(entry), &HashSet::new(), true)
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn test_directories_are_rejected() {
        let mut store = SelectionStore::new();
        let folder = dir("season1", vec![file("season1/a.mkv")]);
        assert!(!store.toggle(&flat(&folder), true));
        assert_eq!(store.count(), 0);

        assert!(store.toggle(&flat(&file("b.mkv")), true));
        assert_eq!(store.count(), 1);
        assert!(store.is_selected("b.mkv"));
    }

    #[test]
    fn test_select_all_ignores_collapse_state() {
        // Same tree, nothing expanded: select-all still reaches every leaf.
        let tree = vec![
            dir(
                "shows",
                vec![file("shows/a.mkv"), dir("shows/s2", vec![file("shows/s2/b.mkv")])],
            ),
            file("c.mkv"),
        ];
        let mut store = SelectionStore::new();
        store.select_all(&tree);
        assert_eq!(store.count(), 3);
        assert!(!store.is_selected("shows")); // never a directory

        store.deselect_all();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_prune_drops_vanished_paths() {
        let before = vec![file("a.mkv"), file("b.mkv")];
        let mut store = SelectionStore::new();
        store.select_all(&before);
        assert_eq!(store.count(), 2);

        let after = vec![file("a.mkv")];
        store.prune(&after);
        assert_eq!(store.count(), 1);
        assert!(store.is_selected("a.mkv"));
        assert!(!store.is_selected("b.mkv"));
    }

    #[test]
    fn test_bulk_outcome_counts_partial_failure() {
        let outcome = BulkOutcome::from_results([
            Ok(()),
            Err("File already in queue".to_string()),
            Ok(()),
        ]);
        assert_eq!(outcome, BulkOutcome { succeeded: 2, failed: 1 });
    }
}
