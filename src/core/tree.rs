use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

// ── Enums ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    File,
    Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Name,
    Size,
    Date,
    Type,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Size => "size",
            Self::Date => "date",
            Self::Type => "type",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "size" => Self::Size,
            "date" => Self::Date,
            "type" => Self::Type,
            _ => Self::Name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "desc" => Self::Desc,
            _ => Self::Asc,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// One sort setting for an independently sortable table (tree, queue, history).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Parse a persisted "field:direction" value; malformed input falls back to defaults.
    pub fn parse(s: &str) -> Self {
        let (field, direction) = s.split_once(':').unwrap_or((s, "asc"));
        Self {
            field: SortField::from_str(field),
            direction: SortDirection::from_str(direction),
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field.as_str(), self.direction.as_str())
    }
}

// ── Tree nodes ──

/// One node of the server-provided media listing. `path` identifies the node
/// across the whole tree; `children` is render order and is always replaced
/// wholesale on resort, never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, rename = "size_display")]
    pub size_display: String,
    #[serde(default)]
    pub modified: Option<f64>,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub children: Vec<MediaEntry>,
}

/// A tree node annotated with its depth and parent linkage, as produced by
/// [`flatten`] and consumed by [`rebuild_hierarchy`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlatEntry {
    pub name: String,
    pub kind: EntryKind,
    pub path: String,
    pub size: u64,
    pub size_display: String,
    pub modified: Option<f64>,
    pub extension: String,
    pub level: usize,
    pub parent_path: Option<String>,
}

impl FlatEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

// ── Transforms ──

/// Depth-first pre-order flattening. Root-level entries are always emitted;
/// when `include_hidden` is false a directory's descendants are emitted only
/// if its path is in `expanded`.
pub fn flatten(
    entries: &[MediaEntry],
    expanded: &HashSet<String>,
    include_hidden: bool,
) -> Vec<FlatEntry> {
    let mut out = Vec::new();
    flatten_into(entries, expanded, include_hidden, 0, None, &mut out);
    out
}

fn flatten_into(
    entries: &[MediaEntry],
    expanded: &HashSet<String>,
    include_hidden: bool,
    level: usize,
    parent_path: Option<&str>,
    out: &mut Vec<FlatEntry>,
) {
    for entry in entries {
        out.push(FlatEntry {
            name: entry.name.clone(),
            kind: entry.kind,
            path: entry.path.clone(),
            size: entry.size,
            size_display: entry.size_display.clone(),
            modified: entry.modified,
            extension: entry.extension.clone(),
            level,
            parent_path: parent_path.map(str::to_string),
        });

        if entry.kind == EntryKind::Directory
            && (include_hidden || expanded.contains(&entry.path))
        {
            flatten_into(
                &entry.children,
                expanded,
                include_hidden,
                level + 1,
                Some(&entry.path),
                out,
            );
        }
    }
}

/// Stable sort of a flattened sequence. Entries equal under the comparator
/// keep their pre-sort relative order regardless of direction.
pub fn sort_entries(mut flat: Vec<FlatEntry>, spec: SortSpec) -> Vec<FlatEntry> {
    flat.sort_by(|a, b| {
        let ord = match spec.field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Size => a.size.cmp(&b.size),
            SortField::Date => a
                .modified
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&b.modified.unwrap_or(f64::NEG_INFINITY)),
            SortField::Type => a.extension.cmp(&b.extension),
        };
        match spec.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    flat
}

/// Reconstruct parent→children edges from each entry's recorded parent path,
/// preserving input order as sibling order. An entry whose parent does not
/// resolve to any node in the set (including a self-reference) becomes a root.
///
/// For the identity sort this is the exact structural inverse of
/// [`flatten`] with `include_hidden = true`.
pub fn rebuild_hierarchy(sorted: &[FlatEntry]) -> Vec<MediaEntry> {
    let paths: HashSet<&str> = sorted.iter().map(|e| e.path.as_str()).collect();

    let mut roots: Vec<usize> = Vec::new();
    let mut children_of: HashMap<&str, Vec<usize>> = HashMap::new();

    for (i, entry) in sorted.iter().enumerate() {
        match entry
            .parent_path
            .as_deref()
            .filter(|p| *p != entry.path && paths.contains(p))
        {
            Some(parent) => children_of.entry(parent).or_default().push(i),
            None => roots.push(i),
        }
    }

    roots
        .iter()
        .map(|&i| build_node(i, sorted, &children_of))
        .collect()
}

fn build_node(
    index: usize,
    sorted: &[FlatEntry],
    children_of: &HashMap<&str, Vec<usize>>,
) -> MediaEntry {
    let entry = &sorted[index];
    let children = children_of
        .get(entry.path.as_str())
        .map(|ids| {
            ids.iter()
                .map(|&i| build_node(i, sorted, children_of))
                .collect()
        })
        .unwrap_or_default();

    MediaEntry {
        name: entry.name.clone(),
        kind: entry.kind,
        path: entry.path.clone(),
        size: entry.size,
        size_display: entry.size_display.clone(),
        modified: entry.modified,
        extension: entry.extension.clone(),
        children,
    }
}

/// Count file leaves across the whole tree, collapsed folders included.
pub fn file_count(entries: &[MediaEntry]) -> usize {
    flatten(entries, &HashSet::new(), true)
        .iter()
        .filter(|e| e.is_file())
        .count()
}
