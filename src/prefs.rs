use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::core::tree::SortSpec;

pub type PrefConn = Arc<Mutex<Connection>>;

/// Keep restored widgets at least this far inside the viewport edge.
const VIEWPORT_MARGIN: i64 = 24;

/// Get the preference database path.
/// Uses ENCODECK_DATA_DIR env var, or falls back to ./data/
pub fn data_path() -> PathBuf {
    if let Ok(dir) = std::env::var("ENCODECK_DATA_DIR") {
        PathBuf::from(dir).join("encodeck.db")
    } else {
        PathBuf::from("data").join("encodeck.db")
    }
}

/// Floating-indicator presentation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorPrefs {
    pub collapsed: bool,
    pub x: i64,
    pub y: i64,
}

/// Clamp a restored position into the viewport so a widget saved on a
/// larger screen cannot come back off-screen.
pub fn clamp_position(x: i64, y: i64, viewport_w: i64, viewport_h: i64) -> (i64, i64) {
    (
        x.clamp(0, (viewport_w - VIEWPORT_MARGIN).max(0)),
        y.clamp(0, (viewport_h - VIEWPORT_MARGIN).max(0)),
    )
}

/// Durable store for presentation state the server does not own: sort
/// specs, the folder-expansion set, and the floating indicator.
pub struct PreferenceStore {
    conn: PrefConn,
}

/// Open (or create) the store and run initialization.
pub fn open_store(path: &Path) -> Result<PreferenceStore, rusqlite::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    initialize(&conn)?;

    info!("Preference store opened at {}", path.display());
    Ok(PreferenceStore {
        conn: Arc::new(Mutex::new(conn)),
    })
}

fn initialize(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS settings (
            key             TEXT PRIMARY KEY,
            value           TEXT NOT NULL
        );",
    )?;

    let defaults = [
        ("sort.tree", "name:asc"),
        ("sort.queue", "name:asc"),
        ("sort.history", "date:desc"),
        ("expanded_paths", "[]"),
        ("indicator.collapsed", "false"),
        ("indicator.x", "24"),
        ("indicator.y", "24"),
    ];

    let mut stmt = conn.prepare("INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)")?;
    for (key, value) in &defaults {
        stmt.execute(params![key, value])?;
    }

    Ok(())
}

impl PreferenceStore {
    /// Volatile store, for sessions where nothing should be persisted.
    pub fn in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        initialize(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn get(&self, key: &str) -> rusqlite::Result<Option<String>> {
        let db = self.conn.lock().unwrap();
        let mut stmt = db.prepare("SELECT value FROM settings WHERE key = ?1")?;
        let mut rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
        rows.next().transpose()
    }

    pub fn set(&self, key: &str, value: &str) -> rusqlite::Result<()> {
        let db = self.conn.lock().unwrap();
        db.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    // ── Sort specs ──

    pub fn sort_spec(&self, table: &str) -> SortSpec {
        self.get(&format!("sort.{table}"))
            .ok()
            .flatten()
            .map(|v| SortSpec::parse(&v))
            .unwrap_or_default()
    }

    pub fn set_sort_spec(&self, table: &str, spec: SortSpec) -> rusqlite::Result<()> {
        self.set(&format!("sort.{table}"), &spec.to_string())
    }

    // ── Folder expansion ──

    pub fn expanded_paths(&self) -> HashSet<String> {
        self.get("expanded_paths")
            .ok()
            .flatten()
            .and_then(|v| serde_json::from_str(&v).ok())
            .unwrap_or_default()
    }

    pub fn set_expanded_paths(&self, expanded: &HashSet<String>) -> rusqlite::Result<()> {
        // Stable order keeps the stored value diff-friendly.
        let mut paths: Vec<&str> = expanded.iter().map(String::as_str).collect();
        paths.sort_unstable();
        let value = serde_json::to_string(&paths).unwrap_or_else(|_| "[]".to_string());
        self.set("expanded_paths", &value)
    }

    // ── Floating indicator ──

    pub fn set_indicator(&self, prefs: IndicatorPrefs) -> rusqlite::Result<()> {
        let db = self.conn.lock().unwrap();
        let mut stmt = db.prepare(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
        )?;
        let collapsed = if prefs.collapsed { "true" } else { "false" };
        for (key, value) in [
            ("indicator.collapsed", collapsed.to_string()),
            ("indicator.x", prefs.x.to_string()),
            ("indicator.y", prefs.y.to_string()),
        ] {
            stmt.execute(params![key, value])?;
        }
        Ok(())
    }

    /// Restore the indicator, clamped to the current viewport.
    pub fn indicator(&self, viewport_w: i64, viewport_h: i64) -> IndicatorPrefs {
        let get_i64 = |key: &str| {
            self.get(key)
                .ok()
                .flatten()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(VIEWPORT_MARGIN)
        };
        let collapsed = self
            .get("indicator.collapsed")
            .ok()
            .flatten()
            .is_some_and(|v| v == "true");
        let (x, y) = clamp_position(
            get_i64("indicator.x"),
            get_i64("indicator.y"),
            viewport_w,
            viewport_h,
        );
        IndicatorPrefs { collapsed, x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::{SortDirection, SortField};

    fn store() -> PreferenceStore {
        PreferenceStore::in_memory().unwrap()
    }

    #[test]
    fn test_defaults_present_after_init() {
        let store = store();
        assert_eq!(store.sort_spec("tree"), SortSpec::parse("name:asc"));
        assert_eq!(store.sort_spec("history"), SortSpec::parse("date:desc"));
        assert!(store.expanded_paths().is_empty());
    }

    #[test]
    fn test_sort_spec_round_trip() {
        let store = store();
        let spec = SortSpec::new(SortField::Size, SortDirection::Desc);
        store.set_sort_spec("tree", spec).unwrap();
        assert_eq!(store.sort_spec("tree"), spec);
        // Unknown table falls back to defaults rather than erroring.
        assert_eq!(store.sort_spec("mystery"), SortSpec::default());
    }

    #[test]
    fn test_expanded_paths_round_trip() {
        let store = store();
        let expanded: HashSet<String> =
            ["shows".to_string(), "shows/specials".to_string()].into();
        store.set_expanded_paths(&expanded).unwrap();
        assert_eq!(store.expanded_paths(), expanded);
    }

    #[test]
    fn test_indicator_clamped_to_viewport() {
        let store = store();
        store
            .set_indicator(IndicatorPrefs {
                collapsed: true,
                x: 2400,
                y: -50,
            })
            .unwrap();

        // Restored on a 1280x800 viewport: pulled back inside.
        let restored = store.indicator(1280, 800);
        assert!(restored.collapsed);
        assert_eq!(restored.x, 1280 - VIEWPORT_MARGIN);
        assert_eq!(restored.y, 0);

        // In-bounds positions come back untouched.
        store
            .set_indicator(IndicatorPrefs {
                collapsed: false,
                x: 100,
                y: 200,
            })
            .unwrap();
        assert_eq!(
            store.indicator(1280, 800),
            IndicatorPrefs {
                collapsed: false,
                x: 100,
                y: 200
            }
        );
    }
}
