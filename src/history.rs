//! Local log of committed work, grouped and summarized by date.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Date format of stored entries, e.g. "02 Jan 2024"
pub const DATE_FORMAT: &str = "%d %b %Y";

/// Month-label format, e.g. "Jan 2024"
pub const MONTH_FORMAT: &str = "%b %Y";

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("commit message cannot be empty")]
    EmptyMessage,

    #[error("failed to read history file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse history file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write history file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create history directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("history has not been loaded")]
    NotLoaded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: String,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkHistory {
    #[serde(default)]
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total_commits: usize,
    pub monthly_breakdown: BTreeMap<String, usize>,
    pub most_active_month: String,
}

/// Where the history lives between runs
pub trait HistoryStorage {
    fn load(&self) -> Result<WorkHistory, HistoryError>;
    fn save(&self, history: &WorkHistory) -> Result<(), HistoryError>;
}

/// History persisted as pretty-printed JSON
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HistoryStorage for JsonFileStorage {
    fn load(&self) -> Result<WorkHistory, HistoryError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no history file, starting empty");
            return Ok(WorkHistory::default());
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|source| HistoryError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| HistoryError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, history: &WorkHistory) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| HistoryError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let contents = serde_json::to_string_pretty(history)?;
        std::fs::write(&self.path, contents).map_err(|source| HistoryError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Month label of a stored date: "02 Jan 2024" becomes "Jan 2024"
pub fn extract_month_year(date: &str) -> String {
    if let Ok(parsed) = NaiveDate::parse_from_str(date, DATE_FORMAT) {
        return parsed.format(MONTH_FORMAT).to_string();
    }

    let parts: Vec<&str> = date.split_whitespace().collect();
    if parts.len() >= 3 {
        format!("{} {}", parts[1], parts[2])
    } else {
        date.to_string()
    }
}

/// Cut `summary` to `max_chars` characters, marking the cut with "..."
pub fn truncate_summary(summary: &str, max_chars: usize) -> String {
    if summary.chars().count() <= max_chars {
        return summary.to_string();
    }
    let kept: String = summary.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

fn parse_month(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("01 {label}"), DATE_FORMAT).ok()
}

/// Parsed keys first in date order, then the rest lexicographically
fn chronological(a: &str, b: &str, parse: fn(&str) -> Option<NaiveDate>) -> Ordering {
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Group entries by `key`, keeping insertion order inside each group
fn group_by(
    entries: &[HistoryEntry],
    key: impl Fn(&HistoryEntry) -> String,
    parse: fn(&str) -> Option<NaiveDate>,
) -> Vec<(String, Vec<HistoryEntry>)> {
    let mut groups: BTreeMap<String, Vec<HistoryEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(key(entry)).or_default().push(entry.clone());
    }

    let mut groups: Vec<_> = groups.into_iter().collect();
    groups.sort_by(|(a, _), (b, _)| chronological(a, b, parse));
    groups
}

/// Order month labels by date, unparsable labels last
pub fn compare_month_labels(a: &str, b: &str) -> Ordering {
    chronological(a, b, parse_month)
}

pub fn group_by_date(entries: &[HistoryEntry]) -> Vec<(String, Vec<HistoryEntry>)> {
    group_by(entries, |e| e.date.clone(), parse_date)
}

pub fn group_by_month(entries: &[HistoryEntry]) -> Vec<(String, Vec<HistoryEntry>)> {
    group_by(entries, |e| extract_month_year(&e.date), parse_month)
}

/// Loads, appends to and summarizes the work history
pub struct HistoryManager<S: HistoryStorage> {
    storage: S,
    history: Option<WorkHistory>,
}

impl<S: HistoryStorage> HistoryManager<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            history: None,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn load(&mut self) -> Result<(), HistoryError> {
        let history = self.storage.load()?;
        debug!(entries = history.entries.len(), "loaded work history");
        self.history = Some(history);
        Ok(())
    }

    pub fn save(&self) -> Result<(), HistoryError> {
        let history = self.history.as_ref().ok_or(HistoryError::NotLoaded)?;
        self.storage.save(history)
    }

    fn loaded(&mut self) -> Result<&mut WorkHistory, HistoryError> {
        if self.history.is_none() {
            self.load()?;
        }
        self.history.as_mut().ok_or(HistoryError::NotLoaded)
    }

    /// Record `message` under today's local date
    pub fn add_entry(&mut self, message: &str) -> Result<(), HistoryError> {
        self.add_entry_on(message, Local::now().date_naive())
    }

    pub fn add_entry_on(&mut self, message: &str, date: NaiveDate) -> Result<(), HistoryError> {
        if message.trim().is_empty() {
            return Err(HistoryError::EmptyMessage);
        }

        self.loaded()?.entries.push(HistoryEntry {
            date: date.format(DATE_FORMAT).to_string(),
            summary: message.to_string(),
        });
        if let Err(e) = self.save() {
            // Keep memory in step with what is on disk
            if let Some(history) = self.history.as_mut() {
                history.entries.pop();
            }
            return Err(e);
        }
        Ok(())
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        self.history
            .as_ref()
            .map(|h| h.entries.as_slice())
            .unwrap_or_default()
    }

    /// Entries whose date contains `month_year`, e.g. "Dec 2024"
    pub fn filter_by_month_year(&self, month_year: &str) -> Vec<HistoryEntry> {
        self.entries()
            .iter()
            .filter(|e| e.date.contains(month_year))
            .cloned()
            .collect()
    }

    pub fn entries_for_date(&self, date: NaiveDate) -> Vec<HistoryEntry> {
        let wanted = date.format(DATE_FORMAT).to_string();
        self.entries()
            .iter()
            .filter(|e| e.date == wanted)
            .cloned()
            .collect()
    }

    /// Entries dated within `start..=end`; unparsable dates are skipped
    pub fn entries_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<HistoryEntry> {
        self.entries()
            .iter()
            .filter(|e| parse_date(&e.date).is_some_and(|d| d >= start && d <= end))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> HistoryStats {
        let entries = self.entries();
        let mut monthly_breakdown: BTreeMap<String, usize> = BTreeMap::new();
        for entry in entries {
            *monthly_breakdown
                .entry(extract_month_year(&entry.date))
                .or_default() += 1;
        }

        let mut most_active_month = String::new();
        let mut max_count = 0;
        for (month, &count) in &monthly_breakdown {
            if count > max_count {
                max_count = count;
                most_active_month = month.clone();
            }
        }

        HistoryStats {
            total_commits: entries.len(),
            monthly_breakdown,
            most_active_month,
        }
    }

    /// Drop every entry and persist the empty history
    pub fn clear(&mut self) -> Result<(), HistoryError> {
        let previous = self.history.replace(WorkHistory::default());
        if let Err(e) = self.save() {
            self.history = previous;
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// In-memory storage counting saves
    #[derive(Default)]
    struct MemoryStorage {
        history: RefCell<WorkHistory>,
        saves: Cell<usize>,
        fail_saves: Cell<bool>,
    }

    impl MemoryStorage {
        fn with(entries: &[(&str, &str)]) -> Self {
            let storage = Self::default();
            storage.history.borrow_mut().entries = entries
                .iter()
                .map(|(date, summary)| HistoryEntry {
                    date: date.to_string(),
                    summary: summary.to_string(),
                })
                .collect();
            storage
        }
    }

    impl HistoryStorage for MemoryStorage {
        fn load(&self) -> Result<WorkHistory, HistoryError> {
            Ok(self.history.borrow().clone())
        }

        fn save(&self, history: &WorkHistory) -> Result<(), HistoryError> {
            if self.fail_saves.get() {
                return Err(HistoryError::Write {
                    path: PathBuf::from("work_history.json"),
                    source: std::io::Error::other("disk full"),
                });
            }
            *self.history.borrow_mut() = history.clone();
            self.saves.set(self.saves.get() + 1);
            Ok(())
        }
    }

    fn loaded(entries: &[(&str, &str)]) -> HistoryManager<MemoryStorage> {
        let mut manager = HistoryManager::new(MemoryStorage::with(entries));
        manager.load().unwrap();
        manager
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const SAMPLE: &[(&str, &str)] = &[
        ("15 Dec 2024", "feat: add login"),
        ("20 Dec 2024", "fix: session timeout"),
        ("03 Jan 2025", "docs: update readme"),
    ];

    #[test]
    fn test_extract_month_year() {
        assert_eq!(extract_month_year("02 Jan 2024"), "Jan 2024");
        assert_eq!(extract_month_year("Mon 13 2024 extra"), "13 2024");
        assert_eq!(extract_month_year("garbage"), "garbage");
    }

    #[test]
    fn test_truncate_summary() {
        assert_eq!(truncate_summary("short", 60), "short");
        let long = "x".repeat(70);
        let cut = truncate_summary(&long, 60);
        assert_eq!(cut.chars().count(), 60);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_summary("ünïcödé text", 8), "ünïcö...");
    }

    #[test]
    fn test_filter_by_month_year() {
        let manager = loaded(&[("15 Dec 2024", "a"), ("03 Jan 2025", "b")]);
        let filtered = manager.filter_by_month_year("Dec 2024");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].summary, "a");
    }

    #[test]
    fn test_stats() {
        let manager = loaded(SAMPLE);
        let stats = manager.stats();
        assert_eq!(stats.total_commits, 3);
        assert_eq!(stats.monthly_breakdown.get("Dec 2024"), Some(&2));
        assert_eq!(stats.monthly_breakdown.get("Jan 2025"), Some(&1));
        assert_eq!(stats.most_active_month, "Dec 2024");
        assert_eq!(manager.stats(), stats);
    }

    #[test]
    fn test_stats_empty() {
        let stats = loaded(&[]).stats();
        assert_eq!(stats.total_commits, 0);
        assert!(stats.monthly_breakdown.is_empty());
        assert_eq!(stats.most_active_month, "");
    }

    #[test]
    fn test_most_active_month_tie_picks_first_label() {
        let manager = loaded(&[("01 Mar 2024", "a"), ("01 Feb 2024", "b")]);
        assert_eq!(manager.stats().most_active_month, "Feb 2024");
    }

    #[test]
    fn test_add_entry_rejects_blank_message() {
        let mut manager = loaded(SAMPLE);
        assert!(matches!(
            manager.add_entry("   "),
            Err(HistoryError::EmptyMessage)
        ));
        assert_eq!(manager.entries().len(), 3);
        assert_eq!(manager.storage().saves.get(), 0);
    }

    #[test]
    fn test_add_entry_loads_and_persists() {
        let mut manager = HistoryManager::new(MemoryStorage::with(SAMPLE));
        manager
            .add_entry_on("feat: export csv", date(2025, 1, 4))
            .unwrap();
        assert_eq!(manager.entries().len(), 4);
        assert_eq!(manager.storage().saves.get(), 1);
        let stored = manager.storage().history.borrow();
        assert_eq!(stored.entries[3].date, "04 Jan 2025");
        assert_eq!(stored.entries[3].summary, "feat: export csv");
    }

    #[test]
    fn test_failed_save_leaves_entries_unchanged() {
        let mut manager = loaded(SAMPLE);
        manager.storage().fail_saves.set(true);
        assert!(matches!(
            manager.add_entry_on("feat: lost", date(2025, 1, 5)),
            Err(HistoryError::Write { .. })
        ));
        assert_eq!(manager.entries().len(), 3);
        assert!(manager.entries().iter().all(|e| e.summary != "feat: lost"));

        assert!(manager.clear().is_err());
        assert_eq!(manager.entries().len(), 3);

        manager.storage().fail_saves.set(false);
        manager
            .add_entry_on("feat: kept", date(2025, 1, 6))
            .unwrap();
        assert_eq!(manager.storage().history.borrow().entries.len(), 4);
    }

    #[test]
    fn test_add_entry_uses_today() {
        let mut manager = loaded(&[]);
        manager.add_entry("chore: tidy").unwrap();
        let today = Local::now().date_naive().format(DATE_FORMAT).to_string();
        assert_eq!(manager.entries()[0].date, today);
    }

    #[test]
    fn test_save_before_load_fails() {
        let manager = HistoryManager::new(MemoryStorage::default());
        assert!(matches!(manager.save(), Err(HistoryError::NotLoaded)));
    }

    #[test]
    fn test_group_by_date_is_chronological() {
        let manager = loaded(&[
            ("03 Jan 2025", "c"),
            ("15 Dec 2024", "a"),
            ("not a date", "x"),
            ("15 Dec 2024", "b"),
        ]);
        let groups = group_by_date(manager.entries());
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["15 Dec 2024", "03 Jan 2025", "not a date"]);
        let summaries: Vec<&str> = groups[0].1.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(summaries, vec!["a", "b"]);
    }

    #[test]
    fn test_group_by_month_is_chronological() {
        let manager = loaded(&[
            ("01 Feb 2025", "c"),
            ("15 Dec 2024", "a"),
            ("03 Jan 2025", "b"),
        ]);
        let keys: Vec<String> = group_by_month(manager.entries())
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["Dec 2024", "Jan 2025", "Feb 2025"]);
    }

    #[test]
    fn test_entries_for_date_and_range() {
        let manager = loaded(&[
            ("15 Dec 2024", "a"),
            ("bad date", "x"),
            ("20 Dec 2024", "b"),
            ("03 Jan 2025", "c"),
        ]);
        assert_eq!(manager.entries_for_date(date(2024, 12, 20)).len(), 1);

        let range = manager.entries_in_range(date(2024, 12, 15), date(2024, 12, 31));
        let summaries: Vec<&str> = range.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(summaries, vec!["a", "b"]);
    }

    #[test]
    fn test_clear() {
        let mut manager = loaded(SAMPLE);
        manager.clear().unwrap();
        assert!(manager.entries().is_empty());
        assert!(manager.storage().history.borrow().entries.is_empty());
    }

    #[test]
    fn test_json_storage_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("none.json"));
        assert_eq!(storage.load().unwrap(), WorkHistory::default());
    }

    #[test]
    fn test_json_storage_creates_parent_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".git").join("work_history.json");
        let mut manager = HistoryManager::new(JsonFileStorage::new(&path));
        manager.load().unwrap();
        manager
            .add_entry_on("feat: first", date(2024, 1, 2))
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"entries\": ["));
        assert!(raw.contains("\"date\": \"02 Jan 2024\""));

        let mut reloaded = HistoryManager::new(JsonFileStorage::new(&path));
        reloaded.load().unwrap();
        reloaded.save().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);
    }

    #[test]
    fn test_json_storage_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();
        let storage = JsonFileStorage::new(&path);
        assert!(matches!(storage.load(), Err(HistoryError::Parse { .. })));
    }
}
