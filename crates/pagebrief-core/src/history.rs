use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One past summarization request, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Position from the newest record; the newest has id 1. Ids are
    /// renumbered after every mutation.
    pub id: u64,
    pub url: String,
    pub summary: Option<String>,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Length of the extracted text sent to the backends
    pub char_count: usize,
    /// Sentences in the generated summary
    pub sentence_count: usize,
}

/// Outcome of a summarize call, before it is numbered and timestamped.
#[derive(Debug, Clone)]
pub struct NewHistoryRecord {
    pub url: String,
    pub summary: Option<String>,
    pub error: Option<String>,
    pub char_count: usize,
}

/// Aggregate statistics over the retained history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Totals and averages over successful records only
    pub total_char_count: usize,
    pub total_sentence_count: usize,
    pub avg_char_count: f64,
    pub avg_sentence_count: f64,
}

fn count_sentences(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|part| !part.trim().is_empty())
        .count()
}

/// Bounded, ordered log of past requests, persisted as a JSON file. Records
/// are kept newest first and truncated to `max_entries` on insertion. A
/// missing or corrupt file degrades to an empty history.
pub struct HistoryStore {
    path: PathBuf,
    max_entries: usize,
    records: Mutex<Vec<HistoryRecord>>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        let path = path.into();
        let records = Self::load(&path);

        Self {
            path,
            max_entries,
            records: Mutex::new(records),
        }
    }

    fn load(path: &Path) -> Vec<HistoryRecord> {
        if !path.exists() {
            return Vec::new();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!("Corrupt history file {}: {}; starting empty", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!("Cannot read history file {}: {}; starting empty", path.display(), e);
                Vec::new()
            }
        }
    }

    fn persist(&self, records: &[HistoryRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    fn renumber(records: &mut [HistoryRecord]) {
        for (index, record) in records.iter_mut().enumerate() {
            record.id = index as u64 + 1;
        }
    }

    /// Insert a record at the front, truncating the log to its bound.
    pub fn add(&self, new: NewHistoryRecord) -> Result<HistoryRecord> {
        let mut records = self.records.lock().expect("history lock poisoned");

        let record = HistoryRecord {
            id: 1,
            success: new.error.is_none(),
            sentence_count: new.summary.as_deref().map(count_sentences).unwrap_or(0),
            url: new.url,
            summary: new.summary,
            error: new.error,
            timestamp: Utc::now(),
            char_count: new.char_count,
        };

        records.insert(0, record.clone());
        records.truncate(self.max_entries);
        Self::renumber(&mut records);

        self.persist(&records)?;
        Ok(record)
    }

    /// List records newest first, optionally limited.
    pub fn list(&self, limit: Option<usize>) -> Vec<HistoryRecord> {
        let records = self.records.lock().expect("history lock poisoned");
        let take = limit.unwrap_or(records.len());
        records.iter().take(take).cloned().collect()
    }

    pub fn get(&self, id: u64) -> Result<HistoryRecord> {
        let records = self.records.lock().expect("history lock poisoned");
        records
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or(Error::RecordNotFound(id))
    }

    /// Delete the record with the given id; remaining ids are renumbered.
    pub fn delete(&self, id: u64) -> Result<()> {
        let mut records = self.records.lock().expect("history lock poisoned");

        let position = records
            .iter()
            .position(|record| record.id == id)
            .ok_or(Error::RecordNotFound(id))?;

        records.remove(position);
        Self::renumber(&mut records);
        self.persist(&records)
    }

    pub fn clear(&self) -> Result<()> {
        let mut records = self.records.lock().expect("history lock poisoned");
        records.clear();
        self.persist(&records)
    }

    pub fn stats(&self) -> HistoryStats {
        let records = self.records.lock().expect("history lock poisoned");

        let succeeded: Vec<_> = records.iter().filter(|r| r.success).collect();
        let total_char_count: usize = succeeded.iter().map(|r| r.char_count).sum();
        let total_sentence_count: usize = succeeded.iter().map(|r| r.sentence_count).sum();

        let (avg_char_count, avg_sentence_count) = if succeeded.is_empty() {
            (0.0, 0.0)
        } else {
            (
                total_char_count as f64 / succeeded.len() as f64,
                total_sentence_count as f64 / succeeded.len() as f64,
            )
        };

        HistoryStats {
            total: records.len(),
            succeeded: succeeded.len(),
            failed: records.len() - succeeded.len(),
            total_char_count,
            total_sentence_count,
            avg_char_count,
            avg_sentence_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir, max_entries: usize) -> HistoryStore {
        HistoryStore::new(dir.path().join("history.json"), max_entries)
    }

    fn success(url: &str, summary: &str, char_count: usize) -> NewHistoryRecord {
        NewHistoryRecord {
            url: url.to_string(),
            summary: Some(summary.to_string()),
            error: None,
            char_count,
        }
    }

    fn failure(url: &str, error: &str) -> NewHistoryRecord {
        NewHistoryRecord {
            url: url.to_string(),
            summary: None,
            error: Some(error.to_string()),
            char_count: 0,
        }
    }

    #[test]
    fn test_add_assigns_newest_first_ids() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 10);

        store.add(success("https://a.example", "One. Two.", 100)).unwrap();
        store.add(success("https://b.example", "Three.", 200)).unwrap();

        let records = store.list(None);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].url, "https://b.example");
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].url, "https://a.example");
    }

    #[test]
    fn test_bound_truncates_oldest() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 2);

        store.add(success("https://a.example", "A.", 1)).unwrap();
        store.add(success("https://b.example", "B.", 2)).unwrap();
        store.add(success("https://c.example", "C.", 3)).unwrap();

        let records = store.list(None);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].url, "https://c.example");
        assert_eq!(records[1].url, "https://b.example");
    }

    #[test]
    fn test_list_limit() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 10);

        for i in 0..5 {
            store.add(success(&format!("https://example.com/{i}"), "S.", 10)).unwrap();
        }

        assert_eq!(store.list(Some(3)).len(), 3);
        assert_eq!(store.list(None).len(), 5);
    }

    #[test]
    fn test_get_and_delete_renumbers() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 10);

        store.add(success("https://a.example", "A.", 1)).unwrap();
        store.add(success("https://b.example", "B.", 2)).unwrap();
        store.add(success("https://c.example", "C.", 3)).unwrap();

        assert_eq!(store.get(2).unwrap().url, "https://b.example");

        store.delete(2).unwrap();
        let records = store.list(None);
        assert_eq!(records.len(), 2);
        // Ids closed the gap
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].url, "https://c.example");
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].url, "https://a.example");

        assert!(matches!(store.get(3), Err(Error::RecordNotFound(3))));
    }

    #[test]
    fn test_delete_missing_id() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 10);
        assert!(matches!(store.delete(1), Err(Error::RecordNotFound(1))));
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 10);

        store.add(success("https://a.example", "A.", 1)).unwrap();
        store.clear().unwrap();
        assert!(store.list(None).is_empty());
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let first = HistoryStore::new(&path, 10);
        first.add(success("https://a.example", "One. Two. Three.", 300)).unwrap();

        let second = HistoryStore::new(&path, 10);
        let records = second.list(None);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "https://a.example");
        assert_eq!(records[0].sentence_count, 3);
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = HistoryStore::new(&path, 10);
        assert!(store.list(None).is_empty());

        // The store still works after recovery
        store.add(success("https://a.example", "A.", 1)).unwrap();
        assert_eq!(store.list(None).len(), 1);
    }

    #[test]
    fn test_stats() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 10);

        store.add(success("https://a.example", "One. Two.", 100)).unwrap();
        store.add(success("https://b.example", "One. Two. Three. Four.", 300)).unwrap();
        store.add(failure("https://c.example", "all backends failed")).unwrap();

        let stats = store.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_char_count, 400);
        assert_eq!(stats.total_sentence_count, 6);
        assert_eq!(stats.avg_char_count, 200.0);
        assert_eq!(stats.avg_sentence_count, 3.0);
    }

    #[test]
    fn test_stats_empty_history() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 10);

        let stats = store.stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.avg_char_count, 0.0);
    }

    #[test]
    fn test_count_sentences() {
        assert_eq!(count_sentences("One. Two! Three?"), 3);
        assert_eq!(count_sentences("No terminator"), 1);
        assert_eq!(count_sentences(""), 0);
        assert_eq!(count_sentences("Trailing dots..."), 1);
    }
}
