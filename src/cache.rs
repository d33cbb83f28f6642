//! Summary cache keyed by paper identifier.
//!
//! Entries never expire. The file-backed store rewrites its JSON file after
//! every insert so an interrupted run keeps all summaries generated so far.

use crate::error::Result;
use crate::paper::SummaryEntry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Current cache file layout version
const CACHE_VERSION: u32 = 1;

/// Identifier -> summary mapping used by the pipeline.
pub trait CacheStore: Send {
    fn lookup(&self, id: &str) -> Option<SummaryEntry>;

    fn store(&mut self, entry: SummaryEntry) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// On-disk representation. BTreeMap keeps the file stable between runs.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, SummaryEntry>,
}

/// Cache persisted as a single JSON file.
pub struct JsonFileCache {
    path: PathBuf,
    entries: BTreeMap<String, SummaryEntry>,
}

impl JsonFileCache {
    /// Open the cache at `path`.
    ///
    /// A missing, unreadable or corrupt file yields an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::load(&path);
        Self { path, entries }
    }

    /// Get the cache file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> BTreeMap<String, SummaryEntry> {
        if !path.exists() {
            debug!("Cache file not found: {:?}", path);
            return BTreeMap::new();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<CacheFile>(&content) {
                Ok(file) => {
                    if file.version > CACHE_VERSION {
                        warn!(
                            version = file.version,
                            "Cache file written by a newer version, reading known fields only"
                        );
                    }
                    info!("Loaded {} cached summaries from {:?}", file.entries.len(), path);
                    file.entries
                }
                Err(e) => {
                    warn!("Failed to parse cache file, starting empty: {}", e);
                    BTreeMap::new()
                }
            },
            Err(e) => {
                warn!("Failed to read cache file, starting empty: {}", e);
                BTreeMap::new()
            }
        }
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = CacheFile {
            version: CACHE_VERSION,
            entries: self.entries.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        // Write-then-rename so a crash never leaves a truncated cache behind
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        debug!("Saved {} summaries to {:?}", self.entries.len(), self.path);
        Ok(())
    }
}

impl CacheStore for JsonFileCache {
    fn lookup(&self, id: &str) -> Option<SummaryEntry> {
        self.entries.get(id).cloned()
    }

    fn store(&mut self, entry: SummaryEntry) -> Result<()> {
        self.entries.insert(entry.id.clone(), entry);
        self.save()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// In-memory cache, nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, SummaryEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn lookup(&self, id: &str) -> Option<SummaryEntry> {
        self.entries.get(id).cloned()
    }

    fn store(&mut self, entry: SummaryEntry) -> Result<()> {
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::fixtures::fixed_time;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file_is_empty() {
        let cache = JsonFileCache::open("/nonexistent/path/cache.json");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_store_and_lookup_survives_reopen() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("cache.json");
        let entry = SummaryEntry::new("P3", "A friendly summary.", fixed_time());

        let mut cache = JsonFileCache::open(&path);
        cache.store(entry.clone())?;
        assert_eq!(cache.lookup("P3"), Some(entry.clone()));

        let reopened = JsonFileCache::open(&path);
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.lookup("P3"), Some(entry));
        assert!(!path.with_extension("json.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_corrupt_file_starts_empty_and_recovers() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json")?;

        let mut cache = JsonFileCache::open(&path);
        assert!(cache.is_empty());

        cache.store(SummaryEntry::new("P1", "text", fixed_time()))?;
        assert_eq!(JsonFileCache::open(&path).len(), 1);
        Ok(())
    }

    #[test]
    fn test_reads_unknown_fields() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("cache.json");
        std::fs::write(
            &path,
            r#"{"version": 2, "written_by": "future", "entries": {"P9": {"id": "P9", "text": "hi", "generated_at": "2024-09-10T12:30:00Z", "model": "x"}}}"#,
        )?;

        let cache = JsonFileCache::open(&path);
        assert_eq!(cache.lookup("P9").map(|e| e.text), Some("hi".to_string()));
        Ok(())
    }

    #[test]
    fn test_last_writer_wins() -> Result<()> {
        let mut cache = MemoryCache::new();
        cache.store(SummaryEntry::new("P1", "first", fixed_time()))?;
        cache.store(SummaryEntry::new("P1", "second", fixed_time()))?;
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("P1").map(|e| e.text), Some("second".to_string()));
        Ok(())
    }
}
