//! Translation cache with per-run reference counting
//!
//! The cache maps a source string to its translation and survives between runs as a JSON
//! object. During a run it also counts how often each source string is referenced; at the end
//! of a complete run, entries nobody referenced (strings that disappeared from the game data)
//! are dropped before saving.
//!
//! Workers share one cache. A single mutex guards the key map and the counter; it is never
//! held across an await. Each key owns a once-cell, and the translator runs inside that cell,
//! so concurrent requests for the same string wait for the first one and the backend is called
//! at most once per distinct string. A failed translation leaves the cell empty.

use crate::error::{MtError, MtResult};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::info;

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Arc<OnceCell<String>>>,
    counter: HashMap<String, u64>,
}

/// How a lookup was served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Already translated, in this run or a previous one
    Hit,
    /// Translated by this call
    Miss,
}

/// Shared translation memo plus reference counter
#[derive(Debug, Default)]
pub struct TranslationCache {
    state: Mutex<CacheState>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache pre-filled with translations from a previous run
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(source, translated)| (source, Arc::new(OnceCell::new_with(Some(translated)))))
            .collect();
        Self {
            state: Mutex::new(CacheState {
                entries,
                counter: HashMap::new(),
            }),
        }
    }

    /// Load a cache file; a missing file gives an empty cache
    pub fn load(path: &Path) -> MtResult<Self> {
        if !path.exists() {
            info!("no translate cache at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            MtError::CacheError(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let entries: HashMap<String, String> = serde_json::from_str(&content).map_err(|e| {
            MtError::CacheError(format!("Failed to parse '{}': {}", path.display(), e))
        })?;
        info!(
            "loaded {} cached translations from {}",
            entries.len(),
            path.display()
        );
        Ok(Self::from_entries(entries))
    }

    /// Save the cache as pretty-printed JSON with sorted keys
    ///
    /// The file is written next to its destination and renamed into place, so an interrupted
    /// save never leaves a truncated cache behind.
    pub fn save(&self, path: &Path) -> MtResult<()> {
        let snapshot = self.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| MtError::CacheError(format!("Failed to serialize cache: {}", e)))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| {
            MtError::CacheError(format!("Failed to write '{}': {}", tmp.display(), e))
        })?;
        std::fs::rename(&tmp, path).map_err(|e| {
            MtError::CacheError(format!("Failed to replace '{}': {}", path.display(), e))
        })?;
        info!("saved {} translations to {}", snapshot.len(), path.display());
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one reference to `source` and return the count after incrementing
    pub fn count_reference(&self, source: &str) -> u64 {
        let mut state = self.lock();
        let count = state.counter.entry(source.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// References counted for `source` in this run
    pub fn reference_count(&self, source: &str) -> u64 {
        self.lock().counter.get(source).copied().unwrap_or(0)
    }

    /// The cached translation of `source`, if any
    pub fn get(&self, source: &str) -> Option<String> {
        self.lock()
            .entries
            .get(source)
            .and_then(|cell| cell.get().cloned())
    }

    /// Store a translation, replacing any previous one
    pub fn insert(&self, source: &str, translated: String) {
        self.lock().entries.insert(
            source.to_string(),
            Arc::new(OnceCell::new_with(Some(translated))),
        );
    }

    /// Count a reference to `source` and resolve it, translating on the first request only
    ///
    /// `translate` runs outside the map lock. Concurrent callers asking for the same source
    /// wait for the running translation instead of starting their own. On error nothing is
    /// stored and the error is returned to the caller whose translation failed.
    pub async fn resolve<F, Fut>(&self, source: &str, translate: F) -> MtResult<(String, CacheStatus)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = MtResult<String>>,
    {
        let cell = {
            let mut state = self.lock();
            *state.counter.entry(source.to_string()).or_insert(0) += 1;
            state
                .entries
                .entry(source.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let mut status = CacheStatus::Hit;
        let value = cell
            .get_or_try_init(|| {
                status = CacheStatus::Miss;
                translate()
            })
            .await?;
        Ok((value.clone(), status))
    }

    /// Count a reference to `source` and return its cached value, caching it as its own
    /// translation when there is none
    pub fn keep(&self, source: &str) -> String {
        let mut state = self.lock();
        *state.counter.entry(source.to_string()).or_insert(0) += 1;
        let cell = state
            .entries
            .entry(source.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()));
        if let Some(value) = cell.get() {
            return value.clone();
        }
        *cell = Arc::new(OnceCell::new_with(Some(source.to_string())));
        source.to_string()
    }

    /// Drop entries that were not referenced in this run, and failed ones
    ///
    /// Returns the number of entries removed.
    pub fn prune_unreferenced(&self) -> usize {
        let mut state = self.lock();
        let CacheState { entries, counter } = &mut *state;
        let before = entries.len();
        entries.retain(|source, cell| {
            cell.initialized() && counter.get(source).copied().unwrap_or(0) > 0
        });
        let removed = before - entries.len();
        info!("pruned {} stale cache entries", removed);
        removed
    }

    /// All resolved translations, sorted by source
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock()
            .entries
            .iter()
            .filter_map(|(source, cell)| cell.get().map(|v| (source.clone(), v.clone())))
            .collect()
    }

    /// Number of resolved translations
    pub fn len(&self) -> usize {
        self.lock()
            .entries
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
