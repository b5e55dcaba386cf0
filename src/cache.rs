use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::BuildConfig;
use crate::pipeline::BuildOutcome;
use crate::vfs::Snapshot;

pub const DEFAULT_CAPACITY: usize = 32;

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Arc<BuildOutcome>>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
}

/// Build results keyed by content hash of (snapshot, entry, configuration).
///
/// Concurrent misses for the same key may both build; the second insert is
/// dropped, so readers only ever see one outcome per key.
pub struct PreviewCache {
    capacity: usize,
    state: RwLock<CacheState>,
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PreviewCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn compute_hash(source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn key(snapshot: &Snapshot, entry: Option<&str>, config: &BuildConfig) -> String {
        Self::compute_hash(&format!(
            "{}\0{}\0{}",
            snapshot.content_hash(),
            entry.unwrap_or(""),
            config.fingerprint()
        ))
    }

    pub fn get(&self, key: &str) -> Option<Arc<BuildOutcome>> {
        let state = self.state.read().ok()?;
        let hit = state.entries.get(key).cloned();
        debug!(key, hit = hit.is_some(), "preview cache lookup");
        hit
    }

    /// Stores `outcome` unless the key is already present, evicting the oldest
    /// entry when full. Returns the stored value.
    pub fn insert(&self, key: String, outcome: BuildOutcome) -> Arc<BuildOutcome> {
        let outcome = Arc::new(outcome);
        let Ok(mut state) = self.state.write() else {
            return outcome;
        };
        if let Some(existing) = state.entries.get(&key) {
            return Arc::clone(existing);
        }
        while state.entries.len() >= self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
        }
        state.order.push_back(key.clone());
        state.entries.insert(key, Arc::clone(&outcome));
        outcome
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.write() {
            state.entries.clear();
            state.order.clear();
        }
    }
}
