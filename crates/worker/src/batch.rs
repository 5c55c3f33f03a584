//! The batch accumulator threaded through the pipeline stages.
//!
//! A `Batch` is created empty at the start of each cycle and never reused.
//! Restore and compose fill it; sealing moves every unwrapped entry into
//! the wrapped map under one shared root; submit and save consume it.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde_json::Value;

/// One candidate document with its raw size in bytes.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub body: Value,
    pub size: u64,
}

/// The completion thresholds from configuration.
#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    pub max_size_bytes: u64,
    pub max_time: Duration,
}

/// Accumulator for one cycle's documents.
///
/// Invariants: a key lives in at most one of the two maps; either every
/// wrapped entry shares `merkle_root` or the wrapped map predates sealing
/// (revoke path, roots sealed elsewhere).
#[derive(Debug)]
pub struct Batch {
    unwrapped: BTreeMap<String, BatchEntry>,
    wrapped: BTreeMap<String, BatchEntry>,
    /// Set once by sealing; shared by every document in the batch.
    pub merkle_root: Option<String>,
    composition_start: Instant,
    /// True iff at least one document was recovered from backup.
    pub restored: bool,
    /// True iff a completion threshold has been reached.
    pub composed: bool,
}

impl Batch {
    pub fn new() -> Self {
        Self {
            unwrapped: BTreeMap::new(),
            wrapped: BTreeMap::new(),
            merkle_root: None,
            composition_start: Instant::now(),
            restored: false,
            composed: false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.unwrapped.contains_key(key) || self.wrapped.contains_key(key)
    }

    /// Insert a pre-seal candidate (issue path). Displaces any wrapped
    /// entry under the same key.
    pub fn insert_unwrapped(&mut self, key: String, entry: BatchEntry) {
        self.wrapped.remove(&key);
        self.unwrapped.insert(key, entry);
    }

    /// Insert an already-wrapped candidate (revoke path).
    pub fn insert_wrapped(&mut self, key: String, entry: BatchEntry) {
        self.unwrapped.remove(&key);
        self.wrapped.insert(key, entry);
    }

    pub fn unwrapped(&self) -> &BTreeMap<String, BatchEntry> {
        &self.unwrapped
    }

    pub fn wrapped(&self) -> &BTreeMap<String, BatchEntry> {
        &self.wrapped
    }

    /// Drain the unwrapped map for sealing, preserving key order.
    pub fn take_unwrapped(&mut self) -> BTreeMap<String, BatchEntry> {
        std::mem::take(&mut self.unwrapped)
    }

    /// Install the sealed documents and the shared root, clearing any
    /// stale wrapped contents.
    pub fn set_sealed(&mut self, wrapped: BTreeMap<String, BatchEntry>, merkle_root: String) {
        self.wrapped = wrapped;
        self.merkle_root = Some(merkle_root);
    }

    pub fn candidate_count(&self) -> usize {
        self.unwrapped.len() + self.wrapped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unwrapped.is_empty() && self.wrapped.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.unwrapped
            .values()
            .chain(self.wrapped.values())
            .map(|e| e.size)
            .sum()
    }

    /// Re-evaluate the completion predicate: size threshold OR time
    /// threshold. Called after every insertion and at the top of the
    /// compose loop; downstream stages must not care which one fired.
    pub fn update_composed(&mut self, limits: &BatchLimits) -> bool {
        self.composed = self.total_size() >= limits.max_size_bytes
            || self.composition_start.elapsed() >= limits.max_time;
        self.composed
    }
}

impl Default for Batch {
    fn default() -> Self {
        Self::new()
    }
}
