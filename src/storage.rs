//! Key/set store abstraction backing the driver availability pool.
//!
//! The pool only needs three set operations per key: add a member, remove a member and list the
//! members. Each call is atomic for its one key and one member; nothing is atomic across keys.
//! A networked store (Redis `SADD`/`SREM`/`SMEMBERS` style) fits the same trait.

use crate::error::Result;
use bytes::Bytes;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for key/set store implementations
///
/// All operations are idempotent: adding an existing member or removing a missing one is a
/// no-op, reported through the returned flag rather than as an error.
pub trait SetStore: Send + Sync {
    /// Add `member` to the set at `key`. Returns whether it was newly added.
    fn add(&self, key: &str, member: &[u8]) -> Result<bool>;

    /// Remove `member` from the set at `key`. Returns whether it was present.
    fn remove(&self, key: &str, member: &[u8]) -> Result<bool>;

    /// All members of the set at `key`, in no particular order. Missing keys are empty sets.
    fn members(&self, key: &str) -> Result<Vec<Bytes>>;

    /// Whether `member` is in the set at `key`.
    fn contains(&self, key: &str, member: &[u8]) -> Result<bool> {
        Ok(self.members(key)?.iter().any(|m| m.as_ref() == member))
    }

    /// Keys with at least one member that start with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Get store statistics
    fn stats(&self) -> Result<SetStoreStats>;
}

/// Set store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetStoreStats {
    /// Number of non-empty sets
    pub key_count: usize,
    /// Members across all sets
    pub member_count: usize,
    /// Number of operations performed
    pub operations_count: u64,
}

/// In-memory set store.
///
/// Sets that become empty are dropped, so `keys_with_prefix` only reports occupied keys.
#[derive(Debug, Default)]
pub struct MemorySetStore {
    sets: RwLock<FxHashMap<String, FxHashSet<Bytes>>>,
    operations: AtomicU64,
}

impl MemorySetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_operation(&self) {
        self.operations.fetch_add(1, Ordering::Relaxed);
    }
}

impl SetStore for MemorySetStore {
    fn add(&self, key: &str, member: &[u8]) -> Result<bool> {
        self.record_operation();
        let mut sets = self.sets.write();
        Ok(sets
            .entry(key.to_string())
            .or_default()
            .insert(Bytes::copy_from_slice(member)))
    }

    fn remove(&self, key: &str, member: &[u8]) -> Result<bool> {
        self.record_operation();
        let mut sets = self.sets.write();
        let Some(set) = sets.get_mut(key) else {
            return Ok(false);
        };

        let removed = set.remove(member);
        if set.is_empty() {
            sets.remove(key);
        }
        Ok(removed)
    }

    fn members(&self, key: &str) -> Result<Vec<Bytes>> {
        self.record_operation();
        let sets = self.sets.read();
        Ok(sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn contains(&self, key: &str, member: &[u8]) -> Result<bool> {
        self.record_operation();
        let sets = self.sets.read();
        Ok(sets.get(key).is_some_and(|set| set.contains(member)))
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let sets = self.sets.read();
        let mut keys: Vec<String> = sets
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn stats(&self) -> Result<SetStoreStats> {
        let sets = self.sets.read();
        Ok(SetStoreStats {
            key_count: sets.len(),
            member_count: sets.values().map(FxHashSet::len).sum(),
            operations_count: self.operations.load(Ordering::Relaxed),
        })
    }
}
