//! Driver availability pool.
//!
//! Available drivers are kept as serialized snapshots in the set `drivers:<geohash>` of the cell
//! they are in. A snapshot is a copy taken when the driver was inserted; it does not follow later
//! changes to the driver record. To remove a driver, the exact bytes that were stored must be
//! removed, otherwise set removal silently misses and the stale entry stays matchable.
//!
//! `DriverPool` therefore remembers, per driver id, the key and bytes it last stored, and every
//! removal uses those. [`DriverPool::sync`] is the single entry point that brings the pool in
//! line with a driver record: an available, located driver ends up in exactly one cell; any
//! other driver ends up in none.
//!
//! Relocation removes the old snapshot before adding the new one. A concurrent matcher may see
//! the driver in neither cell during that gap; there is no cross-key transaction.

use crate::error::Result;
use crate::storage::SetStore;
use bytes::Bytes;
use geodispatch_types::{Driver, DriverId, DriverStatus};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

pub const POOL_KEY_PREFIX: &str = "drivers:";

/// The set key holding available drivers of `cell`.
pub fn pool_key(cell: &str) -> String {
    format!("{POOL_KEY_PREFIX}{cell}")
}

/// Serialize the snapshot stored in the pool for `driver`.
pub fn snapshot(driver: &Driver) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(driver)?))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredSnapshot {
    key: String,
    bytes: Bytes,
}

/// Where a driver sits after a pool update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Present in the set at this key
    Pooled { key: String },
    /// Not present in any set
    Withdrawn,
}

pub struct DriverPool {
    store: Arc<dyn SetStore>,
    stored: Mutex<FxHashMap<DriverId, StoredSnapshot>>,
}

impl DriverPool {
    pub fn new(store: Arc<dyn SetStore>) -> Self {
        Self {
            store,
            stored: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn store(&self) -> &Arc<dyn SetStore> {
        &self.store
    }

    /// Raw members of a cell's set.
    pub fn members(&self, cell: &str) -> Result<Vec<Bytes>> {
        self.store.members(&pool_key(cell))
    }

    /// The key this pool last stored `driver_id` under.
    pub fn key_of(&self, driver_id: DriverId) -> Option<String> {
        self.stored.lock().get(&driver_id).map(|s| s.key.clone())
    }

    /// Number of drivers this pool has placed.
    pub fn len(&self) -> usize {
        self.stored.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Put `driver` in the set of its current cell, first removing whatever snapshot was stored
    /// for it before. Drivers without a cell are only withdrawn.
    pub fn insert(&self, driver: &Driver) -> Result<Placement> {
        let mut stored = self.stored.lock();
        self.insert_locked(&mut stored, driver)
    }

    /// Bring the pool in line with `new`, the updated record of `old`.
    ///
    /// When this pool holds no snapshot for the driver, the snapshot of `old` is removed from the
    /// cell `old` was in, so an entry written by another process does not outlive the move.
    pub fn relocate(&self, old: &Driver, new: &Driver) -> Result<Placement> {
        let mut stored = self.stored.lock();
        if !stored.contains_key(&old.id) && old.is_located() {
            let key = pool_key(&old.geohash);
            let untracked = old.clone().with_status(DriverStatus::Available);
            if self.store.remove(&key, &snapshot(&untracked)?)? {
                log::debug!("Driver {} untracked entry removed from {}", old.id, key);
            }
        }
        self.sync_locked(&mut stored, new)
    }

    fn insert_locked(
        &self,
        stored: &mut FxHashMap<DriverId, StoredSnapshot>,
        driver: &Driver,
    ) -> Result<Placement> {
        if !driver.is_located() {
            self.withdraw_locked(stored, driver)?;
            return Ok(Placement::Withdrawn);
        }

        let next = StoredSnapshot {
            key: pool_key(&driver.geohash),
            bytes: snapshot(driver)?,
        };

        if stored.get(&driver.id) == Some(&next) {
            return Ok(Placement::Pooled { key: next.key });
        }

        if let Some(previous) = stored.remove(&driver.id) {
            self.store.remove(&previous.key, &previous.bytes)?;
            if previous.key != next.key {
                log::debug!(
                    "Driver {} moved from {} to {}",
                    driver.id,
                    previous.key,
                    next.key
                );
            }
        }

        self.store.add(&next.key, &next.bytes)?;
        log::debug!("Driver {} pooled under {}", driver.id, next.key);

        let key = next.key.clone();
        stored.insert(driver.id, next);
        Ok(Placement::Pooled { key })
    }

    /// Take `driver` out of the pool.
    ///
    /// The snapshot this pool stored is removed. If the pool never stored one (for example the
    /// set store outlived a previous process), the snapshot of `driver` itself is removed from its
    /// cell instead, which matches when `driver` is the record that was pooled.
    pub fn remove(&self, driver: &Driver) -> Result<bool> {
        let mut stored = self.stored.lock();
        self.withdraw_locked(&mut stored, driver)
    }

    /// Remove exactly the bytes `raw` from the set of `cell`, as read back from the store.
    ///
    /// Used for stale entries found while matching. Tracking for `driver_id` is dropped only
    /// when it points at that same entry.
    pub fn remove_entry(&self, cell: &str, raw: &[u8], driver_id: DriverId) -> Result<bool> {
        let mut stored = self.stored.lock();
        let key = pool_key(cell);
        if stored
            .get(&driver_id)
            .is_some_and(|s| s.key == key && s.bytes.as_ref() == raw)
        {
            stored.remove(&driver_id);
        }
        self.store.remove(&key, raw)
    }

    fn withdraw_locked(
        &self,
        stored: &mut FxHashMap<DriverId, StoredSnapshot>,
        driver: &Driver,
    ) -> Result<bool> {
        let removed = match stored.remove(&driver.id) {
            Some(previous) => self.store.remove(&previous.key, &previous.bytes)?,
            None if driver.is_located() => {
                let untracked = driver.clone().with_status(DriverStatus::Available);
                self.store
                    .remove(&pool_key(&driver.geohash), &snapshot(&untracked)?)?
            }
            None => false,
        };

        if removed {
            log::debug!("Driver {} withdrawn from pool", driver.id);
        }
        Ok(removed)
    }

    /// Bring the pool in line with `driver`: pooled in its cell when available and located,
    /// withdrawn otherwise.
    pub fn sync(&self, driver: &Driver) -> Result<Placement> {
        let mut stored = self.stored.lock();
        self.sync_locked(&mut stored, driver)
    }

    fn sync_locked(
        &self,
        stored: &mut FxHashMap<DriverId, StoredSnapshot>,
        driver: &Driver,
    ) -> Result<Placement> {
        if driver.is_available() {
            self.insert_locked(stored, driver)
        } else {
            self.withdraw_locked(stored, driver)?;
            Ok(Placement::Withdrawn)
        }
    }
}

impl fmt::Debug for DriverPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverPool")
            .field("pooled", &self.len())
            .finish_non_exhaustive()
    }
}
