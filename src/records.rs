//! Durable record store for drivers, riders and trips.
//!
//! The record store is the source of truth for driver state; the availability pool only holds
//! snapshots derived from it. The two are written one after the other, never in one
//! transaction.

use crate::error::Result;
use geodispatch_types::{Driver, DriverId, Rider, RiderId, Trip, TripId};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Trait for record store implementations
pub trait RecordStore: Send + Sync {
    /// Allocate the id of a new driver.
    fn next_driver_id(&self) -> Result<DriverId>;

    fn next_rider_id(&self) -> Result<RiderId>;

    fn next_trip_id(&self) -> Result<TripId>;

    fn driver(&self, id: DriverId) -> Result<Option<Driver>>;

    /// Insert or replace a driver record.
    fn put_driver(&self, driver: &Driver) -> Result<()>;

    fn rider(&self, id: RiderId) -> Result<Option<Rider>>;

    fn put_rider(&self, rider: &Rider) -> Result<()>;

    fn trip(&self, id: TripId) -> Result<Option<Trip>>;

    fn put_trip(&self, trip: &Trip) -> Result<()>;

    /// All driver records, ordered by id.
    fn drivers(&self) -> Result<Vec<Driver>>;
}

/// In-memory record store. Ids start at 1 and increase per record kind.
#[derive(Debug)]
pub struct MemoryRecordStore {
    drivers: RwLock<FxHashMap<DriverId, Driver>>,
    riders: RwLock<FxHashMap<RiderId, Rider>>,
    trips: RwLock<FxHashMap<TripId, Trip>>,
    driver_ids: AtomicI64,
    rider_ids: AtomicI64,
    trip_ids: AtomicI64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            drivers: RwLock::new(FxHashMap::default()),
            riders: RwLock::new(FxHashMap::default()),
            trips: RwLock::new(FxHashMap::default()),
            driver_ids: AtomicI64::new(1),
            rider_ids: AtomicI64::new(1),
            trip_ids: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryRecordStore {
    fn next_driver_id(&self) -> Result<DriverId> {
        Ok(self.driver_ids.fetch_add(1, Ordering::Relaxed))
    }

    fn next_rider_id(&self) -> Result<RiderId> {
        Ok(self.rider_ids.fetch_add(1, Ordering::Relaxed))
    }

    fn next_trip_id(&self) -> Result<TripId> {
        Ok(self.trip_ids.fetch_add(1, Ordering::Relaxed))
    }

    fn driver(&self, id: DriverId) -> Result<Option<Driver>> {
        Ok(self.drivers.read().get(&id).cloned())
    }

    fn put_driver(&self, driver: &Driver) -> Result<()> {
        self.drivers.write().insert(driver.id, driver.clone());
        Ok(())
    }

    fn rider(&self, id: RiderId) -> Result<Option<Rider>> {
        Ok(self.riders.read().get(&id).cloned())
    }

    fn put_rider(&self, rider: &Rider) -> Result<()> {
        self.riders.write().insert(rider.id, rider.clone());
        Ok(())
    }

    fn trip(&self, id: TripId) -> Result<Option<Trip>> {
        Ok(self.trips.read().get(&id).cloned())
    }

    fn put_trip(&self, trip: &Trip) -> Result<()> {
        self.trips.write().insert(trip.id, trip.clone());
        Ok(())
    }

    fn drivers(&self) -> Result<Vec<Driver>> {
        let mut drivers: Vec<Driver> = self.drivers.read().values().cloned().collect();
        drivers.sort_by_key(|d| d.id);
        Ok(drivers)
    }
}
