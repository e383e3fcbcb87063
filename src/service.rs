//! Ride lifecycle on top of the record store, the availability pool and the matcher.
//!
//! Every operation writes the driver record first and then brings the pool in line with it
//! through [`DriverPool::sync`]. Lifecycle writes are serialized by one service-wide lock so two
//! ride requests cannot both be assigned the same driver.

use crate::compute::spatial::geohash;
use crate::compute::spatial::{Nearby, Quadtree, RTreeIndex};
use crate::config::{Config, Technique};
use crate::error::{DispatchError, Result};
use crate::indexer::GeoIndexer;
use crate::matcher::Matcher;
use crate::pool::{DriverPool, Placement};
use crate::records::RecordStore;
use geodispatch_types::{
    Driver, DriverId, DriverStatus, NewDriver, Rider, RiderId, Trip, TripId, TripStatus,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A rider asking to be picked up at `start` and taken to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RideRequest {
    pub rider_id: RiderId,
    #[serde(rename = "start_latitude")]
    pub start_lat: f64,
    #[serde(rename = "start_longitude")]
    pub start_lon: f64,
    #[serde(rename = "end_latitude")]
    pub end_lat: f64,
    #[serde(rename = "end_longitude")]
    pub end_lon: f64,
}

impl RideRequest {
    pub fn new(rider_id: RiderId, start: (f64, f64), end: (f64, f64)) -> Self {
        Self {
            rider_id,
            start_lat: start.0,
            start_lon: start.1,
            end_lat: end.0,
            end_lon: end.1,
        }
    }
}

/// The trip created for a ride request and the driver assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub trip: Trip,
    pub driver: Driver,
}

pub struct RideService {
    config: Config,
    records: Arc<dyn RecordStore>,
    pool: Arc<DriverPool>,
    matcher: Matcher,
    indexer: GeoIndexer,
    quadtree: Arc<Quadtree>,
    rtree: Arc<RTreeIndex>,
    lifecycle: Mutex<()>,
}

impl RideService {
    pub fn new(
        config: Config,
        records: Arc<dyn RecordStore>,
        pool: Arc<DriverPool>,
        quadtree: Arc<Quadtree>,
        rtree: Arc<RTreeIndex>,
    ) -> Result<Self> {
        let indexer = GeoIndexer::new(&config, quadtree.clone(), rtree.clone())?;
        let matcher = Matcher::with_precision(pool.clone(), config.driver_precision)?;
        let service = Self {
            config,
            records,
            pool,
            matcher,
            indexer,
            quadtree,
            rtree,
            lifecycle: Mutex::new(()),
        };
        service.restore_pool()?;
        Ok(service)
    }

    /// Sync the pool with every stored driver record. Returns how many drivers are pooled.
    ///
    /// Runs on construction, so a set store that outlived an earlier process is tracked again.
    pub fn restore_pool(&self) -> Result<usize> {
        let _guard = self.lifecycle.lock();
        let mut pooled = 0;
        for driver in self.records.drivers()? {
            if let Placement::Pooled { .. } = self.pool.sync(&driver)? {
                pooled += 1;
            }
        }
        if pooled > 0 {
            log::info!("Restored {} available drivers into the pool", pooled);
        }
        Ok(pooled)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &Arc<DriverPool> {
        &self.pool
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn indexer(&self) -> &GeoIndexer {
        &self.indexer
    }

    pub fn quadtree(&self) -> &Arc<Quadtree> {
        &self.quadtree
    }

    pub fn rtree(&self) -> &Arc<RTreeIndex> {
        &self.rtree
    }

    pub fn register_rider(&self, name: impl Into<String>) -> Result<Rider> {
        let rider = Rider {
            id: self.records.next_rider_id()?,
            name: name.into(),
        };
        self.records.put_rider(&rider)?;
        log::info!("Registered rider {}", rider.id);
        Ok(rider)
    }

    /// Register a driver and pool it when it is available.
    ///
    /// A driver whose latitude or longitude is exactly zero counts as not yet located: it gets no
    /// cell and stays out of the pool until its first location update.
    pub fn register_driver(&self, new: NewDriver) -> Result<Driver> {
        let geohash = if new.latitude != 0.0 && new.longitude != 0.0 {
            geohash::encode(new.latitude, new.longitude, self.config.driver_precision)?
        } else {
            String::new()
        };

        let _guard = self.lifecycle.lock();
        let driver = Driver {
            id: self.records.next_driver_id()?,
            name: new.name,
            latitude: new.latitude,
            longitude: new.longitude,
            geohash,
            status: new.status.unwrap_or_default(),
        };

        self.records.put_driver(&driver)?;
        self.pool.sync(&driver)?;
        log::info!(
            "Registered driver {} ({}) in cell {:?}",
            driver.id,
            driver.status,
            driver.geohash
        );
        Ok(driver)
    }

    /// Move a driver, optionally changing its status in the same update.
    pub fn update_driver_location(
        &self,
        id: DriverId,
        lat: f64,
        lon: f64,
        status: Option<DriverStatus>,
    ) -> Result<Driver> {
        let cell = geohash::encode(lat, lon, self.config.driver_precision)?;

        let _guard = self.lifecycle.lock();
        let previous = self.require_driver(id)?;
        let mut driver = previous.clone();
        driver.latitude = lat;
        driver.longitude = lon;
        driver.geohash = cell;
        if let Some(status) = status {
            driver.status = status;
        }

        self.records.put_driver(&driver)?;
        self.pool.relocate(&previous, &driver)?;
        log::debug!(
            "Driver {} now at ({}, {}) in cell {}",
            id,
            lat,
            lon,
            driver.geohash
        );
        Ok(driver)
    }

    pub fn set_driver_status(&self, id: DriverId, status: DriverStatus) -> Result<Driver> {
        let _guard = self.lifecycle.lock();
        let mut driver = self.require_driver(id)?;
        driver.status = status;

        self.records.put_driver(&driver)?;
        self.pool.sync(&driver)?;
        log::info!("Driver {} is now {}", id, status);
        Ok(driver)
    }

    /// Match the nearest available driver, create a trip and take the driver off the pool.
    pub fn request_ride(&self, request: &RideRequest) -> Result<Assignment> {
        let _guard = self.lifecycle.lock();
        // pool entries are snapshots; assign against the current record
        let (mut driver, entry) = loop {
            let entry = self
                .matcher
                .find_nearest_entry(request.start_lat, request.start_lon)?;
            let matched_id = entry.driver.id;
            match self.records.driver(matched_id)? {
                Some(current) if current.is_available() => break (current, entry),
                Some(current) => log::warn!(
                    "Pool entry for driver {} is stale ({}), withdrawing it",
                    current.id,
                    current.status
                ),
                None => log::warn!(
                    "Pool entry for unknown driver {}, withdrawing it",
                    matched_id
                ),
            }

            if !self
                .pool
                .remove_entry(&entry.cell, &entry.raw, matched_id)?
            {
                log::debug!(
                    "Stale entry for driver {} was already gone from {}",
                    matched_id,
                    entry.cell
                );
            }
        };

        let trip = Trip {
            id: self.records.next_trip_id()?,
            rider_id: request.rider_id,
            driver_id: driver.id,
            start_lat: request.start_lat,
            start_lon: request.start_lon,
            end_lat: request.end_lat,
            end_lon: request.end_lon,
            status: TripStatus::Requested,
        };
        self.records.put_trip(&trip)?;

        driver.status = DriverStatus::OnTrip;
        self.records.put_driver(&driver)?;
        self.pool.sync(&driver)?;
        // no-op unless the matched entry was written by someone other than this pool
        self.pool.remove_entry(&entry.cell, &entry.raw, driver.id)?;

        log::info!(
            "Assigned driver {} to rider {} (trip {})",
            driver.id,
            trip.rider_id,
            trip.id
        );
        Ok(Assignment { trip, driver })
    }

    /// Complete a trip and return its driver to the pool.
    pub fn complete_trip(&self, trip_id: TripId) -> Result<Trip> {
        let _guard = self.lifecycle.lock();
        let mut trip = self
            .records
            .trip(trip_id)?
            .ok_or(DispatchError::TripNotFound(trip_id))?;
        if trip.is_completed() {
            return Err(DispatchError::TripAlreadyCompleted(trip_id));
        }

        let mut driver = self.require_driver(trip.driver_id)?;

        trip.status = TripStatus::Completed;
        self.records.put_trip(&trip)?;

        driver.status = DriverStatus::Available;
        self.records.put_driver(&driver)?;
        self.pool.sync(&driver)?;

        log::info!("Completed trip {} with driver {}", trip.id, driver.id);
        Ok(trip)
    }

    pub fn driver(&self, id: DriverId) -> Result<Driver> {
        self.require_driver(id)
    }

    pub fn rider(&self, id: RiderId) -> Result<Rider> {
        self.records
            .rider(id)?
            .ok_or(DispatchError::RiderNotFound(id))
    }

    pub fn trip(&self, id: TripId) -> Result<Trip> {
        self.records
            .trip(id)?
            .ok_or(DispatchError::TripNotFound(id))
    }

    /// Point search through the indexer with the configured retry count.
    pub fn search_nearby(
        &self,
        lat: f64,
        lon: f64,
        technique: Option<Technique>,
    ) -> Result<Vec<Nearby>> {
        self.indexer
            .search_nearby_with_retries(lat, lon, technique, self.config.max_retries)
    }

    fn require_driver(&self, id: DriverId) -> Result<Driver> {
        self.records
            .driver(id)?
            .ok_or(DispatchError::DriverNotFound(id))
    }
}

impl fmt::Debug for RideService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RideService")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .field("indexer", &self.indexer)
            .finish_non_exhaustive()
    }
}
