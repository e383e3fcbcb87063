//! Nearest-driver matching over the availability pool.
//!
//! The matcher encodes the rider position at the driver precision and scans the sets of the
//! 8 neighbor cells and then the rider's own cell, in that order, returning the first member
//! that deserializes to an available driver. It never looks past that single ring: a driver two
//! cells away is not found even when it is closer in raw distance than one in a neighbor cell.

use crate::compute::spatial::geohash;
use crate::error::{DispatchError, Result};
use crate::pool::DriverPool;
use bytes::Bytes;
use geodispatch_types::Driver;
use std::sync::Arc;

/// Precision of the cells drivers are pooled under.
pub const DEFAULT_DRIVER_PRECISION: usize = 5;

/// A pool member that matched, with the cell and raw bytes it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub cell: String,
    pub raw: Bytes,
    pub driver: Driver,
}

#[derive(Debug, Clone)]
pub struct Matcher {
    pool: Arc<DriverPool>,
    precision: usize,
}

impl Matcher {
    pub fn new(pool: Arc<DriverPool>) -> Self {
        Self {
            pool,
            precision: DEFAULT_DRIVER_PRECISION,
        }
    }

    pub fn with_precision(pool: Arc<DriverPool>, precision: usize) -> Result<Self> {
        geohash::check_precision(precision)?;
        Ok(Self { pool, precision })
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Cells scanned for a rider at `(lat, lon)`: the neighbors first, the rider's cell last.
    pub fn candidate_cells(&self, lat: f64, lon: f64) -> Result<Vec<String>> {
        let rider_cell = geohash::encode(lat, lon, self.precision)?;
        let mut cells = geohash::neighbors(&rider_cell)?;
        cells.push(rider_cell);
        Ok(cells)
    }

    /// First available driver in the rider's cell ring.
    ///
    /// Members that fail to deserialize are skipped, as are cells whose set cannot be read.
    /// Fails with [`DispatchError::NoAvailableDrivers`] when the ring holds no available driver.
    pub fn find_nearest_driver(&self, lat: f64, lon: f64) -> Result<Driver> {
        self.find_nearest_entry(lat, lon).map(|entry| entry.driver)
    }

    /// Like [`find_nearest_driver`](Self::find_nearest_driver), keeping the raw pool entry.
    pub fn find_nearest_entry(&self, lat: f64, lon: f64) -> Result<PoolEntry> {
        for cell in self.candidate_cells(lat, lon)? {
            let members = match self.pool.members(&cell) {
                Ok(members) => members,
                Err(e) => {
                    log::warn!("Skipping cell {}: {}", cell, e);
                    continue;
                }
            };

            for raw in members {
                let driver: Driver = match serde_json::from_slice(&raw) {
                    Ok(driver) => driver,
                    Err(e) => {
                        log::warn!("Skipping malformed pool entry in cell {}: {}", cell, e);
                        continue;
                    }
                };

                if driver.is_available() {
                    log::debug!("Matched driver {} in cell {}", driver.id, cell);
                    return Ok(PoolEntry { cell, raw, driver });
                }
            }
        }

        Err(DispatchError::NoAvailableDrivers)
    }
}
