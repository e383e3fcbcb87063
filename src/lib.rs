//! Nearest-driver matching over a geohash-bucketed availability pool, with quadtree and R-tree
//! point search.
//!
//! ```rust
//! use geodispatch::{DispatchBuilder, NewDriver, RideRequest};
//!
//! let service = DispatchBuilder::new().build()?;
//! let rider = service.register_rider("Rin")?;
//! let driver = service.register_driver(NewDriver::new("Ada", 37.7750, -122.4190))?;
//!
//! let request = RideRequest::new(rider.id, (37.7749, -122.4194), (37.8044, -122.2712));
//! let assignment = service.request_ride(&request)?;
//! assert_eq!(assignment.driver.id, driver.id);
//!
//! service.complete_trip(assignment.trip.id)?;
//! # Ok::<(), geodispatch::DispatchError>(())
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod error;
pub mod indexer;
pub mod matcher;
pub mod pool;
pub mod records;
pub mod service;
pub mod storage;

pub use builder::DispatchBuilder;
pub use config::{Config, Technique};
pub use error::{DispatchError, Result};
pub use indexer::{GeoIndexer, SearchRequest};
pub use matcher::{Matcher, PoolEntry};
pub use pool::{DriverPool, Placement, pool_key};
pub use records::{MemoryRecordStore, RecordStore};
pub use service::{Assignment, RideRequest, RideService};
pub use storage::{MemorySetStore, SetStore, SetStoreStats};

pub use compute::spatial::{
    Bounds, DistanceMetric, IndexedPoint, Nearby, NearbySearch, Quadtree, RTreeIndex,
    distance_between, haversine_km,
};

pub use geodispatch_types::{
    Coordinate, Driver, DriverId, DriverStatus, NewDriver, Rider, RiderId, Trip, TripId,
    TripStatus,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{DispatchBuilder, DispatchError, Result, RideService};

    pub use crate::{Config, GeoIndexer, Technique};

    pub use crate::{DriverPool, Matcher, MemorySetStore, SetStore};

    pub use crate::compute::spatial::{Bounds, Nearby, Quadtree, RTreeIndex, geohash};

    pub use geodispatch_types::{Driver, DriverStatus, NewDriver, Trip, TripStatus};
}
