//! # geodispatch-types
//!
//! Core domain records for the geodispatch matching engine.
//!
//! - **Coordinates**: `Coordinate`
//! - **Drivers**: `Driver`, `DriverStatus`, `NewDriver`
//! - **Trips**: `Trip`, `TripStatus`, `Rider`
//!
//! All types are serializable with Serde. The JSON field names are the ones stored in the
//! driver availability pool, so a snapshot written by one process can be read by another.
//!
//! ## Examples
//!
//! ```rust
//! use geodispatch_types::driver::{Driver, DriverStatus};
//!
//! let driver = Driver::new(1, "Ada", 37.7750, -122.4190, "9q8yy");
//! assert_eq!(driver.status, DriverStatus::Available);
//! ```

pub mod coordinate;
pub mod driver;
pub mod trip;

pub use coordinate::Coordinate;
pub use driver::{Driver, DriverId, DriverStatus, NewDriver};
pub use trip::{Rider, RiderId, Trip, TripId, TripStatus};
