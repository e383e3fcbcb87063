//! Error types for geodispatch.

use geodispatch_types::{DriverId, RiderId, TripId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unsupported geo-indexing technique: {0:?}")]
    UnsupportedTechnique(String),

    #[error("no nearby points found after {attempts} attempts")]
    NoResultsFound { attempts: usize },

    #[error("search deadline exceeded after {attempts} attempts")]
    SearchDeadlineExceeded { attempts: usize },

    #[error("no available drivers nearby")]
    NoAvailableDrivers,

    #[error("geohash precision must be between 1 and 12, got {0}")]
    InvalidPrecision(usize),

    #[error("coordinate out of range: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("invalid geohash: {0}")]
    InvalidGeohash(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("driver {0} not found")]
    DriverNotFound(DriverId),

    #[error("rider {0} not found")]
    RiderNotFound(RiderId),

    #[error("trip {0} not found")]
    TripNotFound(TripId),

    #[error("trip {0} is already completed")]
    TripAlreadyCompleted(TripId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

impl DispatchError {
    /// Whether the error is an expected "nothing nearby" outcome rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DispatchError::NoResultsFound { .. }
                | DispatchError::NoAvailableDrivers
                | DispatchError::DriverNotFound(_)
                | DispatchError::RiderNotFound(_)
                | DispatchError::TripNotFound(_)
        )
    }
}
