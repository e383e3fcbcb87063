use crate::coordinate::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type DriverId = i64;

/// Availability of a driver for new trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    /// Free to be matched with a rider
    #[default]
    Available,
    /// Assigned to a trip that has not completed yet
    OnTrip,
}

impl DriverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Available => "available",
            DriverStatus::OnTrip => "on_trip",
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A driver record.
///
/// `geohash` is derived from `latitude`/`longitude` and must always be updated together with
/// them. An empty `geohash` means the driver has not reported a location yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub geohash: String,
    #[serde(default)]
    pub status: DriverStatus,
}

impl Driver {
    /// Create an available driver at the given position and cell.
    pub fn new(
        id: DriverId,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        geohash: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            latitude,
            longitude,
            geohash: geohash.into(),
            status: DriverStatus::Available,
        }
    }

    pub fn with_status(mut self, status: DriverStatus) -> Self {
        self.status = status;
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn is_available(&self) -> bool {
        self.status == DriverStatus::Available
    }

    /// Whether the driver has a cell assigned.
    pub fn is_located(&self) -> bool {
        !self.geohash.is_empty()
    }
}

/// Registration payload for a driver that has no id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDriver {
    pub name: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub status: Option<DriverStatus>,
}

impl NewDriver {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            status: None,
        }
    }

    pub fn with_status(mut self, status: DriverStatus) -> Self {
        self.status = Some(status);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let driver = Driver::new(7, "Grace", 1.0, 2.0, "s00tw").with_status(DriverStatus::OnTrip);
        let json = serde_json::to_string(&driver).unwrap();
        assert!(json.contains(r#""status":"on_trip""#));

        let back: Driver = serde_json::from_str(&json).unwrap();
        assert_eq!(back, driver);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let json = r#"{"id":1,"name":"x","latitude":0,"longitude":0,"geohash":"","status":"offline"}"#;
        assert!(serde_json::from_str::<Driver>(json).is_err());
    }

    #[test]
    fn test_missing_status_defaults_to_available() {
        let json = r#"{"id":1,"name":"x","latitude":0.5,"longitude":0.5}"#;
        let driver: Driver = serde_json::from_str(json).unwrap();
        assert!(driver.is_available());
        assert!(!driver.is_located());
    }
}
