use crate::coordinate::Coordinate;
use crate::driver::DriverId;
use serde::{Deserialize, Serialize};

pub type TripId = i64;
pub type RiderId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rider {
    pub id: RiderId,
    pub name: String,
}

/// Lifecycle of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    #[default]
    Requested,
    Accepted,
    Completed,
}

/// A trip between a rider and the driver assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub rider_id: RiderId,
    pub driver_id: DriverId,
    #[serde(rename = "start_latitude")]
    pub start_lat: f64,
    #[serde(rename = "start_longitude")]
    pub start_lon: f64,
    #[serde(rename = "end_latitude")]
    pub end_lat: f64,
    #[serde(rename = "end_longitude")]
    pub end_lon: f64,
    pub status: TripStatus,
}

impl Trip {
    pub fn start(&self) -> Coordinate {
        Coordinate::new(self.start_lat, self.start_lon)
    }

    pub fn end(&self) -> Coordinate {
        Coordinate::new(self.end_lat, self.end_lon)
    }

    pub fn is_completed(&self) -> bool {
        self.status == TripStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_json_field_names() {
        let trip = Trip {
            id: 1,
            rider_id: 2,
            driver_id: 3,
            start_lat: 37.0,
            start_lon: -122.0,
            end_lat: 37.5,
            end_lon: -122.5,
            status: TripStatus::Requested,
        };
        let value = serde_json::to_value(&trip).unwrap();
        assert_eq!(value["start_latitude"], 37.0);
        assert_eq!(value["end_longitude"], -122.5);
        assert_eq!(value["status"], "requested");
        assert_eq!(trip.start(), Coordinate::new(37.0, -122.0));
    }
}
