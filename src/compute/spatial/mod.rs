//! Spatial indexes and the search seam shared by the geo-indexing techniques.

pub mod distance;
pub mod geohash;
pub mod quadtree;
pub mod rtree;

pub use distance::{DistanceMetric, distance_between, distance_between_cells, haversine_km};
pub use quadtree::{Bounds, Quadtree};
pub use rtree::RTreeIndex;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A keyed point stored in the quadtree or R-tree.
///
/// Coordinates are planar: `x` is longitude and `y` is latitude when the point comes from a
/// geographic position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedPoint {
    pub key: String,
    pub x: f64,
    pub y: f64,
}

impl IndexedPoint {
    pub fn new(key: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            key: key.into(),
            x,
            y,
        }
    }

    /// Build a point from a latitude/longitude pair.
    pub fn from_lat_lon(key: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self::new(key, lon, lat)
    }

    pub fn latitude(&self) -> f64 {
        self.y
    }

    pub fn longitude(&self) -> f64 {
        self.x
    }

    /// Planar Euclidean distance to `(x, y)`.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One result of a nearby-point search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Nearby {
    /// A geohash cell adjacent to the query point's cell
    Cell { geohash: String },
    /// A point stored in the quadtree or R-tree
    Point(IndexedPoint),
}

impl Nearby {
    pub fn as_cell(&self) -> Option<&str> {
        match self {
            Nearby::Cell { geohash } => Some(geohash),
            Nearby::Point(_) => None,
        }
    }

    pub fn as_point(&self) -> Option<&IndexedPoint> {
        match self {
            Nearby::Point(point) => Some(point),
            Nearby::Cell { .. } => None,
        }
    }
}

/// A single search attempt around a latitude/longitude.
///
/// `radius` is in coordinate degrees. Implementations that do not use a radius ignore it.
pub trait NearbySearch: Send + Sync {
    fn search_nearby(&self, lat: f64, lon: f64, radius: f64) -> Result<Vec<Nearby>>;
}
