//! Distance calculations leveraging the geo crate.

use super::geohash;
use crate::error::Result;
use geo::{Distance, Euclidean, Geodesic, Haversine, Point, Rhumb};
use geodispatch_types::Coordinate;

/// Distance metrics for spatial calculations.
///
/// - **Haversine**: Fast spherical distance, good for most lon/lat calculations
/// - **Geodesic**: More accurate ellipsoidal distance (Karney 2013), slower
/// - **Rhumb**: Constant bearing distance
/// - **Euclidean**: Planar distance, only for projected coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    #[default]
    Haversine,
    Geodesic,
    Rhumb,
    Euclidean,
}

/// Distance between two points (x = longitude, y = latitude) in meters.
///
/// `Euclidean` returns plain coordinate units instead.
///
/// ```rust
/// use geodispatch::compute::spatial::{DistanceMetric, distance_between};
/// use geo::Point;
///
/// let nyc = Point::new(-74.0060, 40.7128);
/// let la = Point::new(-118.2437, 34.0522);
///
/// let dist = distance_between(&nyc, &la, DistanceMetric::Haversine);
/// assert!(dist > 3_900_000.0); // ~3,944 km
/// ```
pub fn distance_between(point1: &Point, point2: &Point, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Haversine => Haversine.distance(*point1, *point2),
        DistanceMetric::Geodesic => Geodesic.distance(*point1, *point2),
        DistanceMetric::Rhumb => Rhumb.distance(*point1, *point2),
        DistanceMetric::Euclidean => Euclidean.distance(*point1, *point2),
    }
}

/// Great-circle distance between two coordinates in kilometers.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    distance_between(&a.to_point(), &b.to_point(), DistanceMetric::Haversine) / 1000.0
}

/// Great-circle distance between the centres of two geohash cells in kilometers.
pub fn distance_between_cells(cell1: &str, cell2: &str) -> Result<f64> {
    let a = geohash::decode(cell1)?;
    let b = geohash::decode(cell2)?;
    Ok(haversine_km(a, b))
}
