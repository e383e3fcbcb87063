use geo::Point;
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in degrees.
///
/// Valid inputs are latitude in `[-90, 90]` and longitude in `[-180, 180]`. The type does not
/// enforce the range; [`Coordinate::is_valid`] checks it for callers that need to.
///
/// # Examples
///
/// ```
/// use geodispatch_types::Coordinate;
///
/// let sf = Coordinate::new(37.7749, -122.4194);
/// assert!(sf.is_valid());
///
/// // geo points are (x = longitude, y = latitude)
/// let point = sf.to_point();
/// assert_eq!(point.x(), -122.4194);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and inside the geographic range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Convert to a `geo::Point` (x = longitude, y = latitude).
    pub fn to_point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

impl From<Point<f64>> for Coordinate {
    fn from(point: Point<f64>) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(coordinate: Coordinate) -> Self {
        coordinate.to_point()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_conversion_swaps_axes() {
        let c = Coordinate::new(40.7128, -74.0060);
        let p: Point<f64> = c.into();
        assert_eq!(p.x(), -74.0060);
        assert_eq!(p.y(), 40.7128);
        assert_eq!(Coordinate::from(p), c);
    }

    #[test]
    fn test_validity() {
        assert!(Coordinate::new(90.0, 180.0).is_valid());
        assert!(Coordinate::new(-90.0, -180.0).is_valid());
        assert!(!Coordinate::new(90.1, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }
}
