//! Geohash encoding, decoding and cell adjacency.
//!
//! Cells are base-32 strings; each extra character narrows the cell, and cells sharing a prefix
//! are nested. Encoding is lossy: [`decode`] returns the centre of the cell, which lies within
//! half a cell of the encoded coordinate on each axis.
//!
//! Adjacency wraps across the antimeridian (the east neighbor of a cell touching +180° lies at
//! -180°) and stops at the poles: a cell in the northernmost row has no north, north-east or
//! north-west neighbor, so [`neighbors`] returns fewer than 8 cells there.
//!
//! ```rust
//! use geodispatch::compute::spatial::geohash;
//!
//! let cell = geohash::encode(37.7749, -122.4194, 5).unwrap();
//! assert_eq!(cell, "9q8yy");
//!
//! let ring = geohash::neighbors(&cell).unwrap();
//! assert_eq!(ring.len(), 8);
//! assert!(!ring.contains(&cell));
//! ```

use super::{Nearby, NearbySearch};
use crate::error::{DispatchError, Result};
use geo::Rect;
use geodispatch_types::Coordinate;

pub use ::geohash::Direction;

pub const MIN_PRECISION: usize = 1;
pub const MAX_PRECISION: usize = 12;

/// Neighbor directions in the order [`neighbors`] reports them.
pub const DIRECTIONS: [Direction; 8] = [
    Direction::N,
    Direction::NE,
    Direction::E,
    Direction::SE,
    Direction::S,
    Direction::SW,
    Direction::W,
    Direction::NW,
];

pub fn check_precision(precision: usize) -> Result<()> {
    if (MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
        Ok(())
    } else {
        Err(DispatchError::InvalidPrecision(precision))
    }
}

/// Encode a coordinate into a geohash cell of `precision` characters.
///
/// Latitude must lie in `[-90, 90]` and longitude in `[-180, 180]`; anything else, including
/// NaN, is rejected with [`DispatchError::InvalidCoordinate`].
pub fn encode(lat: f64, lon: f64, precision: usize) -> Result<String> {
    check_precision(precision)?;
    if !lat.is_finite() || !lon.is_finite() {
        return Err(DispatchError::InvalidCoordinate { lat, lon });
    }

    ::geohash::encode(::geohash::Coord { x: lon, y: lat }, precision)
        .map_err(|_| DispatchError::InvalidCoordinate { lat, lon })
}

/// Decode a cell to its centre point.
pub fn decode(cell: &str) -> Result<Coordinate> {
    let rect = decode_bbox(cell)?;
    let center = rect.center();
    Ok(Coordinate::new(center.y, center.x))
}

/// Decode a cell to the rectangle it covers (x = longitude, y = latitude).
pub fn decode_bbox(cell: &str) -> Result<Rect<f64>> {
    if cell.is_empty() || cell.len() > MAX_PRECISION {
        return Err(DispatchError::InvalidGeohash(cell.to_string()));
    }

    ::geohash::decode_bbox(cell).map_err(|e| DispatchError::InvalidGeohash(format!("{cell}: {e}")))
}

/// Width (longitude degrees) and height (latitude degrees) of a cell at `precision`.
pub fn cell_dimensions(precision: usize) -> Result<(f64, f64)> {
    check_precision(precision)?;
    let bits = 5 * precision as i32;
    let lon_bits = (bits + 1) / 2;
    let lat_bits = bits / 2;
    Ok((360.0 / 2f64.powi(lon_bits), 180.0 / 2f64.powi(lat_bits)))
}

fn offsets(direction: Direction) -> (f64, f64) {
    match direction {
        Direction::N => (1.0, 0.0),
        Direction::NE => (1.0, 1.0),
        Direction::E => (0.0, 1.0),
        Direction::SE => (-1.0, 1.0),
        Direction::S => (-1.0, 0.0),
        Direction::SW => (-1.0, -1.0),
        Direction::W => (0.0, -1.0),
        Direction::NW => (1.0, -1.0),
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

fn neighbor_of(rect: &Rect<f64>, precision: usize, direction: Direction) -> Result<Option<String>> {
    let (dlat, dlon) = offsets(direction);
    let center = rect.center();

    let lat = center.y + dlat * rect.height();
    if !(-90.0..=90.0).contains(&lat) {
        return Ok(None);
    }
    let lon = wrap_longitude(center.x + dlon * rect.width());

    encode(lat, lon, precision).map(Some)
}

/// The adjacent cell in `direction`, or `None` when it would cross a pole.
pub fn neighbor(cell: &str, direction: Direction) -> Result<Option<String>> {
    let rect = decode_bbox(cell)?;
    neighbor_of(&rect, cell.len(), direction)
}

/// The cells adjacent to `cell` at the same precision, in N, NE, E, SE, S, SW, W, NW order.
///
/// Directions that would cross a pole are omitted. At precision 1 near a pole the wrapped
/// east and west neighbors can coincide; duplicates are reported once.
pub fn neighbors(cell: &str) -> Result<Vec<String>> {
    let rect = decode_bbox(cell)?;
    let precision = cell.len();

    let mut ring = Vec::with_capacity(DIRECTIONS.len());
    for direction in DIRECTIONS {
        if let Some(adjacent) = neighbor_of(&rect, precision, direction)?
            && adjacent != cell
            && !ring.contains(&adjacent)
        {
            ring.push(adjacent);
        }
    }
    Ok(ring)
}

/// Geohashing technique: the neighbor ring of the query point's cell.
///
/// The radius is ignored, so repeating the search with a wider radius returns the same cells.
#[derive(Debug, Clone, Copy)]
pub struct GeohashSearch {
    precision: usize,
}

impl GeohashSearch {
    pub fn new(precision: usize) -> Result<Self> {
        check_precision(precision)?;
        Ok(Self { precision })
    }

    pub fn precision(&self) -> usize {
        self.precision
    }
}

impl NearbySearch for GeohashSearch {
    fn search_nearby(&self, lat: f64, lon: f64, _radius: f64) -> Result<Vec<Nearby>> {
        let cell = encode(lat, lon, self.precision)?;
        Ok(neighbors(&cell)?
            .into_iter()
            .map(|geohash| Nearby::Cell { geohash })
            .collect())
    }
}
