//! R-tree point index with rectangle-intersection search.
//!
//! Each point is stored as a small square of half-width ε around it (0.0001 degrees by
//! default). A search builds a square of half-width `radius` around the query point and returns
//! every stored square that intersects it. That is a superset of a circular search: points in
//! the corners of the query square, up to `radius * √2` away, are included and not filtered.
//!
//! Rectangle bookkeeping is delegated to `rstar`; the tree itself sits behind one
//! [`parking_lot::Mutex`] held for each whole insert or search.
//!
//! ## Example
//!
//! ```rust
//! use geodispatch::compute::spatial::RTreeIndex;
//!
//! let index = RTreeIndex::new();
//! index.insert("sf", 37.7749, -122.4194);
//! index.insert("oakland", 37.8044, -122.2712);
//!
//! let hits = index.search(37.7749, -122.4194, 0.01);
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].key, "sf");
//!
//! assert_eq!(index.search(37.7749, -122.4194, 0.2).len(), 2);
//! ```

use super::{IndexedPoint, Nearby, NearbySearch};
use crate::error::Result;
use parking_lot::Mutex;
use rstar::{AABB, RTree, RTreeObject};

/// Default half-width of the square wrapping each point.
pub const DEFAULT_HALF_WIDTH: f64 = 0.0001;

/// A point wrapped in its ε-square.
#[derive(Debug, Clone, PartialEq)]
pub struct RectEntry {
    pub point: IndexedPoint,
    envelope: AABB<[f64; 2]>,
}

impl RectEntry {
    pub fn new(point: IndexedPoint, half_width: f64) -> Self {
        let envelope = square(point.x, point.y, half_width);
        Self { point, envelope }
    }

    pub fn lower(&self) -> [f64; 2] {
        self.envelope.lower()
    }

    pub fn upper(&self) -> [f64; 2] {
        self.envelope.upper()
    }
}

impl RTreeObject for RectEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn square(x: f64, y: f64, half_width: f64) -> AABB<[f64; 2]> {
    AABB::from_corners([x - half_width, y - half_width], [x + half_width, y + half_width])
}

/// Thread-safe R-tree of keyed points (x = longitude, y = latitude).
#[derive(Debug)]
pub struct RTreeIndex {
    tree: Mutex<RTree<RectEntry>>,
    half_width: f64,
}

impl RTreeIndex {
    pub fn new() -> Self {
        Self::with_half_width(DEFAULT_HALF_WIDTH)
    }

    pub fn with_half_width(half_width: f64) -> Self {
        Self {
            tree: Mutex::new(RTree::new()),
            half_width,
        }
    }

    /// Build an index from many points at once using rstar's bulk loading.
    pub fn bulk_load(points: Vec<IndexedPoint>, half_width: f64) -> Self {
        let entries = points
            .into_iter()
            .map(|p| RectEntry::new(p, half_width))
            .collect();
        Self {
            tree: Mutex::new(RTree::bulk_load(entries)),
            half_width,
        }
    }

    pub fn half_width(&self) -> f64 {
        self.half_width
    }

    pub fn len(&self) -> usize {
        self.tree.lock().size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a latitude/longitude under `key`.
    pub fn insert(&self, key: impl Into<String>, lat: f64, lon: f64) {
        self.insert_point(IndexedPoint::from_lat_lon(key, lat, lon));
    }

    pub fn insert_point(&self, point: IndexedPoint) {
        let entry = RectEntry::new(point, self.half_width);
        self.tree.lock().insert(entry);
    }

    /// Remove the entry stored for exactly this point. Returns whether one was removed.
    pub fn remove_point(&self, point: &IndexedPoint) -> bool {
        let entry = RectEntry::new(point.clone(), self.half_width);
        self.tree.lock().remove(&entry).is_some()
    }

    /// Points whose ε-square intersects the square of half-width `radius` around the query.
    pub fn search(&self, lat: f64, lon: f64, radius: f64) -> Vec<IndexedPoint> {
        if !lat.is_finite() || !lon.is_finite() || !radius.is_finite() {
            log::warn!("Rejecting R-tree search with non-finite input");
            return Vec::new();
        }

        let query = square(lon, lat, radius.abs());
        let tree = self.tree.lock();
        tree.locate_in_envelope_intersecting(&query)
            .map(|entry| entry.point.clone())
            .collect()
    }
}

impl Default for RTreeIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl NearbySearch for RTreeIndex {
    fn search_nearby(&self, lat: f64, lon: f64, radius: f64) -> Result<Vec<Nearby>> {
        Ok(self
            .search(lat, lon, radius)
            .into_iter()
            .map(Nearby::Point)
            .collect())
    }
}
