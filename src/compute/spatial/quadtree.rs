//! Point quadtree over a fixed rectangular region.
//!
//! Each node is either a leaf holding up to `capacity` points, or an internal node with exactly
//! four children covering its NE, NW, SW and SE quadrants. When a full leaf receives another
//! point it splits at its midpoint, moves its points into the children and inserts the new point
//! into the child that contains it. Splits are never undone.
//!
//! Every point lives in exactly one node whose bounds contain it. Child bounds are closed, so a
//! point on a midline lies inside two children; it is routed east of the vertical midline and
//! north of the horizontal one.
//!
//! The whole tree sits behind one [`parking_lot::Mutex`]: inserts and searches each hold it for
//! the entire call.
//!
//! ```rust
//! use geodispatch::compute::spatial::{Bounds, Quadtree, IndexedPoint};
//!
//! let tree = Quadtree::new(Bounds::new(0.0, 0.0, 10.0, 10.0));
//! tree.insert(IndexedPoint::new("a", 1.0, 1.0));
//! tree.insert(IndexedPoint::new("b", 8.0, 8.0));
//!
//! let hits = tree.search(2.0, 2.0, 1.5);
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].key, "a");
//!
//! // outside the root bounds: dropped
//! assert!(!tree.insert(IndexedPoint::new("c", 11.0, 1.0)));
//! assert_eq!(tree.len(), 2);
//! ```

use super::{IndexedPoint, Nearby, NearbySearch};
use crate::error::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Default number of points a leaf holds before splitting.
pub const DEFAULT_CAPACITY: usize = 4;

/// Depth below which nodes stop splitting; leaves at this depth grow past capacity.
///
/// Without a floor, more than `capacity` identical points would split forever.
pub const MAX_DEPTH: usize = 32;

/// Axis-aligned rectangle with closed edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The whole globe: x = longitude in [-180, 180], y = latitude in [-90, 90].
    pub const fn world() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }

    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x < self.max_x
            && self.min_y < self.max_y
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn midpoint(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Whether the circle touches the rectangle, using the closest point of the rectangle to
    /// the centre.
    pub fn intersects_circle(&self, cx: f64, cy: f64, radius: f64) -> bool {
        let closest_x = cx.clamp(self.min_x, self.max_x);
        let closest_y = cy.clamp(self.min_y, self.max_y);
        let dx = closest_x - cx;
        let dy = closest_y - cy;
        dx * dx + dy * dy <= radius * radius
    }

    /// The four quadrants, in [`Quadrant`] order.
    pub fn quadrants(&self) -> [Bounds; 4] {
        let (mid_x, mid_y) = self.midpoint();
        [
            Bounds::new(mid_x, mid_y, self.max_x, self.max_y),
            Bounds::new(self.min_x, mid_y, mid_x, self.max_y),
            Bounds::new(self.min_x, self.min_y, mid_x, mid_y),
            Bounds::new(mid_x, self.min_y, self.max_x, mid_y),
        ]
    }

    fn quadrant_of(&self, x: f64, y: f64) -> Quadrant {
        let (mid_x, mid_y) = self.midpoint();
        match (x >= mid_x, y >= mid_y) {
            (true, true) => Quadrant::NorthEast,
            (false, true) => Quadrant::NorthWest,
            (false, false) => Quadrant::SouthWest,
            (true, false) => Quadrant::SouthEast,
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::world()
    }
}

/// Child slot of an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    NorthEast = 0,
    NorthWest = 1,
    SouthWest = 2,
    SouthEast = 3,
}

#[derive(Debug)]
struct QuadNode {
    bounds: Bounds,
    points: SmallVec<[IndexedPoint; DEFAULT_CAPACITY]>,
    children: Option<Box<[QuadNode; 4]>>,
}

impl QuadNode {
    fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            points: SmallVec::new(),
            children: None,
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    // The caller has already checked that the point is inside `self.bounds`.
    fn insert(&mut self, point: IndexedPoint, capacity: usize, depth: usize) {
        if self.is_leaf() {
            if self.points.len() < capacity || depth >= MAX_DEPTH {
                self.points.push(point);
                return;
            }
            self.subdivide(capacity, depth);
        }

        let quadrant = self.bounds.quadrant_of(point.x, point.y);
        if let Some(children) = self.children.as_mut() {
            children[quadrant as usize].insert(point, capacity, depth + 1);
        }
    }

    fn subdivide(&mut self, capacity: usize, depth: usize) {
        let mut children = Box::new(self.bounds.quadrants().map(QuadNode::new));
        for point in self.points.drain(..) {
            let quadrant = self.bounds.quadrant_of(point.x, point.y);
            children[quadrant as usize].insert(point, capacity, depth + 1);
        }
        self.children = Some(children);
    }

    fn search(&self, cx: f64, cy: f64, radius: f64, out: &mut Vec<IndexedPoint>) {
        if !self.bounds.intersects_circle(cx, cy, radius) {
            return;
        }

        out.extend(
            self.points
                .iter()
                .filter(|p| p.distance_to(cx, cy) <= radius)
                .cloned(),
        );

        if let Some(children) = &self.children {
            for child in children.iter() {
                child.search(cx, cy, radius, out);
            }
        }
    }

    fn collect_stats(&self, depth: usize, stats: &mut QuadtreeStats) {
        stats.node_count += 1;
        stats.max_depth = stats.max_depth.max(depth);
        match &self.children {
            None => stats.leaf_count += 1,
            Some(children) => {
                for child in children.iter() {
                    child.collect_stats(depth + 1, stats);
                }
            }
        }
    }

    fn visit<F: FnMut(&Bounds, &[IndexedPoint], bool)>(&self, f: &mut F) {
        f(&self.bounds, self.points.as_slice(), self.is_leaf());
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.visit(f);
            }
        }
    }
}

/// Shape of the tree, for diagnostics and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuadtreeStats {
    pub point_count: usize,
    pub node_count: usize,
    pub leaf_count: usize,
    pub max_depth: usize,
}

#[derive(Debug)]
struct QuadtreeInner {
    root: QuadNode,
    len: usize,
}

/// Thread-safe quadtree over a fixed region.
#[derive(Debug)]
pub struct Quadtree {
    inner: Mutex<QuadtreeInner>,
    bounds: Bounds,
    capacity: usize,
}

impl Quadtree {
    /// Create an empty tree with the default leaf capacity of 4.
    pub fn new(bounds: Bounds) -> Self {
        Self::with_capacity(bounds, DEFAULT_CAPACITY)
    }

    /// Create an empty tree whose leaves split after `capacity` points (at least 1).
    pub fn with_capacity(bounds: Bounds, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QuadtreeInner {
                root: QuadNode::new(bounds),
                len: 0,
            }),
            bounds,
            capacity: capacity.max(1),
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a point. Points outside the root bounds are dropped and `false` is returned.
    pub fn insert(&self, point: IndexedPoint) -> bool {
        if !self.bounds.contains(point.x, point.y) {
            log::debug!(
                "Dropping quadtree point {} at ({}, {}): outside {:?}",
                point.key,
                point.x,
                point.y,
                self.bounds
            );
            return false;
        }

        let mut inner = self.inner.lock();
        inner.root.insert(point, self.capacity, 0);
        inner.len += 1;
        true
    }

    /// All points within Euclidean distance `radius` of `(x, y)`, boundary included.
    pub fn search(&self, x: f64, y: f64, radius: f64) -> Vec<IndexedPoint> {
        let inner = self.inner.lock();
        let mut out = Vec::new();
        inner.root.search(x, y, radius, &mut out);
        out
    }

    pub fn stats(&self) -> QuadtreeStats {
        let inner = self.inner.lock();
        let mut stats = QuadtreeStats {
            point_count: inner.len,
            ..QuadtreeStats::default()
        };
        inner.root.collect_stats(0, &mut stats);
        stats
    }

    /// Visit every node depth-first with its bounds, resident points and leaf flag.
    ///
    /// The tree lock is held for the whole walk; `f` must not call back into this tree.
    pub fn visit<F: FnMut(&Bounds, &[IndexedPoint], bool)>(&self, mut f: F) {
        let inner = self.inner.lock();
        inner.root.visit(&mut f);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.root = QuadNode::new(self.bounds);
        inner.len = 0;
    }
}

impl NearbySearch for Quadtree {
    fn search_nearby(&self, lat: f64, lon: f64, radius: f64) -> Result<Vec<Nearby>> {
        Ok(self
            .search(lon, lat, radius)
            .into_iter()
            .map(Nearby::Point)
            .collect())
    }
}
