//! Geo-indexing dispatcher: nearby-point search with a widening radius.
//!
//! A search runs one technique up to `max_retries` times. The first attempt uses the configured
//! initial radius (1.0 coordinate degree by default, not meters) and each empty attempt doubles
//! it. The search stops at the first attempt that returns anything. There is no fallback to
//! another technique.
//!
//! The geohashing technique ignores the radius, so it either finds its neighbor cells on the
//! first attempt or never does.
//!
//! ```rust
//! use geodispatch::{Config, GeoIndexer, Technique};
//! use geodispatch::compute::spatial::{Bounds, Quadtree, RTreeIndex};
//! use std::sync::Arc;
//!
//! let quadtree = Arc::new(Quadtree::new(Bounds::world()));
//! let rtree = Arc::new(RTreeIndex::new());
//! let indexer = GeoIndexer::new(&Config::default(), quadtree, rtree).unwrap();
//!
//! // geohashing is the default technique and always finds the neighbor ring
//! let cells = indexer.search_nearby_with_retries(37.7749, -122.4194, None, 3).unwrap();
//! assert_eq!(cells.len(), 8);
//!
//! // the quadtree is empty, so every attempt comes back empty
//! let err = indexer
//!     .search_nearby_with_retries(37.7749, -122.4194, Some(Technique::Quadtree), 3)
//!     .unwrap_err();
//! assert!(err.is_not_found());
//! ```

use crate::compute::spatial::geohash::GeohashSearch;
use crate::compute::spatial::{Nearby, NearbySearch, Quadtree, RTreeIndex};
use crate::config::{Config, Technique};
use crate::error::{DispatchError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Parameters of one nearby-point search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchRequest {
    pub lat: f64,
    pub lon: f64,
    /// `None` selects the indexer's default technique
    pub technique: Option<Technique>,
    pub max_retries: usize,
    /// Checked before every attempt; a search past its deadline stops early
    pub deadline: Option<Instant>,
}

impl SearchRequest {
    pub fn new(lat: f64, lon: f64, max_retries: usize) -> Self {
        Self {
            lat,
            lon,
            technique: None,
            max_retries,
            deadline: None,
        }
    }

    pub fn with_technique(mut self, technique: Technique) -> Self {
        self.technique = Some(technique);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Dispatches nearby-point searches to one of three interchangeable techniques.
pub struct GeoIndexer {
    default_technique: Technique,
    initial_radius: f64,
    geohashing: Arc<dyn NearbySearch>,
    quadtree: Arc<dyn NearbySearch>,
    rtree: Arc<dyn NearbySearch>,
}

impl GeoIndexer {
    /// Create an indexer over the given quadtree and R-tree handles.
    pub fn new(config: &Config, quadtree: Arc<Quadtree>, rtree: Arc<RTreeIndex>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            default_technique: config.default_technique,
            initial_radius: config.initial_radius,
            geohashing: Arc::new(GeohashSearch::new(config.point_precision)?),
            quadtree,
            rtree,
        })
    }

    /// Replace the handle that serves `technique`.
    pub fn with_handle(mut self, technique: Technique, handle: Arc<dyn NearbySearch>) -> Self {
        match technique {
            Technique::Geohashing => self.geohashing = handle,
            Technique::Quadtree => self.quadtree = handle,
            Technique::RTree => self.rtree = handle,
        }
        self
    }

    pub fn default_technique(&self) -> Technique {
        self.default_technique
    }

    pub fn initial_radius(&self) -> f64 {
        self.initial_radius
    }

    fn handle(&self, technique: Technique) -> &dyn NearbySearch {
        match technique {
            Technique::Geohashing => self.geohashing.as_ref(),
            Technique::Quadtree => self.quadtree.as_ref(),
            Technique::RTree => self.rtree.as_ref(),
        }
    }

    /// Search around `(lat, lon)`, doubling the radius after each empty attempt.
    ///
    /// Fails with [`DispatchError::NoResultsFound`] when all `max_retries` attempts are empty.
    pub fn search_nearby_with_retries(
        &self,
        lat: f64,
        lon: f64,
        technique: Option<Technique>,
        max_retries: usize,
    ) -> Result<Vec<Nearby>> {
        let mut request = SearchRequest::new(lat, lon, max_retries);
        request.technique = technique;
        self.search(&request)
    }

    /// Like [`search_nearby_with_retries`](Self::search_nearby_with_retries) with the technique
    /// given by name. An empty name selects the default technique; an unknown one fails with
    /// [`DispatchError::UnsupportedTechnique`] before any attempt is made.
    pub fn search_nearby_named(
        &self,
        lat: f64,
        lon: f64,
        technique: &str,
        max_retries: usize,
    ) -> Result<Vec<Nearby>> {
        let technique = Technique::resolve(technique, self.default_technique)?;
        self.search_nearby_with_retries(lat, lon, Some(technique), max_retries)
    }

    pub fn search(&self, request: &SearchRequest) -> Result<Vec<Nearby>> {
        let technique = request.technique.unwrap_or(self.default_technique);
        let handle = self.handle(technique);
        let mut radius = self.initial_radius;

        for attempt in 0..request.max_retries {
            if let Some(deadline) = request.deadline
                && Instant::now() >= deadline
            {
                return Err(DispatchError::SearchDeadlineExceeded { attempts: attempt });
            }

            let results = handle.search_nearby(request.lat, request.lon, radius)?;
            if !results.is_empty() {
                return Ok(results);
            }

            log::debug!(
                "{} search at ({}, {}) found nothing within {} (attempt {}/{})",
                technique,
                request.lat,
                request.lon,
                radius,
                attempt + 1,
                request.max_retries
            );
            radius *= 2.0;
        }

        Err(DispatchError::NoResultsFound {
            attempts: request.max_retries,
        })
    }
}

impl fmt::Debug for GeoIndexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoIndexer")
            .field("default_technique", &self.default_technique)
            .field("initial_radius", &self.initial_radius)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::spatial::{Bounds, IndexedPoint};
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Records every radius it is asked for and answers once `hit_at` is reached.
    #[derive(Default)]
    struct Recording {
        radii: Mutex<Vec<f64>>,
        hit_at: Option<usize>,
    }

    impl NearbySearch for Recording {
        fn search_nearby(&self, lat: f64, lon: f64, radius: f64) -> Result<Vec<Nearby>> {
            let mut radii = self.radii.lock();
            radii.push(radius);
            if self.hit_at == Some(radii.len()) {
                Ok(vec![Nearby::Point(IndexedPoint::from_lat_lon("hit", lat, lon))])
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn indexer() -> GeoIndexer {
        GeoIndexer::new(
            &Config::default(),
            Arc::new(Quadtree::new(Bounds::world())),
            Arc::new(RTreeIndex::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_exhausted_retries_double_the_radius() {
        let recording = Arc::new(Recording::default());
        let indexer = indexer().with_handle(Technique::Quadtree, recording.clone());

        let err = indexer
            .search_nearby_with_retries(0.0, 0.0, Some(Technique::Quadtree), 3)
            .unwrap_err();

        assert!(matches!(err, DispatchError::NoResultsFound { attempts: 3 }));
        assert_eq!(*recording.radii.lock(), vec![1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_stops_at_first_non_empty_attempt() {
        let recording = Arc::new(Recording {
            hit_at: Some(2),
            ..Recording::default()
        });
        let indexer = indexer().with_handle(Technique::RTree, recording.clone());

        let results = indexer
            .search_nearby_with_retries(1.0, 2.0, Some(Technique::RTree), 5)
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(*recording.radii.lock(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_missing_technique_uses_default() {
        let recording = Arc::new(Recording::default());
        let config = Config::default().with_default_technique(Technique::RTree);
        let indexer = GeoIndexer::new(
            &config,
            Arc::new(Quadtree::new(Bounds::world())),
            Arc::new(RTreeIndex::new()),
        )
        .unwrap()
        .with_handle(Technique::RTree, recording.clone());

        assert!(indexer.search_nearby_with_retries(0.0, 0.0, None, 2).is_err());
        assert_eq!(recording.radii.lock().len(), 2);

        assert!(indexer.search_nearby_named(0.0, 0.0, "", 1).is_err());
        assert_eq!(recording.radii.lock().len(), 3);
    }

    #[test]
    fn test_unknown_technique_name() {
        let err = indexer()
            .search_nearby_named(0.0, 0.0, "kdtree", 3)
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedTechnique(name) if name == "kdtree"));
    }

    #[test]
    fn test_zero_retries_finds_nothing() {
        let err = indexer()
            .search_nearby_with_retries(0.0, 0.0, Some(Technique::Geohashing), 0)
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoResultsFound { attempts: 0 }));
    }

    #[test]
    fn test_quadtree_found_after_widening() {
        let quadtree = Arc::new(Quadtree::new(Bounds::world()));
        quadtree.insert(IndexedPoint::from_lat_lon("a", 10.0, 13.0));
        let indexer = GeoIndexer::new(&Config::default(), quadtree, Arc::new(RTreeIndex::new()))
            .unwrap();

        // 3 degrees away: radii 1 and 2 miss, 4 hits
        let results = indexer
            .search_nearby_with_retries(10.0, 10.0, Some(Technique::Quadtree), 3)
            .unwrap();
        assert_eq!(results[0].as_point().unwrap().key, "a");

        assert!(
            indexer
                .search_nearby_with_retries(10.0, 10.0, Some(Technique::Quadtree), 2)
                .is_err()
        );
    }

    #[test]
    fn test_geohash_technique_returns_neighbor_cells() {
        let results = indexer()
            .search_nearby_with_retries(37.7749, -122.4194, Some(Technique::Geohashing), 3)
            .unwrap();
        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|r| r.as_cell().is_some()));
    }

    #[test]
    fn test_expired_deadline_stops_before_first_attempt() {
        let recording = Arc::new(Recording::default());
        let indexer = indexer().with_handle(Technique::Quadtree, recording.clone());

        let request = SearchRequest::new(0.0, 0.0, 3)
            .with_technique(Technique::Quadtree)
            .with_deadline(Instant::now() - Duration::from_millis(1));

        assert!(matches!(
            indexer.search(&request),
            Err(DispatchError::SearchDeadlineExceeded { attempts: 0 })
        ));
        assert!(recording.radii.lock().is_empty());
    }
}
