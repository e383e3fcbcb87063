//! Compute layer for spatial encoding and point search.
//!
//! This module holds the pure spatial machinery:
//! - Geohash encoding, decoding and cell adjacency
//! - Quadtree and R-tree point indexes behind a common search seam
//! - Distance calculations
//!
//! It has no knowledge of drivers, trips or the availability pool.

pub mod spatial;
