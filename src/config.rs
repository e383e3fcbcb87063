//! Engine configuration.
//!
//! The configuration is a plain serializable struct: every field has a default, so a partial JSON
//! or TOML document is enough. Unknown technique names are rejected while parsing, not on the
//! first search.
//!
//! ```rust
//! use geodispatch::{Config, Technique};
//!
//! let json = r#"{
//!     "default_technique": "quadtree",
//!     "max_retries": 5
//! }"#;
//! let config = Config::from_json(json).unwrap();
//! assert_eq!(config.default_technique, Technique::Quadtree);
//! assert_eq!(config.driver_precision, 5);
//!
//! assert!(Config::from_json(r#"{"default_technique": "kdtree"}"#).is_err());
//! ```

use crate::compute::spatial::quadtree::Bounds;
use crate::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Point-search technique used by the [`GeoIndexer`](crate::GeoIndexer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Technique {
    /// Enumerate the neighbor cells of the query point's geohash
    #[default]
    Geohashing,
    /// Radius search in the quadtree
    Quadtree,
    /// Rectangle intersection search in the R-tree
    RTree,
}

impl Technique {
    pub const ALL: [Technique; 3] = [Technique::Geohashing, Technique::Quadtree, Technique::RTree];

    pub fn as_str(&self) -> &'static str {
        match self {
            Technique::Geohashing => "geohashing",
            Technique::Quadtree => "quadtree",
            Technique::RTree => "rtree",
        }
    }

    /// Resolve an optional technique name; an empty name selects `default`.
    pub fn resolve(name: &str, default: Technique) -> Result<Technique> {
        if name.is_empty() {
            Ok(default)
        } else {
            name.parse()
        }
    }
}

impl FromStr for Technique {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geohashing" | "geohash" => Ok(Technique::Geohashing),
            "quadtree" => Ok(Technique::Quadtree),
            "rtree" | "r-tree" | "r_tree" => Ok(Technique::RTree),
            _ => Err(DispatchError::UnsupportedTechnique(s.to_string())),
        }
    }
}

impl TryFrom<String> for Technique {
    type Error = DispatchError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Technique> for String {
    fn from(technique: Technique) -> Self {
        technique.as_str().to_string()
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Technique used when a search does not name one
    #[serde(default)]
    pub default_technique: Technique,

    /// Attempts made by a point search before giving up
    #[serde(default = "Config::default_max_retries")]
    pub max_retries: usize,

    /// Search radius of the first attempt, in coordinate degrees (not meters)
    #[serde(default = "Config::default_initial_radius")]
    pub initial_radius: f64,

    /// Geohash precision of the driver availability pool cells
    #[serde(default = "Config::default_driver_precision")]
    pub driver_precision: usize,

    /// Geohash precision used by the geohashing point-search technique
    #[serde(default = "Config::default_point_precision")]
    pub point_precision: usize,

    /// Region covered by the quadtree (x = longitude, y = latitude)
    #[serde(default = "Bounds::world")]
    pub quadtree_bounds: Bounds,

    /// Points a quadtree leaf holds before it subdivides
    #[serde(default = "Config::default_quadtree_capacity")]
    pub quadtree_capacity: usize,

    /// Half-width of the rectangle wrapping each R-tree point
    #[serde(default = "Config::default_rtree_half_width")]
    pub rtree_half_width: f64,
}

impl Config {
    const fn default_max_retries() -> usize {
        3
    }

    const fn default_initial_radius() -> f64 {
        1.0
    }

    const fn default_driver_precision() -> usize {
        5
    }

    const fn default_point_precision() -> usize {
        12
    }

    const fn default_quadtree_capacity() -> usize {
        4
    }

    const fn default_rtree_half_width() -> f64 {
        0.0001
    }

    pub fn with_default_technique(mut self, technique: Technique) -> Self {
        self.default_technique = technique;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_radius(mut self, radius: f64) -> Self {
        self.initial_radius = radius;
        self
    }

    pub fn with_driver_precision(mut self, precision: usize) -> Self {
        self.driver_precision = precision;
        self
    }

    pub fn with_point_precision(mut self, precision: usize) -> Self {
        self.point_precision = precision;
        self
    }

    pub fn with_quadtree_bounds(mut self, bounds: Bounds) -> Self {
        self.quadtree_bounds = bounds;
        self
    }

    pub fn with_quadtree_capacity(mut self, capacity: usize) -> Self {
        self.quadtree_capacity = capacity;
        self
    }

    pub fn with_rtree_half_width(mut self, half_width: f64) -> Self {
        self.rtree_half_width = half_width;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for precision in [self.driver_precision, self.point_precision] {
            if !(1..=12).contains(&precision) {
                return Err(DispatchError::InvalidPrecision(precision));
            }
        }

        if self.max_retries == 0 {
            return Err(DispatchError::InvalidConfig(
                "max_retries must be greater than zero".to_string(),
            ));
        }

        if !self.initial_radius.is_finite() || self.initial_radius <= 0.0 {
            return Err(DispatchError::InvalidConfig(format!(
                "initial_radius must be positive, got {}",
                self.initial_radius
            )));
        }

        if !self.quadtree_bounds.is_valid() {
            return Err(DispatchError::InvalidConfig(format!(
                "quadtree bounds are empty or non-finite: {:?}",
                self.quadtree_bounds
            )));
        }

        if self.quadtree_capacity == 0 {
            return Err(DispatchError::InvalidConfig(
                "quadtree_capacity must be greater than zero".to_string(),
            ));
        }

        if !self.rtree_half_width.is_finite() || self.rtree_half_width <= 0.0 {
            return Err(DispatchError::InvalidConfig(format!(
                "rtree_half_width must be positive, got {}",
                self.rtree_half_width
            )));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str)
            .map_err(|e| DispatchError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DispatchError::InvalidConfig(e.to_string()))
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_technique: Technique::default(),
            max_retries: Self::default_max_retries(),
            initial_radius: Self::default_initial_radius(),
            driver_precision: Self::default_driver_precision(),
            point_precision: Self::default_point_precision(),
            quadtree_bounds: Bounds::world(),
            quadtree_capacity: Self::default_quadtree_capacity(),
            rtree_half_width: Self::default_rtree_half_width(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_technique, Technique::Geohashing);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_radius, 1.0);
        assert_eq!(config.driver_precision, 5);
        assert_eq!(config.point_precision, 12);
        assert_eq!(config.quadtree_capacity, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default()
            .with_default_technique(Technique::RTree)
            .with_max_retries(6)
            .with_initial_radius(0.25);

        let json = config.to_json().unwrap();
        assert!(json.contains(r#""default_technique": "rtree""#));

        let deserialized = Config::from_json(&json).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_quadtree_capacity_setter() {
        let config = Config::default().with_quadtree_capacity(16);
        assert_eq!(config.quadtree_capacity, 16);
        assert!(config.validate().is_ok());
        assert!(Config::default().with_quadtree_capacity(0).validate().is_err());
    }

    #[test]
    fn test_technique_parsing() {
        assert_eq!("geohash".parse::<Technique>().unwrap(), Technique::Geohashing);
        assert_eq!("QuadTree".parse::<Technique>().unwrap(), Technique::Quadtree);
        assert_eq!("rtree".parse::<Technique>().unwrap(), Technique::RTree);
        assert!(matches!(
            "kdtree".parse::<Technique>(),
            Err(DispatchError::UnsupportedTechnique(name)) if name == "kdtree"
        ));
    }

    #[test]
    fn test_technique_resolve_empty_uses_default() {
        assert_eq!(
            Technique::resolve("", Technique::Quadtree).unwrap(),
            Technique::Quadtree
        );
        assert_eq!(
            Technique::resolve("rtree", Technique::Quadtree).unwrap(),
            Technique::RTree
        );
    }

    #[test]
    fn test_unknown_technique_fails_at_load() {
        let err = Config::from_json(r#"{"default_technique": "voronoi"}"#).unwrap_err();
        assert!(err.to_string().contains("voronoi"));
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            Config::default().with_driver_precision(0).validate(),
            Err(DispatchError::InvalidPrecision(0))
        ));
        assert!(matches!(
            Config::default().with_point_precision(13).validate(),
            Err(DispatchError::InvalidPrecision(13))
        ));
        assert!(Config::default().with_max_retries(0).validate().is_err());
        assert!(Config::default().with_initial_radius(-1.0).validate().is_err());
        assert!(Config::default().with_rtree_half_width(0.0).validate().is_err());
        assert!(
            Config::default()
                .with_quadtree_bounds(Bounds::new(1.0, 0.0, 0.0, 1.0))
                .validate()
                .is_err()
        );
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_config_toml_round_trip() {
        let config = Config::default().with_default_technique(Technique::Quadtree);
        let toml_str = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&toml_str).unwrap(), config);
    }
}
