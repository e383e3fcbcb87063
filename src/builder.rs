//! Service builder for flexible configuration
//!
//! Wires a [`RideService`] from a configuration and its two external collaborators, the set
//! store behind the availability pool and the record store. Both default to in-memory stores.

use crate::compute::spatial::{Quadtree, RTreeIndex};
use crate::config::Config;
use crate::error::Result;
use crate::pool::DriverPool;
use crate::records::{MemoryRecordStore, RecordStore};
use crate::service::RideService;
use crate::storage::{MemorySetStore, SetStore};
use std::path::Path;
use std::sync::Arc;

/// Builder for a ride service with custom stores and settings.
#[derive(Default)]
pub struct DispatchBuilder {
    config: Config,
    set_store: Option<Arc<dyn SetStore>>,
    records: Option<Arc<dyn RecordStore>>,
}

impl DispatchBuilder {
    /// Create a new builder with default in-memory configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Load the engine configuration from a JSON file.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        self.config = Config::from_json_file(path)?;
        Ok(self)
    }

    /// Use `store` for the driver availability pool.
    pub fn set_store(mut self, store: Arc<dyn SetStore>) -> Self {
        self.set_store = Some(store);
        self
    }

    /// Use `records` for drivers, riders and trips.
    pub fn record_store(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = Some(records);
        self
    }

    /// Build the service. Fails when the configuration does not validate.
    pub fn build(self) -> Result<RideService> {
        self.config.validate()?;

        let set_store: Arc<dyn SetStore> = self
            .set_store
            .unwrap_or_else(|| Arc::new(MemorySetStore::new()));
        let records: Arc<dyn RecordStore> = self
            .records
            .unwrap_or_else(|| Arc::new(MemoryRecordStore::new()));

        let quadtree = Arc::new(Quadtree::with_capacity(
            self.config.quadtree_bounds,
            self.config.quadtree_capacity,
        ));
        let rtree = Arc::new(RTreeIndex::with_half_width(self.config.rtree_half_width));

        log::debug!(
            "Building ride service (default technique {}, driver precision {})",
            self.config.default_technique,
            self.config.driver_precision
        );

        RideService::new(
            self.config,
            records,
            Arc::new(DriverPool::new(set_store)),
            quadtree,
            rtree,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Technique;
    use geodispatch_types::NewDriver;
    use std::io::Write;

    #[test]
    fn test_builder_default() {
        let service = DispatchBuilder::new().build().unwrap();
        assert_eq!(service.config(), &Config::default());
        assert!(service.pool().is_empty());
    }

    #[test]
    fn test_builder_with_config() {
        let config = Config::default()
            .with_default_technique(Technique::Quadtree)
            .with_max_retries(5)
            .with_quadtree_capacity(8);
        let service = DispatchBuilder::new().config(config).build().unwrap();
        assert_eq!(service.indexer().default_technique(), Technique::Quadtree);
        assert_eq!(service.quadtree().capacity(), 8);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = Config::default().with_driver_precision(0);
        assert!(DispatchBuilder::new().config(config).build().is_err());
    }

    #[test]
    fn test_builder_shared_set_store() {
        let store = Arc::new(MemorySetStore::new());
        let service = DispatchBuilder::new()
            .set_store(store.clone())
            .build()
            .unwrap();
        service
            .register_driver(NewDriver::new("Ada", 37.7750, -122.4190))
            .unwrap();
        assert_eq!(store.stats().unwrap().member_count, 1);
    }

    #[test]
    fn test_builder_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_technique": "rtree", "initial_radius": 0.5}}"#).unwrap();

        let service = DispatchBuilder::new()
            .config_file(file.path())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(service.config().default_technique, Technique::RTree);
        assert_eq!(service.indexer().initial_radius(), 0.5);
    }
}
