use geodispatch::compute::spatial::geohash;
use geodispatch::{
    Bounds, Config, DispatchBuilder, DispatchError, DriverStatus, IndexedPoint, MemorySetStore,
    NewDriver, Quadtree, RTreeIndex, RideRequest, SetStore, Technique, pool_key,
};
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Keys of the pool sets currently holding at least one driver.
fn occupied_cells(store: &MemorySetStore) -> Vec<String> {
    store.keys_with_prefix("drivers:").unwrap()
}

#[test]
fn test_end_to_end_san_francisco() {
    init_logging();
    let store = Arc::new(MemorySetStore::new());
    let service = DispatchBuilder::new()
        .set_store(store.clone())
        .build()
        .unwrap();

    let rider = service.register_rider("Rin").unwrap();
    let driver = service
        .register_driver(NewDriver::new("Ada", 37.7750, -122.4190))
        .unwrap();
    let cell = driver.geohash.clone();
    assert_eq!(cell, geohash::encode(37.7749, -122.4194, 5).unwrap());

    let found = service.matcher().find_nearest_driver(37.7749, -122.4194).unwrap();
    assert_eq!(found.id, driver.id);

    let assignment = service
        .request_ride(&RideRequest::new(
            rider.id,
            (37.7749, -122.4194),
            (37.8044, -122.2712),
        ))
        .unwrap();
    assert_eq!(assignment.driver.id, driver.id);
    assert!(store.members(&pool_key(&cell)).unwrap().is_empty());

    let trip = service.trip(assignment.trip.id).unwrap();
    assert_eq!(trip.rider_id, rider.id);
    assert_eq!(trip.driver_id, driver.id);
}

#[test]
fn test_pool_consistency_sequence() {
    init_logging();
    let store = Arc::new(MemorySetStore::new());
    let service = DispatchBuilder::new()
        .set_store(store.clone())
        .build()
        .unwrap();

    // register at cell A
    let driver = service
        .register_driver(NewDriver::new("Ada", 37.7750, -122.4190))
        .unwrap();
    let cell_a = pool_key(&driver.geohash);
    assert_eq!(occupied_cells(&store), vec![cell_a.clone()]);

    // relocate to cell B
    let moved = service
        .update_driver_location(driver.id, 40.7128, -74.0060, None)
        .unwrap();
    let cell_b = pool_key(&moved.geohash);
    assert_ne!(cell_a, cell_b);
    assert_eq!(occupied_cells(&store), vec![cell_b.clone()]);

    // on trip: in no cell
    service
        .set_driver_status(driver.id, DriverStatus::OnTrip)
        .unwrap();
    assert!(occupied_cells(&store).is_empty());

    // available again: back in cell B only
    service
        .set_driver_status(driver.id, DriverStatus::Available)
        .unwrap();
    assert_eq!(occupied_cells(&store), vec![cell_b]);
    assert_eq!(store.stats().unwrap().member_count, 1);
}

#[test]
fn test_matcher_ignores_closer_driver_outside_ring() {
    let service = DispatchBuilder::new().build().unwrap();
    let rider_cell = geohash::encode(37.7749, -122.4194, 5).unwrap();

    // two cells east of the rider: outside the ring
    let east = geohash::neighbor(&rider_cell, geohash::Direction::E)
        .unwrap()
        .unwrap();
    let far = geohash::neighbor(&east, geohash::Direction::E)
        .unwrap()
        .unwrap();
    let far_center = geohash::decode(&far).unwrap();
    service
        .register_driver(NewDriver::new(
            "Far",
            far_center.latitude,
            far_center.longitude,
        ))
        .unwrap();

    assert!(matches!(
        service.matcher().find_nearest_driver(37.7749, -122.4194),
        Err(DispatchError::NoAvailableDrivers)
    ));

    // a driver in the north-east corner of the ring is found
    let ne = geohash::neighbor(&rider_cell, geohash::Direction::NE)
        .unwrap()
        .unwrap();
    let ne_center = geohash::decode(&ne).unwrap();
    let near = service
        .register_driver(NewDriver::new("Ring", ne_center.latitude, ne_center.longitude))
        .unwrap();

    assert_eq!(
        service
            .matcher()
            .find_nearest_driver(37.7749, -122.4194)
            .unwrap()
            .id,
        near.id
    );
}

#[test]
fn test_dispatcher_over_shared_indexes() {
    let config = Config::default().with_max_retries(3);
    let service = DispatchBuilder::new().config(config).build().unwrap();

    service
        .quadtree()
        .insert(IndexedPoint::from_lat_lon("depot", 10.0, 12.5));
    service.rtree().insert("depot", 10.0, 12.5);

    for technique in [Technique::Quadtree, Technique::RTree] {
        let hits = service.search_nearby(10.0, 10.0, Some(technique)).unwrap();
        assert_eq!(hits.len(), 1, "{technique}");
        assert_eq!(hits[0].as_point().unwrap().key, "depot");
    }

    // the indexes are not fed from the pool
    service
        .register_driver(NewDriver::new("Ada", 37.7750, -122.4190))
        .unwrap();
    assert_eq!(service.quadtree().len(), 1);
    assert_eq!(service.rtree().len(), 1);

    let err = service
        .search_nearby(-40.0, 100.0, Some(Technique::Quadtree))
        .unwrap_err();
    assert!(matches!(err, DispatchError::NoResultsFound { attempts: 3 }));
}

#[test]
fn test_named_technique_resolution() {
    let service = DispatchBuilder::new().build().unwrap();
    let indexer = service.indexer();

    let cells = indexer
        .search_nearby_named(37.7749, -122.4194, "geohash", 1)
        .unwrap();
    assert_eq!(cells.len(), 8);

    assert!(matches!(
        indexer.search_nearby_named(37.7749, -122.4194, "kd-tree", 3),
        Err(DispatchError::UnsupportedTechnique(_))
    ));
}

#[test]
fn test_quadtree_matches_brute_force() {
    let tree = Quadtree::with_capacity(Bounds::new(0.0, 0.0, 100.0, 100.0), 4);

    // deterministic scatter, including duplicates
    let mut points = Vec::new();
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    for i in 0..500 {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let x = (state >> 33) as f64 % 100.0;
        let y = (state >> 13) as f64 % 100.0;
        let point = IndexedPoint::new(format!("p{i}"), x, y);
        assert!(tree.insert(point.clone()));
        points.push(point);
        if i % 50 == 0 {
            let dup = IndexedPoint::new(format!("dup{i}"), x, y);
            assert!(tree.insert(dup.clone()));
            points.push(dup);
        }
    }
    assert_eq!(tree.len(), points.len());

    tree.visit(|bounds, resident, _| {
        for p in resident {
            assert!(bounds.contains(p.x, p.y), "{} outside {:?}", p.key, bounds);
        }
    });

    for &(cx, cy, r) in &[(50.0, 50.0, 10.0), (0.0, 0.0, 25.0), (99.0, 1.0, 5.0), (30.0, 70.0, 0.0)] {
        let mut found: Vec<String> = tree.search(cx, cy, r).into_iter().map(|p| p.key).collect();
        let mut expected: Vec<String> = points
            .iter()
            .filter(|p| p.distance_to(cx, cy) <= r)
            .map(|p| p.key.clone())
            .collect();
        found.sort();
        expected.sort();
        assert_eq!(found, expected);
    }
}

#[test]
fn test_rtree_and_quadtree_agree_inside_circle() {
    let tree = Quadtree::new(Bounds::world());
    let rtree = RTreeIndex::new();
    for i in 0..20 {
        let lat = i as f64 * 0.5;
        let lon = i as f64 * -0.25;
        tree.insert(IndexedPoint::from_lat_lon(format!("p{i}"), lat, lon));
        rtree.insert(format!("p{i}"), lat, lon);
    }

    // every quadtree (circle) hit is also an R-tree (square) hit
    let circle: Vec<String> = tree.search(-1.0, 2.0, 1.5).into_iter().map(|p| p.key).collect();
    let square: Vec<String> = rtree.search(2.0, -1.0, 1.5).into_iter().map(|p| p.key).collect();
    assert!(!circle.is_empty());
    assert!(circle.iter().all(|k| square.contains(k)));
}
