use proxima::common::{Logger, QueryHint};
use proxima::data::DoubleVector;
use proxima::database::{Database, DatabaseBuilder, HashmapDatabase};
use proxima::distance::{
    DistanceFunction, EuclideanDistance, ManhattanDistance, MaximumDistance,
    SpatialDistanceFunction,
};
use proxima::errors::ProximaResult;
use proxima::id::ObjectId;
use proxima::index::PivotTableIndexFactory;
use proxima_int_test::test_util::{
    insert_points, linear_knn, linear_range, linear_scan_reference, random_points, vectors,
};
use proxima_spatial::database::SpatialIndexDatabase;
use proxima_spatial::deliclu::DeLiCluTreeFactory;
use proxima_spatial::rtree::{BulkSplitStrategy, NodeSplitStrategy, RTreeConfig};
use std::sync::Arc;

const SIZES: [usize; 4] = [1, 10, 200, 2000];

/// Compares kNN and (optionally) range answers of `db` with a linear scan
/// over `reference` for a sample of ids.
fn assert_matches_linear_scan<D: Database>(
    db: &D,
    reference: &HashmapDatabase,
    function: Arc<dyn DistanceFunction<DoubleVector>>,
    scan_function: Arc<dyn DistanceFunction<DoubleVector>>,
    with_range: bool,
) -> ProximaResult<()> {
    let relation = vectors(db)?;
    let knn = db
        .query(&relation)
        .distance_function(function.clone())
        .hint(QueryHint::OptimizedOnly)
        .knn_query()?
        .expect("index bound to the distance");
    let scan_knn = linear_knn(reference, scan_function.clone())?;

    let ids = relation.ids();
    let step = (ids.len() / 25).max(1);
    for id in ids.iter().step_by(step) {
        for k in [1, 4, 11] {
            assert_eq!(
                knn.knn_for_id(*id, k)?,
                scan_knn.knn_for_id(*id, k)?,
                "kNN mismatch for {} with k={}",
                id,
                k
            );
        }
    }

    if with_range {
        let range = db
            .query(&relation)
            .distance_function(function)
            .hint(QueryHint::OptimizedOnly)
            .range_query()?
            .expect("index bound to the distance");
        let scan_range = linear_range(reference, scan_function)?;
        for id in ids.iter().step_by(step) {
            for epsilon in [0.0, 0.05, 0.2] {
                assert_eq!(
                    range.range_for_id(*id, epsilon)?,
                    scan_range.range_for_id(*id, epsilon)?,
                    "range mismatch for {} with epsilon={}",
                    id,
                    epsilon
                );
            }
        }
    }
    Ok(())
}

/// Every 7th id, deleted from both databases.
fn delete_some<D: Database>(db: &D, reference: &HashmapDatabase) -> ProximaResult<()> {
    let doomed: Vec<ObjectId> = db.id_view().ids().into_iter().step_by(7).collect();
    db.delete_all(&doomed)?;
    reference.delete_all(&doomed)?;
    assert_eq!(db.len(), reference.len());
    Ok(())
}

fn check_spatial(
    function: Arc<dyn SpatialDistanceFunction>,
    scan_function: Arc<dyn DistanceFunction<DoubleVector>>,
    tree_config: RTreeConfig,
    dimensionality: usize,
) {
    for (round, size) in SIZES.iter().enumerate() {
        let points = random_points(*size, dimensionality, 100 + round as u64);
        let config = DatabaseBuilder::new()
            .logger(Logger::silent())
            .build_config()
            .unwrap();
        let db = SpatialIndexDatabase::new(config, function.clone(), tree_config.clone()).unwrap();
        let reference = linear_scan_reference(points.clone()).unwrap();
        insert_points(&db, points).unwrap();

        assert_matches_linear_scan(&db, &reference, db.distance_function(), scan_function.clone(), true)
            .unwrap();
        delete_some(&db, &reference).unwrap();
        if !db.is_empty() {
            assert_matches_linear_scan(
                &db,
                &reference,
                db.distance_function(),
                scan_function.clone(),
                true,
            )
            .unwrap();
        }
    }
}

fn small_nodes() -> RTreeConfig {
    RTreeConfig::builder()
        .capacities(6, 5)
        .integrity_checks(true)
        .build()
        .unwrap()
}

#[test]
fn test_rtree_matches_linear_scan() {
    check_spatial(
        Arc::new(EuclideanDistance),
        Arc::new(EuclideanDistance),
        RTreeConfig::default(),
        2,
    );
}

#[test]
fn test_rtree_small_nodes_matches_linear_scan() {
    check_spatial(
        Arc::new(EuclideanDistance),
        Arc::new(EuclideanDistance),
        small_nodes(),
        3,
    );
}

#[test]
fn test_rtree_center_split_matches_linear_scan() {
    let config = RTreeConfig::builder()
        .capacities(8, 8)
        .split_strategy(NodeSplitStrategy::CenterSort)
        .integrity_checks(true)
        .build()
        .unwrap();
    check_spatial(Arc::new(ManhattanDistance), Arc::new(ManhattanDistance), config, 2);
}

#[test]
fn test_bulk_loaded_rtree_matches_linear_scan() {
    for strategy in [
        BulkSplitStrategy::FileOrder,
        BulkSplitStrategy::OneDimSort,
        BulkSplitStrategy::SortTileRecursive,
        BulkSplitStrategy::HilbertSort,
    ] {
        let config = RTreeConfig::builder()
            .capacities(7, 6)
            .bulk_strategy(strategy)
            .integrity_checks(true)
            .build()
            .unwrap();
        check_spatial(Arc::new(MaximumDistance), Arc::new(MaximumDistance), config, 2);
    }
}

#[test]
fn test_deliclu_tree_matches_linear_scan() {
    for (round, size) in SIZES.iter().enumerate() {
        let points = random_points(*size, 2, 300 + round as u64);
        let db = DatabaseBuilder::new()
            .logger(Logger::silent())
            .index_factory::<DoubleVector>(Arc::new(DeLiCluTreeFactory::new(
                Arc::new(EuclideanDistance),
                small_nodes(),
            )))
            .open_hashmap()
            .unwrap();
        let reference = linear_scan_reference(points.clone()).unwrap();
        insert_points(&db, points).unwrap();

        let function: Arc<dyn DistanceFunction<DoubleVector>> = Arc::new(EuclideanDistance);
        assert_matches_linear_scan(&db, &reference, function.clone(), function.clone(), true)
            .unwrap();
        delete_some(&db, &reference).unwrap();
        if !db.is_empty() {
            assert_matches_linear_scan(&db, &reference, function.clone(), function, true)
                .unwrap();
        }
    }
}

#[test]
fn test_pivot_table_matches_linear_scan() {
    for (round, size) in SIZES.iter().enumerate() {
        let points = random_points(*size, 3, 500 + round as u64);
        let function: Arc<dyn DistanceFunction<DoubleVector>> = Arc::new(EuclideanDistance);
        let db = DatabaseBuilder::new()
            .logger(Logger::silent())
            .index_factory::<DoubleVector>(Arc::new(PivotTableIndexFactory::<DoubleVector>::new(
                function.clone(),
                4,
            )))
            .open_hashmap()
            .unwrap();
        let reference = linear_scan_reference(points.clone()).unwrap();
        insert_points(&db, points).unwrap();

        assert_matches_linear_scan(&db, &reference, function.clone(), function.clone(), true)
            .unwrap();
        delete_some(&db, &reference).unwrap();
        if !db.is_empty() {
            assert_matches_linear_scan(&db, &reference, function.clone(), function, true)
                .unwrap();
        }
    }
}
