use proxima::common::{Logger, QueryHint};
use proxima::data::DoubleVector;
use proxima::database::{BundleConnection, Database, DatabaseBuilder, MultipleObjectsBundle};
use proxima::distance::{DistanceFunction, EuclideanDistance};
use proxima::errors::{ErrorKind, ProximaResult};
use proxima::id::ObjectId;
use proxima_int_test::test_util::{
    cleanup, create_spatial_test_context, create_test_context, insert_points, run_test,
    scenario_points, vectors,
};
use proxima_spatial::rtree::RTreeConfig;
use std::sync::Arc;

/// Range and kNN around P1, answered by whatever `hints` lets the database pick.
fn check_five_points<D: Database>(
    db: &D,
    ids: &[ObjectId],
    function: Arc<dyn DistanceFunction<DoubleVector>>,
    hints: &[QueryHint],
) -> ProximaResult<()> {
    let relation = vectors(db)?;
    let range = db
        .query(&relation)
        .distance_function(function.clone())
        .hints(hints)
        .range_query()?
        .expect("range query available");
    let result = range.range_for_id(ids[0], 1.5)?;
    let found: Vec<(ObjectId, f64)> = result.iter().map(|p| (p.id(), p.distance())).collect();
    assert_eq!(found, vec![(ids[0], 0.0), (ids[1], 1.0), (ids[2], 1.0)]);

    let knn = db
        .query(&relation)
        .distance_function(function)
        .hints(hints)
        .knn_query()?
        .expect("knn query available");
    let result = knn.knn_for_id(ids[0], 2)?;
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].id(), ids[0]);
    assert_eq!(result[1].id(), ids[1]);
    Ok(())
}

#[test]
fn test_five_points_linear_scan() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let ids = insert_points(&db, scenario_points())?;
            check_five_points(&db, &ids, Arc::new(EuclideanDistance), &[])
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_five_points_rtree() {
    run_test(
        || create_spatial_test_context(Arc::new(EuclideanDistance), RTreeConfig::default()),
        |ctx| {
            let db = ctx.db();
            let ids = insert_points(&db, scenario_points())?;
            check_five_points(&db, &ids, db.distance_function(), &[QueryHint::OptimizedOnly])
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_five_points_pivot_table() {
    let db = DatabaseBuilder::new()
        .logger(Logger::silent())
        .open_metrical(Arc::new(EuclideanDistance), 2)
        .unwrap();
    let ids = insert_points(&db, scenario_points()).unwrap();
    check_five_points(&db, &ids, db.distance_function(), &[QueryHint::OptimizedOnly]).unwrap();
}

#[test]
fn test_five_points_static_database() {
    let connection = Arc::new(BundleConnection::new(
        MultipleObjectsBundle::new().with_column(scenario_points()),
    ));
    let db = DatabaseBuilder::new()
        .logger(Logger::silent())
        .open_static(connection)
        .unwrap();
    let ids: Vec<ObjectId> = (1..=5).map(ObjectId::new).collect();
    assert_eq!(db.id_view().ids(), ids);
    check_five_points(&db, &ids, Arc::new(EuclideanDistance), &[]).unwrap();
}

#[test]
fn test_deleted_point_disappears_from_every_query() {
    run_test(
        || create_spatial_test_context(Arc::new(EuclideanDistance), RTreeConfig::default()),
        |ctx| {
            let db = ctx.db();
            let ids = insert_points(&db, scenario_points())?;
            let removed = db.delete(ids[1])?;
            assert_eq!(removed.id(), Some(ids[1]));
            assert_eq!(removed.find::<DoubleVector>(), Some(&DoubleVector::from([1.0, 0.0])));

            let relation = vectors(&db)?;
            assert_eq!(relation.get(ids[1]).unwrap_err().kind(), &ErrorKind::ObjectNotFound);

            let knn = db
                .query(&relation)
                .distance_function(db.distance_function())
                .hint(QueryHint::OptimizedOnly)
                .knn_query()?
                .expect("R*-tree bound");
            let result = knn.knn_for_id(ids[0], 5)?;
            assert_eq!(result.len(), 4);
            assert!(result.iter().all(|p| p.id() != ids[1]));
            assert_eq!(result[1].id(), ids[2]);

            let range = db
                .query(&relation)
                .distance_function(db.distance_function())
                .hint(QueryHint::OptimizedOnly)
                .range_query()?
                .expect("R*-tree bound");
            let result = range.range_for_id(ids[0], 1.5)?;
            assert_eq!(
                result.iter().map(|p| p.id()).collect::<Vec<_>>(),
                vec![ids[0], ids[2]]
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
