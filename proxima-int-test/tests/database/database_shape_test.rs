use proxima::common::{Logger, QueryHint, TypeInformation};
use proxima::data::DoubleVector;
use proxima::database::{
    BundleConnection, Database, DatabaseBuilder, MultipleObjectsBundle, ProxyDatabase,
};
use proxima::distance::{DistanceFunction, EuclideanDistance};
use proxima::errors::ErrorKind;
use proxima::id::{ObjectId, ObjectIdSet};
use proxima_int_test::test_util::{
    cleanup, create_spatial_test_context, create_test_context, insert_points, linear_knn,
    linear_scan_reference, random_points, run_test, scenario_points, vectors,
};
use proxima_spatial::rtree::{BulkSplitStrategy, RStarTreeIndexFactory, RTreeConfig};
use std::sync::Arc;

fn euclidean() -> Arc<dyn DistanceFunction<DoubleVector>> {
    Arc::new(EuclideanDistance)
}

#[test]
fn test_static_database_bulk_loads_rtree() {
    let points = random_points(500, 3, 21);
    let tree_config = RTreeConfig::builder()
        .bulk_strategy(BulkSplitStrategy::HilbertSort)
        .integrity_checks(true)
        .build()
        .unwrap();
    let db = DatabaseBuilder::new()
        .logger(Logger::silent())
        .index_factory::<DoubleVector>(Arc::new(RStarTreeIndexFactory::new(
            Arc::new(EuclideanDistance),
            tree_config,
        )))
        .open_static(Arc::new(BundleConnection::new(
            MultipleObjectsBundle::new().with_column(points.clone()),
        )))
        .unwrap();
    assert_eq!(db.len(), 500);

    let relation = vectors(&db).unwrap();
    let knn = db
        .query(&relation)
        .distance_function(euclidean())
        .hint(QueryHint::OptimizedOnly)
        .knn_query()
        .unwrap()
        .expect("R*-tree bound");

    let reference = linear_scan_reference(points).unwrap();
    let scan = linear_knn(&reference, euclidean()).unwrap();
    for id in (1..=500).step_by(25).map(ObjectId::new) {
        assert_eq!(knn.knn_for_id(id, 8).unwrap(), scan.knn_for_id(id, 8).unwrap());
    }

    let err = db.delete(ObjectId::new(1)).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnsupportedOperation);
}

#[test]
fn test_proxy_builds_its_own_tree() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let ids = insert_points(&db, scenario_points())?;
            let subset: ObjectIdSet = [ids[0], ids[2], ids[3]].into_iter().collect();

            let config = DatabaseBuilder::new()
                .logger(Logger::silent())
                .index_factory::<DoubleVector>(Arc::new(RStarTreeIndexFactory::new(
                    Arc::new(EuclideanDistance),
                    RTreeConfig::default(),
                )))
                .build_config()?;
            let proxy = ProxyDatabase::new(&db, &subset, config)?;
            assert_eq!(proxy.len(), 3);

            let relation = vectors(&proxy)?;
            let knn = proxy
                .query(&relation)
                .distance_function(euclidean())
                .hint(QueryHint::OptimizedOnly)
                .knn_query()?
                .expect("R*-tree bound");
            let result = knn.knn_for_id(ids[0], 3)?;
            assert_eq!(
                result.iter().map(|p| p.id()).collect::<Vec<_>>(),
                vec![ids[0], ids[2], ids[3]]
            );

            let err = proxy.delete(ids[0]).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UnsupportedOperation);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_duplicate_id_keeps_tree_in_sync() {
    run_test(
        || create_spatial_test_context(Arc::new(EuclideanDistance), RTreeConfig::default()),
        |ctx| {
            let db = ctx.db();
            db.insert(
                MultipleObjectsBundle::new()
                    .with_column(vec![DoubleVector::from([0.0, 0.0])])
                    .with_ids(vec![ObjectId::new(10)]),
            )?;
            let err = db
                .insert(
                    MultipleObjectsBundle::new()
                        .with_column(vec![
                            DoubleVector::from([1.0, 1.0]),
                            DoubleVector::from([2.0, 2.0]),
                        ])
                        .with_ids(vec![ObjectId::new(11), ObjectId::new(10)]),
                )
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::DuplicateId);
            assert_eq!(db.len(), 1);

            let relation = vectors(&db)?;
            let knn = db
                .query(&relation)
                .distance_function(db.distance_function())
                .hint(QueryHint::OptimizedOnly)
                .knn_query()?
                .expect("R*-tree bound");
            let result = knn.knn_for_id(ObjectId::new(10), 5)?;
            assert_eq!(result.len(), 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_query_construction_errors() {
    run_test(
        || create_spatial_test_context(Arc::new(EuclideanDistance), RTreeConfig::default()),
        |ctx| {
            let db = ctx.db();
            let err = vectors(&db).err().unwrap();
            assert_eq!(err.kind(), &ErrorKind::NoMatchingRelation);

            insert_points(&db, scenario_points())?;
            let relation = vectors(&db)?;
            let err = db.query(&relation).knn_query().err().unwrap();
            assert_eq!(err.kind(), &ErrorKind::ConfigurationError);

            let err = db
                .insert(MultipleObjectsBundle::new().with_column(vec![DoubleVector::from([
                    1.0, 2.0, 3.0,
                ])]))
                .unwrap_err();
            assert!(err.kind().is_validation());
            assert_eq!(db.len(), 5);

            let err = db
                .get_relation::<i64>(&TypeInformation::of::<i64>())
                .err()
                .unwrap();
            assert_eq!(err.kind(), &ErrorKind::NoMatchingRelation);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
