use proxima::common::{Logger, QueryHint};
use proxima::data::DoubleVector;
use proxima::database::{Database, DatabaseBuilder, HashmapDatabase};
use proxima::distance::{DistanceFunction, EuclideanDistance};
use proxima::errors::ErrorKind;
use proxima::id::ObjectId;
use proxima::index::MaterializeKnnPreprocessorFactory;
use proxima_int_test::test_util::{
    insert_points, linear_knn, linear_scan_reference, random_points, vectors,
};
use std::sync::Arc;

const K: usize = 10;

fn euclidean() -> Arc<dyn DistanceFunction<DoubleVector>> {
    Arc::new(EuclideanDistance)
}

fn materialized_db() -> HashmapDatabase {
    DatabaseBuilder::new()
        .logger(Logger::silent())
        .index_factory::<DoubleVector>(Arc::new(
            MaterializeKnnPreprocessorFactory::<DoubleVector>::new(euclidean(), K),
        ))
        .open_hashmap()
        .unwrap()
}

fn assert_same_answers(db: &HashmapDatabase, reference: &HashmapDatabase) {
    let relation = vectors(db).unwrap();
    let knn = db
        .query(&relation)
        .distance_function(euclidean())
        .hints(&[QueryHint::OptimizedOnly, QueryHint::MaxK(K)])
        .knn_query()
        .unwrap()
        .expect("materialized lists bound");
    let rknn = db
        .query(&relation)
        .distance_function(euclidean())
        .hints(&[QueryHint::OptimizedOnly, QueryHint::MaxK(K)])
        .rknn_query()
        .unwrap()
        .expect("materialized lists bound");

    let scan_knn = linear_knn(reference, euclidean()).unwrap();
    let scan_relation = vectors(reference).unwrap();
    let scan_rknn = reference
        .query(&scan_relation)
        .distance_function(euclidean())
        .rknn_query()
        .unwrap()
        .unwrap();

    for id in relation.ids().iter().step_by(9) {
        for k in [1, 5, K] {
            assert_eq!(knn.knn_for_id(*id, k).unwrap(), scan_knn.knn_for_id(*id, k).unwrap());
            assert_eq!(
                rknn.rknn_for_id(*id, k).unwrap(),
                scan_rknn.rknn_for_id(*id, k).unwrap()
            );
        }
    }
}

#[test]
fn test_materialized_lists_match_linear_scan() {
    let points = random_points(300, 2, 77);
    let db = materialized_db();
    insert_points(&db, points[..200].to_vec()).unwrap();
    let reference = linear_scan_reference(points[..200].to_vec()).unwrap();
    assert_same_answers(&db, &reference);

    // lists follow later inserts and deletes
    insert_points(&db, points[200..].to_vec()).unwrap();
    insert_points(&reference, points[200..].to_vec()).unwrap();
    let doomed: Vec<ObjectId> = db.id_view().ids().into_iter().step_by(5).collect();
    db.delete_all(&doomed).unwrap();
    reference.delete_all(&doomed).unwrap();
    assert_same_answers(&db, &reference);
}

#[test]
fn test_k_above_materialized_k() {
    let db = materialized_db();
    let ids = insert_points(&db, random_points(50, 2, 3)).unwrap();
    let relation = vectors(&db).unwrap();

    let declined = db
        .query(&relation)
        .distance_function(euclidean())
        .hints(&[QueryHint::OptimizedOnly, QueryHint::MaxK(K + 1)])
        .knn_query()
        .unwrap();
    assert!(declined.is_none());

    let fallback = db
        .query(&relation)
        .distance_function(euclidean())
        .hint(QueryHint::MaxK(K + 1))
        .knn_query()
        .unwrap()
        .expect("linear scan fallback");
    assert_eq!(fallback.knn_for_id(ids[0], K + 1).unwrap().len(), K + 1);

    let bound = db
        .query(&relation)
        .distance_function(euclidean())
        .hint(QueryHint::OptimizedOnly)
        .knn_query()
        .unwrap()
        .expect("materialized lists bound");
    let err = bound.knn_for_id(ids[0], K + 1).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
}
