use std::sync::Arc;

use proxima::common::QueryHint;
use proxima::database::Database;
use proxima::distance::EuclideanDistance;
use proxima::errors::{ErrorKind, ProximaError, ProximaResult};
use proxima_int_test::test_util::{
    cleanup, create_spatial_test_context, insert_points, random_points, vectors,
};
use proxima_spatial::rtree::RTreeConfig;

fn main() -> ProximaResult<()> {
    colog::init();
    println!("Starting stress test...");
    let ctx = create_spatial_test_context(Arc::new(EuclideanDistance), RTreeConfig::default())?;
    let db = ctx.db();

    let count = 200_000;
    let start = std::time::Instant::now();
    let ids = insert_points(&db, random_points(count, 4, 7))?;
    println!("Inserted {} points in {:?}", ids.len(), start.elapsed());

    let relation = vectors(&db)?;
    let knn = db
        .query(&relation)
        .distance_function(db.distance_function())
        .hint(QueryHint::OptimizedOnly)
        .knn_query()?
        .ok_or_else(|| ProximaError::new("R*-tree did not bind", ErrorKind::InternalError))?;

    let start = std::time::Instant::now();
    let mut found = 0;
    for id in ids.iter().step_by(100) {
        found += knn.knn_for_id(*id, 10)?.len();
    }
    println!("Answered {} kNN queries in {:?}", ids.len() / 100, start.elapsed());
    println!("Collected {} neighbors", found);

    let start = std::time::Instant::now();
    db.delete_all(&ids[..count / 2])?;
    println!("Deleted {} points in {:?}", count / 2, start.elapsed());

    cleanup(ctx)
}
