use proxima::common::{Logger, TypeInformation};
use proxima::data::DoubleVector;
use proxima::database::{Database, DatabaseBuilder, HashmapDatabase, MultipleObjectsBundle};
use proxima::distance::{DistanceFunction, SpatialDistanceFunction};
use proxima::errors::{ErrorKind, ProximaError, ProximaResult};
use proxima::id::ObjectId;
use proxima::query::{KnnQuery, RangeQuery};
use proxima::relation::RelationRef;
use proxima_spatial::database::SpatialIndexDatabase;
use proxima_spatial::rtree::RTreeConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::backtrace::Backtrace;
use std::panic::{RefUnwindSafe, UnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Runs a test between its setup and teardown.
///
/// The teardown runs even when the test body fails; a failure in any of
/// the three phases fails the test with the phase named.
pub fn run_test<D, B, T, A>(before: B, test: T, after: A)
where
    D: Database + Clone,
    B: Fn() -> ProximaResult<TestContext<D>> + UnwindSafe + RefUnwindSafe,
    T: Fn(TestContext<D>) -> ProximaResult<()> + UnwindSafe + RefUnwindSafe,
    A: Fn(TestContext<D>) -> ProximaResult<()> + UnwindSafe + RefUnwindSafe,
{
    let start_time = Instant::now();

    let result = std::panic::catch_unwind(|| {
        let backtrace = Backtrace::capture();
        let ctx = match before() {
            Ok(ctx) => ctx,
            Err(e) => return Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
        };
        match test(ctx.clone()) {
            Ok(_) => after(ctx)
                .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
            Err(e) => {
                let _ = after(ctx);
                Err((format!("Test failed: {:?}", e), backtrace.to_string()))
            }
        }
    });

    let elapsed = start_time.elapsed();
    let (error, backtrace) = match result {
        Ok(Ok(_)) => return,
        Ok(Err((e, bt))) => (e, bt),
        Err(panic_err) => {
            let message = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            (format!("Panic: {}", message), String::new())
        }
    };

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {:?}", elapsed);
    eprintln!("Error: {}", error);
    if !backtrace.is_empty() && !backtrace.contains("disabled") {
        eprintln!("\nBacktrace:\n{}", backtrace);
    }
    eprintln!("=====================================================\n");

    panic!("Test failed: {}", error);
}

#[derive(Clone)]
pub struct TestContext<D> {
    db: D,
    logger: Logger,
}

impl<D: Database + Clone> TestContext<D> {
    pub fn new(db: D, logger: Logger) -> Self {
        Self { db, logger }
    }

    pub fn db(&self) -> D {
        self.db.clone()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

fn test_logger() -> Logger {
    Logger::new("proxima_int_test")
}

pub fn create_test_context() -> ProximaResult<TestContext<HashmapDatabase>> {
    let logger = test_logger();
    let db = DatabaseBuilder::new().logger(logger.clone()).open_hashmap()?;
    Ok(TestContext::new(db, logger))
}

pub fn create_spatial_test_context(
    function: Arc<dyn SpatialDistanceFunction>,
    tree_config: RTreeConfig,
) -> ProximaResult<TestContext<SpatialIndexDatabase>> {
    let logger = test_logger();
    let config = DatabaseBuilder::new().logger(logger.clone()).build_config()?;
    let db = SpatialIndexDatabase::new(config, function, tree_config)?;
    Ok(TestContext::new(db, logger))
}

/// Deletes every remaining object and verifies the database is empty.
pub fn cleanup<D: Database>(ctx: TestContext<D>) -> ProximaResult<()> {
    let ids = ctx.db.id_view().ids();
    ctx.db.delete_all(&ids)?;
    if !ctx.db.is_empty() {
        return Err(ProximaError::new(
            &format!("{} object(s) survived cleanup", ctx.db.len()),
            ErrorKind::InternalError,
        ));
    }
    ctx.logger
        .debug(format_args!("Cleaned up {} object(s)", ids.len()));
    Ok(())
}

/// The five points every scenario test uses: P1..P5.
pub fn scenario_points() -> Vec<DoubleVector> {
    vec![
        DoubleVector::from([0.0, 0.0]),
        DoubleVector::from([1.0, 0.0]),
        DoubleVector::from([0.0, 1.0]),
        DoubleVector::from([5.0, 5.0]),
        DoubleVector::from([5.0, 6.0]),
    ]
}

/// `n` uniform points in the unit cube of `dimensionality` dimensions.
pub fn random_points(n: usize, dimensionality: usize, seed: u64) -> Vec<DoubleVector> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let values: Vec<f64> = (0..dimensionality).map(|_| rng.gen_range(0.0..1.0)).collect();
            DoubleVector::new(values)
        })
        .collect()
}

pub fn insert_points<D: Database>(db: &D, points: Vec<DoubleVector>) -> ProximaResult<Vec<ObjectId>> {
    db.insert(MultipleObjectsBundle::new().with_column(points))
}

pub fn vectors<D: Database>(db: &D) -> ProximaResult<RelationRef<DoubleVector>> {
    db.get_relation::<DoubleVector>(&TypeInformation::of::<DoubleVector>())
}

/// A plain database holding the same points under the same ids, answering
/// every query by linear scan.
pub fn linear_scan_reference(points: Vec<DoubleVector>) -> ProximaResult<HashmapDatabase> {
    let db = DatabaseBuilder::new().logger(Logger::silent()).open_hashmap()?;
    insert_points(&db, points)?;
    Ok(db)
}

pub fn linear_knn(
    db: &HashmapDatabase,
    function: Arc<dyn DistanceFunction<DoubleVector>>,
) -> ProximaResult<Arc<dyn KnnQuery<DoubleVector>>> {
    let relation = vectors(db)?;
    db.query(&relation)
        .distance_function(function)
        .knn_query()?
        .ok_or_else(|| ProximaError::new("No linear scan available", ErrorKind::InternalError))
}

pub fn linear_range(
    db: &HashmapDatabase,
    function: Arc<dyn DistanceFunction<DoubleVector>>,
) -> ProximaResult<Arc<dyn RangeQuery<DoubleVector>>> {
    let relation = vectors(db)?;
    db.query(&relation)
        .distance_function(function)
        .range_query()?
        .ok_or_else(|| ProximaError::new("No linear scan available", ErrorKind::InternalError))
}
