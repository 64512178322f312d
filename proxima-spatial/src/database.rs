use std::sync::Arc;

use proxima::data::DoubleVector;
use proxima::database::{
    Database, DatabaseConfig, DatabaseCore, HashmapDatabase, MultipleObjectsBundle,
    SingleObjectBundle,
};
use proxima::data::HyperBoundingBox;
use proxima::distance::{DistanceFunction, SpatialDistanceFunction};
use proxima::errors::ProximaResult;
use proxima::id::ObjectId;

use crate::rtree::{RStarTreeIndexFactory, RTreeConfig};

/// Dynamic database whose vector relations are indexed by an R*-tree.
///
/// Queries with the configured spatial distance are answered by the tree;
/// any other distance falls back to the usual dispatch.
///
/// ```rust
/// use std::sync::Arc;
/// use proxima::common::{Logger, QueryHint, TypeInformation};
/// use proxima::data::DoubleVector;
/// use proxima::database::{Database, DatabaseConfig, MultipleObjectsBundle};
/// use proxima::distance::EuclideanDistance;
/// use proxima_spatial::database::SpatialIndexDatabase;
/// use proxima_spatial::rtree::RTreeConfig;
///
/// let config = DatabaseConfig::new();
/// config.set_logger(Logger::silent()).unwrap();
/// let db = SpatialIndexDatabase::new(config, Arc::new(EuclideanDistance), RTreeConfig::default())
///     .unwrap();
/// let ids = db
///     .insert(MultipleObjectsBundle::new().with_column(vec![
///         DoubleVector::from([0.0, 0.0]),
///         DoubleVector::from([3.0, 4.0]),
///     ]))
///     .unwrap();
///
/// let relation = db
///     .get_relation::<DoubleVector>(&TypeInformation::of::<DoubleVector>())
///     .unwrap();
/// let knn = db
///     .query(&relation)
///     .distance_function(db.distance_function())
///     .hint(QueryHint::OptimizedOnly)
///     .knn_query()
///     .unwrap()
///     .expect("answered by the tree");
/// let result = knn.knn_for_id(ids[0], 2).unwrap();
/// assert_eq!(result[1].distance(), 5.0);
/// ```
#[derive(Clone)]
pub struct SpatialIndexDatabase {
    database: HashmapDatabase,
    function: Arc<dyn SpatialDistanceFunction>,
}

impl SpatialIndexDatabase {
    pub fn new(
        config: DatabaseConfig,
        function: Arc<dyn SpatialDistanceFunction>,
        tree_config: RTreeConfig,
    ) -> ProximaResult<Self> {
        config.add_index_factory::<DoubleVector>(Arc::new(RStarTreeIndexFactory::new(
            function.clone(),
            tree_config,
        )))?;
        Ok(SpatialIndexDatabase {
            database: HashmapDatabase::new(config),
            function,
        })
    }

    /// The distance the trees are built for, ready to pass to a query.
    pub fn distance_function(&self) -> Arc<dyn DistanceFunction<DoubleVector>> {
        Arc::new(SpatialDistanceAdapter {
            function: self.function.clone(),
        })
    }

    pub fn spatial_distance_function(&self) -> &Arc<dyn SpatialDistanceFunction> {
        &self.function
    }
}

impl Database for SpatialIndexDatabase {
    fn core(&self) -> &DatabaseCore {
        self.database.core()
    }

    fn insert(&self, bundle: MultipleObjectsBundle) -> ProximaResult<Vec<ObjectId>> {
        self.database.insert(bundle)
    }

    fn delete(&self, id: ObjectId) -> ProximaResult<SingleObjectBundle> {
        self.database.delete(id)
    }

    fn delete_all(&self, ids: &[ObjectId]) -> ProximaResult<Vec<SingleObjectBundle>> {
        self.database.delete_all(ids)
    }
}

/// Presents a spatial distance as a plain vector distance with the same
/// descriptor, so index lookups still bind to the trees.
struct SpatialDistanceAdapter {
    function: Arc<dyn SpatialDistanceFunction>,
}

impl DistanceFunction<DoubleVector> for SpatialDistanceAdapter {
    fn distance(&self, a: &DoubleVector, b: &DoubleVector) -> f64 {
        self.function.distance(a, b)
    }

    fn descriptor(&self) -> String {
        self.function.descriptor()
    }

    fn is_metric(&self) -> bool {
        self.function.is_metric()
    }

    fn is_symmetric(&self) -> bool {
        self.function.is_symmetric()
    }
}

impl SpatialDistanceFunction for SpatialDistanceAdapter {
    fn min_dist(&self, mbr: &HyperBoundingBox, point: &DoubleVector) -> f64 {
        self.function.min_dist(mbr, point)
    }
}
