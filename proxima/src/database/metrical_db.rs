use std::sync::Arc;

use crate::data::DoubleVector;
use crate::database::{
    Database, DatabaseConfig, DatabaseCore, HashmapDatabase, MultipleObjectsBundle,
    SingleObjectBundle,
};
use crate::distance::DistanceFunction;
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::id::ObjectId;
use crate::index::PivotTableIndexFactory;

/// Dynamic database whose vector relations are indexed by a pivot table.
///
/// Queries using the configured metric are answered with
/// triangle-inequality pruning; any other distance falls back to the usual
/// dispatch.
#[derive(Clone)]
pub struct MetricalIndexDatabase {
    database: HashmapDatabase,
    function: Arc<dyn DistanceFunction<DoubleVector>>,
}

impl MetricalIndexDatabase {
    pub fn new(
        config: DatabaseConfig,
        function: Arc<dyn DistanceFunction<DoubleVector>>,
        num_pivots: usize,
    ) -> ProximaResult<Self> {
        if !function.is_metric() {
            let message = format!(
                "A metrical index database requires a metric, {} is not",
                function.descriptor()
            );
            config.logger().error(format_args!("{}", message));
            return Err(ProximaError::new(&message, ErrorKind::ConfigurationError));
        }
        if num_pivots == 0 {
            return Err(ProximaError::new(
                "A metrical index database needs at least one pivot",
                ErrorKind::ConfigurationError,
            ));
        }
        config.add_index_factory::<DoubleVector>(Arc::new(
            PivotTableIndexFactory::<DoubleVector>::new(function.clone(), num_pivots),
        ))?;
        Ok(MetricalIndexDatabase {
            database: HashmapDatabase::new(config),
            function,
        })
    }

    /// The metric the pivot tables are built for.
    pub fn distance_function(&self) -> Arc<dyn DistanceFunction<DoubleVector>> {
        self.function.clone()
    }
}

impl Database for MetricalIndexDatabase {
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
