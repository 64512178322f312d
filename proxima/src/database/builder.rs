use std::sync::Arc;

use crate::common::Logger;
use crate::data::{DoubleVector, RelationValue};
use crate::database::{
    DatabaseConfig, DatabaseConnection, HashmapDatabase, MetricalIndexDatabase,
    StaticArrayDatabase,
};
use crate::distance::DistanceFunction;
use crate::errors::{ProximaError, ProximaResult};
use crate::index::IndexFactory;

/// Builder for the database shapes of this crate.
///
/// The first configuration error is kept and reported by the `open_*` call.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use proxima::common::Logger;
/// use proxima::data::DoubleVector;
/// use proxima::database::{Database, DatabaseBuilder};
/// use proxima::distance::EuclideanDistance;
/// use proxima::index::MaterializeKnnPreprocessorFactory;
///
/// let db = DatabaseBuilder::new()
///     .logger(Logger::new("proxima::example"))
///     .index_factory::<DoubleVector>(Arc::new(
///         MaterializeKnnPreprocessorFactory::<DoubleVector>::new(Arc::new(EuclideanDistance), 5),
///     ))
///     .open_hashmap()
///     .unwrap();
/// assert!(db.is_empty());
/// ```
#[derive(Default)]
pub struct DatabaseBuilder {
    error: Option<ProximaError>,
    config: DatabaseConfig,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        DatabaseBuilder {
            error: None,
            config: DatabaseConfig::new(),
        }
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_logger(logger) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn index_factory<O: RelationValue>(mut self, factory: Arc<dyn IndexFactory<O>>) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.add_index_factory(factory) {
                self.error = Some(e);
            }
        }
        self
    }

    /// The configuration built so far, for shapes constructed directly.
    pub fn build_config(self) -> ProximaResult<DatabaseConfig> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(self.config)
    }

    pub fn open_hashmap(self) -> ProximaResult<HashmapDatabase> {
        let config = self.build_config()?;
        Ok(HashmapDatabase::new(config))
    }

    /// Opens a static database and loads the data of `connection`.
    pub fn open_static(
        self,
        connection: Arc<dyn DatabaseConnection>,
    ) -> ProximaResult<StaticArrayDatabase> {
        let config = self.build_config()?;
        let database = StaticArrayDatabase::new(connection, config);
        database.initialize()?;
        Ok(database)
    }

    pub fn open_metrical(
        self,
        function: Arc<dyn DistanceFunction<DoubleVector>>,
        num_pivots: usize,
    ) -> ProximaResult<MetricalIndexDatabase> {
        let config = self.build_config()?;
        MetricalIndexDatabase::new(config, function, num_pivots)
    }
}
