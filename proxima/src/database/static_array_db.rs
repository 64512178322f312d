use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::database::{
    Database, DatabaseConfig, DatabaseConnection, DatabaseCore, MultipleObjectsBundle,
    SingleObjectBundle,
};
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::id::{IdAllocator, ObjectId};

/// Database loaded once from a [`DatabaseConnection`] into array relations.
///
/// The objects receive one contiguous id range; afterwards the contents
/// never change and every mutation fails with
/// [`ErrorKind::UnsupportedOperation`].
#[derive(Clone)]
pub struct StaticArrayDatabase {
    inner: Arc<StaticArrayDatabaseInner>,
}

struct StaticArrayDatabaseInner {
    core: DatabaseCore,
    connection: Arc<dyn DatabaseConnection>,
    allocator: IdAllocator,
    initialized: AtomicBool,
}

impl StaticArrayDatabase {
    pub fn new(connection: Arc<dyn DatabaseConnection>, config: DatabaseConfig) -> Self {
        StaticArrayDatabase {
            inner: Arc::new(StaticArrayDatabaseInner {
                core: DatabaseCore::new(config),
                connection,
                allocator: IdAllocator::new(),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    /// Loads the data of the connection. Can only be called once.
    pub fn initialize(&self) -> ProximaResult<()> {
        let core = &self.inner.core;
        if self.inner.initialized.swap(true, Ordering::AcqRel) {
            core.logger()
                .error(format_args!("Static database is already initialized"));
            return Err(ProximaError::new(
                "Static database is already initialized",
                ErrorKind::InvalidOperation,
            ));
        }

        let bundle = self.inner.connection.load_data()?;
        let length = bundle.validate()?;
        if bundle.ids().is_some() {
            core.logger().warn(format_args!(
                "Ignoring explicit ids of the loaded bundle, static databases assign their own"
            ));
        }
        let range = self.inner.allocator.allocate_range(length);

        let mut result_events = Vec::new();
        for values in bundle.columns() {
            let name = values.type_information().to_string();
            let column = values.column_values().new_array_column(
                &name,
                values.type_information().clone(),
                range.clone(),
            )?;
            result_events.extend(core.add_column(column)?);
        }
        core.id_set()
            .write()
            .extend(range.clone().map(ObjectId::new));
        core.logger().info(format_args!(
            "Loaded {} object(s) into {} relation(s), ids {}..{}",
            length,
            bundle.column_count(),
            range.start,
            range.end
        ));
        core.fire_result_events(result_events)
    }

    fn read_only(&self, operation: &str) -> ProximaError {
        self.inner
            .core
            .logger()
            .error(format_args!("{} is not supported by a static database", operation));
        ProximaError::new(
            &format!("{} is not supported by a static database", operation),
            ErrorKind::UnsupportedOperation,
        )
    }
}

impl Database for StaticArrayDatabase {
    fn core(&self) -> &DatabaseCore {
        &self.inner.core
    }

    fn insert(&self, _bundle: MultipleObjectsBundle) -> ProximaResult<Vec<ObjectId>> {
        Err(self.read_only("Insert"))
    }

    fn delete(&self, _id: ObjectId) -> ProximaResult<SingleObjectBundle> {
        Err(self.read_only("Delete"))
    }

    fn delete_all(&self, _ids: &[ObjectId]) -> ProximaResult<Vec<SingleObjectBundle>> {
        Err(self.read_only("Delete"))
    }
}
