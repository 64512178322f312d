use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::common::Logger;
use crate::data::RelationValue;
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::index::IndexFactory;

/// Settings shared by a database and everything it creates.
///
/// A configuration can be changed until a database is opened with it; after
/// that every setter fails with [`ErrorKind::InvalidOperation`].
#[derive(Clone)]
pub struct DatabaseConfig {
    inner: Arc<DatabaseConfigInner>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseConfig {
    pub fn new() -> Self {
        DatabaseConfig {
            inner: Arc::new(DatabaseConfigInner::new()),
        }
    }

    pub fn logger(&self) -> Logger {
        self.inner.logger.read().clone()
    }

    pub fn set_logger(&self, logger: Logger) -> ProximaResult<()> {
        self.inner.set_logger(logger)
    }

    /// Registers a factory applied to every new relation of type `O`.
    pub fn add_index_factory<O: RelationValue>(
        &self,
        factory: Arc<dyn IndexFactory<O>>,
    ) -> ProximaResult<()> {
        self.inner.add_index_factory(factory)
    }

    /// Factories registered for type `O`, in registration order.
    pub fn index_factories<O: RelationValue>(&self) -> Vec<Arc<dyn IndexFactory<O>>> {
        self.inner.index_factories::<O>()
    }

    pub fn index_factory_count(&self) -> usize {
        self.inner
            .index_factories
            .iter()
            .map(|entry| entry.value().len())
            .sum()
    }

    pub fn is_configured(&self) -> bool {
        self.inner.configured.load(Ordering::Relaxed)
    }

    pub(crate) fn freeze(&self) {
        self.inner.configured.store(true, Ordering::Relaxed);
    }
}

struct DatabaseConfigInner {
    configured: AtomicBool,
    logger: RwLock<Logger>,
    index_factories: DashMap<TypeId, Vec<Box<dyn Any + Send + Sync>>>,
}

impl DatabaseConfigInner {
    fn new() -> Self {
        DatabaseConfigInner {
            configured: AtomicBool::new(false),
            logger: RwLock::new(Logger::default()),
            index_factories: DashMap::new(),
        }
    }

    fn ensure_not_configured(&self, what: &str) -> ProximaResult<()> {
        if self.configured.load(Ordering::Relaxed) {
            let message = format!("{} cannot be changed after initialization", what);
            self.logger.read().error(format_args!("{}", message));
            return Err(ProximaError::new(&message, ErrorKind::InvalidOperation));
        }
        Ok(())
    }

    fn set_logger(&self, logger: Logger) -> ProximaResult<()> {
        self.ensure_not_configured("Logger")?;
        if logger.target().is_empty() {
            return Err(ProximaError::new(
                "Logger target cannot be empty",
                ErrorKind::ConfigurationError,
            ));
        }
        *self.logger.write() = logger;
        Ok(())
    }

    fn add_index_factory<O: RelationValue>(
        &self,
        factory: Arc<dyn IndexFactory<O>>,
    ) -> ProximaResult<()> {
        self.ensure_not_configured("Index factories")?;
        self.index_factories
            .entry(TypeId::of::<O>())
            .or_default()
            .push(Box::new(factory));
        Ok(())
    }

    fn index_factories<O: RelationValue>(&self) -> Vec<Arc<dyn IndexFactory<O>>> {
        match self.index_factories.get(&TypeId::of::<O>()) {
            Some(entry) => entry
                .value()
                .iter()
                .filter_map(|f| f.downcast_ref::<Arc<dyn IndexFactory<O>>>().cloned())
                .collect(),
            None => Vec::new(),
        }
    }
}
