use std::sync::Arc;

use crate::database::{Database, DatabaseConfig, DatabaseCore, MultipleObjectsBundle, SingleObjectBundle};
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::id::{ObjectId, ObjectIdSet};

/// Read-only view over a subset of the objects of another database.
///
/// The view keeps its own relations (restricted proxies of the source
/// relations), its own indexes created from its configuration and its own
/// listeners.
///
/// The subset is fixed when the view is built and values are read from the
/// source. Objects the source deletes drop out of the view's relations, and
/// with them out of linear scans, but the view's id set, event listeners and
/// indexes are not told. Rebuild the view after deleting from the source when
/// it carries indexes.
#[derive(Clone)]
pub struct ProxyDatabase {
    inner: Arc<ProxyDatabaseInner>,
}

struct ProxyDatabaseInner {
    core: DatabaseCore,
}

impl ProxyDatabase {
    /// Builds a view of the ids of `ids` that are live in `source`.
    pub fn new<D: Database>(
        source: &D,
        ids: &ObjectIdSet,
        config: DatabaseConfig,
    ) -> ProximaResult<Self> {
        let core = DatabaseCore::new(config);
        let selected: ObjectIdSet = ids
            .iter()
            .copied()
            .filter(|id| source.contains(*id))
            .collect();
        if selected.len() != ids.len() {
            core.logger().warn(format_args!(
                "{} requested id(s) are not part of the source database",
                ids.len() - selected.len()
            ));
        }

        let mut result_events = Vec::new();
        for column in source.core().columns() {
            result_events.extend(core.add_column(column.proxy(&selected))?);
        }
        let count = selected.len();
        *core.id_set().write() = selected;
        core.logger().debug(format_args!(
            "Proxy over {} of {} object(s)",
            count,
            source.len()
        ));
        core.fire_result_events(result_events)?;
        Ok(ProxyDatabase {
            inner: Arc::new(ProxyDatabaseInner { core }),
        })
    }

    fn read_only(&self, operation: &str) -> ProximaError {
        self.inner
            .core
            .logger()
            .error(format_args!("{} is not supported by a proxy database", operation));
        ProximaError::new(
            &format!("{} is not supported by a proxy database", operation),
            ErrorKind::UnsupportedOperation,
        )
    }
}

impl Database for ProxyDatabase {
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
