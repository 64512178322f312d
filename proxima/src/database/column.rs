use std::any::Any;
use std::ops::Range;
use std::sync::Arc;

use crate::common::{Logger, TypeInformation};
use crate::data::RelationValue;
use crate::database::{BundleColumn, DatabaseConfig};
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::id::{ObjectId, ObjectIdSet};
use crate::index::IndexRegistry;
use crate::relation::{ArrayRelation, MaterializedRelation, ProxyView, RelationId, RelationRef};

/// Type-erased view of a [`Column`] used by the database shapes.
pub(crate) trait AnyColumn: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn relation_id(&self) -> RelationId;

    fn type_information(&self) -> TypeInformation;

    fn long_name(&self) -> String;

    fn contains(&self, id: ObjectId) -> bool;

    /// Checks that `values` can be written to this column.
    fn validate_values(&self, values: &BundleColumn) -> ProximaResult<()>;

    fn write_values(&self, ids: &[ObjectId], values: &BundleColumn) -> ProximaResult<()>;

    fn remove_values(&self, ids: &[ObjectId]);

    fn read_value(&self, id: ObjectId) -> Option<Box<dyn Any + Send + Sync>>;

    /// Instantiates the configured factories accepting this column's type.
    /// Returns the names of the created indexes.
    fn attach_indexes(&self, config: &DatabaseConfig, logger: &Logger)
        -> ProximaResult<Vec<String>>;

    fn index_insert_all(&self, ids: &[ObjectId]) -> ProximaResult<()>;

    fn index_delete_all(&self, ids: &[ObjectId]) -> ProximaResult<()>;

    /// Read-only column restricted to `ids`.
    fn proxy(&self, ids: &ObjectIdSet) -> Arc<dyn AnyColumn>;
}

/// A relation of a database together with the indexes built over it.
pub(crate) struct Column<T> {
    relation: RelationRef<T>,
    materialized: Option<Arc<MaterializedRelation<T>>>,
    indexes: IndexRegistry<T>,
}

impl<T: RelationValue> Column<T> {
    pub(crate) fn materialized(name: &str, type_information: TypeInformation) -> Self {
        let relation = Arc::new(MaterializedRelation::new(name, type_information));
        Column {
            relation: relation.clone(),
            materialized: Some(relation),
            indexes: IndexRegistry::new(),
        }
    }

    pub(crate) fn array(
        name: &str,
        type_information: TypeInformation,
        ids: Range<u64>,
        values: Vec<T>,
    ) -> ProximaResult<Self> {
        let relation = ArrayRelation::new(name, type_information, ids, values)?;
        Ok(Self::read_only(Arc::new(relation)))
    }

    pub(crate) fn read_only(relation: RelationRef<T>) -> Self {
        Column {
            relation,
            materialized: None,
            indexes: IndexRegistry::new(),
        }
    }

    pub(crate) fn relation(&self) -> &RelationRef<T> {
        &self.relation
    }

    pub(crate) fn indexes(&self) -> &IndexRegistry<T> {
        &self.indexes
    }

    fn writable(&self) -> ProximaResult<&Arc<MaterializedRelation<T>>> {
        self.materialized.as_ref().ok_or_else(|| {
            ProximaError::new(
                &format!("{} is read-only", self.relation.long_name()),
                ErrorKind::UnsupportedOperation,
            )
        })
    }
}

impl<T: RelationValue> AnyColumn for Column<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn relation_id(&self) -> RelationId {
        self.relation.relation_id()
    }

    fn type_information(&self) -> TypeInformation {
        self.relation.type_information()
    }

    fn long_name(&self) -> String {
        self.relation.long_name()
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.relation.contains(id)
    }

    fn validate_values(&self, values: &BundleColumn) -> ProximaResult<()> {
        self.writable()?;
        values
            .column_values()
            .validate(&self.relation.type_information())
    }

    fn write_values(&self, ids: &[ObjectId], values: &BundleColumn) -> ProximaResult<()> {
        let relation = self.writable()?;
        let typed = values.values::<T>().ok_or_else(|| {
            ProximaError::new(
                &format!(
                    "Column of {} cannot be written to {}",
                    values.type_information(),
                    self.relation.long_name()
                ),
                ErrorKind::ValidationError,
            )
        })?;
        for (id, value) in ids.iter().zip(typed.iter()) {
            relation.set(*id, value.clone())?;
        }
        Ok(())
    }

    fn remove_values(&self, ids: &[ObjectId]) {
        if let Some(relation) = &self.materialized {
            for id in ids {
                relation.delete(*id);
            }
        }
    }

    fn read_value(&self, id: ObjectId) -> Option<Box<dyn Any + Send + Sync>> {
        self.relation
            .get(id)
            .ok()
            .map(|value| Box::new(value) as Box<dyn Any + Send + Sync>)
    }

    fn attach_indexes(
        &self,
        config: &DatabaseConfig,
        logger: &Logger,
    ) -> ProximaResult<Vec<String>> {
        let type_information = self.relation.type_information();
        let mut names = Vec::new();
        for factory in config.index_factories::<T>() {
            if !factory.accepts(&type_information) {
                continue;
            }
            let registration = factory.instantiate(self.relation.clone(), logger)?;
            registration.index().initialize()?;
            let name = registration.index().long_name();
            logger.debug(format_args!(
                "{} created {} for {}",
                factory.name(),
                name,
                self.relation.long_name()
            ));
            self.indexes.register(registration);
            names.push(name);
        }
        Ok(names)
    }

    fn index_insert_all(&self, ids: &[ObjectId]) -> ProximaResult<()> {
        for index in self.indexes.indexes() {
            index.insert_all(ids)?;
        }
        Ok(())
    }

    fn index_delete_all(&self, ids: &[ObjectId]) -> ProximaResult<()> {
        for index in self.indexes.indexes() {
            index.delete_all(ids)?;
        }
        Ok(())
    }

    fn proxy(&self, ids: &ObjectIdSet) -> Arc<dyn AnyColumn> {
        let view = ProxyView::new(self.relation.clone(), ids);
        Arc::new(Column::<T>::read_only(Arc::new(view)))
    }
}

/// Typed access to a type-erased column.
pub(crate) fn downcast_column<T: RelationValue>(column: &Arc<dyn AnyColumn>) -> Option<&Column<T>> {
    column.as_any().downcast_ref::<Column<T>>()
}
