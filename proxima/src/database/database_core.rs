use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{has_hint, max_k_hint, Logger, QueryHint, TypeInformation};
use crate::data::RelationValue;
use crate::database::{downcast_column, AnyColumn, DatabaseConfig, SingleObjectBundle};
use crate::distance::{DistanceFunction, DistanceQuery, SimilarityFunction, SimilarityQuery};
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::event::{DatabaseEventManager, ResultEvent, ResultKind};
use crate::id::{ObjectId, ObjectIdSet};
use crate::index::{IndexId, IndexRegistration, IndexRegistry};
use crate::query::linear_scan::{LinearScanKnnQuery, LinearScanRangeQuery, LinearScanRknnQuery};
use crate::query::{KnnQuery, RangeQuery, RknnQuery};
use crate::relation::{IdView, Relation, RelationId, RelationRef};

/// State and query dispatch shared by every database shape.
///
/// The core owns the live id set, the id view, the typed columns with their
/// index registries and the event manager. Dispatch consults the indexes of
/// the queried relation, most recently registered first, and falls back to
/// a linear scan unless [`QueryHint::OptimizedOnly`] is given.
#[derive(Clone)]
pub struct DatabaseCore {
    inner: Arc<DatabaseCoreInner>,
}

struct DatabaseCoreInner {
    config: DatabaseConfig,
    logger: Logger,
    ids: Arc<RwLock<ObjectIdSet>>,
    id_view: Arc<IdView>,
    columns: RwLock<Vec<Arc<dyn AnyColumn>>>,
    events: DatabaseEventManager,
}

impl DatabaseCore {
    pub(crate) fn new(config: DatabaseConfig) -> Self {
        config.freeze();
        let logger = config.logger().child("database");
        let ids = Arc::new(RwLock::new(ObjectIdSet::new()));
        let id_view = Arc::new(IdView::new(ids.clone()));
        let events = DatabaseEventManager::new(logger.child("events"));
        DatabaseCore {
            inner: Arc::new(DatabaseCoreInner {
                config,
                logger,
                ids,
                id_view,
                columns: RwLock::new(Vec::new()),
                events,
            }),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    pub fn events(&self) -> &DatabaseEventManager {
        &self.inner.events
    }

    pub fn len(&self) -> usize {
        self.inner.ids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.ids.read().is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.inner.ids.read().contains(&id)
    }

    /// Live ids in ascending order.
    pub fn ids(&self) -> ObjectIdSet {
        self.inner.ids.read().clone()
    }

    pub fn id_view(&self) -> RelationRef<ObjectId> {
        self.inner.id_view.clone()
    }

    /// Number of relations, the id view included.
    pub fn relation_count(&self) -> usize {
        self.inner.columns.read().len() + 1
    }

    /// Names of the relations, the id view first.
    pub fn relation_names(&self) -> Vec<String> {
        std::iter::once(self.inner.id_view.long_name())
            .chain(self.inner.columns.read().iter().map(|c| c.long_name()))
            .collect()
    }

    pub(crate) fn id_set(&self) -> &Arc<RwLock<ObjectIdSet>> {
        &self.inner.ids
    }

    pub(crate) fn columns(&self) -> Vec<Arc<dyn AnyColumn>> {
        self.inner.columns.read().clone()
    }

    /// Adds a column and creates the configured indexes for it. Returns the
    /// notifications to deliver once the caller released its locks.
    pub(crate) fn add_column(&self, column: Arc<dyn AnyColumn>) -> ProximaResult<Vec<ResultEvent>> {
        let index_names = column.attach_indexes(&self.inner.config, &self.inner.logger)?;
        let mut events = vec![ResultEvent::added(ResultKind::Relation, &column.long_name())];
        events.extend(
            index_names
                .iter()
                .map(|name| ResultEvent::added(ResultKind::Index, name)),
        );
        self.inner.logger.debug(format_args!(
            "Added relation {} with {} index(es)",
            column.long_name(),
            index_names.len()
        ));
        self.inner.columns.write().push(column);
        Ok(events)
    }

    /// Withdraws columns added by an insert that did not complete.
    pub(crate) fn remove_columns(&self, doomed: &[Arc<dyn AnyColumn>]) {
        if doomed.is_empty() {
            return;
        }
        self.inner
            .columns
            .write()
            .retain(|c| !doomed.iter().any(|d| c.relation_id() == d.relation_id()));
        self.inner.logger.debug(format_args!(
            "Withdrew {} relation(s) of a failed insert",
            doomed.len()
        ));
    }

    pub(crate) fn fire_result_events(&self, events: Vec<ResultEvent>) -> ProximaResult<()> {
        let mut first_error = None;
        for event in events {
            if let Err(e) = self.inner.events.fire_result_event(event) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// First relation whose type satisfies `restriction`, the id view first.
    pub fn get_relation<T: RelationValue>(
        &self,
        restriction: &TypeInformation,
    ) -> ProximaResult<RelationRef<T>> {
        if restriction.is_assignable_from(&self.inner.id_view.type_information()) {
            let view: RelationRef<ObjectId> = self.inner.id_view.clone();
            if let Some(relation) = (&view as &dyn Any).downcast_ref::<RelationRef<T>>() {
                return Ok(relation.clone());
            }
        }
        for column in self.inner.columns.read().iter() {
            if !restriction.is_assignable_from(&column.type_information()) {
                continue;
            }
            if let Some(typed) = downcast_column::<T>(column) {
                return Ok(typed.relation().clone());
            }
        }
        let available = self.relation_names().join(", ");
        self.inner.logger.debug(format_args!(
            "No relation matches {}, available: {}",
            restriction, available
        ));
        Err(ProximaError::new(
            &format!("No relation matches {} (available: {})", restriction, available),
            ErrorKind::NoMatchingRelation,
        ))
    }

    pub fn contains_relation(&self, relation_id: RelationId) -> bool {
        self.inner.id_view.relation_id() == relation_id
            || self
                .inner
                .columns
                .read()
                .iter()
                .any(|c| c.relation_id() == relation_id)
    }

    fn foreign_relation(&self, relation_id: RelationId) -> ProximaError {
        self.inner.logger.error(format_args!(
            "{} is not a relation of this database",
            relation_id
        ));
        ProximaError::new(
            &format!("{} is not a relation of this database", relation_id),
            ErrorKind::ConfigurationError,
        )
    }

    /// Index registry of the relation a query is bound to.
    fn registry_for<O: RelationValue>(&self, relation_id: RelationId) -> ProximaResult<IndexRegistry<O>> {
        if self.inner.id_view.relation_id() == relation_id {
            return Ok(IndexRegistry::new());
        }
        let columns = self.inner.columns.read();
        let column = columns
            .iter()
            .find(|c| c.relation_id() == relation_id)
            .ok_or_else(|| self.foreign_relation(relation_id))?;
        downcast_column::<O>(column)
            .map(|typed| typed.indexes().clone())
            .ok_or_else(|| {
                ProximaError::new(
                    &format!(
                        "{} does not hold values of {}",
                        column.long_name(),
                        std::any::type_name::<O>()
                    ),
                    ErrorKind::ConfigurationError,
                )
            })
    }

    pub fn distance_query<O: RelationValue>(
        &self,
        relation: &RelationRef<O>,
        function: Option<Arc<dyn DistanceFunction<O>>>,
    ) -> ProximaResult<DistanceQuery<O>> {
        let Some(function) = function else {
            self.inner
                .logger
                .error(format_args!("Distance query requested without a distance function"));
            return Err(ProximaError::new(
                "A distance function is required",
                ErrorKind::ConfigurationError,
            ));
        };
        if !self.contains_relation(relation.relation_id()) {
            return Err(self.foreign_relation(relation.relation_id()));
        }
        Ok(DistanceQuery::new(relation.clone(), function))
    }

    pub fn similarity_query<O: RelationValue>(
        &self,
        relation: &RelationRef<O>,
        function: Option<Arc<dyn SimilarityFunction<O>>>,
    ) -> ProximaResult<SimilarityQuery<O>> {
        let Some(function) = function else {
            self.inner
                .logger
                .error(format_args!("Similarity query requested without a similarity function"));
            return Err(ProximaError::new(
                "A similarity function is required",
                ErrorKind::ConfigurationError,
            ));
        };
        if !self.contains_relation(relation.relation_id()) {
            return Err(self.foreign_relation(relation.relation_id()));
        }
        Ok(SimilarityQuery::new(relation.clone(), function))
    }

    pub fn knn_query<O: RelationValue>(
        &self,
        distance_query: &DistanceQuery<O>,
        hints: &[QueryHint],
    ) -> ProximaResult<Option<Arc<dyn KnnQuery<O>>>> {
        let registry = self.registry_for::<O>(distance_query.relation_id())?;
        for index in registry.knn_indexes() {
            if let Some(query) = index.get_knn_query(distance_query, hints) {
                self.inner
                    .logger
                    .debug(format_args!("kNN query answered by {}", index.long_name()));
                return Ok(Some(query));
            }
        }
        if has_hint(hints, QueryHint::OptimizedOnly) {
            return Ok(None);
        }
        self.inner.logger.debug(format_args!(
            "No index accelerates kNN on {}, using a linear scan",
            distance_query.relation().long_name()
        ));
        Ok(Some(Arc::new(LinearScanKnnQuery::new(distance_query.clone()))))
    }

    pub fn range_query<O: RelationValue>(
        &self,
        distance_query: &DistanceQuery<O>,
        hints: &[QueryHint],
    ) -> ProximaResult<Option<Arc<dyn RangeQuery<O>>>> {
        let registry = self.registry_for::<O>(distance_query.relation_id())?;
        for index in registry.range_indexes() {
            if let Some(query) = index.get_range_query(distance_query, hints) {
                self.inner
                    .logger
                    .debug(format_args!("Range query answered by {}", index.long_name()));
                return Ok(Some(query));
            }
        }
        if has_hint(hints, QueryHint::OptimizedOnly) {
            return Ok(None);
        }
        self.inner.logger.debug(format_args!(
            "No index accelerates range queries on {}, using a linear scan",
            distance_query.relation().long_name()
        ));
        Ok(Some(Arc::new(LinearScanRangeQuery::new(distance_query.clone()))))
    }

    pub fn rknn_query<O: RelationValue>(
        &self,
        distance_query: &DistanceQuery<O>,
        hints: &[QueryHint],
    ) -> ProximaResult<Option<Arc<dyn RknnQuery<O>>>> {
        let registry = self.registry_for::<O>(distance_query.relation_id())?;
        for index in registry.rknn_indexes() {
            if let Some(query) = index.get_rknn_query(distance_query, hints) {
                self.inner
                    .logger
                    .debug(format_args!("RkNN query answered by {}", index.long_name()));
                return Ok(Some(query));
            }
        }
        if has_hint(hints, QueryHint::OptimizedOnly) {
            return Ok(None);
        }

        let mut knn_hints = vec![QueryHint::Bulk];
        if let Some(k) = max_k_hint(hints) {
            knn_hints.push(QueryHint::MaxK(k));
        }
        let knn: Arc<dyn KnnQuery<O>> = match self.knn_query(distance_query, &knn_hints)? {
            Some(knn) => knn,
            None => Arc::new(LinearScanKnnQuery::new(distance_query.clone())),
        };
        Ok(Some(Arc::new(LinearScanRknnQuery::new(knn))))
    }

    pub fn add_index<O: RelationValue>(
        &self,
        relation: &RelationRef<O>,
        registration: IndexRegistration<O>,
    ) -> ProximaResult<IndexId> {
        if registration.index().relation_id() != relation.relation_id() {
            return Err(ProximaError::new(
                &format!(
                    "{} was not built over {}",
                    registration.index().long_name(),
                    relation.long_name()
                ),
                ErrorKind::ConfigurationError,
            ));
        }
        let registry = self.registry_for::<O>(relation.relation_id())?;
        registration.index().initialize()?;
        let name = registration.index().long_name();
        let id = registry.register(registration);
        self.inner.events.fire_result_event(ResultEvent::added(ResultKind::Index, &name))?;
        Ok(id)
    }

    pub fn remove_index<O: RelationValue>(
        &self,
        relation: &RelationRef<O>,
        id: IndexId,
    ) -> ProximaResult<bool> {
        let registry = self.registry_for::<O>(relation.relation_id())?;
        match registry.remove(id) {
            Some(registration) => {
                let name = registration.index().long_name();
                self.inner
                    .events
                    .fire_result_event(ResultEvent::removed(ResultKind::Index, &name))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Values of `id` in every relation that holds it.
    pub fn get_bundle(&self, id: ObjectId) -> ProximaResult<SingleObjectBundle> {
        if !self.contains(id) {
            return Err(ProximaError::new(
                &format!("Object {} not found in the database", id),
                ErrorKind::ObjectNotFound,
            ));
        }
        let mut bundle = SingleObjectBundle::new().with_id(id);
        for column in self.inner.columns.read().iter() {
            if let Some(value) = column.read_value(id) {
                bundle.push_boxed(column.type_information(), value);
            }
        }
        Ok(bundle)
    }
}
