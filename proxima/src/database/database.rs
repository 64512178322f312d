use std::sync::Arc;

use crate::common::{QueryHint, TypeInformation};
use crate::data::RelationValue;
use crate::database::{DatabaseCore, MultipleObjectsBundle, QueryBuilder, SingleObjectBundle};
use crate::distance::{DistanceFunction, DistanceQuery, SimilarityFunction, SimilarityQuery};
use crate::errors::ProximaResult;
use crate::event::{DataStoreListener, ListenerId, ResultListener};
use crate::id::ObjectId;
use crate::index::{IndexId, IndexRegistration};
use crate::query::{KnnQuery, RangeQuery, RknnQuery};
use crate::relation::RelationRef;

/// A collection of objects stored column-wise in typed relations.
///
/// Every shape keeps a [`DatabaseCore`] with the id view, the relations,
/// their indexes and the event listeners. Lookups, query construction and
/// listener management are shared; the shapes differ in how they accept
/// and remove data.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use proxima::data::DoubleVector;
/// use proxima::database::{Database, DatabaseBuilder, MultipleObjectsBundle};
/// use proxima::common::TypeInformation;
/// use proxima::distance::EuclideanDistance;
///
/// let db = DatabaseBuilder::new().open_hashmap().unwrap();
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
///     .distance_function(Arc::new(EuclideanDistance))
///     .knn_query()
///     .unwrap()
///     .unwrap();
/// let result = knn.knn_for_id(ids[0], 2).unwrap();
/// assert_eq!(result[1].distance(), 5.0);
/// ```
pub trait Database: Send + Sync {
    fn core(&self) -> &DatabaseCore;

    /// Inserts the objects of `bundle` and returns their ids in row order.
    fn insert(&self, bundle: MultipleObjectsBundle) -> ProximaResult<Vec<ObjectId>>;

    /// Removes `id` and returns its values.
    fn delete(&self, id: ObjectId) -> ProximaResult<SingleObjectBundle>;

    /// Removes every id of `ids` that is present; unknown ids are skipped.
    fn delete_all(&self, ids: &[ObjectId]) -> ProximaResult<Vec<SingleObjectBundle>>;

    fn len(&self) -> usize {
        self.core().len()
    }

    fn is_empty(&self) -> bool {
        self.core().is_empty()
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.core().contains(id)
    }

    fn id_view(&self) -> RelationRef<ObjectId> {
        self.core().id_view()
    }

    fn relation_count(&self) -> usize {
        self.core().relation_count()
    }

    /// First relation whose type satisfies `restriction`.
    fn get_relation<T: RelationValue>(
        &self,
        restriction: &TypeInformation,
    ) -> ProximaResult<RelationRef<T>>
    where
        Self: Sized,
    {
        self.core().get_relation::<T>(restriction)
    }

    fn get_bundle(&self, id: ObjectId) -> ProximaResult<SingleObjectBundle> {
        self.core().get_bundle(id)
    }

    fn get_distance_query<O: RelationValue>(
        &self,
        relation: &RelationRef<O>,
        function: Option<Arc<dyn DistanceFunction<O>>>,
        _hints: &[QueryHint],
    ) -> ProximaResult<DistanceQuery<O>>
    where
        Self: Sized,
    {
        self.core().distance_query(relation, function)
    }

    fn get_similarity_query<O: RelationValue>(
        &self,
        relation: &RelationRef<O>,
        function: Option<Arc<dyn SimilarityFunction<O>>>,
        _hints: &[QueryHint],
    ) -> ProximaResult<SimilarityQuery<O>>
    where
        Self: Sized,
    {
        self.core().similarity_query(relation, function)
    }

    /// Best available kNN query; `None` only under [`QueryHint::OptimizedOnly`].
    fn get_knn_query<O: RelationValue>(
        &self,
        distance_query: &DistanceQuery<O>,
        hints: &[QueryHint],
    ) -> ProximaResult<Option<Arc<dyn KnnQuery<O>>>>
    where
        Self: Sized,
    {
        self.core().knn_query(distance_query, hints)
    }

    fn get_range_query<O: RelationValue>(
        &self,
        distance_query: &DistanceQuery<O>,
        hints: &[QueryHint],
    ) -> ProximaResult<Option<Arc<dyn RangeQuery<O>>>>
    where
        Self: Sized,
    {
        self.core().range_query(distance_query, hints)
    }

    fn get_rknn_query<O: RelationValue>(
        &self,
        distance_query: &DistanceQuery<O>,
        hints: &[QueryHint],
    ) -> ProximaResult<Option<Arc<dyn RknnQuery<O>>>>
    where
        Self: Sized,
    {
        self.core().rknn_query(distance_query, hints)
    }

    /// Starts building queries over `relation`.
    fn query<'a, O: RelationValue>(&'a self, relation: &RelationRef<O>) -> QueryBuilder<'a, Self, O>
    where
        Self: Sized,
    {
        QueryBuilder::new(self, relation.clone())
    }

    /// Registers an index built over `relation`.
    fn add_index<O: RelationValue>(
        &self,
        relation: &RelationRef<O>,
        registration: IndexRegistration<O>,
    ) -> ProximaResult<IndexId>
    where
        Self: Sized,
    {
        self.core().add_index(relation, registration)
    }

    fn remove_index<O: RelationValue>(
        &self,
        relation: &RelationRef<O>,
        id: IndexId,
    ) -> ProximaResult<bool>
    where
        Self: Sized,
    {
        self.core().remove_index(relation, id)
    }

    fn add_data_store_listener(&self, listener: DataStoreListener) -> ListenerId {
        self.core().events().add_data_store_listener(listener)
    }

    fn remove_data_store_listener(&self, id: ListenerId) -> bool {
        self.core().events().remove_data_store_listener(id)
    }

    fn add_result_listener(&self, listener: ResultListener) -> ListenerId {
        self.core().events().add_result_listener(listener)
    }

    fn remove_result_listener(&self, id: ListenerId) -> bool {
        self.core().events().remove_result_listener(id)
    }

    /// Merges subsequent data store events of one type until
    /// [`Database::flush_data_store_events`].
    fn accumulate_data_store_events(&self) {
        self.core().events().accumulate_data_store_events()
    }

    fn flush_data_store_events(&self) -> ProximaResult<()> {
        self.core().events().flush_data_store_events()
    }
}

/// Source of the initial contents of a database.
pub trait DatabaseConnection: Send + Sync {
    fn load_data(&self) -> ProximaResult<MultipleObjectsBundle>;
}

/// Connection serving a bundle held in memory.
pub struct BundleConnection {
    bundle: MultipleObjectsBundle,
}

impl BundleConnection {
    pub fn new(bundle: MultipleObjectsBundle) -> Self {
        BundleConnection { bundle }
    }
}

impl DatabaseConnection for BundleConnection {
    fn load_data(&self) -> ProximaResult<MultipleObjectsBundle> {
        Ok(self.bundle.clone())
    }
}
