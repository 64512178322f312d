use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{max_k_hint, Logger, QueryHint, TypeInformation};
use crate::data::RelationValue;
use crate::distance::{DistanceFunction, DistanceQuery};
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::event::{DataStoreListener, DatabaseEventManager, ListenerId};
use crate::id::ObjectId;
use crate::index::{
    is_same_binding, Index, IndexFactory, IndexRegistration, KnnIndex, RknnIndex,
};
use crate::query::linear_scan::LinearScanKnnQuery;
use crate::query::{
    sort_result, DistanceResultPair, KnnHeap, KnnQuery, QueryResult, RknnQuery,
};
use crate::relation::{object_not_found, RelationId, RelationRef};

/// Index keeping the k nearest neighbors of every object materialized.
///
/// kNN queries for stored objects with `k` up to the materialized `k` are
/// answered from the stored lists, and so are reverse kNN queries. The lists
/// follow inserts and deletes; listeners registered on the preprocessor learn
/// which objects were added, removed or had their neighborhood changed.
pub struct MaterializeKnnPreprocessor<O> {
    inner: Arc<MaterializeKnnInner<O>>,
}

impl<O> Clone for MaterializeKnnPreprocessor<O> {
    fn clone(&self) -> Self {
        MaterializeKnnPreprocessor {
            inner: self.inner.clone(),
        }
    }
}

struct MaterializeKnnInner<O> {
    relation: RelationRef<O>,
    function: Arc<dyn DistanceFunction<O>>,
    k: usize,
    logger: Logger,
    events: DatabaseEventManager,
    lists: RwLock<BTreeMap<ObjectId, QueryResult>>,
}

impl<O: RelationValue> MaterializeKnnPreprocessor<O> {
    pub fn new(
        relation: RelationRef<O>,
        function: Arc<dyn DistanceFunction<O>>,
        k: usize,
        logger: Logger,
    ) -> ProximaResult<Self> {
        if k == 0 {
            return Err(ProximaError::new(
                "Materialized kNN needs k >= 1",
                ErrorKind::ConfigurationError,
            ));
        }
        let events = DatabaseEventManager::new(logger.child("events"));
        Ok(MaterializeKnnPreprocessor {
            inner: Arc::new(MaterializeKnnInner {
                relation,
                function,
                k,
                logger,
                events,
                lists: RwLock::new(BTreeMap::new()),
            }),
        })
    }

    /// The materialized neighborhood size.
    pub fn k(&self) -> usize {
        self.inner.k
    }

    /// Stored kNN list of `id`.
    pub fn knn_list(&self, id: ObjectId) -> ProximaResult<QueryResult> {
        self.inner
            .lists
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| object_not_found(id, &self.long_name()))
    }

    pub fn add_data_store_listener(&self, listener: DataStoreListener) -> ListenerId {
        self.inner.events.add_data_store_listener(listener)
    }

    pub fn remove_data_store_listener(&self, id: ListenerId) -> bool {
        self.inner.events.remove_data_store_listener(id)
    }

    fn own_distance_query(&self) -> DistanceQuery<O> {
        DistanceQuery::new(self.inner.relation.clone(), self.inner.function.clone())
    }

    fn check_k(&self, k: usize) -> ProximaResult<()> {
        if k > self.inner.k {
            self.inner.logger.debug(format_args!(
                "Requested k={} above materialized k={}",
                k, self.inner.k
            ));
            return Err(ProximaError::new(
                &format!(
                    "Requested k={} exceeds the materialized k={}",
                    k, self.inner.k
                ),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }

    fn accepts(&self, distance_query: &DistanceQuery<O>, hints: &[QueryHint]) -> bool {
        if !is_same_binding(
            distance_query,
            self.inner.relation.relation_id(),
            &self.inner.function.descriptor(),
        ) {
            return false;
        }
        match max_k_hint(hints) {
            Some(max_k) if max_k > self.inner.k => {
                self.inner.logger.debug(format_args!(
                    "Declining query with k up to {}, only {} materialized",
                    max_k, self.inner.k
                ));
                false
            }
            _ => true,
        }
    }

    /// Offers `candidate` to a sorted list of at most `k` pairs.
    fn offer(list: &mut QueryResult, k: usize, candidate: DistanceResultPair) -> bool {
        if list.len() >= k && list.last().is_some_and(|last| candidate >= *last) {
            return false;
        }
        let position = list.binary_search(&candidate).unwrap_or_else(|p| p);
        list.insert(position, candidate);
        list.truncate(k);
        true
    }

    fn recompute(
        &self,
        object: &O,
        excluded: &BTreeSet<ObjectId>,
    ) -> ProximaResult<QueryResult> {
        let mut heap = KnnHeap::new(self.inner.k);
        for id in self.inner.relation.ids() {
            if excluded.contains(&id) {
                continue;
            }
            let candidate = self.inner.relation.get(id)?;
            heap.offer(self.inner.function.distance(object, &candidate), id);
        }
        Ok(heap.into_sorted_vec())
    }

    fn fire(&self, primary: (&[ObjectId], bool), updated: &[ObjectId]) -> ProximaResult<()> {
        let events = &self.inner.events;
        events.accumulate_data_store_events();
        let (ids, inserted) = primary;
        let first = if inserted {
            events.fire_objects_inserted(ids)
        } else {
            events.fire_objects_removed(ids)
        };
        let second = events.fire_objects_updated(updated);
        let flushed = events.flush_data_store_events();
        first.and(second).and(flushed)
    }
}

impl<O: RelationValue> Index<O> for MaterializeKnnPreprocessor<O> {
    fn long_name(&self) -> String {
        format!(
            "materialized {}NN of {} ({})",
            self.inner.k,
            self.inner.relation.long_name(),
            self.inner.function.descriptor()
        )
    }

    fn relation_id(&self) -> RelationId {
        self.inner.relation.relation_id()
    }

    fn initialize(&self) -> ProximaResult<()> {
        let ids = self.inner.relation.ids();
        let scan = LinearScanKnnQuery::new(self.own_distance_query());
        let computed = scan.knn_for_bulk_ids(&ids, self.inner.k)?;
        let mut lists = self.inner.lists.write();
        lists.clear();
        lists.extend(ids.into_iter().zip(computed));
        self.inner
            .logger
            .debug(format_args!("Materialized {} kNN list(s)", lists.len()));
        Ok(())
    }

    fn insert(&self, id: ObjectId) -> ProximaResult<()> {
        self.insert_all(&[id])
    }

    fn insert_all(&self, ids: &[ObjectId]) -> ProximaResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let new_objects = ids
            .iter()
            .map(|id| Ok((*id, self.inner.relation.get(*id)?)))
            .collect::<ProximaResult<Vec<(ObjectId, O)>>>()?;
        let scan = LinearScanKnnQuery::new(self.own_distance_query());
        let new_lists = scan.knn_for_bulk_ids(ids, self.inner.k)?;

        let mut updated = Vec::new();
        {
            let mut lists = self.inner.lists.write();
            for (id, list) in lists.iter_mut() {
                let object = self.inner.relation.get(*id)?;
                let mut changed = false;
                for (new_id, new_object) in &new_objects {
                    let distance = self.inner.function.distance(&object, new_object);
                    let candidate = DistanceResultPair::new(distance, *new_id);
                    changed |= Self::offer(list, self.inner.k, candidate);
                }
                if changed {
                    updated.push(*id);
                }
            }
            lists.extend(ids.iter().copied().zip(new_lists));
        }
        self.fire((ids, true), &updated)
    }

    fn delete(&self, id: ObjectId) -> ProximaResult<bool> {
        let present = self.inner.lists.read().contains_key(&id);
        self.delete_all(&[id])?;
        Ok(present)
    }

    fn delete_all(&self, ids: &[ObjectId]) -> ProximaResult<()> {
        let deleted: BTreeSet<ObjectId> = ids.iter().copied().collect();
        let mut removed = Vec::new();
        let mut updated = Vec::new();
        {
            let mut lists = self.inner.lists.write();
            for id in &deleted {
                if lists.remove(id).is_some() {
                    removed.push(*id);
                }
            }
            if removed.is_empty() {
                return Ok(());
            }
            for (id, list) in lists.iter_mut() {
                if list.iter().any(|pair| deleted.contains(&pair.id())) {
                    let object = self.inner.relation.get(*id)?;
                    *list = self.recompute(&object, &deleted)?;
                    updated.push(*id);
                }
            }
        }
        self.fire((&removed, false), &updated)
    }

    fn size(&self) -> usize {
        self.inner.lists.read().len()
    }
}

impl<O: RelationValue> KnnIndex<O> for MaterializeKnnPreprocessor<O> {
    fn get_knn_query(
        &self,
        distance_query: &DistanceQuery<O>,
        hints: &[QueryHint],
    ) -> Option<Arc<dyn KnnQuery<O>>> {
        if !self.accepts(distance_query, hints) {
            return None;
        }
        Some(Arc::new(MaterializedKnnQuery {
            index: self.clone(),
            scan: LinearScanKnnQuery::new(distance_query.clone()),
        }))
    }
}

impl<O: RelationValue> RknnIndex<O> for MaterializeKnnPreprocessor<O> {
    fn get_rknn_query(
        &self,
        distance_query: &DistanceQuery<O>,
        hints: &[QueryHint],
    ) -> Option<Arc<dyn RknnQuery<O>>> {
        if !self.accepts(distance_query, hints) {
            return None;
        }
        Some(Arc::new(MaterializedRknnQuery {
            index: self.clone(),
            distance_query: distance_query.clone(),
        }))
    }
}

struct MaterializedKnnQuery<O> {
    index: MaterializeKnnPreprocessor<O>,
    scan: LinearScanKnnQuery<O>,
}

impl<O: RelationValue> KnnQuery<O> for MaterializedKnnQuery<O> {
    fn knn_for_object(&self, object: &O, k: usize) -> ProximaResult<QueryResult> {
        // arbitrary query objects have no materialized list
        self.scan.knn_for_object(object, k)
    }

    fn knn_for_id(&self, id: ObjectId, k: usize) -> ProximaResult<QueryResult> {
        self.index.check_k(k)?;
        let mut list = self.index.knn_list(id)?;
        list.truncate(k);
        Ok(list)
    }

    fn distance_query(&self) -> &DistanceQuery<O> {
        self.scan.distance_query()
    }
}

struct MaterializedRknnQuery<O> {
    index: MaterializeKnnPreprocessor<O>,
    distance_query: DistanceQuery<O>,
}

impl<O: RelationValue> RknnQuery<O> for MaterializedRknnQuery<O> {
    fn rknn_for_id(&self, id: ObjectId, k: usize) -> ProximaResult<QueryResult> {
        self.index.check_k(k)?;
        self.distance_query.relation().get(id)?;
        let lists = self.index.inner.lists.read();
        let mut result: QueryResult = lists
            .iter()
            .filter_map(|(candidate, list)| {
                list.iter()
                    .take(k)
                    .find(|pair| pair.id() == id)
                    .map(|pair| DistanceResultPair::new(pair.distance(), *candidate))
            })
            .collect();
        sort_result(&mut result);
        Ok(result)
    }

    fn rknn_for_object(&self, object: &O, k: usize) -> ProximaResult<QueryResult> {
        self.index.check_k(k)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let relation = self.distance_query.relation();
        let lists = self.index.inner.lists.read();
        let mut result = Vec::new();
        for (candidate_id, list) in lists.iter() {
            let kdist = if list.len() < k {
                f64::INFINITY
            } else {
                list[k - 1].distance()
            };
            let candidate = relation.get(*candidate_id)?;
            let distance = self.distance_query.distance_between(&candidate, object);
            if distance <= kdist {
                result.push(DistanceResultPair::new(distance, *candidate_id));
            }
        }
        sort_result(&mut result);
        Ok(result)
    }

    fn distance_query(&self) -> &DistanceQuery<O> {
        &self.distance_query
    }
}

/// Creates a [`MaterializeKnnPreprocessor`] for every relation of type `O`.
pub struct MaterializeKnnPreprocessorFactory<O> {
    function: Arc<dyn DistanceFunction<O>>,
    k: usize,
}

impl<O> MaterializeKnnPreprocessorFactory<O> {
    pub fn new(function: Arc<dyn DistanceFunction<O>>, k: usize) -> Self {
        MaterializeKnnPreprocessorFactory { function, k }
    }
}

impl<O: RelationValue> IndexFactory<O> for MaterializeKnnPreprocessorFactory<O> {
    fn name(&self) -> String {
        format!("MaterializeKnn(k={}, {})", self.k, self.function.descriptor())
    }

    fn accepts(&self, type_information: &TypeInformation) -> bool {
        type_information.is_type::<O>()
    }

    fn instantiate(
        &self,
        relation: RelationRef<O>,
        logger: &Logger,
    ) -> ProximaResult<IndexRegistration<O>> {
        let index = Arc::new(MaterializeKnnPreprocessor::new(
            relation,
            self.function.clone(),
            self.k,
            logger.child("materialize_knn"),
        )?);
        Ok(IndexRegistration::<O>::new(index.clone())
            .with_knn(index.clone())
            .with_rknn(index))
    }
}
