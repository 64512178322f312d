use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{Logger, QueryHint, TypeInformation};
use crate::data::RelationValue;
use crate::distance::{DistanceFunction, DistanceQuery};
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::id::ObjectId;
use crate::index::{
    is_same_binding, Index, IndexFactory, IndexRegistration, KnnIndex, RangeIndex,
};
use crate::query::{sort_result, DistanceResultPair, KnnHeap, KnnQuery, QueryResult, RangeQuery};
use crate::relation::{RelationId, RelationRef};

/// Relative slack applied to triangle-inequality bounds before pruning.
const BOUND_TOLERANCE: f64 = 1e-9;

/// Metric index storing the distances of every object to a few pivots.
///
/// For a metric distance `|d(q, p) - d(o, p)|` is a lower bound of `d(q, o)`
/// for every pivot `p`; candidates whose best bound already exceeds the
/// current answer are skipped without computing their distance.
pub struct PivotTableIndex<O> {
    inner: Arc<PivotTableInner<O>>,
}

impl<O> Clone for PivotTableIndex<O> {
    fn clone(&self) -> Self {
        PivotTableIndex {
            inner: self.inner.clone(),
        }
    }
}

struct PivotTableInner<O> {
    relation: RelationRef<O>,
    function: Arc<dyn DistanceFunction<O>>,
    num_pivots: usize,
    logger: Logger,
    state: RwLock<PivotTable<O>>,
}

struct PivotTable<O> {
    pivots: Vec<O>,
    rows: BTreeMap<ObjectId, Vec<f64>>,
}

impl<O: RelationValue> PivotTableIndex<O> {
    pub fn new(
        relation: RelationRef<O>,
        function: Arc<dyn DistanceFunction<O>>,
        num_pivots: usize,
        logger: Logger,
    ) -> ProximaResult<Self> {
        if !function.is_metric() {
            logger.error(format_args!(
                "Pivot table requires a metric, {} is not",
                function.descriptor()
            ));
            return Err(ProximaError::new(
                &format!("Pivot table requires a metric, {} is not", function.descriptor()),
                ErrorKind::ConfigurationError,
            ));
        }
        if num_pivots == 0 {
            return Err(ProximaError::new(
                "Pivot table needs at least one pivot",
                ErrorKind::ConfigurationError,
            ));
        }
        Ok(PivotTableIndex {
            inner: Arc::new(PivotTableInner {
                relation,
                function,
                num_pivots,
                logger,
                state: RwLock::new(PivotTable {
                    pivots: Vec::new(),
                    rows: BTreeMap::new(),
                }),
            }),
        })
    }

    pub fn num_pivots(&self) -> usize {
        self.inner.state.read().pivots.len()
    }

    fn distance(&self, a: &O, b: &O) -> f64 {
        self.inner.function.distance(a, b)
    }

    fn row_for(&self, pivots: &[O], object: &O) -> Vec<f64> {
        pivots.iter().map(|p| self.distance(p, object)).collect()
    }

    /// Picks additional pivots farthest-first among `candidates`.
    fn extend_pivots(&self, table: &mut PivotTable<O>, candidates: &[(ObjectId, O)]) {
        let before = table.pivots.len();
        let mut remaining: Vec<&(ObjectId, O)> = candidates.iter().collect();
        while table.pivots.len() < self.inner.num_pivots && !remaining.is_empty() {
            let choice = if table.pivots.is_empty() {
                Some(0)
            } else {
                let mut best: Option<(usize, f64)> = None;
                for (position, (_, object)) in remaining.iter().enumerate() {
                    let nearest = table
                        .pivots
                        .iter()
                        .map(|p| self.distance(p, object))
                        .fold(f64::INFINITY, f64::min);
                    if nearest > 0.0 && best.map_or(true, |(_, d)| nearest > d) {
                        best = Some((position, nearest));
                    }
                }
                best.map(|(position, _)| position)
            };
            match choice {
                Some(position) => {
                    let (_, object) = remaining.remove(position);
                    table.pivots.push(object.clone());
                }
                None => break,
            }
        }

        if table.pivots.len() > before {
            self.inner.logger.debug(format_args!(
                "Pivot table over {} now uses {} pivot(s)",
                self.inner.relation.long_name(),
                table.pivots.len()
            ));
            let pivots = table.pivots.clone();
            for (id, row) in table.rows.iter_mut() {
                if let Ok(object) = self.inner.relation.get(*id) {
                    for pivot in &pivots[row.len()..] {
                        row.push(self.distance(pivot, &object));
                    }
                }
            }
        }
    }

    fn lower_bound(query_row: &[f64], row: &[f64]) -> f64 {
        query_row
            .iter()
            .zip(row.iter())
            .map(|(q, o)| (q - o).abs())
            .fold(0.0, f64::max)
    }

    fn exceeds(bound: f64, limit: f64) -> bool {
        bound - BOUND_TOLERANCE * bound.abs().max(1.0) > limit
    }

    /// Candidates ordered by ascending lower bound.
    fn candidates(&self, object: &O) -> Vec<(f64, ObjectId)> {
        let table = self.inner.state.read();
        let query_row = self.row_for(&table.pivots, object);
        let mut candidates: Vec<(f64, ObjectId)> = table
            .rows
            .iter()
            .map(|(id, row)| (Self::lower_bound(&query_row, row), *id))
            .collect();
        candidates.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        candidates
    }

    fn knn(
        &self,
        distance_query: &DistanceQuery<O>,
        object: &O,
        k: usize,
    ) -> ProximaResult<QueryResult> {
        let mut heap = KnnHeap::new(k);
        if k == 0 {
            return Ok(heap.into_sorted_vec());
        }
        for (bound, id) in self.candidates(object) {
            if Self::exceeds(bound, heap.kth_distance()) {
                break;
            }
            let candidate = self.inner.relation.get(id)?;
            heap.offer(distance_query.distance_between(object, &candidate), id);
        }
        Ok(heap.into_sorted_vec())
    }

    fn range(
        &self,
        distance_query: &DistanceQuery<O>,
        object: &O,
        epsilon: f64,
    ) -> ProximaResult<QueryResult> {
        let mut result = Vec::new();
        for (bound, id) in self.candidates(object) {
            if Self::exceeds(bound, epsilon) {
                break;
            }
            let candidate = self.inner.relation.get(id)?;
            let distance = distance_query.distance_between(object, &candidate);
            if distance <= epsilon {
                result.push(DistanceResultPair::new(distance, id));
            }
        }
        sort_result(&mut result);
        Ok(result)
    }

    fn accepts(&self, distance_query: &DistanceQuery<O>) -> bool {
        is_same_binding(
            distance_query,
            self.inner.relation.relation_id(),
            &self.inner.function.descriptor(),
        )
    }
}

impl<O: RelationValue> Index<O> for PivotTableIndex<O> {
    fn long_name(&self) -> String {
        format!(
            "pivot table over {} ({})",
            self.inner.relation.long_name(),
            self.inner.function.descriptor()
        )
    }

    fn relation_id(&self) -> RelationId {
        self.inner.relation.relation_id()
    }

    fn initialize(&self) -> ProximaResult<()> {
        let ids = self.inner.relation.ids();
        self.insert_all(&ids)
    }

    fn insert(&self, id: ObjectId) -> ProximaResult<()> {
        self.insert_all(&[id])
    }

    fn insert_all(&self, ids: &[ObjectId]) -> ProximaResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let objects = ids
            .iter()
            .map(|id| Ok((*id, self.inner.relation.get(*id)?)))
            .collect::<ProximaResult<Vec<(ObjectId, O)>>>()?;

        let mut table = self.inner.state.write();
        if table.pivots.len() < self.inner.num_pivots {
            self.extend_pivots(&mut table, &objects);
        }
        for (id, object) in &objects {
            let row = self.row_for(&table.pivots, object);
            table.rows.insert(*id, row);
        }
        Ok(())
    }

    fn delete(&self, id: ObjectId) -> ProximaResult<bool> {
        Ok(self.inner.state.write().rows.remove(&id).is_some())
    }

    fn size(&self) -> usize {
        self.inner.state.read().rows.len()
    }

    fn log_statistics(&self) {
        let table = self.inner.state.read();
        self.inner.logger.info(format_args!(
            "{}: {} object(s), {} pivot(s)",
            self.long_name(),
            table.rows.len(),
            table.pivots.len()
        ));
    }
}

impl<O: RelationValue> KnnIndex<O> for PivotTableIndex<O> {
    fn get_knn_query(
        &self,
        distance_query: &DistanceQuery<O>,
        _hints: &[QueryHint],
    ) -> Option<Arc<dyn KnnQuery<O>>> {
        if !self.accepts(distance_query) {
            return None;
        }
        Some(Arc::new(PivotTableQuery {
            index: self.clone(),
            distance_query: distance_query.clone(),
        }))
    }
}

impl<O: RelationValue> RangeIndex<O> for PivotTableIndex<O> {
    fn get_range_query(
        &self,
        distance_query: &DistanceQuery<O>,
        _hints: &[QueryHint],
    ) -> Option<Arc<dyn RangeQuery<O>>> {
        if !self.accepts(distance_query) {
            return None;
        }
        Some(Arc::new(PivotTableQuery {
            index: self.clone(),
            distance_query: distance_query.clone(),
        }))
    }
}

struct PivotTableQuery<O> {
    index: PivotTableIndex<O>,
    distance_query: DistanceQuery<O>,
}

impl<O: RelationValue> KnnQuery<O> for PivotTableQuery<O> {
    fn knn_for_object(&self, object: &O, k: usize) -> ProximaResult<QueryResult> {
        self.index.knn(&self.distance_query, object, k)
    }

    fn distance_query(&self) -> &DistanceQuery<O> {
        &self.distance_query
    }
}

impl<O: RelationValue> RangeQuery<O> for PivotTableQuery<O> {
    fn range_for_object(&self, object: &O, epsilon: f64) -> ProximaResult<QueryResult> {
        self.index.range(&self.distance_query, object, epsilon)
    }

    fn distance_query(&self) -> &DistanceQuery<O> {
        &self.distance_query
    }
}

/// Creates a [`PivotTableIndex`] for every relation of type `O`.
pub struct PivotTableIndexFactory<O> {
    function: Arc<dyn DistanceFunction<O>>,
    num_pivots: usize,
}

impl<O> PivotTableIndexFactory<O> {
    pub fn new(function: Arc<dyn DistanceFunction<O>>, num_pivots: usize) -> Self {
        PivotTableIndexFactory {
            function,
            num_pivots,
        }
    }
}

impl<O: RelationValue> IndexFactory<O> for PivotTableIndexFactory<O> {
    fn name(&self) -> String {
        format!("PivotTable({})", self.function.descriptor())
    }

    fn accepts(&self, type_information: &TypeInformation) -> bool {
        type_information.is_type::<O>()
    }

    fn instantiate(
        &self,
        relation: RelationRef<O>,
        logger: &Logger,
    ) -> ProximaResult<IndexRegistration<O>> {
        let index = Arc::new(PivotTableIndex::new(
            relation,
            self.function.clone(),
            self.num_pivots,
            logger.child("pivot_table"),
        )?);
        Ok(IndexRegistration::<O>::new(index.clone())
            .with_knn(index.clone())
            .with_range(index))
    }
}
