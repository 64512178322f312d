use std::marker::PhantomData;
use std::sync::Arc;

use proxima::common::{Logger, QueryHint, TypeInformation};
use proxima::data::DoubleVector;
use proxima::distance::{DistanceQuery, SpatialDistanceFunction};
use proxima::errors::{ErrorKind, ProximaError, ProximaResult};
use proxima::id::ObjectId;
use proxima::index::{
    is_same_binding, Index, IndexFactory, IndexRegistration, KnnIndex, RangeIndex,
};
use proxima::query::{KnnQuery, QueryResult, RangeQuery};
use proxima::relation::{RelationId, RelationRef};

use crate::rtree::augmentation::NodeAugmentation;
use crate::rtree::rtree_config::RTreeConfig;
use crate::rtree::rtree_impl::RTree;

/// Index over a vector relation backed by an [`RTree`].
///
/// kNN and range queries are accelerated for the spatial distance function
/// the index was built with; exact distances always go through the distance
/// query, so answers equal those of a linear scan.
pub struct SpatialTreeIndex<A> {
    inner: Arc<SpatialTreeIndexInner<A>>,
}

/// The plain R*-tree index.
pub type RStarTreeIndex = SpatialTreeIndex<()>;

impl<A> Clone for SpatialTreeIndex<A> {
    fn clone(&self) -> Self {
        SpatialTreeIndex {
            inner: self.inner.clone(),
        }
    }
}

struct SpatialTreeIndexInner<A> {
    relation: RelationRef<DoubleVector>,
    function: Arc<dyn SpatialDistanceFunction>,
    tree: RTree<A>,
    logger: Logger,
}

impl<A: NodeAugmentation> SpatialTreeIndex<A> {
    pub fn new(
        relation: RelationRef<DoubleVector>,
        function: Arc<dyn SpatialDistanceFunction>,
        config: RTreeConfig,
        logger: Logger,
    ) -> Self {
        SpatialTreeIndex {
            inner: Arc::new(SpatialTreeIndexInner {
                relation,
                function,
                tree: RTree::new(config, logger.clone()),
                logger,
            }),
        }
    }

    pub fn tree(&self) -> &RTree<A> {
        &self.inner.tree
    }

    pub fn relation(&self) -> &RelationRef<DoubleVector> {
        &self.inner.relation
    }

    pub fn distance_function(&self) -> &Arc<dyn SpatialDistanceFunction> {
        &self.inner.function
    }

    pub(crate) fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    /// Registration declaring kNN and range support.
    pub fn registration(&self) -> IndexRegistration<DoubleVector> {
        let index = Arc::new(self.clone());
        IndexRegistration::<DoubleVector>::new(index.clone())
            .with_knn(index.clone())
            .with_range(index)
    }

    /// Runs the integrity check when the configuration asks for it.
    pub(crate) fn check_integrity_if_enabled(&self) -> ProximaResult<()> {
        if !self.inner.tree.config().integrity_checks() {
            return Ok(());
        }
        self.inner.tree.integrity_check().map_err(|e| {
            let err = ProximaError::from(e);
            self.inner
                .logger
                .error(format_args!("{}: {}", self.long_name(), err.message()));
            err
        })
    }

    pub(crate) fn accepts(&self, distance_query: &DistanceQuery<DoubleVector>) -> bool {
        is_same_binding(
            distance_query,
            self.inner.relation.relation_id(),
            &self.inner.function.descriptor(),
        )
    }

    fn knn(
        &self,
        distance_query: &DistanceQuery<DoubleVector>,
        object: &DoubleVector,
        k: usize,
    ) -> ProximaResult<QueryResult> {
        Ok(self.inner.tree.knn(object, k, self.inner.function.as_ref(), |id| {
            distance_query.distance_to(object, id)
        })?)
    }

    fn range(
        &self,
        distance_query: &DistanceQuery<DoubleVector>,
        object: &DoubleVector,
        epsilon: f64,
    ) -> ProximaResult<QueryResult> {
        Ok(self
            .inner
            .tree
            .range(object, epsilon, self.inner.function.as_ref(), |id| {
                distance_query.distance_to(object, id)
            })?)
    }
}

impl<A: NodeAugmentation> Index<DoubleVector> for SpatialTreeIndex<A> {
    fn long_name(&self) -> String {
        format!(
            "{} over {} ({})",
            A::TREE_NAME,
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
        let point = self.inner.relation.get(id)?;
        self.inner.tree.insert(id, &point)?;
        Ok(())
    }

    /// Bulk loads into an empty tree when a bulk strategy is configured,
    /// inserts one by one otherwise.
    fn insert_all(&self, ids: &[ObjectId]) -> ProximaResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let tree = &self.inner.tree;
        if tree.is_empty() && tree.config().bulk_strategy().is_some() {
            let points = ids
                .iter()
                .map(|id| Ok((*id, self.inner.relation.get(*id)?)))
                .collect::<ProximaResult<Vec<(ObjectId, DoubleVector)>>>()?;
            tree.bulk_load(points)?;
        } else {
            for id in ids {
                self.insert(*id)?;
            }
        }
        self.check_integrity_if_enabled()
    }

    fn delete(&self, id: ObjectId) -> ProximaResult<bool> {
        if !self.inner.tree.contains(id) {
            return Ok(false);
        }
        let point = self.inner.relation.get(id).map_err(|e| {
            ProximaError::new_with_cause(
                &format!("Indexed object {} has no value in {}", id, self.inner.relation.long_name()),
                ErrorKind::IndexCorrupted,
                e,
            )
        })?;
        Ok(self.inner.tree.delete(id, &point)?)
    }

    fn size(&self) -> usize {
        self.inner.tree.len()
    }

    fn log_statistics(&self) {
        self.inner.tree.log_stats(&self.long_name());
    }
}

impl<A: NodeAugmentation> KnnIndex<DoubleVector> for SpatialTreeIndex<A> {
    fn get_knn_query(
        &self,
        distance_query: &DistanceQuery<DoubleVector>,
        _hints: &[QueryHint],
    ) -> Option<Arc<dyn KnnQuery<DoubleVector>>> {
        if !self.accepts(distance_query) {
            self.inner.logger.debug(format_args!(
                "{} cannot answer kNN for {}",
                self.long_name(),
                distance_query.descriptor()
            ));
            return None;
        }
        Some(Arc::new(SpatialTreeQuery {
            index: self.clone(),
            distance_query: distance_query.clone(),
        }))
    }
}

impl<A: NodeAugmentation> RangeIndex<DoubleVector> for SpatialTreeIndex<A> {
    fn get_range_query(
        &self,
        distance_query: &DistanceQuery<DoubleVector>,
        _hints: &[QueryHint],
    ) -> Option<Arc<dyn RangeQuery<DoubleVector>>> {
        if !self.accepts(distance_query) {
            return None;
        }
        Some(Arc::new(SpatialTreeQuery {
            index: self.clone(),
            distance_query: distance_query.clone(),
        }))
    }
}

struct SpatialTreeQuery<A> {
    index: SpatialTreeIndex<A>,
    distance_query: DistanceQuery<DoubleVector>,
}

impl<A: NodeAugmentation> KnnQuery<DoubleVector> for SpatialTreeQuery<A> {
    fn knn_for_object(&self, object: &DoubleVector, k: usize) -> ProximaResult<QueryResult> {
        self.index.knn(&self.distance_query, object, k)
    }

    fn distance_query(&self) -> &DistanceQuery<DoubleVector> {
        &self.distance_query
    }
}

impl<A: NodeAugmentation> RangeQuery<DoubleVector> for SpatialTreeQuery<A> {
    fn range_for_object(&self, object: &DoubleVector, epsilon: f64) -> ProximaResult<QueryResult> {
        self.index.range(&self.distance_query, object, epsilon)
    }

    fn distance_query(&self) -> &DistanceQuery<DoubleVector> {
        &self.distance_query
    }
}

/// Creates a [`SpatialTreeIndex`] for every vector relation.
pub struct SpatialTreeIndexFactory<A> {
    function: Arc<dyn SpatialDistanceFunction>,
    config: RTreeConfig,
    marker: PhantomData<fn() -> A>,
}

/// Factory of plain R*-tree indexes.
pub type RStarTreeIndexFactory = SpatialTreeIndexFactory<()>;

impl<A> SpatialTreeIndexFactory<A> {
    pub fn new(function: Arc<dyn SpatialDistanceFunction>, config: RTreeConfig) -> Self {
        SpatialTreeIndexFactory {
            function,
            config,
            marker: PhantomData,
        }
    }
}

impl<A: NodeAugmentation> IndexFactory<DoubleVector> for SpatialTreeIndexFactory<A> {
    fn name(&self) -> String {
        format!("{}({})", A::TREE_NAME, self.function.descriptor())
    }

    fn accepts(&self, type_information: &TypeInformation) -> bool {
        type_information.is_type::<DoubleVector>()
    }

    fn instantiate(
        &self,
        relation: RelationRef<DoubleVector>,
        logger: &Logger,
    ) -> ProximaResult<IndexRegistration<DoubleVector>> {
        let index = SpatialTreeIndex::<A>::new(
            relation,
            self.function.clone(),
            self.config.clone(),
            logger.child("rtree"),
        );
        Ok(index.registration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtree::BulkSplitStrategy;
    use proxima::distance::{EuclideanDistance, ManhattanDistance};
    use proxima::query::linear_scan::{LinearScanKnnQuery, LinearScanRangeQuery};
    use proxima::relation::MaterializedRelation;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_relation(n: usize, seed: u64) -> Arc<MaterializedRelation<DoubleVector>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let relation = Arc::new(MaterializedRelation::new(
            "random",
            TypeInformation::of::<DoubleVector>().with_dimensionality(2),
        ));
        for i in 0..n {
            let point = [rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)];
            relation
                .set(ObjectId::new(i as u64 + 1), DoubleVector::from(point))
                .unwrap();
        }
        relation
    }

    fn index_over(
        relation: &Arc<MaterializedRelation<DoubleVector>>,
        config: RTreeConfig,
    ) -> RStarTreeIndex {
        let index = RStarTreeIndex::new(
            relation.clone(),
            Arc::new(EuclideanDistance),
            config,
            Logger::silent(),
        );
        index.initialize().unwrap();
        index
    }

    #[test]
    fn test_knn_and_range_match_linear_scan() {
        let relation = random_relation(400, 3);
        let config = RTreeConfig::builder().capacities(6, 6).build().unwrap();
        let index = index_over(&relation, config);
        assert_eq!(index.size(), 400);

        let dq: DistanceQuery<DoubleVector> =
            DistanceQuery::new(relation.clone(), Arc::new(EuclideanDistance));
        let knn = index.get_knn_query(&dq, &[]).unwrap();
        let range = index.get_range_query(&dq, &[]).unwrap();
        let scan_knn = LinearScanKnnQuery::new(dq.clone());
        let scan_range = LinearScanRangeQuery::new(dq.clone());
        for id in [1u64, 100, 399] {
            let id = ObjectId::new(id);
            assert_eq!(knn.knn_for_id(id, 15).unwrap(), scan_knn.knn_for_id(id, 15).unwrap());
            assert_eq!(
                range.range_for_id(id, 12.5).unwrap(),
                scan_range.range_for_id(id, 12.5).unwrap()
            );
        }
    }

    #[test]
    fn test_bulk_initialize_with_integrity_checks() {
        let relation = random_relation(250, 9);
        let config = RTreeConfig::builder()
            .capacities(10, 10)
            .bulk_strategy(BulkSplitStrategy::HilbertSort)
            .integrity_checks(true)
            .build()
            .unwrap();
        let index = index_over(&relation, config);
        assert_eq!(index.size(), 250);
        assert!(index.tree().height() >= 3);

        let dq: DistanceQuery<DoubleVector> =
            DistanceQuery::new(relation.clone(), Arc::new(EuclideanDistance));
        let knn = index.get_knn_query(&dq, &[]).unwrap();
        let scan = LinearScanKnnQuery::new(dq);
        assert_eq!(
            knn.knn_for_id(ObjectId::new(7), 9).unwrap(),
            scan.knn_for_id(ObjectId::new(7), 9).unwrap()
        );
    }

    #[test]
    fn test_refuses_other_binding() {
        let relation = random_relation(20, 1);
        let index = index_over(&relation, RTreeConfig::default());
        let dq: DistanceQuery<DoubleVector> =
            DistanceQuery::new(relation.clone(), Arc::new(ManhattanDistance));
        assert!(index.get_knn_query(&dq, &[]).is_none());
        assert!(index.get_range_query(&dq, &[]).is_none());

        let other = random_relation(20, 1);
        let dq: DistanceQuery<DoubleVector> =
            DistanceQuery::new(other, Arc::new(EuclideanDistance));
        assert!(index.get_knn_query(&dq, &[]).is_none());
    }

    #[test]
    fn test_delete_and_duplicate_insert() {
        let relation = random_relation(30, 4);
        let index = index_over(&relation, RTreeConfig::default());
        let err = index.insert(ObjectId::new(3)).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DuplicateId);

        assert!(index.delete(ObjectId::new(3)).unwrap());
        assert!(!index.delete(ObjectId::new(3)).unwrap());
        assert_eq!(index.size(), 29);
    }

    #[test]
    fn test_factory_registration() {
        let factory = RStarTreeIndexFactory::new(Arc::new(EuclideanDistance), RTreeConfig::default());
        assert!(factory.accepts(&TypeInformation::of::<DoubleVector>()));
        assert!(!factory.accepts(&TypeInformation::of::<String>()));
        assert!(factory.name().starts_with("R*-tree"));

        let relation = random_relation(5, 2);
        let registration = factory
            .instantiate(relation as RelationRef<DoubleVector>, &Logger::silent())
            .unwrap();
        assert!(registration.knn().is_some());
        assert!(registration.range().is_some());
        assert!(registration.rknn().is_none());
    }
}
