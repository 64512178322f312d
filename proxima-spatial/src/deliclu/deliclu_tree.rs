use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use proxima::common::{Logger, QueryHint, TypeInformation};
use proxima::data::DoubleVector;
use proxima::distance::{DistanceQuery, SpatialDistanceFunction};
use proxima::errors::{ErrorKind, ProximaError, ProximaResult};
use proxima::id::ObjectId;
use proxima::index::{Index, IndexFactory, IndexRegistration, KnnIndex, RangeIndex};
use proxima::query::{KnnQuery, RangeQuery};
use proxima::relation::{RelationId, RelationRef};
use serde::{Deserialize, Serialize};

use crate::rtree::{
    IndexTreePath, Node, NodeAugmentation, PageId, RTreeConfig, RootEntry, SpatialTreeIndex,
};

/// Processing state a DeLiClu entry summarizes for its subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeLiCluFlags {
    has_handled: bool,
    has_unhandled: bool,
}

impl DeLiCluFlags {
    pub fn new(has_handled: bool, has_unhandled: bool) -> Self {
        DeLiCluFlags {
            has_handled,
            has_unhandled,
        }
    }

    /// Whether some object below the entry has been handled.
    pub fn has_handled(&self) -> bool {
        self.has_handled
    }

    /// Whether some object below the entry is still unhandled.
    pub fn has_unhandled(&self) -> bool {
        self.has_unhandled
    }

    fn handled() -> Self {
        DeLiCluFlags::new(true, false)
    }
}

impl NodeAugmentation for DeLiCluFlags {
    const TREE_NAME: &'static str = "DeLiClu tree";

    fn new_leaf_entry() -> Self {
        DeLiCluFlags::new(false, true)
    }

    fn aggregate<'a, I>(entries: I) -> Self
    where
        I: Iterator<Item = &'a Self>,
    {
        entries.fold(DeLiCluFlags::new(false, false), |acc, flags| {
            DeLiCluFlags::new(
                acc.has_handled || flags.has_handled,
                acc.has_unhandled || flags.has_unhandled,
            )
        })
    }
}

/// R*-tree whose entries additionally record whether their subtree holds
/// handled and unhandled objects, as the DeLiClu clustering traversal needs.
///
/// Besides the usual kNN and range queries the tree offers:
/// - [`DeLiCluTree::set_handled`] to mark an object processed,
/// - [`DeLiCluTree::set_expanded`] / [`DeLiCluTree::get_expanded`] to memo
///   which node pairs a traversal already expanded,
/// - [`DeLiCluTree::root_entry`] and [`DeLiCluTree::node`] to walk the tree.
///
/// ```rust
/// use std::sync::Arc;
/// use proxima::common::{Logger, TypeInformation};
/// use proxima::data::DoubleVector;
/// use proxima::distance::EuclideanDistance;
/// use proxima::id::ObjectId;
/// use proxima::index::Index;
/// use proxima::relation::MaterializedRelation;
/// use proxima_spatial::deliclu::DeLiCluTree;
/// use proxima_spatial::rtree::RTreeConfig;
///
/// let relation = Arc::new(MaterializedRelation::new(
///     "points",
///     TypeInformation::of::<DoubleVector>(),
/// ));
/// relation.set(ObjectId::new(1), DoubleVector::from([0.0, 0.0])).unwrap();
/// relation.set(ObjectId::new(2), DoubleVector::from([1.0, 1.0])).unwrap();
///
/// let tree = DeLiCluTree::new(
///     relation,
///     Arc::new(EuclideanDistance),
///     RTreeConfig::default(),
///     Logger::silent(),
/// );
/// tree.initialize().unwrap();
///
/// tree.set_handled(ObjectId::new(1)).unwrap();
/// let root = tree.root_entry().unwrap();
/// assert!(root.augmentation.has_handled() && root.augmentation.has_unhandled());
/// ```
#[derive(Clone)]
pub struct DeLiCluTree {
    index: SpatialTreeIndex<DeLiCluFlags>,
    expanded: Arc<RwLock<HashMap<PageId, BTreeSet<PageId>>>>,
}

impl DeLiCluTree {
    pub fn new(
        relation: RelationRef<DoubleVector>,
        function: Arc<dyn SpatialDistanceFunction>,
        config: RTreeConfig,
        logger: Logger,
    ) -> Self {
        DeLiCluTree {
            index: SpatialTreeIndex::new(relation, function, config, logger),
            expanded: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Marks `id` handled and refreshes the flags of all its ancestors.
    ///
    /// Returns the root-to-leaf path of the object. An object the tree does
    /// not hold means the tree and its relation disagree, which is reported
    /// as [`ErrorKind::IndexCorrupted`].
    pub fn set_handled(&self, id: ObjectId) -> ProximaResult<IndexTreePath> {
        let point = self.index.relation().get(id).map_err(|e| {
            ProximaError::new_with_cause(
                &format!("Object {} to mark handled has no value", id),
                ErrorKind::IndexCorrupted,
                e,
            )
        })?;
        let path = self
            .index
            .tree()
            .update_leaf_augmentation(id, &point, |flags| *flags = DeLiCluFlags::handled())
            .map_err(|e| {
                let err = ProximaError::from(e);
                self.index
                    .logger()
                    .error(format_args!("Cannot mark {} handled: {}", id, err.message()));
                err
            })?;
        self.index.logger().trace(format_args!(
            "Marked {} handled, path length {}",
            id,
            path.len()
        ));
        Ok(path)
    }

    /// Remembers that `page2` was expanded from `page1`.
    ///
    /// The memo is not symmetric.
    pub fn set_expanded(&self, page1: PageId, page2: PageId) {
        self.expanded.write().entry(page1).or_default().insert(page2);
    }

    /// Pages recorded as expanded from `page`, ascending.
    pub fn get_expanded(&self, page: PageId) -> BTreeSet<PageId> {
        self.expanded
            .read()
            .get(&page)
            .cloned()
            .unwrap_or_default()
    }

    pub fn root_entry(&self) -> ProximaResult<RootEntry<DeLiCluFlags>> {
        Ok(self.index.tree().root_entry()?)
    }

    pub fn node(&self, page_id: PageId) -> ProximaResult<Node<DeLiCluFlags>> {
        Ok(self.index.tree().node(page_id)?)
    }

    pub fn height(&self) -> usize {
        self.index.tree().height()
    }

    /// Verifies boxes, flags and balance of the whole tree.
    pub fn integrity_check(&self) -> ProximaResult<()> {
        Ok(self.index.tree().integrity_check()?)
    }

    pub fn registration(&self) -> IndexRegistration<DoubleVector> {
        let tree = Arc::new(self.clone());
        IndexRegistration::<DoubleVector>::new(tree.clone())
            .with_knn(tree.clone())
            .with_range(tree)
    }
}

impl Index<DoubleVector> for DeLiCluTree {
    fn long_name(&self) -> String {
        self.index.long_name()
    }

    fn relation_id(&self) -> RelationId {
        self.index.relation_id()
    }

    fn initialize(&self) -> ProximaResult<()> {
        self.index.initialize()
    }

    fn insert(&self, id: ObjectId) -> ProximaResult<()> {
        self.index.insert(id)
    }

    fn insert_all(&self, ids: &[ObjectId]) -> ProximaResult<()> {
        self.index.insert_all(ids)
    }

    fn delete(&self, id: ObjectId) -> ProximaResult<bool> {
        self.index.delete(id)
    }

    fn size(&self) -> usize {
        self.index.size()
    }

    fn log_statistics(&self) {
        self.index.log_statistics()
    }
}

impl KnnIndex<DoubleVector> for DeLiCluTree {
    fn get_knn_query(
        &self,
        distance_query: &DistanceQuery<DoubleVector>,
        hints: &[QueryHint],
    ) -> Option<Arc<dyn KnnQuery<DoubleVector>>> {
        self.index.get_knn_query(distance_query, hints)
    }
}

impl RangeIndex<DoubleVector> for DeLiCluTree {
    fn get_range_query(
        &self,
        distance_query: &DistanceQuery<DoubleVector>,
        hints: &[QueryHint],
    ) -> Option<Arc<dyn RangeQuery<DoubleVector>>> {
        self.index.get_range_query(distance_query, hints)
    }
}

/// Creates a [`DeLiCluTree`] for every vector relation.
pub struct DeLiCluTreeFactory {
    function: Arc<dyn SpatialDistanceFunction>,
    config: RTreeConfig,
}

impl DeLiCluTreeFactory {
    pub fn new(function: Arc<dyn SpatialDistanceFunction>, config: RTreeConfig) -> Self {
        DeLiCluTreeFactory { function, config }
    }
}

impl IndexFactory<DoubleVector> for DeLiCluTreeFactory {
    fn name(&self) -> String {
        format!("{}({})", DeLiCluFlags::TREE_NAME, self.function.descriptor())
    }

    fn accepts(&self, type_information: &TypeInformation) -> bool {
        type_information.is_type::<DoubleVector>()
    }

    fn instantiate(
        &self,
        relation: RelationRef<DoubleVector>,
        logger: &Logger,
    ) -> ProximaResult<IndexRegistration<DoubleVector>> {
        let tree = DeLiCluTree::new(
            relation,
            self.function.clone(),
            self.config.clone(),
            logger.child("deliclu"),
        );
        Ok(tree.registration())
    }
}
