use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;

use log::Level;
use parking_lot::RwLock;
use proxima::common::Logger;
use proxima::data::{DoubleVector, HyperBoundingBox};
use proxima::distance::SpatialDistanceFunction;
use proxima::errors::ProximaResult;
use proxima::id::ObjectId;
use proxima::query::{DistanceResultPair, KnnHeap, QueryResult};

use crate::rtree::augmentation::NodeAugmentation;
use crate::rtree::bulk::{group_sizes, order_entries};
use crate::rtree::page_file::PageFile;
use crate::rtree::rtree_config::{BulkSplitStrategy, RTreeConfig};
use crate::rtree::rtree_constants::PRUNE_TOLERANCE;
use crate::rtree::rtree_types::{
    EntryTarget, IndexTreePath, Node, PageId, RTreeStats, RootEntry, SpatialEntry, SpatialError,
    SpatialResult,
};
use crate::rtree::split::split_entries;

/// Balanced bounding-box tree over points, generic over the per-entry
/// augmentation of the tree variant.
///
/// Every root-to-leaf path has the same length; a tree of height 1 is a
/// single leaf root. Nodes live in an in-memory [`PageFile`]. The tree is a
/// cheap handle: clones share the same nodes.
///
/// Reads run concurrently; structural changes take the write lock for the
/// duration of one operation.
pub struct RTree<A> {
    inner: Arc<RTreeInner<A>>,
}

impl<A> Clone for RTree<A> {
    fn clone(&self) -> Self {
        RTree {
            inner: self.inner.clone(),
        }
    }
}

struct RTreeInner<A> {
    config: RTreeConfig,
    logger: Logger,
    state: RwLock<TreeState<A>>,
}

/// Node sizes, fixed once the dimensionality of the data is known.
#[derive(Debug, Clone, Copy)]
struct Layout {
    dimensionality: usize,
    leaf_capacity: usize,
    directory_capacity: usize,
    leaf_min: usize,
    directory_min: usize,
}

struct TreeState<A> {
    pages: PageFile<Node<A>>,
    root: PageId,
    height: usize,
    members: HashSet<ObjectId>,
    layout: Option<Layout>,
}

impl<A> TreeState<A> {
    fn layout(&self) -> SpatialResult<Layout> {
        self.layout.ok_or_else(|| {
            SpatialError::InvalidOperation("The tree has no node layout yet".to_string())
        })
    }

    fn capacity(&self, leaf: bool) -> SpatialResult<usize> {
        let layout = self.layout()?;
        Ok(if leaf {
            layout.leaf_capacity
        } else {
            layout.directory_capacity
        })
    }

    fn min_entries(&self, leaf: bool) -> SpatialResult<usize> {
        let layout = self.layout()?;
        Ok(if leaf {
            layout.leaf_min
        } else {
            layout.directory_min
        })
    }

    fn reset(&mut self) {
        self.pages.clear();
        let root = self.pages.allocate();
        self.pages.put(root, Node::new(root, true));
        self.root = root;
        self.height = 1;
    }
}

/// Queue element of the best-first kNN search.
struct NodeCandidate {
    min_dist: f64,
    page_id: PageId,
}

impl PartialEq for NodeCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NodeCandidate {}

impl PartialOrd for NodeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.min_dist
            .total_cmp(&other.min_dist)
            .then_with(|| self.page_id.cmp(&other.page_id))
    }
}

fn exceeds(bound: f64, limit: f64) -> bool {
    bound - PRUNE_TOLERANCE * bound.abs().max(1.0) > limit
}

fn point_box(point: &DoubleVector) -> HyperBoundingBox {
    HyperBoundingBox::from_spatial(point)
}

/// Box and aggregate augmentation of a node, as stored in its parent entry.
fn summarize<A: NodeAugmentation>(node: &Node<A>) -> SpatialResult<(HyperBoundingBox, A)> {
    let mbr = node.mbr().ok_or_else(|| {
        SpatialError::IndexCorrupted(format!("Node {} has no entries", node.page_id()))
    })?;
    let augmentation = A::aggregate(node.entries().iter().map(|e| e.augmentation()));
    Ok((mbr, augmentation))
}

/// Recomputes a directory entry from its child; returns whether it changed.
fn adjust_entry<A: NodeAugmentation>(
    entry: &mut SpatialEntry<A>,
    mbr: HyperBoundingBox,
    augmentation: A,
) -> bool {
    let changed = *entry.mbr() != mbr || *entry.augmentation() != augmentation;
    if changed {
        entry.set_mbr(mbr);
        entry.set_augmentation(augmentation);
    }
    changed
}

fn encoded_entry_size<A: NodeAugmentation>(
    dimensionality: usize,
    target: EntryTarget,
    augmentation: A,
) -> SpatialResult<usize> {
    let zeros = vec![0.0; dimensionality];
    let entry = SpatialEntry::new(HyperBoundingBox::new(&zeros, &zeros)?, target, augmentation);
    bincode::serde::encode_to_vec(&entry, bincode::config::legacy())
        .map(|bytes| bytes.len())
        .map_err(|e| SpatialError::Serialization(e.to_string()))
}

impl<A: NodeAugmentation> RTree<A> {
    pub fn new(config: RTreeConfig, logger: Logger) -> Self {
        let mut state = TreeState {
            pages: PageFile::new(),
            root: 0,
            height: 1,
            members: HashSet::new(),
            layout: None,
        };
        state.reset();
        RTree {
            inner: Arc::new(RTreeInner {
                config,
                logger,
                state: RwLock::new(state),
            }),
        }
    }

    pub fn config(&self) -> &RTreeConfig {
        &self.inner.config
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.inner.state.read().members.contains(&id)
    }

    pub fn height(&self) -> usize {
        self.inner.state.read().height
    }

    /// Dimensionality of the indexed points, known after the first insert.
    pub fn dimensionality(&self) -> Option<usize> {
        self.inner.state.read().layout.map(|l| l.dimensionality)
    }

    pub fn root_page_id(&self) -> PageId {
        self.inner.state.read().root
    }

    /// Entry describing the whole tree.
    ///
    /// For an empty tree the box is `None` and the augmentation is
    /// [`NodeAugmentation::empty_root`].
    pub fn root_entry(&self) -> SpatialResult<RootEntry<A>> {
        let state = self.inner.state.read();
        let root = state.pages.read(state.root)?;
        if root.is_empty() {
            return Ok(RootEntry {
                page_id: state.root,
                mbr: None,
                augmentation: A::empty_root(),
            });
        }
        let (mbr, augmentation) = summarize(root)?;
        Ok(RootEntry {
            page_id: state.root,
            mbr: Some(mbr),
            augmentation,
        })
    }

    /// Copy of the node stored in `page_id`.
    pub fn node(&self, page_id: PageId) -> SpatialResult<Node<A>> {
        self.inner.state.read().pages.read(page_id).cloned()
    }

    pub fn stats(&self) -> RTreeStats {
        let state = self.inner.state.read();
        let (leaf_nodes, directory_nodes) =
            state
                .pages
                .pages()
                .fold((0, 0), |(l, d), node| if node.is_leaf() { (l + 1, d) } else { (l, d + 1) });
        RTreeStats {
            height: state.height,
            entries: state.members.len(),
            leaf_nodes,
            directory_nodes,
            leaf_capacity: state.layout.map_or(0, |l| l.leaf_capacity),
            directory_capacity: state.layout.map_or(0, |l| l.directory_capacity),
            page_reads: state.pages.reads(),
            page_writes: state.pages.writes(),
        }
    }

    pub fn log_stats(&self, name: &str) {
        if self.inner.logger.is_enabled(Level::Info) {
            self.inner
                .logger
                .info(format_args!("{}: {}", name, self.stats()));
        }
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Inserts one point.
    ///
    /// Fails without changing the tree when `id` is already indexed or the
    /// point has another dimensionality than the indexed ones.
    pub fn insert(&self, id: ObjectId, point: &DoubleVector) -> SpatialResult<()> {
        let mut state = self.inner.state.write();
        if state.members.contains(&id) {
            return Err(SpatialError::DuplicateId(id));
        }
        self.ensure_layout(&mut state, point.dimensionality())?;
        let entry = SpatialEntry::new(point_box(point), EntryTarget::Object(id), A::new_leaf_entry());
        self.insert_entry(&mut state, entry)?;
        state.members.insert(id);
        Ok(())
    }

    /// Fixes the node layout on first use and checks `dimensionality`
    /// against it afterwards.
    fn ensure_layout(&self, state: &mut TreeState<A>, dimensionality: usize) -> SpatialResult<()> {
        if let Some(layout) = state.layout {
            if layout.dimensionality != dimensionality {
                return Err(SpatialError::DimensionalityMismatch {
                    expected: layout.dimensionality,
                    actual: dimensionality,
                });
            }
            return Ok(());
        }
        if dimensionality == 0 {
            return Err(SpatialError::InvalidConfiguration(
                "Points without dimensions cannot be indexed".to_string(),
            ));
        }

        let config = &self.inner.config;
        let leaf_size =
            encoded_entry_size(dimensionality, EntryTarget::Object(ObjectId::new(0)), A::new_leaf_entry())?;
        let directory_size =
            encoded_entry_size(dimensionality, EntryTarget::Page(0), A::new_leaf_entry())?;
        let leaf_capacity = config.capacity_for(config.leaf_capacity(), leaf_size)?;
        let directory_capacity = config.capacity_for(config.directory_capacity(), directory_size)?;
        let layout = Layout {
            dimensionality,
            leaf_capacity,
            directory_capacity,
            leaf_min: config.min_entries(leaf_capacity),
            directory_min: config.min_entries(directory_capacity),
        };
        self.inner.logger.debug(format_args!(
            "{} layout for {} dimension(s): leaf capacity {}, directory capacity {}",
            A::TREE_NAME,
            dimensionality,
            leaf_capacity,
            directory_capacity
        ));
        state.layout = Some(layout);
        Ok(())
    }

    /// Descends from the root to the leaf best suited for `mbr`.
    fn choose_leaf(
        &self,
        state: &TreeState<A>,
        mbr: &HyperBoundingBox,
    ) -> SpatialResult<(PageId, IndexTreePath)> {
        let mut path = IndexTreePath::default();
        let mut page_id = state.root;
        loop {
            let node = state.pages.read(page_id)?;
            if node.is_leaf() {
                return Ok((page_id, path));
            }
            let index = Self::choose_subtree(node.entries(), mbr);
            path.push(page_id, index);
            page_id = node.entries()[index].page_id().ok_or_else(|| {
                SpatialError::IndexCorrupted(format!(
                    "Directory node {} holds an object entry",
                    node.page_id()
                ))
            })?;
        }
    }

    /// Smallest enlargement, then smallest resulting area, then first position.
    fn choose_subtree(entries: &[SpatialEntry<A>], mbr: &HyperBoundingBox) -> usize {
        let mut best = 0;
        let mut best_enlargement = f64::INFINITY;
        let mut best_area = f64::INFINITY;
        for (index, entry) in entries.iter().enumerate() {
            let union = entry.mbr().union(mbr);
            let area = union.volume();
            let enlargement = area - entry.mbr().volume();
            if enlargement < best_enlargement
                || (enlargement == best_enlargement && area < best_area)
            {
                best = index;
                best_enlargement = enlargement;
                best_area = area;
            }
        }
        best
    }

    /// Appends a leaf entry and restores the tree invariants above it.
    fn insert_entry(&self, state: &mut TreeState<A>, entry: SpatialEntry<A>) -> SpatialResult<()> {
        let (leaf_id, path) = self.choose_leaf(state, entry.mbr())?;
        state.pages.write(leaf_id)?.entries_mut().push(entry);
        self.propagate(state, leaf_id, &path)
    }

    /// Splits overflowing nodes and adjusts parent entries from `page_id` up
    /// to the root, stopping early once an entry stays unchanged.
    fn propagate(
        &self,
        state: &mut TreeState<A>,
        page_id: PageId,
        path: &IndexTreePath,
    ) -> SpatialResult<()> {
        let mut child_id = page_id;
        let mut pending = self.split_if_overflowing(state, child_id)?;
        for element in path.elements().iter().rev() {
            let (mbr, augmentation) = summarize(state.pages.read(child_id)?)?;
            let parent = state.pages.write(element.page_id)?;
            let changed = adjust_entry(&mut parent.entries_mut()[element.index], mbr, augmentation);
            match pending.take() {
                Some(sibling) => {
                    parent.entries_mut().push(sibling);
                    pending = self.split_if_overflowing(state, element.page_id)?;
                }
                None if !changed => return Ok(()),
                None => {}
            }
            child_id = element.page_id;
        }
        if let Some(sibling) = pending {
            self.grow_root(state, sibling)?;
        }
        Ok(())
    }

    /// Splits `page_id` when it holds more entries than its capacity and
    /// returns the directory entry of the new sibling.
    fn split_if_overflowing(
        &self,
        state: &mut TreeState<A>,
        page_id: PageId,
    ) -> SpatialResult<Option<SpatialEntry<A>>> {
        let node = state.pages.read(page_id)?;
        let leaf = node.is_leaf();
        if node.len() <= state.capacity(leaf)? {
            return Ok(None);
        }
        let min_entries = state.min_entries(leaf)?;
        let entries = std::mem::take(state.pages.write(page_id)?.entries_mut());
        let (first, second) =
            split_entries(self.inner.config.split_strategy(), entries, min_entries);
        *state.pages.write(page_id)?.entries_mut() = first;

        let sibling_id = state.pages.allocate();
        let sibling = Node::with_entries(sibling_id, leaf, second);
        let (mbr, augmentation) = summarize(&sibling)?;
        self.inner.logger.trace(format_args!(
            "Split {} node {} into {} and {} ({} entries)",
            if leaf { "leaf" } else { "directory" },
            page_id,
            page_id,
            sibling_id,
            sibling.len()
        ));
        state.pages.put(sibling_id, sibling);
        Ok(Some(SpatialEntry::new(
            mbr,
            EntryTarget::Page(sibling_id),
            augmentation,
        )))
    }

    fn grow_root(&self, state: &mut TreeState<A>, sibling: SpatialEntry<A>) -> SpatialResult<()> {
        let old_root = state.root;
        let (mbr, augmentation) = summarize(state.pages.read(old_root)?)?;
        let new_root = state.pages.allocate();
        let entries = vec![
            SpatialEntry::new(mbr, EntryTarget::Page(old_root), augmentation),
            sibling,
        ];
        state
            .pages
            .put(new_root, Node::with_entries(new_root, false, entries));
        state.root = new_root;
        state.height += 1;
        self.inner.logger.debug(format_args!(
            "{} root split, new root {} at height {}",
            A::TREE_NAME,
            new_root,
            state.height
        ));
        Ok(())
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Removes `id` stored at `point`; returns whether such an entry was
    /// indexed. An id stored at another point is left in place.
    pub fn delete(&self, id: ObjectId, point: &DoubleVector) -> SpatialResult<bool> {
        let mut state = self.inner.state.write();
        if !state.members.contains(&id) {
            return Ok(false);
        }
        let Some(path) = Self::find_path(&state, id, point)? else {
            let mut anywhere = IndexTreePath::default();
            if Self::search_path(&state, state.root, id, None, &mut anywhere)? {
                self.inner.logger.debug(format_args!(
                    "Object {} is not stored at {:?}, nothing deleted",
                    id,
                    point.values()
                ));
                return Ok(false);
            }
            return Err(SpatialError::IndexCorrupted(format!(
                "Object {} is indexed but not reachable",
                id
            )));
        };
        let leaf = path.leaf().ok_or_else(|| {
            SpatialError::IndexCorrupted(format!("Empty path to object {}", id))
        })?;
        state
            .pages
            .write(leaf.page_id)?
            .entries_mut()
            .remove(leaf.index);
        state.members.remove(&id);
        self.condense(&mut state, &path)?;
        Ok(true)
    }

    /// Root-to-leaf path to the entry of `id`, searching only subtrees whose
    /// box contains `point`.
    fn find_path(
        state: &TreeState<A>,
        id: ObjectId,
        point: &DoubleVector,
    ) -> SpatialResult<Option<IndexTreePath>> {
        let mut path = IndexTreePath::default();
        if Self::search_path(state, state.root, id, Some(point.values()), &mut path)? {
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }

    /// Without a point every subtree is searched.
    fn search_path(
        state: &TreeState<A>,
        page_id: PageId,
        id: ObjectId,
        point: Option<&[f64]>,
        path: &mut IndexTreePath,
    ) -> SpatialResult<bool> {
        let covers = |mbr: &HyperBoundingBox| point.map_or(true, |p| mbr.contains_point(p));
        let node = state.pages.read(page_id)?;
        if node.is_leaf() {
            if let Some(index) = node
                .entries()
                .iter()
                .position(|e| e.object_id() == Some(id) && covers(e.mbr()))
            {
                path.push(page_id, index);
                return Ok(true);
            }
            return Ok(false);
        }
        for (index, entry) in node.entries().iter().enumerate() {
            let Some(child) = entry.page_id() else {
                continue;
            };
            if !covers(entry.mbr()) {
                continue;
            }
            path.push(page_id, index);
            if Self::search_path(state, child, id, point, path)? {
                return Ok(true);
            }
            path.pop();
        }
        Ok(false)
    }

    /// Walks `path` bottom-up after a removal: underfull non-root nodes are
    /// detached and their leaf entries reinserted, other parent entries are
    /// adjusted. A directory root with a single child collapses.
    fn condense(&self, state: &mut TreeState<A>, path: &IndexTreePath) -> SpatialResult<()> {
        let elements = path.elements();
        let mut orphans: Vec<SpatialEntry<A>> = Vec::new();
        for level in (1..elements.len()).rev() {
            let node_id = elements[level].page_id;
            let parent = elements[level - 1];
            let node = state.pages.read(node_id)?;
            if node.len() < state.min_entries(node.is_leaf())? {
                state
                    .pages
                    .write(parent.page_id)?
                    .entries_mut()
                    .remove(parent.index);
                self.detach_subtree(state, node_id, &mut orphans)?;
            } else {
                let (mbr, augmentation) = summarize(node)?;
                let parent_node = state.pages.write(parent.page_id)?;
                adjust_entry(&mut parent_node.entries_mut()[parent.index], mbr, augmentation);
            }
        }

        loop {
            let root = state.pages.read(state.root)?;
            if root.is_leaf() {
                break;
            }
            match root.entries() {
                [] => {
                    self.inner
                        .logger
                        .debug(format_args!("{} emptied, resetting root", A::TREE_NAME));
                    let old_root = state.root;
                    state.pages.free(old_root);
                    let new_root = state.pages.allocate();
                    state.pages.put(new_root, Node::new(new_root, true));
                    state.root = new_root;
                    state.height = 1;
                    break;
                }
                [only] => {
                    let child = only.page_id().ok_or_else(|| {
                        SpatialError::IndexCorrupted("Directory root holds an object entry".to_string())
                    })?;
                    let old_root = state.root;
                    state.pages.free(old_root);
                    state.root = child;
                    state.height -= 1;
                    self.inner.logger.debug(format_args!(
                        "{} root collapsed into {} at height {}",
                        A::TREE_NAME,
                        child,
                        state.height
                    ));
                }
                _ => break,
            }
        }

        if !orphans.is_empty() {
            self.inner.logger.trace(format_args!(
                "Reinserting {} entries of condensed nodes",
                orphans.len()
            ));
        }
        for orphan in orphans {
            self.insert_entry(state, orphan)?;
        }
        Ok(())
    }

    /// Frees every page below and including `page_id`, collecting its leaf
    /// entries with their augmentation.
    fn detach_subtree(
        &self,
        state: &mut TreeState<A>,
        page_id: PageId,
        orphans: &mut Vec<SpatialEntry<A>>,
    ) -> SpatialResult<()> {
        let node = state.pages.read(page_id)?.clone();
        if node.is_leaf() {
            orphans.extend(node.entries().iter().cloned());
        } else {
            for entry in node.entries() {
                if let Some(child) = entry.page_id() {
                    self.detach_subtree(state, child, orphans)?;
                }
            }
        }
        state.pages.free(page_id);
        Ok(())
    }

    // ========================================================================
    // Bulk Load
    // ========================================================================

    /// Builds the tree bottom-up from `points`.
    ///
    /// Only allowed on an empty tree. Entries are ordered by the configured
    /// bulk strategy (Sort-Tile-Recursive when none is configured) and packed
    /// into nodes of balanced sizes level by level.
    pub fn bulk_load(&self, points: Vec<(ObjectId, DoubleVector)>) -> SpatialResult<()> {
        let mut state = self.inner.state.write();
        if !state.members.is_empty() {
            return Err(SpatialError::InvalidOperation(format!(
                "Bulk load requires an empty tree, this one holds {} entries",
                state.members.len()
            )));
        }
        let Some((_, first)) = points.first() else {
            return Ok(());
        };
        let dimensionality = first.dimensionality();
        let mut seen = HashSet::with_capacity(points.len());
        for (id, point) in &points {
            if point.dimensionality() != dimensionality {
                return Err(SpatialError::DimensionalityMismatch {
                    expected: dimensionality,
                    actual: point.dimensionality(),
                });
            }
            if !seen.insert(*id) {
                return Err(SpatialError::DuplicateId(*id));
            }
        }
        self.ensure_layout(&mut state, dimensionality)?;

        let strategy = self
            .inner
            .config
            .bulk_strategy()
            .unwrap_or(BulkSplitStrategy::SortTileRecursive);
        let count = points.len();
        let mut entries: Vec<SpatialEntry<A>> = points
            .into_iter()
            .map(|(id, point)| {
                SpatialEntry::new(point_box(&point), EntryTarget::Object(id), A::new_leaf_entry())
            })
            .collect();

        state.pages.clear();
        let mut leaf = true;
        let mut height = 1;
        loop {
            let capacity = state.capacity(leaf)?;
            order_entries(strategy, &mut entries, capacity);
            let sizes = group_sizes(entries.len(), capacity);
            if sizes.len() == 1 {
                let root = state.pages.allocate();
                state.pages.put(root, Node::with_entries(root, leaf, entries));
                state.root = root;
                break;
            }
            let mut parents = Vec::with_capacity(sizes.len());
            let mut remaining = entries.into_iter();
            for size in sizes {
                let group: Vec<SpatialEntry<A>> = remaining.by_ref().take(size).collect();
                let page_id = state.pages.allocate();
                let node = Node::with_entries(page_id, leaf, group);
                let (mbr, augmentation) = summarize(&node)?;
                state.pages.put(page_id, node);
                parents.push(SpatialEntry::new(mbr, EntryTarget::Page(page_id), augmentation));
            }
            entries = parents;
            leaf = false;
            height += 1;
        }
        state.height = height;
        state.members = seen;
        self.inner.logger.debug(format_args!(
            "{} bulk loaded {} entries with {:?}, height {}",
            A::TREE_NAME,
            count,
            strategy,
            height
        ));
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The `k` nearest indexed objects to `query`.
    ///
    /// Best-first search ordered by the minimum distance of `query` to the
    /// node boxes; `exact` computes the distance of one candidate. Ties are
    /// broken by id exactly like a linear scan.
    pub fn knn<F>(
        &self,
        query: &DoubleVector,
        k: usize,
        function: &dyn SpatialDistanceFunction,
        mut exact: F,
    ) -> SpatialResult<QueryResult>
    where
        F: FnMut(ObjectId) -> ProximaResult<f64>,
    {
        let mut heap = KnnHeap::new(k);
        if k == 0 {
            return Ok(heap.into_sorted_vec());
        }
        let state = self.inner.state.read();
        let mut queue = BinaryHeap::new();
        queue.push(Reverse(NodeCandidate {
            min_dist: 0.0,
            page_id: state.root,
        }));
        while let Some(Reverse(candidate)) = queue.pop() {
            if exceeds(candidate.min_dist, heap.kth_distance()) {
                break;
            }
            let node = state.pages.read(candidate.page_id)?;
            for entry in node.entries() {
                match entry.target() {
                    EntryTarget::Object(id) => {
                        heap.offer(exact(id)?, id);
                    }
                    EntryTarget::Page(page_id) => {
                        let min_dist = function.min_dist(entry.mbr(), query);
                        if !exceeds(min_dist, heap.kth_distance()) {
                            queue.push(Reverse(NodeCandidate { min_dist, page_id }));
                        }
                    }
                }
            }
        }
        Ok(heap.into_sorted_vec())
    }

    /// Every indexed object within `epsilon` of `query`, ascending.
    pub fn range<F>(
        &self,
        query: &DoubleVector,
        epsilon: f64,
        function: &dyn SpatialDistanceFunction,
        mut exact: F,
    ) -> SpatialResult<QueryResult>
    where
        F: FnMut(ObjectId) -> ProximaResult<f64>,
    {
        let state = self.inner.state.read();
        let mut result = Vec::new();
        let mut stack = vec![state.root];
        while let Some(page_id) = stack.pop() {
            let node = state.pages.read(page_id)?;
            for entry in node.entries() {
                match entry.target() {
                    EntryTarget::Object(id) => {
                        let distance = exact(id)?;
                        if distance <= epsilon {
                            result.push(DistanceResultPair::new(distance, id));
                        }
                    }
                    EntryTarget::Page(child) => {
                        if !exceeds(function.min_dist(entry.mbr(), query), epsilon) {
                            stack.push(child);
                        }
                    }
                }
            }
        }
        result.sort_unstable();
        Ok(result)
    }

    // ========================================================================
    // Augmentation Updates
    // ========================================================================

    /// Changes the augmentation of the leaf entry of `id` and recomputes
    /// every ancestor entry over all entries of its child node.
    ///
    /// Fails with [`SpatialError::IndexCorrupted`] when `id` cannot be found.
    pub fn update_leaf_augmentation<F>(
        &self,
        id: ObjectId,
        point: &DoubleVector,
        update: F,
    ) -> SpatialResult<IndexTreePath>
    where
        F: FnOnce(&mut A),
    {
        let mut state = self.inner.state.write();
        let path = Self::find_path(&state, id, point)?.ok_or_else(|| {
            SpatialError::IndexCorrupted(format!("Object {} is not part of the tree", id))
        })?;
        let elements = path.elements();
        let leaf = elements[elements.len() - 1];
        update(
            state.pages.write(leaf.page_id)?.entries_mut()[leaf.index].augmentation_mut(),
        );
        for level in (1..elements.len()).rev() {
            let (mbr, augmentation) = summarize(state.pages.read(elements[level].page_id)?)?;
            let parent = elements[level - 1];
            let parent_node = state.pages.write(parent.page_id)?;
            adjust_entry(&mut parent_node.entries_mut()[parent.index], mbr, augmentation);
        }
        Ok(path)
    }

    // ========================================================================
    // Integrity
    // ========================================================================

    /// Verifies the structure of the whole tree.
    ///
    /// Checks that every directory entry stores exactly the box and
    /// augmentation recomputed from its child, that all leaves sit at the
    /// same depth, that non-root nodes respect their size limits and that
    /// every indexed object is stored exactly once.
    pub fn integrity_check(&self) -> SpatialResult<()> {
        let state = self.inner.state.read();
        let mut seen = HashSet::with_capacity(state.members.len());
        Self::check_node(&state, state.root, 1, &mut seen)?;
        if seen.len() != state.members.len() {
            return Err(SpatialError::IndexCorrupted(format!(
                "Tree stores {} objects, {} are registered",
                seen.len(),
                state.members.len()
            )));
        }
        Ok(())
    }

    fn check_node(
        state: &TreeState<A>,
        page_id: PageId,
        depth: usize,
        seen: &mut HashSet<ObjectId>,
    ) -> SpatialResult<()> {
        let node = state.pages.read(page_id)?;
        if node.is_leaf() != (depth == state.height) {
            return Err(SpatialError::IndexCorrupted(format!(
                "Node {} at depth {} of a tree of height {} is {}",
                page_id,
                depth,
                state.height,
                if node.is_leaf() { "a leaf" } else { "a directory" }
            )));
        }
        if page_id != state.root && state.layout.is_some() {
            let min = state.min_entries(node.is_leaf())?;
            let max = state.capacity(node.is_leaf())?;
            if node.len() < min || node.len() > max {
                return Err(SpatialError::IndexCorrupted(format!(
                    "Node {} holds {} entries, allowed are {} to {}",
                    page_id,
                    node.len(),
                    min,
                    max
                )));
            }
        }
        for entry in node.entries() {
            match entry.target() {
                EntryTarget::Object(id) => {
                    if !node.is_leaf() || !seen.insert(id) {
                        return Err(SpatialError::IndexCorrupted(format!(
                            "Object {} is misplaced or stored twice",
                            id
                        )));
                    }
                }
                EntryTarget::Page(child) => {
                    if node.is_leaf() {
                        return Err(SpatialError::IndexCorrupted(format!(
                            "Leaf {} refers to page {}",
                            page_id, child
                        )));
                    }
                    let (mbr, augmentation) = summarize(state.pages.read(child)?)?;
                    if *entry.mbr() != mbr {
                        return Err(SpatialError::IndexCorrupted(format!(
                            "Entry of page {} stores box {}, its children span {}",
                            child,
                            entry.mbr(),
                            mbr
                        )));
                    }
                    if *entry.augmentation() != augmentation {
                        return Err(SpatialError::IndexCorrupted(format!(
                            "Entry of page {} stores {:?}, its children aggregate to {:?}",
                            child,
                            entry.augmentation(),
                            augmentation
                        )));
                    }
                    Self::check_node(state, child, depth + 1, seen)?;
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn corrupt_first_directory_entry(&self) {
        let mut state = self.inner.state.write();
        let root = state.root;
        if let Ok(node) = state.pages.write(root) {
            if let Some(entry) = node.entries_mut().first_mut() {
                if entry.page_id().is_some() {
                    let mbr = entry.mbr().clone();
                    let shifted: Vec<f64> = mbr.max_corner().iter().map(|v| v + 1.0).collect();
                    if let Ok(bigger) = HyperBoundingBox::new(mbr.min_corner(), &shifted) {
                        entry.set_mbr(bigger);
                    }
                }
            }
        }
    }
}
