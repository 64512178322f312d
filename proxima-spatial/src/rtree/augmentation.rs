use std::fmt::Debug;

use serde::Serialize;

/// Per-entry data a tree variant maintains alongside the bounding boxes.
///
/// Directory entries always carry the aggregate of the entries of their
/// child node; the tree recomputes it whenever a child changes.
pub trait NodeAugmentation: Clone + Debug + PartialEq + Serialize + Send + Sync + 'static {
    /// Name of the tree variant, used in index names and log messages.
    const TREE_NAME: &'static str;

    /// Augmentation of a freshly inserted object.
    fn new_leaf_entry() -> Self;

    /// Augmentation of the root entry of an empty tree.
    fn empty_root() -> Self {
        Self::new_leaf_entry()
    }

    /// Aggregate over the entries of one child node.
    fn aggregate<'a, I>(entries: I) -> Self
    where
        I: Iterator<Item = &'a Self>;
}

/// The plain R*-tree keeps no extra data.
impl NodeAugmentation for () {
    const TREE_NAME: &'static str = "R*-tree";

    fn new_leaf_entry() -> Self {}

    fn aggregate<'a, I>(_entries: I) -> Self
    where
        I: Iterator<Item = &'a Self>,
    {
    }
}
