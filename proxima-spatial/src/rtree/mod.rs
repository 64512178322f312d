//! Bounding-box trees of the R*-tree family.
//!
//! - [`RTree`]: the balanced tree itself, generic over a [`NodeAugmentation`]
//! - [`SpatialTreeIndex`]: an index over a vector relation backed by a tree
//! - [`RTreeConfig`]: page size or capacities, fill and split strategies

mod augmentation;
mod bulk;
mod page_file;
mod rtree_config;
mod rtree_constants;
mod rtree_impl;
mod rtree_index;
mod rtree_types;
mod split;

pub use augmentation::*;
pub use page_file::PageFile;
pub use rtree_config::*;
pub use rtree_constants::*;
pub use rtree_impl::*;
pub use rtree_index::*;
pub use rtree_types::*;
