//! Core types of the bounding-box trees.
//!
//! This module defines the fundamental types shared by every tree variant:
//! - Error and result types
//! - Entries and nodes
//! - Statistics and tree paths

use std::fmt::{Display, Formatter};

use proxima::data::HyperBoundingBox;
use proxima::errors::{ErrorKind, ProximaError};
use proxima::id::ObjectId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur in spatial index operations
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Object {0} is already indexed")]
    DuplicateId(ObjectId),

    #[error("Dimensionality mismatch: tree holds {expected} dimension(s), got {actual}")]
    DimensionalityMismatch { expected: usize, actual: usize },

    #[error("Index corrupted: {0}")]
    IndexCorrupted(String),

    #[error("Page {0} does not exist")]
    MissingPage(PageId),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Core(ProximaError),
}

impl From<SpatialError> for ProximaError {
    fn from(err: SpatialError) -> Self {
        match err {
            SpatialError::InvalidOperation(msg) => {
                ProximaError::new(&msg, ErrorKind::InvalidOperation)
            }
            SpatialError::InvalidConfiguration(msg) => {
                ProximaError::new(&msg, ErrorKind::ValidationError)
            }
            SpatialError::DuplicateId(id) => ProximaError::new(
                &format!("Object {} is already indexed", id),
                ErrorKind::DuplicateId,
            ),
            SpatialError::DimensionalityMismatch { expected, actual } => ProximaError::new(
                &format!(
                    "Tree holds {} dimension(s), object has {}",
                    expected, actual
                ),
                ErrorKind::ValidationError,
            ),
            SpatialError::IndexCorrupted(msg) => {
                ProximaError::new(&msg, ErrorKind::IndexCorrupted)
            }
            SpatialError::MissingPage(page_id) => ProximaError::new(
                &format!("Page {} does not exist", page_id),
                ErrorKind::Extension("Spatial".to_string()),
            ),
            SpatialError::Serialization(msg) => {
                ProximaError::new(&msg, ErrorKind::Extension("Spatial".to_string()))
            }
            SpatialError::Core(err) => err,
        }
    }
}

impl From<ProximaError> for SpatialError {
    fn from(err: ProximaError) -> Self {
        match err.kind() {
            ErrorKind::InvalidOperation => SpatialError::InvalidOperation(err.message().to_string()),
            ErrorKind::IndexCorrupted => SpatialError::IndexCorrupted(err.message().to_string()),
            _ => SpatialError::Core(err),
        }
    }
}

/// Result type for spatial operations
pub type SpatialResult<T> = Result<T, SpatialError>;

/// Page id - identifies one node in the page file
pub type PageId = u64;

// ============================================================================
// Entries and Nodes
// ============================================================================

/// What an entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryTarget {
    /// A stored object (leaf entries)
    Object(ObjectId),
    /// A child node (directory entries)
    Page(PageId),
}

/// One slot of a node: a bounding box, its target and the per-entry
/// augmentation of the tree variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialEntry<A> {
    mbr: HyperBoundingBox,
    target: EntryTarget,
    augmentation: A,
}

impl<A> SpatialEntry<A> {
    pub fn new(mbr: HyperBoundingBox, target: EntryTarget, augmentation: A) -> Self {
        SpatialEntry {
            mbr,
            target,
            augmentation,
        }
    }

    pub fn mbr(&self) -> &HyperBoundingBox {
        &self.mbr
    }

    pub fn target(&self) -> EntryTarget {
        self.target
    }

    pub fn augmentation(&self) -> &A {
        &self.augmentation
    }

    pub(crate) fn augmentation_mut(&mut self) -> &mut A {
        &mut self.augmentation
    }

    pub fn is_leaf_entry(&self) -> bool {
        matches!(self.target, EntryTarget::Object(_))
    }

    pub fn object_id(&self) -> Option<ObjectId> {
        match self.target {
            EntryTarget::Object(id) => Some(id),
            EntryTarget::Page(_) => None,
        }
    }

    pub fn page_id(&self) -> Option<PageId> {
        match self.target {
            EntryTarget::Page(page_id) => Some(page_id),
            EntryTarget::Object(_) => None,
        }
    }

    pub(crate) fn set_mbr(&mut self, mbr: HyperBoundingBox) {
        self.mbr = mbr;
    }

    pub(crate) fn set_augmentation(&mut self, augmentation: A) {
        self.augmentation = augmentation;
    }
}

/// A node of the tree, stored in one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<A> {
    page_id: PageId,
    leaf: bool,
    entries: Vec<SpatialEntry<A>>,
}

impl<A> Node<A> {
    pub(crate) fn new(page_id: PageId, leaf: bool) -> Self {
        Node {
            page_id,
            leaf,
            entries: Vec::new(),
        }
    }

    pub(crate) fn with_entries(page_id: PageId, leaf: bool, entries: Vec<SpatialEntry<A>>) -> Self {
        Node {
            page_id,
            leaf,
            entries,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub fn entries(&self) -> &[SpatialEntry<A>] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<SpatialEntry<A>> {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Minimal box around all entries, `None` for an empty node.
    pub fn mbr(&self) -> Option<HyperBoundingBox> {
        HyperBoundingBox::union_of(self.entries.iter().map(|e| e.mbr()))
    }
}

/// The entry a parent of the root would hold.
#[derive(Debug, Clone, PartialEq)]
pub struct RootEntry<A> {
    pub page_id: PageId,
    /// `None` while the tree is empty
    pub mbr: Option<HyperBoundingBox>,
    pub augmentation: A,
}

// ============================================================================
// Statistics
// ============================================================================

/// Statistics about the shape of a tree and its page traffic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RTreeStats {
    pub height: usize,
    pub entries: usize,
    pub leaf_nodes: usize,
    pub directory_nodes: usize,
    pub leaf_capacity: usize,
    pub directory_capacity: usize,
    pub page_reads: u64,
    pub page_writes: u64,
}

impl Display for RTreeStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "height {}, {} entries, {} leaf / {} directory node(s), capacities {}/{}, {} page read(s), {} page write(s)",
            self.height,
            self.entries,
            self.leaf_nodes,
            self.directory_nodes,
            self.leaf_capacity,
            self.directory_capacity,
            self.page_reads,
            self.page_writes
        )
    }
}

// ============================================================================
// Tree Paths
// ============================================================================

/// One step of a root-to-leaf path: a node and the entry position in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreePathElement {
    pub page_id: PageId,
    pub index: usize,
}

/// Root-to-leaf path to one entry; the last element addresses the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexTreePath {
    elements: SmallVec<[TreePathElement; 8]>,
}

impl IndexTreePath {
    pub(crate) fn push(&mut self, page_id: PageId, index: usize) {
        self.elements.push(TreePathElement { page_id, index });
    }

    pub(crate) fn pop(&mut self) {
        self.elements.pop();
    }

    pub fn elements(&self) -> &[TreePathElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The node holding the addressed entry.
    pub fn leaf(&self) -> Option<TreePathElement> {
        self.elements.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_to_core() {
        let err: ProximaError = SpatialError::DuplicateId(ObjectId::new(3)).into();
        assert_eq!(err.kind(), &ErrorKind::DuplicateId);

        let err: ProximaError = SpatialError::DimensionalityMismatch {
            expected: 2,
            actual: 3,
        }
        .into();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);

        let err: ProximaError = SpatialError::MissingPage(9).into();
        assert_eq!(err.kind(), &ErrorKind::Extension("Spatial".to_string()));
    }

    #[test]
    fn test_error_conversion_from_core() {
        let err: SpatialError =
            ProximaError::new("not allowed", ErrorKind::InvalidOperation).into();
        assert!(matches!(err, SpatialError::InvalidOperation(_)));

        let err: SpatialError = ProximaError::new("gone", ErrorKind::ObjectNotFound).into();
        let back: ProximaError = err.into();
        assert_eq!(back.kind(), &ErrorKind::ObjectNotFound);
    }

    #[test]
    fn test_node_mbr() {
        let mut node: Node<()> = Node::new(1, true);
        assert!(node.mbr().is_none());
        node.entries_mut().push(SpatialEntry::new(
            HyperBoundingBox::new(&[0.0, 0.0], &[1.0, 1.0]).unwrap(),
            EntryTarget::Object(ObjectId::new(1)),
            (),
        ));
        node.entries_mut().push(SpatialEntry::new(
            HyperBoundingBox::new(&[2.0, -1.0], &[3.0, 0.5]).unwrap(),
            EntryTarget::Object(ObjectId::new(2)),
            (),
        ));
        let mbr = node.mbr().unwrap();
        assert_eq!(mbr.min_corner(), &[0.0, -1.0]);
        assert_eq!(mbr.max_corner(), &[3.0, 1.0]);
    }
}
