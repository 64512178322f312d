//! Constants of the bounding-box trees.

/// Default page size in bytes
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Bytes reserved per page for the node header (page id, leaf flag, entry count)
pub const NODE_HEADER_SIZE: usize = 16;

/// Default relative minimum fill of a non-root node
pub const DEFAULT_MIN_FILL: f64 = 0.4;

/// Smallest capacity a node may have
pub const MIN_CAPACITY: usize = 4;

/// Relative slack applied to minimum distances before pruning a subtree
pub const PRUNE_TOLERANCE: f64 = 1e-9;
