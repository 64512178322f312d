use crate::rtree::rtree_constants::{DEFAULT_MIN_FILL, DEFAULT_PAGE_SIZE, MIN_CAPACITY, NODE_HEADER_SIZE};
use crate::rtree::rtree_types::{SpatialError, SpatialResult};

/// How an overflowing node is divided in two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeSplitStrategy {
    /// R*-style split: the axis with the smallest margin sum, then the
    /// distribution with the smallest overlap (ties: smallest area).
    #[default]
    Topological,
    /// Sort by entry centers along the axis of largest spread and cut in the
    /// middle.
    CenterSort,
}

/// How a bulk load orders entries before packing them into nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkSplitStrategy {
    /// Keep the input order.
    FileOrder,
    /// Sort by the center of the first dimension.
    OneDimSort,
    /// Sort-Tile-Recursive: slab the data dimension by dimension.
    SortTileRecursive,
    /// Sort by the Hilbert value of the entry centers.
    HilbertSort,
}

/// Settings of a bounding-box tree.
///
/// Capacities are either given explicitly or derived from the page size and
/// the encoded size of one entry once the dimensionality is known.
#[derive(Debug, Clone, PartialEq)]
pub struct RTreeConfig {
    page_size: usize,
    leaf_capacity: Option<usize>,
    directory_capacity: Option<usize>,
    min_fill: f64,
    split_strategy: NodeSplitStrategy,
    bulk_strategy: Option<BulkSplitStrategy>,
    integrity_checks: bool,
}

impl Default for RTreeConfig {
    fn default() -> Self {
        RTreeConfig {
            page_size: DEFAULT_PAGE_SIZE,
            leaf_capacity: None,
            directory_capacity: None,
            min_fill: DEFAULT_MIN_FILL,
            split_strategy: NodeSplitStrategy::default(),
            bulk_strategy: None,
            integrity_checks: false,
        }
    }
}

impl RTreeConfig {
    pub fn builder() -> RTreeConfigBuilder {
        RTreeConfigBuilder::default()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn leaf_capacity(&self) -> Option<usize> {
        self.leaf_capacity
    }

    pub fn directory_capacity(&self) -> Option<usize> {
        self.directory_capacity
    }

    pub fn min_fill(&self) -> f64 {
        self.min_fill
    }

    pub fn split_strategy(&self) -> NodeSplitStrategy {
        self.split_strategy
    }

    pub fn bulk_strategy(&self) -> Option<BulkSplitStrategy> {
        self.bulk_strategy
    }

    pub fn integrity_checks(&self) -> bool {
        self.integrity_checks
    }

    /// Capacity of a node whose entries encode to `entry_size` bytes.
    pub(crate) fn capacity_for(&self, explicit: Option<usize>, entry_size: usize) -> SpatialResult<usize> {
        if let Some(capacity) = explicit {
            return Ok(capacity);
        }
        let capacity = self.page_size.saturating_sub(NODE_HEADER_SIZE) / entry_size.max(1);
        if capacity < MIN_CAPACITY {
            return Err(SpatialError::InvalidConfiguration(format!(
                "Page size {} holds only {} entries of {} bytes, at least {} are required",
                self.page_size, capacity, entry_size, MIN_CAPACITY
            )));
        }
        Ok(capacity)
    }

    /// Smallest number of entries a non-root node of `capacity` may hold.
    pub(crate) fn min_entries(&self, capacity: usize) -> usize {
        ((capacity as f64 * self.min_fill).floor() as usize).max(1)
    }
}

/// Builder for [`RTreeConfig`]; [`RTreeConfigBuilder::build`] validates.
///
/// ```rust
/// use proxima_spatial::rtree::{BulkSplitStrategy, RTreeConfig};
///
/// let config = RTreeConfig::builder()
///     .capacities(16, 16)
///     .bulk_strategy(BulkSplitStrategy::SortTileRecursive)
///     .build()
///     .unwrap();
/// assert_eq!(config.leaf_capacity(), Some(16));
///
/// assert!(RTreeConfig::builder().min_fill(0.8).build().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RTreeConfigBuilder {
    config: RTreeConfig,
}

impl RTreeConfigBuilder {
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size;
        self
    }

    /// Fixes both capacities instead of deriving them from the page size.
    pub fn capacities(mut self, leaf: usize, directory: usize) -> Self {
        self.config.leaf_capacity = Some(leaf);
        self.config.directory_capacity = Some(directory);
        self
    }

    pub fn min_fill(mut self, min_fill: f64) -> Self {
        self.config.min_fill = min_fill;
        self
    }

    pub fn split_strategy(mut self, strategy: NodeSplitStrategy) -> Self {
        self.config.split_strategy = strategy;
        self
    }

    pub fn bulk_strategy(mut self, strategy: BulkSplitStrategy) -> Self {
        self.config.bulk_strategy = Some(strategy);
        self
    }

    pub fn integrity_checks(mut self, enabled: bool) -> Self {
        self.config.integrity_checks = enabled;
        self
    }

    pub fn build(self) -> SpatialResult<RTreeConfig> {
        let config = self.config;
        if !(config.min_fill > 0.0 && config.min_fill <= 0.5) {
            return Err(SpatialError::InvalidConfiguration(format!(
                "Minimum fill must be within (0, 0.5], got {}",
                config.min_fill
            )));
        }
        for capacity in [config.leaf_capacity, config.directory_capacity].into_iter().flatten() {
            if capacity < MIN_CAPACITY {
                return Err(SpatialError::InvalidConfiguration(format!(
                    "Node capacity must be at least {}, got {}",
                    MIN_CAPACITY, capacity
                )));
            }
        }
        if config.leaf_capacity.is_none() && config.page_size <= NODE_HEADER_SIZE {
            return Err(SpatialError::InvalidConfiguration(format!(
                "Page size {} leaves no room for entries",
                config.page_size
            )));
        }
        Ok(config)
    }
}
