//! # Proxima Spatial - Bounding-Box Trees for Proxima
//!
//! This crate adds R*-tree indexing over vector relations to the proxima
//! database layer, plus the DeLiClu variant whose entries carry
//! handled/unhandled flags for density-linked clustering.
//!
//! ## Features
//!
//! - **R*-tree**: topological or center-sort node splits, reinsertion on underflow
//! - **Bulk Loading**: file order, one-dimensional sort, sort-tile-recursive and Hilbert order
//! - **Exact Queries**: best-first kNN and depth-first range search with box lower bounds
//! - **Augmented Entries**: per-entry data aggregated along every path to the root
//! - **Database Integration**: trees register as kNN and range indexes
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use proxima::common::Logger;
//! use proxima::data::DoubleVector;
//! use proxima::distance::EuclideanDistance;
//! use proxima::id::ObjectId;
//! use proxima_spatial::rtree::{RTree, RTreeConfig};
//!
//! let tree: RTree<()> = RTree::new(RTreeConfig::default(), Logger::silent());
//! let points = vec![
//!     DoubleVector::from([0.0, 0.0]),
//!     DoubleVector::from([2.0, 1.0]),
//!     DoubleVector::from([5.0, 5.0]),
//! ];
//! for (i, point) in points.iter().enumerate() {
//!     tree.insert(ObjectId::new(i as u64), point).unwrap();
//! }
//!
//! let query = DoubleVector::from([1.9, 1.0]);
//! let function = EuclideanDistance;
//! let nearest = tree
//!     .knn(&query, 1, &function, |id| {
//!         Ok(proxima::distance::DistanceFunction::distance(
//!             &function,
//!             &query,
//!             &points[id.value() as usize],
//!         ))
//!     })
//!     .unwrap();
//! assert_eq!(nearest[0].id(), ObjectId::new(1));
//! ```

pub mod database;
pub mod deliclu;
pub mod hilbert;
pub mod rtree;

pub use database::SpatialIndexDatabase;
pub use deliclu::{DeLiCluFlags, DeLiCluTree, DeLiCluTreeFactory};
pub use rtree::{
    RStarTreeIndex, RStarTreeIndexFactory, RTree, RTreeConfig, SpatialError, SpatialResult,
};
