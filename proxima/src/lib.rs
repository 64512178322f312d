//! # Proxima - similarity query execution core
//!
//! Proxima answers k-nearest-neighbor, range, reverse-k-nearest-neighbor and
//! similarity queries over collections of identified objects. Objects are
//! stored column-wise in typed relations; queries bind a distance or
//! similarity function to one relation and are dispatched to the best
//! matching index, falling back to an exhaustive linear scan.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use proxima::common::TypeInformation;
//! use proxima::data::DoubleVector;
//! use proxima::database::{Database, DatabaseBuilder, MultipleObjectsBundle};
//! use proxima::distance::EuclideanDistance;
//!
//! # fn main() -> proxima::errors::ProximaResult<()> {
//! let db = DatabaseBuilder::new().open_hashmap()?;
//! let ids = db.insert(MultipleObjectsBundle::new().with_column(vec![
//!     DoubleVector::from([0.0, 0.0]),
//!     DoubleVector::from([1.0, 0.0]),
//!     DoubleVector::from([5.0, 5.0]),
//! ]))?;
//!
//! let vectors = db.get_relation::<DoubleVector>(&TypeInformation::of::<DoubleVector>())?;
//! let range = db
//!     .query(&vectors)
//!     .distance_function(Arc::new(EuclideanDistance))
//!     .range_query()?
//!     .expect("linear scan is always available");
//! let neighbors = range.range_for_id(ids[0], 1.5)?;
//! assert_eq!(neighbors.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Pattern
//!
//! Databases, indexes, configurations and the event manager are cheap
//! handles over shared state (`Arc` of an inner struct guarded by
//! `parking_lot` locks). Clones observe the same data.
//!
//! ## Module Organization
//!
//! - [`common`] - Logger, query hints and type descriptors
//! - [`data`] - Vector and bounding-box value types
//! - [`database`] - Database shapes, bundles, configuration and dispatch
//! - [`distance`] - Distance and similarity functions and their query bindings
//! - [`errors`] - Error types and result definitions
//! - [`event`] - Data store and result change notification
//! - [`id`] - Object ids and their allocation
//! - [`index`] - Index capabilities, the pivot table and the materialized kNN index
//! - [`query`] - Query traits, results and linear-scan implementations
//! - [`relation`] - Relations and relation views

pub mod common;
pub mod data;
pub mod database;
pub mod distance;
pub mod errors;
pub mod event;
pub mod id;
pub mod index;
pub mod query;
pub mod relation;
