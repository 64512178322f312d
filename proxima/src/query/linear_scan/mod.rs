//! Exhaustive query implementations used whenever no index accelerates a
//! query. They define the answers every index has to reproduce.

mod knn;
mod range;
mod rknn;

pub use knn::*;
pub use range::*;
pub use rknn::*;
