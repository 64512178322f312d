mod knn;
pub mod linear_scan;
mod range;
mod result;
mod rknn;

pub use knn::*;
pub use range::*;
pub use result::*;
pub use rknn::*;
