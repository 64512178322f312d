mod capability;
mod factory;
#[allow(clippy::module_inception)]
mod index;
mod materialize_knn;
mod pivot_table;
mod registry;

pub use capability::*;
pub use factory::*;
pub use index::*;
pub use materialize_knn::*;
pub use pivot_table::*;
pub use registry::*;
