mod double_vector;
mod hyper_bounding_box;
mod relation_value;

pub use double_vector::*;
pub use hyper_bounding_box::*;
pub use relation_value::*;
