mod distance_function;
mod distance_query;
mod similarity_function;

pub use distance_function::*;
pub use distance_query::*;
pub use similarity_function::*;
