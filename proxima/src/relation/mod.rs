mod array_relation;
mod id_view;
mod materialized;
mod proxy_view;
#[allow(clippy::module_inception)]
mod relation;

pub use array_relation::*;
pub use id_view::*;
pub use materialized::*;
pub use proxy_view::*;
pub use relation::*;
