//! Database shapes, query dispatch and the bundles objects travel in.

mod builder;
mod bundle;
mod column;
mod config;
mod database_core;
#[allow(clippy::module_inception)]
mod database;
mod hashmap_db;
mod metrical_db;
mod proxy_db;
mod query_builder;
mod static_array_db;

pub use builder::*;
pub use bundle::*;
pub(crate) use column::*;
pub use config::*;
pub use database_core::*;
pub use database::*;
pub use hashmap_db::*;
pub use metrical_db::*;
pub use proxy_db::*;
pub use query_builder::*;
pub use static_array_db::*;
