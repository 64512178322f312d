//! Change notification for databases and indexes.

mod data_store_event;
mod event_manager;
mod listener;
mod result_event;

pub use data_store_event::*;
pub use event_manager::*;
pub use listener::*;
pub use result_event::*;
