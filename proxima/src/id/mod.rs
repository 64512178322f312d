mod id_allocator;
mod object_id;

pub use id_allocator::*;
pub use object_id::*;
