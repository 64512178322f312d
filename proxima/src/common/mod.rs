mod hints;
mod logger;
mod type_information;

pub use hints::*;
pub use logger::*;
pub use type_information::*;

#[cfg(test)]
pub(crate) use logger::tests::CapturingSink;
