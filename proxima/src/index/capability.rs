use std::fmt::{Display, Formatter};

/// Query kinds an index can accelerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexCapability {
    Knn,
    Range,
    Rknn,
}

impl Display for IndexCapability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexCapability::Knn => write!(f, "kNN"),
            IndexCapability::Range => write!(f, "range"),
            IndexCapability::Rknn => write!(f, "RkNN"),
        }
    }
}
