use std::collections::BTreeSet;
use std::fmt::{Debug, Display};

/// Opaque, totally ordered handle of one stored object.
///
/// Ids are handed out by an [`IdAllocator`](crate::id::IdAllocator). An id is
/// only reissued after the object that owned it has been deleted, so no two
/// live objects ever share an id.
///
/// # Examples
///
/// ```rust
/// use proxima::id::ObjectId;
///
/// let a = ObjectId::new(1);
/// let b = ObjectId::new(2);
/// assert!(a < b);
/// assert_eq!(a.value(), 1);
/// ```
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectId {
    id_value: u64,
}

impl ObjectId {
    pub const fn new(id_value: u64) -> Self {
        ObjectId { id_value }
    }

    pub fn value(&self) -> u64 {
        self.id_value
    }
}

impl From<u64> for ObjectId {
    fn from(value: u64) -> Self {
        ObjectId::new(value)
    }
}

impl Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.id_value)
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.id_value)
    }
}

/// Ordered set of ids; iteration is ascending.
pub type ObjectIdSet = BTreeSet<ObjectId>;
