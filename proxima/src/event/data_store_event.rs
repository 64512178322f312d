use std::fmt::{Display, Formatter};

use crate::id::{ObjectId, ObjectIdSet};

/// Kind of change applied to the contents of a data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataStoreEventType {
    Insert,
    Update,
    Delete,
}

impl Display for DataStoreEventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DataStoreEventType::Insert => write!(f, "Insert"),
            DataStoreEventType::Update => write!(f, "Update"),
            DataStoreEventType::Delete => write!(f, "Delete"),
        }
    }
}

/// A batch of objects affected by one kind of change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStoreEvent {
    event_type: DataStoreEventType,
    ids: ObjectIdSet,
}

impl DataStoreEvent {
    pub fn new(event_type: DataStoreEventType, ids: ObjectIdSet) -> Self {
        DataStoreEvent { event_type, ids }
    }

    pub fn event_type(&self) -> DataStoreEventType {
        self.event_type
    }

    pub fn ids(&self) -> &ObjectIdSet {
        &self.ids
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Display for DataStoreEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[", self.event_type)?;
        for (i, id) in self.ids.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", id)?;
        }
        write!(f, "]")
    }
}
