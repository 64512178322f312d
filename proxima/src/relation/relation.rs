use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::common::TypeInformation;
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::id::ObjectId;

static NEXT_RELATION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one relation instance.
///
/// Indexes and queries compare relations by this identity, never by content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId(u64);

impl RelationId {
    pub(crate) fn next() -> Self {
        RelationId(NEXT_RELATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Display for RelationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "relation-{}", self.0)
    }
}

/// A column of a database: a mapping from object ids to values of one type.
///
/// Iteration over [`Relation::ids`] is deterministic (ascending id order).
pub trait Relation<T>: Send + Sync {
    fn relation_id(&self) -> RelationId;

    fn type_information(&self) -> TypeInformation;

    /// Returns the value stored for `id`.
    ///
    /// Fails with [`ErrorKind::ObjectNotFound`] when the id is absent.
    fn get(&self, id: ObjectId) -> ProximaResult<T>;

    fn contains(&self, id: ObjectId) -> bool;

    fn ids(&self) -> Vec<ObjectId>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn long_name(&self) -> String;
}

/// Shared handle to a relation.
pub type RelationRef<T> = Arc<dyn Relation<T>>;

pub(crate) fn object_not_found(id: ObjectId, relation: &str) -> ProximaError {
    ProximaError::new(
        &format!("Object {} not found in {}", id, relation),
        ErrorKind::ObjectNotFound,
    )
}
