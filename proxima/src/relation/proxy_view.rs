use std::sync::Arc;

use crate::common::TypeInformation;
use crate::errors::ProximaResult;
use crate::id::{ObjectId, ObjectIdSet};
use crate::relation::{object_not_found, Relation, RelationId, RelationRef};

/// Relation restricted to a fixed subset of another relation's ids.
///
/// Values are read from the wrapped relation on every access, so an id the
/// wrapped relation no longer holds drops out of the view.
pub struct ProxyView<T> {
    relation_id: RelationId,
    inner: RelationRef<T>,
    ids: Arc<ObjectIdSet>,
}

impl<T> ProxyView<T> {
    /// Ids that the wrapped relation does not contain are dropped.
    pub fn new(inner: RelationRef<T>, ids: &ObjectIdSet) -> Self {
        let ids: ObjectIdSet = ids.iter().copied().filter(|id| inner.contains(*id)).collect();
        ProxyView {
            relation_id: RelationId::next(),
            inner,
            ids: Arc::new(ids),
        }
    }
}

impl<T> Relation<T> for ProxyView<T> {
    fn relation_id(&self) -> RelationId {
        self.relation_id
    }

    fn type_information(&self) -> TypeInformation {
        self.inner.type_information()
    }

    fn get(&self, id: ObjectId) -> ProximaResult<T> {
        if self.ids.contains(&id) && self.inner.contains(id) {
            self.inner.get(id)
        } else {
            Err(object_not_found(id, &self.long_name()))
        }
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id) && self.inner.contains(id)
    }

    fn ids(&self) -> Vec<ObjectId> {
        self.ids
            .iter()
            .copied()
            .filter(|id| self.inner.contains(*id))
            .collect()
    }

    fn len(&self) -> usize {
        self.ids.iter().filter(|id| self.inner.contains(**id)).count()
    }

    fn long_name(&self) -> String {
        format!("proxy of {}", self.inner.long_name())
    }
}
