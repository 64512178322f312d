use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::TypeInformation;
use crate::errors::ProximaResult;
use crate::id::{ObjectId, ObjectIdSet};
use crate::relation::{object_not_found, Relation, RelationId};

/// Relation mapping every live id of a database to itself.
///
/// It shares the id set with its owning database, so it always reflects the
/// current contents without being written to.
pub struct IdView {
    relation_id: RelationId,
    ids: Arc<RwLock<ObjectIdSet>>,
}

impl IdView {
    pub fn new(ids: Arc<RwLock<ObjectIdSet>>) -> Self {
        IdView {
            relation_id: RelationId::next(),
            ids,
        }
    }
}

impl Relation<ObjectId> for IdView {
    fn relation_id(&self) -> RelationId {
        self.relation_id
    }

    fn type_information(&self) -> TypeInformation {
        TypeInformation::of::<ObjectId>()
    }

    fn get(&self, id: ObjectId) -> ProximaResult<ObjectId> {
        if self.ids.read().contains(&id) {
            Ok(id)
        } else {
            Err(object_not_found(id, "id view"))
        }
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.ids.read().contains(&id)
    }

    fn ids(&self) -> Vec<ObjectId> {
        self.ids.read().iter().copied().collect()
    }

    fn len(&self) -> usize {
        self.ids.read().len()
    }

    fn long_name(&self) -> String {
        "DBID".to_string()
    }
}
