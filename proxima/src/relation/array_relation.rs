use std::ops::Range;

use crate::common::TypeInformation;
use crate::data::RelationValue;
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::id::ObjectId;
use crate::relation::{object_not_found, Relation, RelationId};

/// Read-only relation over a contiguous id range, backed by a vector.
///
/// The value of id `start + i` is stored at offset `i`.
pub struct ArrayRelation<T> {
    relation_id: RelationId,
    name: String,
    type_information: TypeInformation,
    range: Range<u64>,
    values: Vec<T>,
}

impl<T: RelationValue> ArrayRelation<T> {
    pub fn new(
        name: &str,
        type_information: TypeInformation,
        range: Range<u64>,
        values: Vec<T>,
    ) -> ProximaResult<Self> {
        if (range.end - range.start) as usize != values.len() {
            return Err(ProximaError::new(
                &format!(
                    "Id range of {} ids does not match {} values",
                    range.end - range.start,
                    values.len()
                ),
                ErrorKind::ValidationError,
            ));
        }
        Ok(ArrayRelation {
            relation_id: RelationId::next(),
            name: name.to_string(),
            type_information,
            range,
            values,
        })
    }

    fn offset(&self, id: ObjectId) -> Option<usize> {
        if self.range.contains(&id.value()) {
            Some((id.value() - self.range.start) as usize)
        } else {
            None
        }
    }
}

impl<T: RelationValue> Relation<T> for ArrayRelation<T> {
    fn relation_id(&self) -> RelationId {
        self.relation_id
    }

    fn type_information(&self) -> TypeInformation {
        self.type_information.clone()
    }

    fn get(&self, id: ObjectId) -> ProximaResult<T> {
        self.offset(id)
            .map(|offset| self.values[offset].clone())
            .ok_or_else(|| object_not_found(id, &self.name))
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.offset(id).is_some()
    }

    fn ids(&self) -> Vec<ObjectId> {
        self.range.clone().map(ObjectId::new).collect()
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn long_name(&self) -> String {
        self.name.clone()
    }
}
