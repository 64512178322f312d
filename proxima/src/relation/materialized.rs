use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::common::TypeInformation;
use crate::data::RelationValue;
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::id::ObjectId;
use crate::relation::{object_not_found, Relation, RelationId};

/// Modifiable relation keeping its values in an ordered map.
pub struct MaterializedRelation<T> {
    relation_id: RelationId,
    name: String,
    type_information: TypeInformation,
    values: RwLock<BTreeMap<ObjectId, T>>,
}

impl<T: RelationValue> MaterializedRelation<T> {
    pub fn new(name: &str, type_information: TypeInformation) -> Self {
        MaterializedRelation {
            relation_id: RelationId::next(),
            name: name.to_string(),
            type_information,
            values: RwLock::new(BTreeMap::new()),
        }
    }

    /// Checks that `value` fits the declared type of this relation.
    pub fn validate(&self, value: &T) -> ProximaResult<()> {
        match (self.type_information.dimensionality(), value.dimensionality()) {
            (Some(expected), Some(actual)) if expected != actual => Err(ProximaError::new(
                &format!(
                    "Value of dimensionality {} does not fit {} ({})",
                    actual, self.name, self.type_information
                ),
                ErrorKind::DimensionalityMismatch,
            )),
            _ => Ok(()),
        }
    }

    /// Stores `value` under `id`, replacing any previous value.
    pub fn set(&self, id: ObjectId, value: T) -> ProximaResult<()> {
        self.validate(&value)?;
        self.values.write().insert(id, value);
        Ok(())
    }

    /// Removes the value of `id`, returning it.
    pub fn delete(&self, id: ObjectId) -> Option<T> {
        self.values.write().remove(&id)
    }
}

impl<T: RelationValue> Relation<T> for MaterializedRelation<T> {
    fn relation_id(&self) -> RelationId {
        self.relation_id
    }

    fn type_information(&self) -> TypeInformation {
        self.type_information.clone()
    }

    fn get(&self, id: ObjectId) -> ProximaResult<T> {
        self.values
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| object_not_found(id, &self.name))
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.values.read().contains_key(&id)
    }

    fn ids(&self) -> Vec<ObjectId> {
        self.values.read().keys().copied().collect()
    }

    fn len(&self) -> usize {
        self.values.read().len()
    }

    fn long_name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DoubleVector;

    fn vectors() -> MaterializedRelation<DoubleVector> {
        MaterializedRelation::new(
            "vectors",
            TypeInformation::of::<DoubleVector>().with_dimensionality(2),
        )
    }

    #[test]
    fn test_set_get_delete() {
        let relation = vectors();
        relation.set(ObjectId::new(1), DoubleVector::from([1.0, 2.0])).unwrap();
        assert_eq!(relation.get(ObjectId::new(1)).unwrap(), DoubleVector::from([1.0, 2.0]));
        assert!(relation.contains(ObjectId::new(1)));
        assert_eq!(relation.delete(ObjectId::new(1)), Some(DoubleVector::from([1.0, 2.0])));
        assert!(relation.is_empty());
    }

    #[test]
    fn test_get_missing_fails() {
        let relation = vectors();
        let err = relation.get(ObjectId::new(9)).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ObjectNotFound);
    }

    #[test]
    fn test_rejects_wrong_dimensionality() {
        let relation = vectors();
        let err = relation
            .set(ObjectId::new(1), DoubleVector::from([1.0, 2.0, 3.0]))
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DimensionalityMismatch);
        assert!(relation.is_empty());
    }

    #[test]
    fn test_ids_are_ascending() {
        let relation = vectors();
        for id in [5u64, 2, 9] {
            relation.set(ObjectId::new(id), DoubleVector::from([0.0, 0.0])).unwrap();
        }
        assert_eq!(
            relation.ids(),
            vec![ObjectId::new(2), ObjectId::new(5), ObjectId::new(9)]
        );
    }
}
