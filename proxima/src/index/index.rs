use std::sync::Arc;

use crate::common::QueryHint;
use crate::distance::DistanceQuery;
use crate::errors::ProximaResult;
use crate::id::ObjectId;
use crate::query::{KnnQuery, RangeQuery, RknnQuery};
use crate::relation::RelationId;

/// A structure maintained over exactly one relation.
///
/// The owning database keeps the index in sync: objects are inserted after
/// their values were written to the relation and deleted before their values
/// are removed from it.
pub trait Index<O>: Send + Sync {
    fn long_name(&self) -> String;

    /// Identity of the indexed relation.
    fn relation_id(&self) -> RelationId;

    /// Indexes everything currently stored in the relation.
    fn initialize(&self) -> ProximaResult<()>;

    fn insert(&self, id: ObjectId) -> ProximaResult<()>;

    fn insert_all(&self, ids: &[ObjectId]) -> ProximaResult<()> {
        for id in ids {
            self.insert(*id)?;
        }
        Ok(())
    }

    /// Returns whether the id was indexed.
    fn delete(&self, id: ObjectId) -> ProximaResult<bool>;

    fn delete_all(&self, ids: &[ObjectId]) -> ProximaResult<()> {
        for id in ids {
            self.delete(*id)?;
        }
        Ok(())
    }

    /// Number of indexed objects.
    fn size(&self) -> usize;

    fn log_statistics(&self) {}
}

/// An index able to accelerate kNN queries.
///
/// Returns `None` when it cannot answer queries of the given distance query,
/// e.g. because it was built for another distance function.
pub trait KnnIndex<O>: Index<O> {
    fn get_knn_query(
        &self,
        distance_query: &DistanceQuery<O>,
        hints: &[QueryHint],
    ) -> Option<Arc<dyn KnnQuery<O>>>;
}

pub trait RangeIndex<O>: Index<O> {
    fn get_range_query(
        &self,
        distance_query: &DistanceQuery<O>,
        hints: &[QueryHint],
    ) -> Option<Arc<dyn RangeQuery<O>>>;
}

pub trait RknnIndex<O>: Index<O> {
    fn get_rknn_query(
        &self,
        distance_query: &DistanceQuery<O>,
        hints: &[QueryHint],
    ) -> Option<Arc<dyn RknnQuery<O>>>;
}

/// Whether `distance_query` uses the same function over the same relation an
/// index was built for.
pub fn is_same_binding<O>(
    distance_query: &DistanceQuery<O>,
    relation_id: RelationId,
    descriptor: &str,
) -> bool {
    distance_query.relation_id() == relation_id && distance_query.descriptor() == descriptor
}
