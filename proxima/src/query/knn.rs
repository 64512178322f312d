use crate::distance::DistanceQuery;
use crate::errors::ProximaResult;
use crate::id::ObjectId;
use crate::query::QueryResult;

/// k-nearest-neighbor query over the relation of its distance query.
///
/// Answers are ascending by distance, ties broken by id, and hold
/// `min(k, |relation|)` pairs. The object the query starts from is part of
/// the relation and therefore part of its own answer.
pub trait KnnQuery<O>: Send + Sync {
    fn knn_for_object(&self, object: &O, k: usize) -> ProximaResult<QueryResult>;

    fn knn_for_id(&self, id: ObjectId, k: usize) -> ProximaResult<QueryResult> {
        let object = self.distance_query().relation().get(id)?;
        self.knn_for_object(&object, k)
    }

    /// Answers for several ids at once, in the order of `ids`.
    fn knn_for_bulk_ids(&self, ids: &[ObjectId], k: usize) -> ProximaResult<Vec<QueryResult>> {
        ids.iter().map(|id| self.knn_for_id(*id, k)).collect()
    }

    fn distance_query(&self) -> &DistanceQuery<O>;
}
