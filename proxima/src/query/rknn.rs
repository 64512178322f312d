use crate::distance::DistanceQuery;
use crate::errors::ProximaResult;
use crate::id::ObjectId;
use crate::query::QueryResult;

/// Reverse k-nearest-neighbor query.
///
/// The answer for `q` holds every object `o` that has `q` among its own k
/// nearest neighbors, paired with `d(o, q)`, ascending by that distance and
/// then by id.
pub trait RknnQuery<O>: Send + Sync {
    fn rknn_for_id(&self, id: ObjectId, k: usize) -> ProximaResult<QueryResult>;

    /// Objects `o` with `d(o, object) <= kdist(o)`.
    fn rknn_for_object(&self, object: &O, k: usize) -> ProximaResult<QueryResult>;

    fn rknn_for_bulk_ids(&self, ids: &[ObjectId], k: usize) -> ProximaResult<Vec<QueryResult>> {
        ids.iter().map(|id| self.rknn_for_id(*id, k)).collect()
    }

    fn distance_query(&self) -> &DistanceQuery<O>;
}
