use crate::distance::DistanceQuery;
use crate::errors::ProximaResult;
use crate::id::ObjectId;
use crate::query::QueryResult;

/// Range (epsilon-neighborhood) query: every object within `epsilon`
/// inclusive, ascending by distance, ties broken by id.
pub trait RangeQuery<O>: Send + Sync {
    fn range_for_object(&self, object: &O, epsilon: f64) -> ProximaResult<QueryResult>;

    fn range_for_id(&self, id: ObjectId, epsilon: f64) -> ProximaResult<QueryResult> {
        let object = self.distance_query().relation().get(id)?;
        self.range_for_object(&object, epsilon)
    }

    fn distance_query(&self) -> &DistanceQuery<O>;
}
