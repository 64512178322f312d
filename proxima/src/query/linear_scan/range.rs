use crate::distance::DistanceQuery;
use crate::errors::ProximaResult;
use crate::query::{sort_result, DistanceResultPair, QueryResult, RangeQuery};

/// Range query by one pass over the relation.
pub struct LinearScanRangeQuery<O> {
    distance_query: DistanceQuery<O>,
}

impl<O> LinearScanRangeQuery<O> {
    pub fn new(distance_query: DistanceQuery<O>) -> Self {
        LinearScanRangeQuery { distance_query }
    }
}

impl<O: Send + Sync> RangeQuery<O> for LinearScanRangeQuery<O> {
    fn range_for_object(&self, object: &O, epsilon: f64) -> ProximaResult<QueryResult> {
        let relation = self.distance_query.relation();
        let mut result = Vec::new();
        for id in relation.ids() {
            let candidate = relation.get(id)?;
            let distance = self.distance_query.distance_between(object, &candidate);
            if distance <= epsilon {
                result.push(DistanceResultPair::new(distance, id));
            }
        }
        sort_result(&mut result);
        Ok(result)
    }

    fn distance_query(&self) -> &DistanceQuery<O> {
        &self.distance_query
    }
}
