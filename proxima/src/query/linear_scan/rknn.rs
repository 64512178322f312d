use std::collections::HashMap;
use std::sync::Arc;

use crate::distance::DistanceQuery;
use crate::errors::ProximaResult;
use crate::id::ObjectId;
use crate::query::{sort_result, DistanceResultPair, KnnQuery, QueryResult, RknnQuery};

/// Reverse kNN computed from the kNN lists of every object.
///
/// The kNN lists come from the wrapped [`KnnQuery`], so an accelerated kNN
/// implementation speeds up this scan as well.
pub struct LinearScanRknnQuery<O> {
    knn_query: Arc<dyn KnnQuery<O>>,
}

impl<O> LinearScanRknnQuery<O> {
    pub fn new(knn_query: Arc<dyn KnnQuery<O>>) -> Self {
        LinearScanRknnQuery { knn_query }
    }

    pub fn knn_query(&self) -> &Arc<dyn KnnQuery<O>> {
        &self.knn_query
    }

    fn all_knn_lists(&self, k: usize) -> ProximaResult<(Vec<ObjectId>, Vec<QueryResult>)> {
        let ids = self.knn_query.distance_query().relation().ids();
        let lists = self.knn_query.knn_for_bulk_ids(&ids, k)?;
        Ok((ids, lists))
    }
}

impl<O: Send + Sync> RknnQuery<O> for LinearScanRknnQuery<O> {
    fn rknn_for_id(&self, id: ObjectId, k: usize) -> ProximaResult<QueryResult> {
        let mut bulk = self.rknn_for_bulk_ids(&[id], k)?;
        Ok(bulk.pop().unwrap_or_default())
    }

    fn rknn_for_object(&self, object: &O, k: usize) -> ProximaResult<QueryResult> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let distance_query = self.knn_query.distance_query();
        let relation = distance_query.relation();
        let (ids, lists) = self.all_knn_lists(k)?;
        let mut result = Vec::new();
        for (candidate_id, list) in ids.into_iter().zip(lists) {
            let kdist = if list.len() < k {
                f64::INFINITY
            } else {
                list[k - 1].distance()
            };
            let candidate = relation.get(candidate_id)?;
            let distance = distance_query.distance_between(&candidate, object);
            if distance <= kdist {
                result.push(DistanceResultPair::new(distance, candidate_id));
            }
        }
        sort_result(&mut result);
        Ok(result)
    }

    fn rknn_for_bulk_ids(&self, ids: &[ObjectId], k: usize) -> ProximaResult<Vec<QueryResult>> {
        let relation = self.knn_query.distance_query().relation();
        let mut answers: HashMap<ObjectId, QueryResult> = HashMap::with_capacity(ids.len());
        for id in ids {
            // unknown query ids fail the same way a kNN query would
            relation.get(*id)?;
            answers.entry(*id).or_default();
        }

        let (candidates, lists) = self.all_knn_lists(k)?;
        for (candidate_id, list) in candidates.into_iter().zip(lists) {
            for neighbor in list {
                if let Some(answer) = answers.get_mut(&neighbor.id()) {
                    answer.push(DistanceResultPair::new(neighbor.distance(), candidate_id));
                }
            }
        }

        Ok(ids
            .iter()
            .map(|id| {
                let mut answer = answers.get(id).cloned().unwrap_or_default();
                sort_result(&mut answer);
                answer
            })
            .collect())
    }

    fn distance_query(&self) -> &DistanceQuery<O> {
        self.knn_query.distance_query()
    }
}
