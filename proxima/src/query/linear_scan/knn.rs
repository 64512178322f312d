use crate::distance::DistanceQuery;
use crate::errors::ProximaResult;
use crate::id::ObjectId;
use crate::query::{KnnHeap, KnnQuery, QueryResult};

/// kNN by one pass over the relation with a bounded heap.
pub struct LinearScanKnnQuery<O> {
    distance_query: DistanceQuery<O>,
}

impl<O> LinearScanKnnQuery<O> {
    pub fn new(distance_query: DistanceQuery<O>) -> Self {
        LinearScanKnnQuery { distance_query }
    }
}

impl<O: Send + Sync> KnnQuery<O> for LinearScanKnnQuery<O> {
    fn knn_for_object(&self, object: &O, k: usize) -> ProximaResult<QueryResult> {
        let relation = self.distance_query.relation();
        let mut heap = KnnHeap::new(k);
        if k == 0 {
            return Ok(heap.into_sorted_vec());
        }
        for id in relation.ids() {
            let candidate = relation.get(id)?;
            let distance = self.distance_query.distance_between(object, &candidate);
            heap.offer(distance, id);
        }
        Ok(heap.into_sorted_vec())
    }

    fn knn_for_bulk_ids(&self, ids: &[ObjectId], k: usize) -> ProximaResult<Vec<QueryResult>> {
        let relation = self.distance_query.relation();
        let objects = ids
            .iter()
            .map(|id| relation.get(*id))
            .collect::<ProximaResult<Vec<O>>>()?;
        let mut heaps: Vec<KnnHeap> = ids.iter().map(|_| KnnHeap::new(k)).collect();
        if k > 0 && !ids.is_empty() {
            // one pass over the relation serves every query
            for candidate_id in relation.ids() {
                let candidate = relation.get(candidate_id)?;
                for (heap, object) in heaps.iter_mut().zip(objects.iter()) {
                    let distance = self.distance_query.distance_between(object, &candidate);
                    heap.offer(distance, candidate_id);
                }
            }
        }
        Ok(heaps.into_iter().map(KnnHeap::into_sorted_vec).collect())
    }

    fn distance_query(&self) -> &DistanceQuery<O> {
        &self.distance_query
    }
}
