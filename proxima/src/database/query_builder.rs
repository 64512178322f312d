use std::sync::Arc;

use crate::common::QueryHint;
use crate::data::RelationValue;
use crate::database::Database;
use crate::distance::{DistanceFunction, DistanceQuery, SimilarityFunction, SimilarityQuery};
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::query::{KnnQuery, RangeQuery, RknnQuery};
use crate::relation::RelationRef;

/// Fluent construction of queries over one relation of a database.
pub struct QueryBuilder<'a, D, O> {
    database: &'a D,
    relation: RelationRef<O>,
    distance_function: Option<Arc<dyn DistanceFunction<O>>>,
    similarity_function: Option<Arc<dyn SimilarityFunction<O>>>,
    hints: Vec<QueryHint>,
}

impl<'a, D: Database, O: RelationValue> QueryBuilder<'a, D, O> {
    pub fn new(database: &'a D, relation: RelationRef<O>) -> Self {
        QueryBuilder {
            database,
            relation,
            distance_function: None,
            similarity_function: None,
            hints: Vec::new(),
        }
    }

    pub fn distance_function(mut self, function: Arc<dyn DistanceFunction<O>>) -> Self {
        self.distance_function = Some(function);
        self
    }

    pub fn similarity_function(mut self, function: Arc<dyn SimilarityFunction<O>>) -> Self {
        self.similarity_function = Some(function);
        self
    }

    pub fn hint(mut self, hint: QueryHint) -> Self {
        self.hints.push(hint);
        self
    }

    pub fn hints(mut self, hints: &[QueryHint]) -> Self {
        self.hints.extend_from_slice(hints);
        self
    }

    pub fn distance_query(&self) -> ProximaResult<DistanceQuery<O>> {
        self.database.get_distance_query(
            &self.relation,
            self.distance_function.clone(),
            &self.hints,
        )
    }

    pub fn similarity_query(&self) -> ProximaResult<SimilarityQuery<O>> {
        self.database.get_similarity_query(
            &self.relation,
            self.similarity_function.clone(),
            &self.hints,
        )
    }

    pub fn knn_query(&self) -> ProximaResult<Option<Arc<dyn KnnQuery<O>>>> {
        let distance_query = self.require_distance_query()?;
        self.database.get_knn_query(&distance_query, &self.hints)
    }

    pub fn range_query(&self) -> ProximaResult<Option<Arc<dyn RangeQuery<O>>>> {
        let distance_query = self.require_distance_query()?;
        self.database.get_range_query(&distance_query, &self.hints)
    }

    pub fn rknn_query(&self) -> ProximaResult<Option<Arc<dyn RknnQuery<O>>>> {
        let distance_query = self.require_distance_query()?;
        self.database.get_rknn_query(&distance_query, &self.hints)
    }

    fn require_distance_query(&self) -> ProximaResult<DistanceQuery<O>> {
        if self.distance_function.is_none() {
            return Err(ProximaError::new(
                &format!(
                    "No distance function given for queries over {}",
                    self.relation.long_name()
                ),
                ErrorKind::ConfigurationError,
            ));
        }
        self.distance_query()
    }
}
