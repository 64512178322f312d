use std::sync::Arc;

use itertools::Itertools;
use parking_lot::Mutex;

use crate::database::{
    AnyColumn, BundleColumn, Database, DatabaseConfig, DatabaseCore, MultipleObjectsBundle,
    SingleObjectBundle,
};
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::event::ResultEvent;
use crate::id::{IdAllocator, ObjectId};

/// Dynamic database keeping every relation in an in-memory map.
///
/// Objects can be inserted and deleted at any time. Deleted ids are
/// recycled by the allocator and reissued smallest first.
#[derive(Clone)]
pub struct HashmapDatabase {
    inner: Arc<HashmapDatabaseInner>,
}

struct HashmapDatabaseInner {
    core: DatabaseCore,
    allocator: IdAllocator,
    write_lock: Mutex<()>,
}

impl HashmapDatabase {
    pub fn new(config: DatabaseConfig) -> Self {
        HashmapDatabase {
            inner: Arc::new(HashmapDatabaseInner {
                core: DatabaseCore::new(config),
                allocator: IdAllocator::new(),
                write_lock: Mutex::new(()),
            }),
        }
    }
}

impl Database for HashmapDatabase {
    fn core(&self) -> &DatabaseCore {
        &self.inner.core
    }

    fn insert(&self, bundle: MultipleObjectsBundle) -> ProximaResult<Vec<ObjectId>> {
        let (ids, result_events) = {
            let _guard = self.inner.write_lock.lock();
            self.inner.insert(&bundle)?
        };
        let notified = self.inner.core.fire_result_events(result_events);
        self.inner.core.events().fire_objects_inserted(&ids)?;
        notified?;
        Ok(ids)
    }

    fn delete(&self, id: ObjectId) -> ProximaResult<SingleObjectBundle> {
        if !self.inner.core.contains(id) {
            return Err(ProximaError::new(
                &format!("Object {} not found in the database", id),
                ErrorKind::ObjectNotFound,
            ));
        }
        let mut removed = self.delete_all(&[id])?;
        removed.pop().ok_or_else(|| {
            ProximaError::new(
                &format!("Object {} vanished during delete", id),
                ErrorKind::InternalError,
            )
        })
    }

    fn delete_all(&self, ids: &[ObjectId]) -> ProximaResult<Vec<SingleObjectBundle>> {
        let (removed_ids, bundles) = {
            let _guard = self.inner.write_lock.lock();
            self.inner.delete_all(ids)?
        };
        self.inner.core.events().fire_objects_removed(&removed_ids)?;
        Ok(bundles)
    }
}

impl HashmapDatabaseInner {
    fn insert(&self, bundle: &MultipleObjectsBundle) -> ProximaResult<(Vec<ObjectId>, Vec<ResultEvent>)> {
        let logger = self.core.logger();
        let length = bundle.validate().inspect_err(|e| {
            logger.error(format_args!("Rejected bundle: {}", e));
        })?;
        if length == 0 {
            return Ok((Vec::new(), Vec::new()));
        }

        let targets = self.align_columns(bundle)?;
        let ids = self.assign_ids(bundle)?;

        let mut result_events = Vec::new();
        let mut columns = Vec::with_capacity(targets.len());
        let mut created = Vec::new();
        for (target, values) in targets.into_iter().zip(bundle.columns()) {
            match target {
                Some(column) => columns.push(column),
                None => {
                    let name = values.type_information().to_string();
                    let column = values
                        .column_values()
                        .new_materialized_column(&name, values.type_information().clone());
                    match self.core.add_column(column.clone()) {
                        Ok(events) => result_events.extend(events),
                        Err(e) => {
                            self.core.remove_columns(&created);
                            self.release_ids(&ids);
                            return Err(e);
                        }
                    }
                    created.push(column.clone());
                    columns.push(column);
                }
            }
        }

        {
            let mut live = self.core.id_set().write();
            live.extend(ids.iter().copied());
        }
        if let Err(e) = self.write_columns(&columns, &ids, bundle.columns()) {
            self.rollback(&columns, &created, &ids);
            return Err(e);
        }
        for column in &columns {
            if let Err(cause) = column.index_insert_all(&ids) {
                logger.error(format_args!(
                    "Indexing {} object(s) of {} failed: {}",
                    ids.len(),
                    column.long_name(),
                    cause
                ));
                self.rollback(&columns, &created, &ids);
                return Err(ProximaError::new_with_cause(
                    &format!("Failed to index objects of {}", column.long_name()),
                    ErrorKind::IndexingError,
                    cause,
                ));
            }
        }
        logger.debug(format_args!(
            "Inserted {} object(s) into {} relation(s)",
            ids.len(),
            columns.len()
        ));
        Ok((ids, result_events))
    }

    /// Matches every bundle column to an existing relation of the same type,
    /// each relation used at most once. `None` asks for a new relation.
    fn align_columns(
        &self,
        bundle: &MultipleObjectsBundle,
    ) -> ProximaResult<Vec<Option<Arc<dyn AnyColumn>>>> {
        let existing = self.core.columns();
        let mut used = vec![false; existing.len()];
        let mut targets = Vec::with_capacity(bundle.column_count());
        for values in bundle.columns() {
            let type_id = values.type_information().type_id();
            let found = existing
                .iter()
                .enumerate()
                .find(|(i, c)| !used[*i] && c.type_information().type_id() == type_id);
            match found {
                Some((i, column)) => {
                    column.validate_values(values).inspect_err(|e| {
                        self.core.logger().error(format_args!(
                            "Values of {} do not fit {}: {}",
                            values.type_information(),
                            column.long_name(),
                            e
                        ));
                    })?;
                    used[i] = true;
                    targets.push(Some(column.clone()));
                }
                None => targets.push(None),
            }
        }
        Ok(targets)
    }

    fn assign_ids(&self, bundle: &MultipleObjectsBundle) -> ProximaResult<Vec<ObjectId>> {
        let Some(requested) = bundle.ids() else {
            return Ok(self.allocator.allocate_many(bundle.data_length()));
        };
        let mut reserved = Vec::with_capacity(requested.len());
        for id in requested {
            if self.core.contains(*id) || !self.allocator.reserve(*id) {
                self.release_ids(&reserved);
                self.core
                    .logger()
                    .error(format_args!("Id {} is already in use", id));
                return Err(ProximaError::new(
                    &format!("Id {} is already in use", id),
                    ErrorKind::DuplicateId,
                ));
            }
            reserved.push(*id);
        }
        Ok(reserved)
    }

    fn write_columns(
        &self,
        columns: &[Arc<dyn AnyColumn>],
        ids: &[ObjectId],
        values: &[BundleColumn],
    ) -> ProximaResult<()> {
        for (column, values) in columns.iter().zip(values) {
            column.write_values(ids, values)?;
        }
        Ok(())
    }

    /// Undoes a partial insert. Relations created by the insert are
    /// withdrawn along with their indexes.
    fn rollback(
        &self,
        columns: &[Arc<dyn AnyColumn>],
        created: &[Arc<dyn AnyColumn>],
        ids: &[ObjectId],
    ) {
        for column in columns {
            if let Err(e) = column.index_delete_all(ids) {
                self.core.logger().warn(format_args!(
                    "Rollback of the indexes of {} failed: {}",
                    column.long_name(),
                    e
                ));
            }
            column.remove_values(ids);
        }
        self.core.remove_columns(created);
        {
            let mut live = self.core.id_set().write();
            for id in ids {
                live.remove(id);
            }
        }
        self.release_ids(ids);
    }

    fn release_ids(&self, ids: &[ObjectId]) {
        for id in ids {
            self.allocator.deallocate(*id);
        }
    }

    fn delete_all(&self, ids: &[ObjectId]) -> ProximaResult<(Vec<ObjectId>, Vec<SingleObjectBundle>)> {
        let present: Vec<ObjectId> = ids
            .iter()
            .filter(|id| self.core.contains(**id))
            .copied()
            .sorted()
            .dedup()
            .collect();
        if present.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let bundles = present
            .iter()
            .map(|id| self.core.get_bundle(*id))
            .collect::<ProximaResult<Vec<_>>>()?;

        let columns = self.core.columns();
        for column in &columns {
            let held: Vec<ObjectId> = present
                .iter()
                .filter(|id| column.contains(**id))
                .copied()
                .collect();
            column.index_delete_all(&held).map_err(|cause| {
                self.core.logger().error(format_args!(
                    "Removing {} object(s) from the indexes of {} failed: {}",
                    held.len(),
                    column.long_name(),
                    cause
                ));
                ProximaError::new_with_cause(
                    &format!("Failed to unindex objects of {}", column.long_name()),
                    ErrorKind::IndexingError,
                    cause,
                )
            })?;
        }
        for column in &columns {
            column.remove_values(&present);
        }
        {
            let mut live = self.core.id_set().write();
            for id in &present {
                live.remove(id);
            }
        }
        self.release_ids(&present);
        self.core
            .logger()
            .debug(format_args!("Deleted {} object(s)", present.len()));
        Ok((present, bundles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Logger, QueryHint, TypeInformation};
    use crate::data::DoubleVector;
    use crate::distance::{DistanceFunction, EuclideanDistance};
    use crate::event::{DataStoreEventType, DataStoreListener, ResultKind, ResultListener};
    use crate::index::{Index, IndexFactory, IndexRegistration};
    use crate::relation::{RelationId, RelationRef};

    // installs the log backend once for the whole test binary
    #[ctor::ctor]
    fn init() {
        colog::init();
    }

    fn points() -> MultipleObjectsBundle {
        MultipleObjectsBundle::new()
            .with_column(vec![
                DoubleVector::from([0.0, 0.0]),
                DoubleVector::from([1.0, 0.0]),
                DoubleVector::from([0.0, 1.0]),
                DoubleVector::from([5.0, 5.0]),
                DoubleVector::from([5.0, 6.0]),
            ])
            .with_column(vec![
                "P1".to_string(),
                "P2".to_string(),
                "P3".to_string(),
                "P4".to_string(),
                "P5".to_string(),
            ])
    }

    fn silent_db() -> HashmapDatabase {
        let config = DatabaseConfig::new();
        config.set_logger(Logger::silent()).unwrap();
        HashmapDatabase::new(config)
    }

    fn vectors(db: &HashmapDatabase) -> RelationRef<DoubleVector> {
        db.get_relation::<DoubleVector>(&TypeInformation::of::<DoubleVector>())
            .unwrap()
    }

    fn euclidean() -> Arc<dyn DistanceFunction<DoubleVector>> {
        Arc::new(EuclideanDistance)
    }

    #[test]
    fn test_range_and_knn_over_five_points() {
        let db = silent_db();
        let ids = db.insert(points()).unwrap();
        assert_eq!(db.len(), 5);
        assert_eq!(db.relation_count(), 3);

        let relation = vectors(&db);
        let builder = db.query(&relation).distance_function(euclidean());
        let range = builder.range_query().unwrap().unwrap();
        let result = range.range_for_id(ids[0], 1.5).unwrap();
        let found: Vec<ObjectId> = result.iter().map(|p| p.id()).collect();
        assert_eq!(found, vec![ids[0], ids[1], ids[2]]);
        assert_eq!(result[0].distance(), 0.0);
        assert_eq!(result[1].distance(), 1.0);

        let knn = builder.knn_query().unwrap().unwrap();
        let result = knn.knn_for_id(ids[0], 2).unwrap();
        let found: Vec<ObjectId> = result.iter().map(|p| p.id()).collect();
        assert_eq!(found, vec![ids[0], ids[1]]);
    }

    #[test]
    fn test_optimized_only_without_index_yields_none() {
        let db = silent_db();
        db.insert(points()).unwrap();
        let relation = vectors(&db);
        let knn = db
            .query(&relation)
            .distance_function(euclidean())
            .hint(QueryHint::OptimizedOnly)
            .knn_query()
            .unwrap();
        assert!(knn.is_none());
    }

    #[test]
    fn test_missing_distance_function_is_a_configuration_error() {
        let db = silent_db();
        db.insert(points()).unwrap();
        let relation = vectors(&db);
        let err = db.query(&relation).knn_query().err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
        let err = db.get_distance_query(&relation, None, &[]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_foreign_relation_is_rejected() {
        let db = silent_db();
        let other = silent_db();
        other.insert(points()).unwrap();
        let relation = vectors(&other);
        let err = db
            .get_distance_query(&relation, Some(euclidean()), &[])
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_no_matching_relation() {
        let db = silent_db();
        db.insert(points()).unwrap();
        let err = db.get_relation::<i64>(&TypeInformation::of::<i64>()).err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::NoMatchingRelation);
        let ids = db.get_relation::<ObjectId>(&TypeInformation::of::<ObjectId>()).unwrap();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_delete_removes_object_everywhere() {
        let db = silent_db();
        let ids = db.insert(points()).unwrap();
        let bundle = db.delete(ids[1]).unwrap();
        assert_eq!(bundle.id(), Some(ids[1]));
        assert_eq!(bundle.find::<String>().map(String::as_str), Some("P2"));

        let relation = vectors(&db);
        assert_eq!(relation.get(ids[1]).unwrap_err().kind(), &ErrorKind::ObjectNotFound);
        let knn = db
            .query(&relation)
            .distance_function(euclidean())
            .knn_query()
            .unwrap()
            .unwrap();
        let result = knn.knn_for_id(ids[0], 5).unwrap();
        assert_eq!(result.len(), 4);
        assert!(result.iter().all(|p| p.id() != ids[1]));

        let err = db.delete(ids[1]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ObjectNotFound);
    }

    #[test]
    fn test_delete_all_skips_unknown_ids() {
        let db = silent_db();
        let ids = db.insert(points()).unwrap();
        let removed = db
            .delete_all(&[ids[4], ObjectId::new(999), ids[3]])
            .unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(db.len(), 3);
    }

    #[test]
    fn test_deleted_ids_are_recycled() {
        let db = silent_db();
        let ids = db.insert(points()).unwrap();
        db.delete(ids[2]).unwrap();
        let again = db
            .insert(MultipleObjectsBundle::new().with_column(vec![DoubleVector::from([9.0, 9.0])]))
            .unwrap();
        assert_eq!(again, vec![ids[2]]);
    }

    #[test]
    fn test_explicit_duplicate_id_leaves_database_unchanged() {
        let db = silent_db();
        let ids = db
            .insert(
                MultipleObjectsBundle::new()
                    .with_column(vec![10i64, 20])
                    .with_ids(vec![ObjectId::new(7), ObjectId::new(8)]),
            )
            .unwrap();
        assert_eq!(ids, vec![ObjectId::new(7), ObjectId::new(8)]);

        let err = db
            .insert(
                MultipleObjectsBundle::new()
                    .with_column(vec![30i64, 40])
                    .with_ids(vec![ObjectId::new(9), ObjectId::new(8)]),
            )
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DuplicateId);
        assert_eq!(db.len(), 2);
        assert!(!db.contains(ObjectId::new(9)));

        // the reservation of 9 was released
        let ids = db
            .insert(
                MultipleObjectsBundle::new()
                    .with_column(vec![50i64])
                    .with_ids(vec![ObjectId::new(9)]),
            )
            .unwrap();
        assert_eq!(ids, vec![ObjectId::new(9)]);
    }

    #[test]
    fn test_columns_align_with_existing_relations() {
        let db = silent_db();
        db.insert(points()).unwrap();
        db.insert(
            MultipleObjectsBundle::new()
                .with_column(vec!["P6".to_string()])
                .with_column(vec![DoubleVector::from([2.0, 2.0])]),
        )
        .unwrap();
        assert_eq!(db.relation_count(), 3);
        assert_eq!(vectors(&db).len(), 6);

        let err = db
            .insert(MultipleObjectsBundle::new().with_column(vec![DoubleVector::from([1.0, 2.0, 3.0])]))
            .unwrap_err();
        assert!(err.kind().is_validation());
        assert_eq!(db.len(), 6);
    }

    #[test]
    fn test_get_bundle_collects_every_relation() {
        let db = silent_db();
        let ids = db.insert(points()).unwrap();
        let bundle = db.get_bundle(ids[3]).unwrap();
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.find::<DoubleVector>(), Some(&DoubleVector::from([5.0, 5.0])));
        assert_eq!(
            db.get_bundle(ObjectId::new(100)).unwrap_err().kind(),
            &ErrorKind::ObjectNotFound
        );
    }

    #[test]
    fn test_accumulated_events() {
        let db = silent_db();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        db.add_data_store_listener(DataStoreListener::new(move |event| {
            sink.lock().push((event.event_type(), event.len()));
            Ok(())
        }));

        db.accumulate_data_store_events();
        let first = db.insert(MultipleObjectsBundle::new().with_column(vec![1i64])).unwrap();
        db.insert(MultipleObjectsBundle::new().with_column(vec![2i64])).unwrap();
        db.insert(MultipleObjectsBundle::new().with_column(vec![3i64])).unwrap();
        assert!(seen.lock().is_empty());
        db.flush_data_store_events().unwrap();
        assert_eq!(*seen.lock(), vec![(DataStoreEventType::Insert, 3)]);

        seen.lock().clear();
        db.accumulate_data_store_events();
        db.insert(MultipleObjectsBundle::new().with_column(vec![4i64])).unwrap();
        db.delete(first[0]).unwrap();
        db.flush_data_store_events().unwrap();
        assert_eq!(
            *seen.lock(),
            vec![(DataStoreEventType::Insert, 1), (DataStoreEventType::Delete, 1)]
        );
    }

    #[test]
    fn test_result_listener_sees_new_relations() {
        let db = silent_db();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        db.add_result_listener(ResultListener::new(move |event| {
            sink.lock().push((event.kind(), event.name().to_string()));
            Ok(())
        }));
        db.insert(MultipleObjectsBundle::new().with_column(vec![1i64])).unwrap();
        db.insert(MultipleObjectsBundle::new().with_column(vec![2i64])).unwrap();
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, ResultKind::Relation);
    }

    struct RefusingIndex {
        relation: RelationRef<DoubleVector>,
    }

    impl Index<DoubleVector> for RefusingIndex {
        fn long_name(&self) -> String {
            "RefusingIndex".to_string()
        }

        fn relation_id(&self) -> RelationId {
            self.relation.relation_id()
        }

        fn initialize(&self) -> ProximaResult<()> {
            Ok(())
        }

        fn insert(&self, id: ObjectId) -> ProximaResult<()> {
            let value = self.relation.get(id)?;
            if value[0] < 0.0 {
                return Err(ProximaError::new("negative", ErrorKind::IndexingError));
            }
            Ok(())
        }

        fn delete(&self, _id: ObjectId) -> ProximaResult<bool> {
            Ok(true)
        }

        fn size(&self) -> usize {
            0
        }
    }

    struct RefusingFactory;

    impl IndexFactory<DoubleVector> for RefusingFactory {
        fn name(&self) -> String {
            "RefusingFactory".to_string()
        }

        fn accepts(&self, type_information: &TypeInformation) -> bool {
            type_information.is_type::<DoubleVector>()
        }

        fn instantiate(
            &self,
            relation: RelationRef<DoubleVector>,
            _logger: &Logger,
        ) -> ProximaResult<IndexRegistration<DoubleVector>> {
            Ok(IndexRegistration::<DoubleVector>::new(Arc::new(RefusingIndex { relation })))
        }
    }

    #[test]
    fn test_failed_indexing_rolls_back_the_insert() {
        let config = DatabaseConfig::new();
        config.set_logger(Logger::silent()).unwrap();
        config
            .add_index_factory::<DoubleVector>(Arc::new(RefusingFactory))
            .unwrap();
        let db = HashmapDatabase::new(config);
        db.insert(MultipleObjectsBundle::new().with_column(vec![DoubleVector::from([1.0, 1.0])]))
            .unwrap();

        let err = db
            .insert(MultipleObjectsBundle::new().with_column(vec![
                DoubleVector::from([2.0, 2.0]),
                DoubleVector::from([-1.0, 0.0]),
            ]))
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::IndexingError);
        assert!(err.cause().is_some());
        assert_eq!(db.len(), 1);
        assert_eq!(vectors(&db).len(), 1);
    }

    #[test]
    fn test_failed_first_insert_leaves_no_relation() {
        let config = DatabaseConfig::new();
        config.set_logger(Logger::silent()).unwrap();
        config
            .add_index_factory::<DoubleVector>(Arc::new(RefusingFactory))
            .unwrap();
        let db = HashmapDatabase::new(config);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        db.add_result_listener(ResultListener::new(move |event| {
            sink.lock().push(event.kind());
            Ok(())
        }));

        let err = db
            .insert(MultipleObjectsBundle::new().with_column(vec![DoubleVector::from([-1.0, 0.0])]))
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::IndexingError);
        assert_eq!(db.relation_count(), 1);
        assert!(db.is_empty());
        assert!(seen.lock().is_empty());
        assert!(db
            .get_relation::<DoubleVector>(&TypeInformation::of::<DoubleVector>())
            .is_err());

        // a later bundle of another dimensionality gets a fresh relation
        let ids = db
            .insert(
                MultipleObjectsBundle::new().with_column(vec![DoubleVector::from([1.0, 2.0, 3.0])]),
            )
            .unwrap();
        assert_eq!(ids, vec![ObjectId::new(1)]);
        assert_eq!(db.relation_count(), 2);
        assert_eq!(vectors(&db).len(), 1);
        assert_eq!(*seen.lock(), vec![ResultKind::Relation, ResultKind::Index]);
    }
}
