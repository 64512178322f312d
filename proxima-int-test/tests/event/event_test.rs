use parking_lot::Mutex;
use proxima::data::DoubleVector;
use proxima::database::Database;
use proxima::distance::EuclideanDistance;
use proxima::errors::{ErrorKind, ProximaError};
use proxima::event::{
    DataStoreEventType, DataStoreListener, ResultEvent, ResultKind, ResultListener,
};
use proxima::id::{ObjectId, ObjectIdSet};
use proxima_int_test::test_util::{
    cleanup, create_spatial_test_context, insert_points, run_test,
};
use proxima_spatial::rtree::RTreeConfig;
use std::sync::Arc;

type Seen = Arc<Mutex<Vec<(DataStoreEventType, ObjectIdSet)>>>;

fn record<D: Database>(db: &D) -> Seen {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    db.add_data_store_listener(DataStoreListener::new(move |event| {
        sink.lock().push((event.event_type(), event.ids().clone()));
        Ok(())
    }));
    seen
}

fn point(x: f64) -> Vec<DoubleVector> {
    vec![DoubleVector::from([x, x])]
}

fn id_set(ids: &[ObjectId]) -> ObjectIdSet {
    ids.iter().copied().collect()
}

#[test]
fn test_immediate_events_without_accumulation() {
    run_test(
        || create_spatial_test_context(Arc::new(EuclideanDistance), RTreeConfig::default()),
        |ctx| {
            let db = ctx.db();
            let seen = record(&db);
            let first = insert_points(&db, point(1.0))?;
            let second = insert_points(&db, point(2.0))?;
            db.delete(first[0])?;

            assert_eq!(
                *seen.lock(),
                vec![
                    (DataStoreEventType::Insert, id_set(&first)),
                    (DataStoreEventType::Insert, id_set(&second)),
                    (DataStoreEventType::Delete, id_set(&first)),
                ]
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_accumulated_inserts_merge() {
    run_test(
        || create_spatial_test_context(Arc::new(EuclideanDistance), RTreeConfig::default()),
        |ctx| {
            let db = ctx.db();
            let seen = record(&db);

            db.accumulate_data_store_events();
            let mut ids = Vec::new();
            for x in [1.0, 2.0, 3.0] {
                ids.extend(insert_points(&db, point(x))?);
            }
            assert!(seen.lock().is_empty());
            db.flush_data_store_events()?;
            assert_eq!(
                *seen.lock(),
                vec![(DataStoreEventType::Insert, id_set(&ids))]
            );

            // accumulation ended with the flush
            let more = insert_points(&db, point(4.0))?;
            assert_eq!(seen.lock().len(), 2);
            assert_eq!(seen.lock()[1], (DataStoreEventType::Insert, id_set(&more)));

            // an empty flush is silent
            db.flush_data_store_events()?;
            assert_eq!(seen.lock().len(), 2);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_type_change_flushes_the_batch() {
    run_test(
        || create_spatial_test_context(Arc::new(EuclideanDistance), RTreeConfig::default()),
        |ctx| {
            let db = ctx.db();
            let existing = insert_points(&db, point(0.0))?;
            let seen = record(&db);

            db.accumulate_data_store_events();
            let inserted = insert_points(&db, point(1.0))?;
            db.delete(existing[0])?;
            assert_eq!(
                *seen.lock(),
                vec![(DataStoreEventType::Insert, id_set(&inserted))]
            );
            db.flush_data_store_events()?;
            assert_eq!(
                *seen.lock(),
                vec![
                    (DataStoreEventType::Insert, id_set(&inserted)),
                    (DataStoreEventType::Delete, id_set(&existing)),
                ]
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_removed_listener_is_silent() {
    run_test(
        || create_spatial_test_context(Arc::new(EuclideanDistance), RTreeConfig::default()),
        |ctx| {
            let db = ctx.db();
            let calls = Arc::new(Mutex::new(0usize));
            let counter = calls.clone();
            let id = db.add_data_store_listener(DataStoreListener::new(move |_| {
                *counter.lock() += 1;
                Ok(())
            }));
            insert_points(&db, point(1.0))?;
            assert!(db.remove_data_store_listener(id));
            assert!(!db.remove_data_store_listener(id));
            insert_points(&db, point(2.0))?;
            assert_eq!(*calls.lock(), 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_failing_listener_reports_event_error() {
    run_test(
        || create_spatial_test_context(Arc::new(EuclideanDistance), RTreeConfig::default()),
        |ctx| {
            let db = ctx.db();
            let listener = db.add_data_store_listener(DataStoreListener::new(|_| {
                Err(ProximaError::new("listener broke", ErrorKind::InternalError))
            }));
            let seen = record(&db);

            let err = insert_points(&db, point(1.0)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::EventError);
            // the change itself is kept and later listeners still ran
            assert_eq!(db.len(), 1);
            assert_eq!(seen.lock().len(), 1);

            db.remove_data_store_listener(listener);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_result_listener_sees_relation_and_tree() {
    run_test(
        || create_spatial_test_context(Arc::new(EuclideanDistance), RTreeConfig::default()),
        |ctx| {
            let db = ctx.db();
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = seen.clone();
            db.add_result_listener(ResultListener::new(move |event: &ResultEvent| {
                sink.lock().push(event.clone());
                Ok(())
            }));

            insert_points(&db, point(1.0))?;
            insert_points(&db, point(2.0))?;
            let events = seen.lock().clone();
            assert_eq!(events.len(), 2);
            assert!(matches!(events[0], ResultEvent::Added { kind: ResultKind::Relation, .. }));
            assert!(matches!(events[1], ResultEvent::Added { kind: ResultKind::Index, .. }));
            assert!(events[1].name().starts_with("R*-tree over"));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
