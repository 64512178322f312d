use proxima::common::{Logger, QueryHint};
use proxima::data::DoubleVector;
use proxima::database::Database;
use proxima::distance::{DistanceFunction, EuclideanDistance};
use proxima::errors::{ErrorKind, ProximaResult};
use proxima::id::ObjectId;
use proxima::index::{Index, KnnIndex};
use proxima_int_test::test_util::{
    cleanup, create_test_context, insert_points, random_points, run_test, vectors,
};
use proxima_spatial::deliclu::{DeLiCluFlags, DeLiCluTree};
use proxima_spatial::rtree::{PageId, RTreeConfig};
use std::sync::Arc;

fn config() -> RTreeConfig {
    RTreeConfig::builder()
        .capacities(6, 6)
        .integrity_checks(true)
        .build()
        .unwrap()
}

/// Whether any leaf entry below `page_id` is still unhandled.
fn any_unhandled_leaf(tree: &DeLiCluTree, page_id: PageId) -> ProximaResult<bool> {
    let node = tree.node(page_id)?;
    for entry in node.entries() {
        let found = match entry.page_id() {
            Some(child) => any_unhandled_leaf(tree, child)?,
            None => entry.augmentation().has_unhandled(),
        };
        if found {
            return Ok(true);
        }
    }
    Ok(false)
}

#[test]
fn test_root_flags_follow_the_leaves() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let ids = insert_points(&db, random_points(150, 2, 9))?;
            let tree = DeLiCluTree::new(
                vectors(&db)?,
                Arc::new(EuclideanDistance),
                config(),
                ctx.logger().child("deliclu"),
            );
            tree.initialize()?;
            assert_eq!(tree.size(), 150);

            let root = tree.root_entry()?;
            assert_eq!(root.augmentation, DeLiCluFlags::new(false, true));

            for (i, id) in ids.iter().enumerate() {
                let path = tree.set_handled(*id)?;
                assert_eq!(path.len(), tree.height());
                if i % 10 == 0 || i == ids.len() - 1 {
                    let root = tree.root_entry()?;
                    assert!(root.augmentation.has_handled());
                    assert_eq!(
                        root.augmentation.has_unhandled(),
                        any_unhandled_leaf(&tree, root.page_id)?
                    );
                    tree.integrity_check()?;
                }
            }

            let root = tree.root_entry()?;
            assert_eq!(root.augmentation, DeLiCluFlags::new(true, false));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_deliclu_tree_follows_database_changes() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let ids = insert_points(&db, random_points(80, 2, 10))?;
            let tree = DeLiCluTree::new(
                vectors(&db)?,
                Arc::new(EuclideanDistance),
                config(),
                Logger::silent(),
            );
            tree.initialize()?;
            for id in &ids[..40] {
                tree.set_handled(*id)?;
            }

            // remove every unhandled object from the tree
            for id in &ids[40..] {
                assert!(tree.delete(*id)?);
            }
            tree.integrity_check()?;
            let root = tree.root_entry()?;
            assert_eq!(root.augmentation, DeLiCluFlags::new(true, false));

            let relation = vectors(&db)?;
            let function: Arc<dyn DistanceFunction<DoubleVector>> = Arc::new(EuclideanDistance);
            let distance_query = db.get_distance_query(&relation, Some(function), &[])?;
            let knn = tree
                .get_knn_query(&distance_query, &[QueryHint::OptimizedOnly])
                .expect("tree bound to Euclidean distance");
            let result = knn.knn_for_id(ids[0], 100)?;
            assert_eq!(result.len(), 40);
            assert!(result.iter().all(|p| ids[..40].contains(&p.id())));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_set_handled_on_foreign_id_is_corruption() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            insert_points(&db, random_points(5, 2, 11))?;
            let tree = DeLiCluTree::new(
                vectors(&db)?,
                Arc::new(EuclideanDistance),
                config(),
                Logger::silent(),
            );
            tree.initialize()?;
            let err = tree.set_handled(ObjectId::new(999)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::IndexCorrupted);

            // an object the database gained after the tree was built
            let late = insert_points(&db, vec![DoubleVector::from([0.5, 0.5])])?;
            let err = tree.set_handled(late[0]).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::IndexCorrupted);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_expansion_memo() {
    let db = proxima::database::DatabaseBuilder::new()
        .logger(Logger::silent())
        .open_hashmap()
        .unwrap();
    insert_points(&db, random_points(3, 2, 12)).unwrap();
    let tree = DeLiCluTree::new(
        vectors(&db).unwrap(),
        Arc::new(EuclideanDistance),
        config(),
        Logger::silent(),
    );
    tree.set_expanded(4, 9);
    tree.set_expanded(4, 2);
    assert_eq!(tree.get_expanded(4).into_iter().collect::<Vec<_>>(), vec![2, 9]);
    assert!(tree.get_expanded(9).is_empty());
}
