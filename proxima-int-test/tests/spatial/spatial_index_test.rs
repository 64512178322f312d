use proxima::common::Logger;
use proxima::data::DoubleVector;
use proxima::distance::{DistanceFunction, EuclideanDistance};
use proxima::errors::{ErrorKind, ProximaError};
use proxima::id::ObjectId;
use proxima::query::DistanceResultPair;
use proxima_int_test::test_util::random_points;
use proxima_spatial::rtree::{BulkSplitStrategy, RTree, RTreeConfig, SpatialError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

fn small_tree() -> RTree<()> {
    RTree::new(
        RTreeConfig::builder()
            .capacities(5, 4)
            .integrity_checks(true)
            .build()
            .unwrap(),
        Logger::silent(),
    )
}

/// Exhaustive kNN over the points still present.
fn brute_force_knn(
    points: &BTreeMap<ObjectId, DoubleVector>,
    query: &DoubleVector,
    k: usize,
) -> Vec<DistanceResultPair> {
    let mut all: Vec<DistanceResultPair> = points
        .iter()
        .map(|(id, p)| DistanceResultPair::new(EuclideanDistance.distance(query, p), *id))
        .collect();
    all.sort();
    all.truncate(k);
    all
}

fn tree_knn(
    tree: &RTree<()>,
    points: &BTreeMap<ObjectId, DoubleVector>,
    query: &DoubleVector,
    k: usize,
) -> Vec<DistanceResultPair> {
    tree.knn(query, k, &EuclideanDistance, |id| {
        points
            .get(&id)
            .map(|p| EuclideanDistance.distance(query, p))
            .ok_or_else(|| ProximaError::new("stale entry", ErrorKind::IndexCorrupted))
    })
    .unwrap()
}

#[test]
fn test_empty_tree_answers_nothing() {
    let tree = small_tree();
    let points = BTreeMap::new();
    let query = DoubleVector::from([0.5, 0.5]);
    assert!(tree_knn(&tree, &points, &query, 3).is_empty());
    let range = tree
        .range(&query, 10.0, &EuclideanDistance, |_| Ok(0.0))
        .unwrap();
    assert!(range.is_empty());
    let root = tree.root_entry().unwrap();
    assert!(root.mbr.is_none());
    tree.integrity_check().unwrap();
}

#[test]
fn test_random_insert_delete_sequences_stay_consistent() {
    let tree = small_tree();
    let mut rng = StdRng::seed_from_u64(17);
    let mut live: BTreeMap<ObjectId, DoubleVector> = BTreeMap::new();
    let pool = random_points(600, 2, 18);

    for round in 0..6 {
        // insert a batch
        for (i, point) in pool.iter().enumerate().skip(round * 100).take(100) {
            let id = ObjectId::new(i as u64 + 1);
            tree.insert(id, point).unwrap();
            live.insert(id, point.clone());
        }
        // remove a random third of what is there
        let mut ids: Vec<ObjectId> = live.keys().copied().collect();
        ids.shuffle(&mut rng);
        for id in ids.iter().take(ids.len() / 3) {
            let point = live.remove(id).unwrap();
            assert!(tree.delete(*id, &point).unwrap());
        }

        tree.integrity_check().unwrap();
        assert_eq!(tree.len(), live.len());
        for query in pool.iter().step_by(61) {
            assert_eq!(tree_knn(&tree, &live, query, 7), brute_force_knn(&live, query, 7));
        }
    }

    // drain completely
    for (id, point) in std::mem::take(&mut live) {
        assert!(tree.delete(id, &point).unwrap());
    }
    assert!(tree.is_empty());
    assert_eq!(tree.height(), 1);
    tree.integrity_check().unwrap();
}

#[test]
fn test_deleting_unknown_point_is_a_no_op() {
    let tree = small_tree();
    tree.insert(ObjectId::new(1), &DoubleVector::from([0.0, 0.0]))
        .unwrap();
    assert!(!tree
        .delete(ObjectId::new(2), &DoubleVector::from([0.0, 0.0]))
        .unwrap());
    assert!(!tree
        .delete(ObjectId::new(1), &DoubleVector::from([3.0, 3.0]))
        .unwrap());
    assert_eq!(tree.len(), 1);

    // same contract once the tree has directory levels
    let points = random_points(50, 2, 21);
    let tree = small_tree();
    for (i, point) in points.iter().enumerate() {
        tree.insert(ObjectId::new(i as u64 + 1), point).unwrap();
    }
    assert!(tree.height() > 1);
    assert!(!tree
        .delete(ObjectId::new(1), &DoubleVector::from([300.0, 3.0]))
        .unwrap());
    assert_eq!(tree.len(), 50);
    tree.integrity_check().unwrap();
    assert!(tree.delete(ObjectId::new(1), &points[0]).unwrap());
    assert_eq!(tree.len(), 49);
    tree.integrity_check().unwrap();
}

#[test]
fn test_tree_rejects_misuse() {
    let tree = small_tree();
    tree.insert(ObjectId::new(1), &DoubleVector::from([0.0, 0.0]))
        .unwrap();

    let err = tree
        .insert(ObjectId::new(1), &DoubleVector::from([1.0, 1.0]))
        .unwrap_err();
    assert!(matches!(err, SpatialError::DuplicateId(_)));

    let err = tree
        .insert(ObjectId::new(2), &DoubleVector::from([1.0, 1.0, 1.0]))
        .unwrap_err();
    assert!(matches!(
        err,
        SpatialError::DimensionalityMismatch {
            expected: 2,
            actual: 3
        }
    ));

    let err: ProximaError = tree
        .bulk_load(vec![(ObjectId::new(5), DoubleVector::from([2.0, 2.0]))])
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_bulk_load_then_update() {
    let points = random_points(1000, 2, 4);
    let tree = RTree::<()>::new(
        RTreeConfig::builder()
            .capacities(10, 10)
            .bulk_strategy(BulkSplitStrategy::SortTileRecursive)
            .build()
            .unwrap(),
        Logger::silent(),
    );
    let mut live: BTreeMap<ObjectId, DoubleVector> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (ObjectId::new(i as u64 + 1), p.clone()))
        .collect();
    tree.bulk_load(live.iter().map(|(id, p)| (*id, p.clone())).collect())
        .unwrap();
    tree.integrity_check().unwrap();
    assert_eq!(tree.len(), 1000);
    // 1000 points in nodes of 10: 100 leaves, 10 directories, one root
    assert_eq!(tree.height(), 3);

    let stats = tree.stats();
    assert_eq!(stats.entries, 1000);
    assert_eq!(stats.leaf_nodes, 100);
    assert_eq!(stats.directory_nodes, 11);

    for id in (1..=1000).step_by(3).map(ObjectId::new) {
        let point = live.remove(&id).unwrap();
        assert!(tree.delete(id, &point).unwrap());
    }
    let extra = DoubleVector::from([0.5, 0.5]);
    tree.insert(ObjectId::new(5000), &extra).unwrap();
    live.insert(ObjectId::new(5000), extra.clone());
    tree.integrity_check().unwrap();
    assert_eq!(tree_knn(&tree, &live, &extra, 12), brute_force_knn(&live, &extra, 12));
}
