//! Entry orderings and packing for bulk loads.

use proxima::data::SpatialComparable;

use crate::hilbert::{bits_per_dimension, hilbert_key_bounded};
use crate::rtree::rtree_config::BulkSplitStrategy;
use crate::rtree::rtree_types::SpatialEntry;

/// Reorders `entries` so that consecutive runs of `capacity` entries form
/// compact nodes.
pub(crate) fn order_entries<A>(
    strategy: BulkSplitStrategy,
    entries: &mut Vec<SpatialEntry<A>>,
    capacity: usize,
) {
    match strategy {
        BulkSplitStrategy::FileOrder => {}
        BulkSplitStrategy::OneDimSort => sort_by_center(entries, 0),
        BulkSplitStrategy::SortTileRecursive => {
            let dims = dimensionality(entries);
            let taken = std::mem::take(entries);
            *entries = sort_tile_recursive(taken, 0, dims, capacity);
        }
        BulkSplitStrategy::HilbertSort => hilbert_sort(entries),
    }
}

/// Sizes of `ceil(n / capacity)` groups holding `n` entries as evenly as
/// possible.
pub(crate) fn group_sizes(n: usize, capacity: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let groups = n.div_ceil(capacity.max(1));
    let base = n / groups;
    let extra = n % groups;
    (0..groups)
        .map(|g| if g < extra { base + 1 } else { base })
        .collect()
}

fn dimensionality<A>(entries: &[SpatialEntry<A>]) -> usize {
    entries.first().map_or(0, |e| e.mbr().dimensionality())
}

fn sort_by_center<A>(entries: &mut [SpatialEntry<A>], axis: usize) {
    if axis >= dimensionality(entries) {
        return;
    }
    entries.sort_by(|a, b| a.mbr().center(axis).total_cmp(&b.mbr().center(axis)));
}

/// Sort-Tile-Recursive: sorts along `axis`, cuts into slabs that each hold
/// a whole number of nodes and recurses into the next axis per slab.
fn sort_tile_recursive<A>(
    mut entries: Vec<SpatialEntry<A>>,
    axis: usize,
    dims: usize,
    capacity: usize,
) -> Vec<SpatialEntry<A>> {
    sort_by_center(&mut entries, axis);
    let n = entries.len();
    if axis + 1 >= dims || n <= capacity {
        return entries;
    }
    let nodes = n.div_ceil(capacity) as f64;
    let remaining_axes = (dims - axis) as f64;
    let slabs = nodes.powf(1.0 / remaining_axes).ceil().max(1.0) as usize;
    let slab_size = capacity * (nodes as usize).div_ceil(slabs);

    let mut result = Vec::with_capacity(n);
    let mut rest = entries;
    while !rest.is_empty() {
        let tail = rest.split_off(slab_size.min(rest.len()));
        result.extend(sort_tile_recursive(rest, axis + 1, dims, capacity));
        rest = tail;
    }
    result
}

fn hilbert_sort<A>(entries: &mut Vec<SpatialEntry<A>>) {
    let dims = dimensionality(entries);
    if dims == 0 || entries.len() < 2 {
        return;
    }
    let mut lo = vec![f64::INFINITY; dims];
    let mut hi = vec![f64::NEG_INFINITY; dims];
    for entry in entries.iter() {
        for d in 0..dims {
            let c = entry.mbr().center(d);
            lo[d] = lo[d].min(c);
            hi[d] = hi[d].max(c);
        }
    }
    let bits = bits_per_dimension(dims);
    let taken = std::mem::take(entries);
    let mut keyed: Vec<(u128, SpatialEntry<A>)> = taken
        .into_iter()
        .map(|entry| {
            let center: Vec<f64> = (0..dims).map(|d| entry.mbr().center(d)).collect();
            (hilbert_key_bounded(&center, &lo, &hi, bits), entry)
        })
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    entries.extend(keyed.into_iter().map(|(_, entry)| entry));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtree::rtree_types::EntryTarget;
    use proxima::data::HyperBoundingBox;
    use proxima::id::ObjectId;

    fn grid(side: usize) -> Vec<SpatialEntry<()>> {
        let mut entries = Vec::new();
        let mut id = 1;
        for x in 0..side {
            for y in 0..side {
                let p = [(side - 1 - x) as f64, y as f64];
                entries.push(SpatialEntry::new(
                    HyperBoundingBox::new(&p, &p).unwrap(),
                    EntryTarget::Object(ObjectId::new(id)),
                    (),
                ));
                id += 1;
            }
        }
        entries
    }

    fn total_area(entries: &[SpatialEntry<()>], capacity: usize) -> f64 {
        let mut offset = 0;
        let mut area = 0.0;
        for size in group_sizes(entries.len(), capacity) {
            let group = &entries[offset..offset + size];
            area += HyperBoundingBox::union_of(group.iter().map(|e| e.mbr()))
                .unwrap()
                .volume();
            offset += size;
        }
        area
    }

    #[test]
    fn test_group_sizes_are_balanced() {
        assert_eq!(group_sizes(0, 4), Vec::<usize>::new());
        assert_eq!(group_sizes(3, 4), vec![3]);
        assert_eq!(group_sizes(9, 4), vec![3, 3, 3]);
        assert_eq!(group_sizes(10, 4), vec![4, 3, 3]);
        assert_eq!(group_sizes(100, 10).len(), 10);
    }

    #[test]
    fn test_file_order_keeps_input() {
        let mut entries = grid(3);
        let before: Vec<_> = entries.iter().map(|e| e.object_id()).collect();
        order_entries(BulkSplitStrategy::FileOrder, &mut entries, 4);
        let after: Vec<_> = entries.iter().map(|e| e.object_id()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_one_dim_sort_orders_first_axis() {
        let mut entries = grid(4);
        order_entries(BulkSplitStrategy::OneDimSort, &mut entries, 4);
        let xs: Vec<f64> = entries.iter().map(|e| e.mbr().min(0)).collect();
        assert!(xs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_tiling_strategies_keep_entries_and_pack_tightly() {
        for strategy in [BulkSplitStrategy::SortTileRecursive, BulkSplitStrategy::HilbertSort] {
            let mut entries = grid(8);
            order_entries(strategy, &mut entries, 4);
            assert_eq!(entries.len(), 64);
            let mut ids: Vec<u64> = entries
                .iter()
                .filter_map(|e| e.object_id())
                .map(|id| id.value())
                .collect();
            ids.sort();
            assert_eq!(ids, (1..=64).collect::<Vec<_>>());
            // 16 nodes of 2x2 points each have area 1
            assert!(total_area(&entries, 4) <= 16.0 + 1e-9, "{:?}", strategy);
        }
    }
}
