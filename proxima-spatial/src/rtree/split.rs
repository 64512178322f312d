//! Node split strategies.

use proxima::data::{HyperBoundingBox, SpatialComparable};

use crate::rtree::rtree_config::NodeSplitStrategy;
use crate::rtree::rtree_types::SpatialEntry;

/// Divides the entries of an overflowing node into two groups of at least
/// `min_entries` entries each.
pub(crate) fn split_entries<A>(
    strategy: NodeSplitStrategy,
    entries: Vec<SpatialEntry<A>>,
    min_entries: usize,
) -> (Vec<SpatialEntry<A>>, Vec<SpatialEntry<A>>) {
    let (order, first_size) = match strategy {
        NodeSplitStrategy::Topological => topological_split(&entries, min_entries),
        NodeSplitStrategy::CenterSort => center_split(&entries, min_entries),
    };

    let mut slots: Vec<Option<SpatialEntry<A>>> = entries.into_iter().map(Some).collect();
    let first = order[..first_size]
        .iter()
        .filter_map(|i| slots[*i].take())
        .collect();
    let second = order[first_size..]
        .iter()
        .filter_map(|i| slots[*i].take())
        .collect();
    (first, second)
}

fn dimensionality<A>(entries: &[SpatialEntry<A>]) -> usize {
    entries.first().map_or(0, |e| e.mbr().dimensionality())
}

/// Positions sorted by the lower, or upper, bound along `axis`.
fn sorted_along<A>(entries: &[SpatialEntry<A>], axis: usize, by_upper: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|a, b| {
        let (ma, mb) = (entries[*a].mbr(), entries[*b].mbr());
        let (pa, sa, pb, sb) = if by_upper {
            (ma.max(axis), ma.min(axis), mb.max(axis), mb.min(axis))
        } else {
            (ma.min(axis), ma.max(axis), mb.min(axis), mb.max(axis))
        };
        pa.total_cmp(&pb).then_with(|| sa.total_cmp(&sb))
    });
    order
}

/// Boxes of every prefix and every suffix of `order`.
fn prefix_suffix_boxes<A>(
    entries: &[SpatialEntry<A>],
    order: &[usize],
) -> (Vec<HyperBoundingBox>, Vec<HyperBoundingBox>) {
    let mut prefix: Vec<HyperBoundingBox> = Vec::with_capacity(order.len());
    for i in order {
        let next = match prefix.last() {
            Some(last) => last.union(entries[*i].mbr()),
            None => entries[*i].mbr().clone(),
        };
        prefix.push(next);
    }
    let mut suffix: Vec<HyperBoundingBox> = Vec::with_capacity(order.len());
    for i in order.iter().rev() {
        let next = match suffix.last() {
            Some(last) => last.union(entries[*i].mbr()),
            None => entries[*i].mbr().clone(),
        };
        suffix.push(next);
    }
    suffix.reverse();
    (prefix, suffix)
}

/// R*-style split: choose the axis with the smallest margin sum over all
/// distributions, then the distribution with the smallest overlap (ties:
/// smallest total area).
fn topological_split<A>(entries: &[SpatialEntry<A>], min_entries: usize) -> (Vec<usize>, usize) {
    let n = entries.len();
    let min_entries = min_entries.clamp(1, (n / 2).max(1));
    let distributions = min_entries..=(n - min_entries);

    let mut best_axis = 0;
    let mut best_margin = f64::INFINITY;
    for axis in 0..dimensionality(entries) {
        let mut margin = 0.0;
        for by_upper in [false, true] {
            let order = sorted_along(entries, axis, by_upper);
            let (prefix, suffix) = prefix_suffix_boxes(entries, &order);
            for k in distributions.clone() {
                margin += prefix[k - 1].margin() + suffix[k].margin();
            }
        }
        if margin < best_margin {
            best_margin = margin;
            best_axis = axis;
        }
    }

    let mut best: Option<(f64, f64, Vec<usize>, usize)> = None;
    for by_upper in [false, true] {
        let order = sorted_along(entries, best_axis, by_upper);
        let (prefix, suffix) = prefix_suffix_boxes(entries, &order);
        for k in distributions.clone() {
            let overlap = prefix[k - 1].overlap(&suffix[k]);
            let area = prefix[k - 1].volume() + suffix[k].volume();
            let better = match &best {
                None => true,
                Some((o, a, _, _)) => overlap < *o || (overlap == *o && area < *a),
            };
            if better {
                best = Some((overlap, area, order.clone(), k));
            }
        }
    }
    match best {
        Some((_, _, order, k)) => (order, k),
        None => ((0..n).collect(), n / 2),
    }
}

/// Sorts by entry centers along the axis where they spread the most and
/// cuts in the middle.
fn center_split<A>(entries: &[SpatialEntry<A>], min_entries: usize) -> (Vec<usize>, usize) {
    let n = entries.len();
    let mut best_axis = 0;
    let mut best_spread = f64::NEG_INFINITY;
    for axis in 0..dimensionality(entries) {
        let (lo, hi) = entries
            .iter()
            .map(|e| e.mbr().center(axis))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                (lo.min(c), hi.max(c))
            });
        if hi - lo > best_spread {
            best_spread = hi - lo;
            best_axis = axis;
        }
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| {
        entries[*a]
            .mbr()
            .center(best_axis)
            .total_cmp(&entries[*b].mbr().center(best_axis))
    });
    let first_size = (n / 2).max(min_entries.min(n));
    (order, first_size)
}
