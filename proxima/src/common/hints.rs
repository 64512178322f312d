/// Hints passed to query construction.
///
/// Hints never change the answer of a query; they only influence which
/// implementation the dispatcher picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryHint {
    /// Never fall back to a linear scan; report "no query available" instead.
    OptimizedOnly,
    /// The caller will issue many queries; implementations may batch.
    Bulk,
    /// The largest k the caller is going to request.
    MaxK(usize),
}

/// Returns whether `hint` is present.
pub fn has_hint(hints: &[QueryHint], hint: QueryHint) -> bool {
    hints.contains(&hint)
}

/// Returns the largest `MaxK` hint, if any.
pub fn max_k_hint(hints: &[QueryHint]) -> Option<usize> {
    hints
        .iter()
        .filter_map(|hint| match hint {
            QueryHint::MaxK(k) => Some(*k),
            _ => None,
        })
        .max()
}
