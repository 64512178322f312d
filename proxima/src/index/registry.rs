use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::index::{Index, IndexCapability, KnnIndex, RangeIndex, RknnIndex};

static NEXT_INDEX_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a registered index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexId(u64);

impl IndexId {
    fn next() -> Self {
        IndexId(NEXT_INDEX_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// An index together with the query kinds it declares to accelerate.
///
/// The dispatcher only asks an index for queries of a kind it was registered
/// with, so an index never needs to be inspected for its concrete type.
///
/// ```rust,ignore
/// let tree = Arc::new(tree);
/// let registration = IndexRegistration::new(tree.clone())
///     .with_knn(tree.clone())
///     .with_range(tree);
/// ```
pub struct IndexRegistration<O> {
    id: IndexId,
    index: Arc<dyn Index<O>>,
    knn: Option<Arc<dyn KnnIndex<O>>>,
    range: Option<Arc<dyn RangeIndex<O>>>,
    rknn: Option<Arc<dyn RknnIndex<O>>>,
}

impl<O> Clone for IndexRegistration<O> {
    fn clone(&self) -> Self {
        IndexRegistration {
            id: self.id,
            index: self.index.clone(),
            knn: self.knn.clone(),
            range: self.range.clone(),
            rknn: self.rknn.clone(),
        }
    }
}

impl<O> IndexRegistration<O> {
    pub fn new(index: Arc<dyn Index<O>>) -> Self {
        IndexRegistration {
            id: IndexId::next(),
            index,
            knn: None,
            range: None,
            rknn: None,
        }
    }

    pub fn with_knn(mut self, knn: Arc<dyn KnnIndex<O>>) -> Self {
        self.knn = Some(knn);
        self
    }

    pub fn with_range(mut self, range: Arc<dyn RangeIndex<O>>) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_rknn(mut self, rknn: Arc<dyn RknnIndex<O>>) -> Self {
        self.rknn = Some(rknn);
        self
    }

    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn index(&self) -> &Arc<dyn Index<O>> {
        &self.index
    }

    pub fn knn(&self) -> Option<&Arc<dyn KnnIndex<O>>> {
        self.knn.as_ref()
    }

    pub fn range(&self) -> Option<&Arc<dyn RangeIndex<O>>> {
        self.range.as_ref()
    }

    pub fn rknn(&self) -> Option<&Arc<dyn RknnIndex<O>>> {
        self.rknn.as_ref()
    }

    pub fn has_capability(&self, capability: IndexCapability) -> bool {
        match capability {
            IndexCapability::Knn => self.knn.is_some(),
            IndexCapability::Range => self.range.is_some(),
            IndexCapability::Rknn => self.rknn.is_some(),
        }
    }

    pub fn capabilities(&self) -> SmallVec<[IndexCapability; 3]> {
        [IndexCapability::Knn, IndexCapability::Range, IndexCapability::Rknn]
            .into_iter()
            .filter(|c| self.has_capability(*c))
            .collect()
    }
}

/// Indexes registered for one relation, in registration order.
pub struct IndexRegistry<O> {
    registrations: Arc<RwLock<Vec<IndexRegistration<O>>>>,
}

impl<O> Clone for IndexRegistry<O> {
    fn clone(&self) -> Self {
        IndexRegistry {
            registrations: self.registrations.clone(),
        }
    }
}

impl<O> Default for IndexRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> IndexRegistry<O> {
    pub fn new() -> Self {
        IndexRegistry {
            registrations: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn register(&self, registration: IndexRegistration<O>) -> IndexId {
        let id = registration.id();
        self.registrations.write().push(registration);
        id
    }

    pub fn remove(&self, id: IndexId) -> Option<IndexRegistration<O>> {
        let mut registrations = self.registrations.write();
        let position = registrations.iter().position(|r| r.id() == id)?;
        Some(registrations.remove(position))
    }

    pub fn len(&self) -> usize {
        self.registrations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.read().is_empty()
    }

    /// Copy of the registrations in registration order.
    pub fn snapshot(&self) -> Vec<IndexRegistration<O>> {
        self.registrations.read().clone()
    }

    /// All indexes in registration order.
    pub fn indexes(&self) -> Vec<Arc<dyn Index<O>>> {
        self.registrations
            .read()
            .iter()
            .map(|r| r.index().clone())
            .collect()
    }

    /// kNN accelerators, most recently registered first.
    pub fn knn_indexes(&self) -> Vec<Arc<dyn KnnIndex<O>>> {
        self.registrations
            .read()
            .iter()
            .rev()
            .filter_map(|r| r.knn().cloned())
            .collect()
    }

    /// Range accelerators, most recently registered first.
    pub fn range_indexes(&self) -> Vec<Arc<dyn RangeIndex<O>>> {
        self.registrations
            .read()
            .iter()
            .rev()
            .filter_map(|r| r.range().cloned())
            .collect()
    }

    /// RkNN accelerators, most recently registered first.
    pub fn rknn_indexes(&self) -> Vec<Arc<dyn RknnIndex<O>>> {
        self.registrations
            .read()
            .iter()
            .rev()
            .filter_map(|r| r.rknn().cloned())
            .collect()
    }
}
