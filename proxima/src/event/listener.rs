use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::errors::ProximaResult;
use crate::event::{DataStoreEvent, ResultEvent};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle returned on registration, used to unregister a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Any closure `Fn(&DataStoreEvent) -> ProximaResult<()>` is a data store callback.
pub trait DataStoreCallback: Send + Sync + Fn(&DataStoreEvent) -> ProximaResult<()> {}

impl<F> DataStoreCallback for F where F: Send + Sync + Fn(&DataStoreEvent) -> ProximaResult<()> {}

/// Any closure `Fn(&ResultEvent) -> ProximaResult<()>` is a result callback.
pub trait ResultCallback: Send + Sync + Fn(&ResultEvent) -> ProximaResult<()> {}

impl<F> ResultCallback for F where F: Send + Sync + Fn(&ResultEvent) -> ProximaResult<()> {}

/// Listener for changes of the stored objects.
///
/// ```rust
/// use proxima::event::DataStoreListener;
///
/// let listener = DataStoreListener::new(|event| {
///     println!("{} objects changed", event.len());
///     Ok(())
/// });
/// ```
#[derive(Clone)]
pub struct DataStoreListener {
    on_event: Arc<dyn DataStoreCallback>,
}

impl DataStoreListener {
    pub fn new(on_event: impl DataStoreCallback + 'static) -> Self {
        DataStoreListener {
            on_event: Arc::new(on_event),
        }
    }

    pub(crate) fn notify(&self, event: &DataStoreEvent) -> ProximaResult<()> {
        (self.on_event)(event)
    }
}

impl Debug for DataStoreListener {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStoreListener").finish()
    }
}

/// Listener for relations and indexes being added to or removed from a database.
#[derive(Clone)]
pub struct ResultListener {
    on_event: Arc<dyn ResultCallback>,
}

impl ResultListener {
    pub fn new(on_event: impl ResultCallback + 'static) -> Self {
        ResultListener {
            on_event: Arc::new(on_event),
        }
    }

    pub(crate) fn notify(&self, event: &ResultEvent) -> ProximaResult<()> {
        (self.on_event)(event)
    }
}

impl Debug for ResultListener {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultListener").finish()
    }
}
