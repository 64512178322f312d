use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::Logger;
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::event::{
    DataStoreEvent, DataStoreEventType, DataStoreListener, ListenerId, ResultEvent,
    ResultListener,
};
use crate::id::{ObjectId, ObjectIdSet};

/// Collects change notifications and dispatches them to listeners.
///
/// Without accumulation every change is delivered at once. Between
/// [`accumulate_data_store_events`](Self::accumulate_data_store_events) and
/// [`flush_data_store_events`](Self::flush_data_store_events) changes of the
/// same type are merged into one event; a change of another type delivers the
/// pending batch first.
///
/// Listeners run on the calling thread, outside of any lock, in registration
/// order. A failing listener does not stop the others; the first failure is
/// returned to the caller as an [`ErrorKind::EventError`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use proxima::common::Logger;
/// use proxima::event::{DataStoreEventType, DataStoreListener, DatabaseEventManager};
/// use proxima::id::ObjectId;
///
/// let manager = DatabaseEventManager::new(Logger::silent());
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// manager.add_data_store_listener(DataStoreListener::new(move |event| {
///     sink.lock().push(event.clone());
///     Ok(())
/// }));
///
/// manager.accumulate_data_store_events();
/// manager.fire_objects_inserted(&[ObjectId::new(1)]).unwrap();
/// manager.fire_objects_inserted(&[ObjectId::new(2)]).unwrap();
/// manager.flush_data_store_events().unwrap();
///
/// let events = seen.lock();
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].event_type(), DataStoreEventType::Insert);
/// assert_eq!(events[0].len(), 2);
/// ```
#[derive(Clone)]
pub struct DatabaseEventManager {
    inner: Arc<EventManagerInner>,
}

struct EventManagerInner {
    logger: Logger,
    data_store_listeners: Mutex<Vec<(ListenerId, DataStoreListener)>>,
    result_listeners: Mutex<Vec<(ListenerId, ResultListener)>>,
    pending: Mutex<PendingEvents>,
}

#[derive(Default)]
struct PendingEvents {
    accumulating: bool,
    current_type: Option<DataStoreEventType>,
    ids: ObjectIdSet,
}

impl PendingEvents {
    fn take(&mut self) -> Option<DataStoreEvent> {
        let event_type = self.current_type.take()?;
        if self.ids.is_empty() {
            return None;
        }
        Some(DataStoreEvent::new(event_type, std::mem::take(&mut self.ids)))
    }
}

impl DatabaseEventManager {
    pub fn new(logger: Logger) -> Self {
        DatabaseEventManager {
            inner: Arc::new(EventManagerInner {
                logger,
                data_store_listeners: Mutex::new(Vec::new()),
                result_listeners: Mutex::new(Vec::new()),
                pending: Mutex::new(PendingEvents::default()),
            }),
        }
    }

    pub fn add_data_store_listener(&self, listener: DataStoreListener) -> ListenerId {
        let id = ListenerId::next();
        self.inner.data_store_listeners.lock().push((id, listener));
        id
    }

    /// Returns whether a listener was registered under `id`.
    pub fn remove_data_store_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.data_store_listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn add_result_listener(&self, listener: ResultListener) -> ListenerId {
        let id = ListenerId::next();
        self.inner.result_listeners.lock().push((id, listener));
        id
    }

    pub fn remove_result_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.result_listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn data_store_listener_count(&self) -> usize {
        self.inner.data_store_listeners.lock().len()
    }

    /// Starts merging subsequent changes. Calling it again while already
    /// accumulating has no effect.
    pub fn accumulate_data_store_events(&self) {
        let mut pending = self.inner.pending.lock();
        if !pending.accumulating {
            pending.accumulating = true;
        }
    }

    pub fn is_accumulating(&self) -> bool {
        self.inner.pending.lock().accumulating
    }

    /// Delivers the pending batch, if any, and ends accumulation.
    pub fn flush_data_store_events(&self) -> ProximaResult<()> {
        let event = {
            let mut pending = self.inner.pending.lock();
            pending.accumulating = false;
            pending.take()
        };
        match event {
            Some(event) => self.dispatch(&event),
            None => Ok(()),
        }
    }

    pub fn fire_objects_inserted(&self, ids: &[ObjectId]) -> ProximaResult<()> {
        self.fire(DataStoreEventType::Insert, ids)
    }

    pub fn fire_objects_updated(&self, ids: &[ObjectId]) -> ProximaResult<()> {
        self.fire(DataStoreEventType::Update, ids)
    }

    pub fn fire_objects_removed(&self, ids: &[ObjectId]) -> ProximaResult<()> {
        self.fire(DataStoreEventType::Delete, ids)
    }

    /// Records a change of the given type.
    ///
    /// An empty id list is ignored.
    pub fn fire(&self, event_type: DataStoreEventType, ids: &[ObjectId]) -> ProximaResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut ready = Vec::with_capacity(2);
        {
            let mut pending = self.inner.pending.lock();
            if pending.accumulating {
                if pending.current_type.is_some_and(|t| t != event_type) {
                    if let Some(event) = pending.take() {
                        ready.push(event);
                    }
                }
                pending.current_type = Some(event_type);
                pending.ids.extend(ids.iter().copied());
            } else {
                ready.push(DataStoreEvent::new(event_type, ids.iter().copied().collect()));
            }
        }

        let mut first_error = None;
        for event in ready {
            if let Err(e) = self.dispatch(&event) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn fire_result_event(&self, event: ResultEvent) -> ProximaResult<()> {
        let listeners: Vec<ResultListener> = self
            .inner
            .result_listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        let mut first_error = None;
        for listener in listeners {
            if let Err(e) = listener.notify(&event) {
                self.inner
                    .logger
                    .error(format_args!("Result listener failed on {}: {}", event, e));
                first_error.get_or_insert(e);
            }
        }
        self.wrap_listener_error(first_error)
    }

    fn dispatch(&self, event: &DataStoreEvent) -> ProximaResult<()> {
        let listeners: Vec<DataStoreListener> = self
            .inner
            .data_store_listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        self.inner.logger.trace(format_args!(
            "Dispatching {} to {} listener(s)",
            event,
            listeners.len()
        ));
        let mut first_error = None;
        for listener in listeners {
            if let Err(e) = listener.notify(event) {
                self.inner
                    .logger
                    .error(format_args!("Data store listener failed on {}: {}", event, e));
                first_error.get_or_insert(e);
            }
        }
        self.wrap_listener_error(first_error)
    }

    fn wrap_listener_error(&self, error: Option<ProximaError>) -> ProximaResult<()> {
        match error {
            Some(cause) => Err(ProximaError::new_with_cause(
                "Event listener failed",
                ErrorKind::EventError,
                cause,
            )),
            None => Ok(()),
        }
    }
}
