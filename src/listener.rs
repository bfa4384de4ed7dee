//! Change listeners.

use crate::change::StatChange;
use crate::error::StatError;
use parking_lot::RwLock;
use std::sync::Arc;

/// Receives every change on every entity of a
/// [`StatService`](crate::service::StatService).
///
/// Listeners run synchronously, with no container locked, on the thread
/// that is delivering that container's queued changes. That is usually the
/// mutating thread; a mutation made while another call is already
/// delivering for the same container is queued and delivered by that call,
/// in order. Listeners may read or mutate any container, including the one
/// that changed. An `Err` stops delivery, discards the container's queued
/// changes and is returned from the delivering call unchanged.
pub trait StatChangeListener: Send + Sync {
    fn on_stat_changed(&self, change: &StatChange) -> Result<(), StatError>;
}

impl<F> StatChangeListener for F
where
    F: Fn(&StatChange) -> Result<(), StatError> + Send + Sync,
{
    fn on_stat_changed(&self, change: &StatChange) -> Result<(), StatError> {
        self(change)
    }
}

/// Whether two handles point at the same allocation.
pub(crate) fn same_handle<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Ordered listener set with snapshot-on-iterate semantics.
///
/// Dispatch works on a copy of the list taken when the change arrives, so
/// listeners added or removed during a dispatch only affect later ones.
#[derive(Default)]
pub(crate) struct ListenerList {
    listeners: RwLock<Vec<Arc<dyn StatChangeListener>>>,
}

impl ListenerList {
    /// Append `listener`; returns `false` if it was already registered.
    pub(crate) fn add(&self, listener: Arc<dyn StatChangeListener>) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| same_handle(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    pub(crate) fn remove(&self, listener: &Arc<dyn StatChangeListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !same_handle(l, listener));
        listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn StatChangeListener>> {
        self.listeners.read().clone()
    }

    /// Deliver `change` to every listener in registration order.
    pub(crate) fn dispatch(&self, change: &StatChange) -> Result<(), StatError> {
        for listener in self.snapshot() {
            listener.on_stat_changed(change)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::StatValueChange;
    use crate::entity::EntityKey;
    use crate::stat_id::StatId;
    use parking_lot::Mutex;

    fn sample_change() -> StatChange {
        StatValueChange::new(StatId::new("armor").unwrap(), 0.0, 1.0).attach(EntityKey::random())
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let list = ListenerList::default();
        let listener: Arc<dyn StatChangeListener> =
            Arc::new(|_: &StatChange| -> Result<(), StatError> { Ok(()) });
        assert!(list.add(listener.clone()));
        assert!(!list.add(listener.clone()));
        assert_eq!(list.len(), 1);
        assert!(list.remove(&listener));
        assert!(!list.remove(&listener));
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let list = ListenerList::default();
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            list.add(Arc::new(move |_: &StatChange| -> Result<(), StatError> {
                order.lock().push(tag);
                Ok(())
            }));
        }
        list.dispatch(&sample_change()).unwrap();
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_dispatch_stops_at_first_error() {
        let calls = Arc::new(Mutex::new(0));
        let list = ListenerList::default();
        list.add(Arc::new(|_: &StatChange| -> Result<(), StatError> {
            Err(StatError::Listener("rejected".into()))
        }));
        let counter = calls.clone();
        list.add(Arc::new(move |_: &StatChange| -> Result<(), StatError> {
            *counter.lock() += 1;
            Ok(())
        }));

        let err = list.dispatch(&sample_change()).unwrap_err();
        assert_eq!(err, StatError::Listener("rejected".into()));
        assert_eq!(*calls.lock(), 0);
    }
}
