//! ListenerSet - panic-isolated fan-out to external subscribers

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use crate::ContractError;

/// External subscriber callback
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Ordered set of subscribers for one kind of event
///
/// Delivery iterates a snapshot, so a listener may subscribe further
/// listeners without deadlocking. A listener that panics does not prevent
/// delivery to the rest; its failure is handed back to the raiser.
pub struct ListenerSet<E> {
    listeners: RwLock<Vec<Listener<E>>>,
}

impl<E> ListenerSet<E> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Add a subscriber
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.push(Arc::new(listener));
    }

    /// Add an already shared subscriber
    pub fn push(&self, listener: Listener<E>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every subscriber
    pub fn clear(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Deliver `event` to every subscriber
    ///
    /// Returns one `ListenerFailure` per subscriber that panicked.
    pub fn notify(&self, event: &E, event_name: &str) -> Vec<ContractError> {
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut failures = Vec::new();
        for listener in snapshot {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener(event))) {
                failures.push(ContractError::ListenerFailure {
                    event: event_name.to_string(),
                    message: panic_message(payload.as_ref()),
                });
            }
        }
        failures
    }
}

impl<E> Default for ListenerSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for ListenerSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_panicking_listener_is_isolated() {
        let set: ListenerSet<u32> = ListenerSet::new();
        let delivered = Arc::new(AtomicUsize::new(0));

        set.subscribe(|_| panic!("listener exploded"));
        let counter = delivered.clone();
        set.subscribe(move |value| {
            counter.fetch_add(*value as usize, Ordering::SeqCst);
        });

        let failures = set.notify(&5, "Tick");

        assert_eq!(delivered.load(Ordering::SeqCst), 5);
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].to_string(),
            "exception in consumer handler for Tick notification: listener exploded"
        );
    }

    #[test]
    fn test_listener_may_subscribe_during_delivery() {
        let set: Arc<ListenerSet<()>> = Arc::new(ListenerSet::new());
        let inner = set.clone();
        set.subscribe(move |_| inner.subscribe(|_| {}));

        assert!(set.notify(&(), "Nested").is_empty());
        assert_eq!(set.len(), 2);
    }
}
