//! A lifecycle scope that can be destroyed on demand.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::domain::ports::{Lifecycle, LifecycleObserver};

#[derive(Default)]
struct Observers {
    registered: Vec<Arc<dyn LifecycleObserver>>,
    destroyed: bool,
}

/// Owns a set of observers and notifies them once on [`destroy`](Self::destroy).
///
/// The destroyed flag lives under the same lock as the observer list, so an
/// observer is either taken by `destroy` or notified by `add_observer`.
/// Notifications run outside the lock.
#[derive(Default)]
pub struct LifecycleRegistry {
    observers: Mutex<Observers>,
}

impl LifecycleRegistry {
    /// Creates a live scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tears the scope down, notifying every registered observer.
    /// Subsequent calls are no-ops.
    pub fn destroy(&self) {
        let observers = {
            let mut state = self.observers.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            std::mem::take(&mut state.registered)
        };
        debug!(observers = observers.len(), "Lifecycle destroyed");
        for observer in observers {
            observer.on_destroy();
        }
    }

    /// Returns true once [`destroy`](Self::destroy) has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.observers.lock().destroyed
    }

    /// Number of observers currently registered.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.lock().registered.len()
    }
}

impl Lifecycle for LifecycleRegistry {
    fn add_observer(&self, observer: Arc<dyn LifecycleObserver>) {
        {
            let mut state = self.observers.lock();
            if !state.destroyed {
                state.registered.push(observer);
                return;
            }
        }
        observer.on_destroy();
    }

    fn remove_observer(&self, observer: &Arc<dyn LifecycleObserver>) {
        let target = Arc::as_ptr(observer).cast::<()>();
        self.observers
            .lock()
            .registered
            .retain(|o| Arc::as_ptr(o).cast::<()>() != target);
    }
}

impl std::fmt::Debug for LifecycleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleRegistry")
            .field("observers", &self.observer_count())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
