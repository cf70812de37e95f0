//! Port for binding requests to an external lifetime.

use std::sync::Arc;

/// Notified when the owning scope is torn down.
pub trait LifecycleObserver: Send + Sync {
    /// The scope was destroyed.
    fn on_destroy(&self);
}

/// An external scope whose teardown cancels attached requests.
pub trait Lifecycle: Send + Sync {
    /// Registers an observer. If the scope is already destroyed the observer
    /// is notified immediately.
    fn add_observer(&self, observer: Arc<dyn LifecycleObserver>);

    /// Unregisters an observer previously added.
    fn remove_observer(&self, observer: &Arc<dyn LifecycleObserver>);
}
