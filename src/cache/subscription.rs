use std::sync::{Arc, Weak};

use tracing::trace;

use crate::cache::token_store::{Observer, StoreInner};
use crate::observability::metrics::get_metrics;

/// Handle for one observer registered on a [`TokenStore`](crate::cache::token_store::TokenStore).
///
/// Releasing stops all further notifications. Dropping the handle releases it,
/// so keep it alive for as long as the observer should run.
#[must_use = "dropping a Subscription releases the observer immediately"]
pub struct Subscription {
    store: Weak<StoreInner>,
    observer: Arc<Observer>,
}

impl Subscription {
    pub(crate) fn new(store: Weak<StoreInner>, observer: Arc<Observer>) -> Self {
        Self { store, observer }
    }

    /// Removes the observer. Returns `false` when it was already released.
    pub fn release(&self) -> bool {
        if !self.observer.deactivate() {
            return false;
        }
        if let Some(store) = self.store.upgrade() {
            store.unregister(self.observer.id);
        }
        get_metrics().active_subscriptions.dec();
        trace!(observer_id = self.observer.id, "observer released");
        true
    }

    pub fn is_released(&self) -> bool {
        !self.observer.is_active()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("observer_id", &self.observer.id)
            .field("released", &self.is_released())
            .finish()
    }
}
