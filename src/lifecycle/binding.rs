use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::cache::subscription::Subscription;
use crate::cache::token_store::TokenStore;
use crate::errors::BindingError;
use crate::utils::constants::UNAUTHENTICATED;

/// Token field owned by a consuming context, kept in sync while its binding is active.
#[derive(Debug, Clone)]
pub struct TokenMirror {
    inner: Arc<RwLock<String>>,
}

impl Default for TokenMirror {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(UNAUTHENTICATED.to_owned())),
        }
    }
}

impl TokenMirror {
    pub fn get(&self) -> String {
        self.inner.read().clone()
    }

    fn set(&self, token: &str) {
        *self.inner.write() = token.to_owned();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Inactive,
    Active,
}

/// Connects a [`TokenStore`] to a [`TokenMirror`] for the lifetime of a consuming context.
///
/// Every activation creates its own subscription and every deactivation
/// releases it. Dropping an active binding deactivates it.
#[derive(Debug)]
pub struct LifecycleBinding {
    store: TokenStore,
    mirror: TokenMirror,
    subscription: Option<Subscription>,
}

impl LifecycleBinding {
    pub fn new(store: TokenStore, mirror: TokenMirror) -> Self {
        Self {
            store,
            mirror,
            subscription: None,
        }
    }

    pub fn mirror(&self) -> &TokenMirror {
        &self.mirror
    }

    pub fn state(&self) -> BindingState {
        match self.subscription {
            Some(_) => BindingState::Active,
            None => BindingState::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == BindingState::Active
    }

    /// Subscribes the mirror to the store. Fails if already active.
    pub fn activate(&mut self) -> Result<(), BindingError> {
        if self.subscription.is_some() {
            return Err(BindingError::AlreadyActive);
        }
        let mirror = self.mirror.clone();
        self.subscription = Some(self.store.subscribe(move |token: &str| mirror.set(token)));
        info!("lifecycle binding activated");
        Ok(())
    }

    /// Releases the subscription; does nothing when inactive.
    pub fn deactivate(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.release();
            info!("lifecycle binding deactivated");
        }
    }

    /// Runs `body` with the binding active and deactivates on every exit path,
    /// including errors, panics and the returned future being dropped.
    pub async fn run_scoped<F, Fut, T>(&mut self, body: F) -> anyhow::Result<T>
    where
        F: FnOnce(TokenMirror) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.activate()?;
        let mirror = self.mirror.clone();
        let scope = ActiveScope(self);
        let result = body(mirror).await;
        drop(scope);
        debug!(ok = result.is_ok(), "scoped binding finished");
        result
    }
}

impl Drop for LifecycleBinding {
    fn drop(&mut self) {
        self.deactivate();
    }
}

struct ActiveScope<'a>(&'a mut LifecycleBinding);

impl Drop for ActiveScope<'_> {
    fn drop(&mut self) {
        self.0.deactivate();
    }
}
