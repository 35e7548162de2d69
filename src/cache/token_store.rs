use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::{debug, trace, warn};

use crate::cache::subscription::Subscription;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::UNAUTHENTICATED;

pub(crate) type TokenCallback = Box<dyn Fn(&str) + Send + Sync>;

/// One registered observer.
pub(crate) struct Observer {
    pub(crate) id: u64,
    active: AtomicBool,
    callback: TokenCallback,
}

impl Observer {
    /// Returns true only for the call that actually deactivated the observer.
    pub(crate) fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

#[derive(Default)]
struct DispatchState {
    running: bool,
    queue: VecDeque<String>,
}

pub(crate) struct StoreInner {
    /// Scalar read by request decorators; written once a notification round is over.
    current: RwLock<String>,
    /// Latest broadcast value, handed to new observers.
    latest: RwLock<String>,
    observers: Mutex<Vec<Arc<Observer>>>,
    next_id: AtomicU64,
    dispatch: ReentrantMutex<RefCell<DispatchState>>,
}

impl StoreInner {
    pub(crate) fn unregister(&self, id: u64) {
        self.observers.lock().retain(|observer| observer.id != id);
    }
}

/// Holds the current bearer token and broadcasts every change to its observers.
///
/// `TokenStore` is a handle: clones share the same state, so one instance
/// constructed by the container is handed to every consumer.
///
/// Notification is synchronous and ordered by registration. A `push` issued
/// from inside an observer callback is queued and delivered once the in-flight
/// round completes, so every observer sees tokens in push order.
///
/// A panicking callback does not cut a round short: the remaining observers
/// are still notified and queued pushes are still delivered, then the first
/// panic is resumed on the pushing thread.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<StoreInner>,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("authenticated", &self.is_authenticated())
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl TokenStore {
    /// Creates an unauthenticated store seeded with an empty token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                current: RwLock::new(UNAUTHENTICATED.to_owned()),
                latest: RwLock::new(UNAUTHENTICATED.to_owned()),
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                dispatch: ReentrantMutex::new(RefCell::new(DispatchState::default())),
            }),
        }
    }

    /// Replaces the token and notifies every active observer, identical values included.
    pub fn push(&self, token: impl Into<String>) {
        let token = token.into();
        self.dispatch(move || {
            self.inner.dispatch.lock().borrow_mut().queue.push_back(token);
        });
    }

    /// Registers `on_token`, invoking it immediately with the latest token and
    /// then on every later `push` until the returned handle is released.
    pub fn subscribe<F>(&self, on_token: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let observer = Arc::new(Observer {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            active: AtomicBool::new(true),
            callback: Box::new(on_token),
        });

        // dropped on unwind, releasing the observer if the first callback panics
        let subscription = Subscription::new(Arc::downgrade(&self.inner), observer.clone());
        self.dispatch(|| {
            self.inner.observers.lock().push(observer.clone());
            get_metrics().active_subscriptions.inc();
            trace!(observer_id = observer.id, "observer registered");
            let latest = self.inner.latest.read().clone();
            (observer.callback)(&latest);
        });

        subscription
    }

    /// Last pushed token, or an empty string when nobody has signed in.
    pub fn current_value(&self) -> String {
        self.inner.current.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        !self.inner.current.read().is_empty()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }

    /// Runs `action` while holding the dispatch lock, then drains queued pushes.
    ///
    /// Nested calls from the same thread only run `action`; the outermost call
    /// delivers whatever they queued.
    fn dispatch<R>(&self, action: impl FnOnce() -> R) -> R {
        let guard = self.inner.dispatch.lock();
        if guard.borrow().running {
            return action();
        }
        guard.borrow_mut().running = true;
        let _reset = ResetOnExit(&*guard);

        let outcome = panic::catch_unwind(AssertUnwindSafe(action));
        let mut first_panic = None;
        loop {
            let next = guard.borrow_mut().queue.pop_front();
            let Some(token) = next else { break };
            if let Err(payload) = self.deliver(&token) {
                first_panic.get_or_insert(payload);
            }
        }

        match (outcome, first_panic) {
            (Ok(result), None) => result,
            (Err(payload), _) | (Ok(_), Some(payload)) => panic::resume_unwind(payload),
        }
    }

    /// Notifies every active observer of `token`, then commits it as the current value.
    ///
    /// Returns the payload of the first callback that panicked, if any.
    fn deliver(&self, token: &str) -> Result<(), Box<dyn Any + Send>> {
        *self.inner.latest.write() = token.to_owned();

        // observers registered during this round only get their subscribe-time value
        let snapshot: Vec<Arc<Observer>> = self.inner.observers.lock().clone();
        debug!(observers = snapshot.len(), "broadcasting token");
        let mut first_panic = None;
        for observer in snapshot.iter().filter(|observer| observer.is_active()) {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| (observer.callback)(token)));
            if let Err(payload) = delivered {
                warn!(observer_id = observer.id, "observer panicked while receiving token");
                first_panic.get_or_insert(payload);
            }
        }

        *self.inner.current.write() = token.to_owned();
        get_metrics().token_pushes.inc();
        first_panic.map_or(Ok(()), Err)
    }
}

struct ResetOnExit<'a>(&'a RefCell<DispatchState>);

impl Drop for ResetOnExit<'_> {
    fn drop(&mut self) {
        let mut state = self.0.borrow_mut();
        state.running = false;
        state.queue.clear();
    }
}
