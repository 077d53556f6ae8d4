//! # Callbacks & Subscriber Lists
//!
//! Every hook the scheduler exposes (per-scene open/close callbacks, collection events,
//! active scene changes, queue-empty) is a [`Subscribers`] list.
//!
//! - Emitting iterates a snapshot, so a handler may unsubscribe itself (or anyone else)
//!   while it runs.
//! - Each handler is guarded: an `Err` is logged at `warn`, a panic is caught and logged
//!   at `error`, and the remaining handlers still run.
//! - Non-persistent subscriptions are removed the first time they are invoked.

use crate::model::{OpenScene, SceneCollection};
use crate::sync::lock;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// What every caller-supplied callback returns.
pub type CallbackResult = Result<(), CallbackError>;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Arc<dyn Fn(&E) -> CallbackResult + Send + Sync>;

struct Entry<E> {
    id: SubscriptionId,
    persistent: bool,
    handler: Handler<E>,
}

pub struct Subscribers<E> {
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry<E>>>,
}

impl<E> Subscribers<E> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Adds a handler that stays registered until [`Subscribers::unsubscribe`].
    pub fn subscribe(
        &self,
        handler: impl Fn(&E) -> CallbackResult + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.insert(handler, true)
    }

    /// Adds a handler that is removed after its first invocation.
    pub fn subscribe_once(
        &self,
        handler: impl Fn(&E) -> CallbackResult + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.insert(handler, false)
    }

    pub(crate) fn insert(
        &self,
        handler: impl Fn(&E) -> CallbackResult + Send + Sync + 'static,
        persistent: bool,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        lock(&self.entries).push(Entry {
            id,
            persistent,
            handler: Arc::new(handler),
        });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every handler; returns how many of them succeeded.
    pub fn emit(&self, event: &E, hook: &str) -> usize {
        let snapshot: Vec<Handler<E>> = {
            let mut entries = lock(&self.entries);
            let snapshot = entries.iter().map(|entry| entry.handler.clone()).collect();
            entries.retain(|entry| entry.persistent);
            snapshot
        };

        let mut succeeded = 0;
        for handler in &snapshot {
            if invoke_guarded(hook, || (**handler)(event)) {
                succeeded += 1;
            }
        }
        succeeded
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a caller callback, absorbing both errors and panics. Returns `true` on success.
pub(crate) fn invoke_guarded(hook: &str, callback: impl FnOnce() -> CallbackResult) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(hook, error = %e, "Callback failed");
            false
        }
        Err(_) => {
            error!(hook, "Callback panicked");
            false
        }
    }
}

/// Awaits a caller future, absorbing both errors and panics. Returns `true` on success.
pub(crate) async fn await_guarded(hook: &str, future: BoxFuture<CallbackResult>) -> bool {
    // Spawning isolates a panicking future from the operation task; dropping the
    // guard (operation cancelled mid-await) aborts the spawned task too.
    let mut task = AbortOnDrop(tokio::spawn(future));
    match (&mut task.0).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(hook, error = %e, "Callback failed");
            false
        }
        Err(e) => {
            error!(hook, error = %e, "Callback panicked");
            false
        }
    }
}

struct AbortOnDrop(tokio::task::JoinHandle<CallbackResult>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A scene being opened or closed by an operation.
#[derive(Debug, Clone)]
pub struct SceneEvent {
    pub scene: Arc<OpenScene>,
    pub operation: super::OperationId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionEventKind {
    WillClose,
    WillOpen,
    Closed,
    Opened,
}

#[derive(Debug, Clone)]
pub struct CollectionEvent {
    pub kind: CollectionEventKind,
    pub collection: Arc<SceneCollection>,
}

#[derive(Debug, Clone)]
pub struct ActiveSceneChanged {
    pub previous: Option<Arc<OpenScene>>,
    pub next: Option<Arc<OpenScene>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_once_handlers_are_removed_after_first_emit() {
        let subscribers = Subscribers::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        subscribers.subscribe_once(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let counter = calls.clone();
        subscribers.subscribe(move |_| {
            counter.fetch_add(10, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(subscribers.emit(&1, "test"), 2);
        assert_eq!(subscribers.emit(&2, "test"), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 21);
        assert_eq!(subscribers.len(), 1);
    }

    #[test]
    fn test_failing_and_panicking_handlers_do_not_block_others() {
        let subscribers = Subscribers::<()>::new();
        let reached = Arc::new(AtomicUsize::new(0));

        subscribers.subscribe(|_| Err("boom".into()));
        subscribers.subscribe(|_| panic!("listener bug"));
        let counter = reached.clone();
        subscribers.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(subscribers.emit(&(), "test"), 1);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself() {
        let subscribers = Arc::new(Subscribers::<()>::new());
        let slot = Arc::new(Mutex::new(None));

        let (list, own_id) = (subscribers.clone(), slot.clone());
        let id = subscribers.subscribe(move |_| {
            if let Some(id) = *lock(&own_id) {
                list.unsubscribe(id);
            }
            Ok(())
        });
        *lock(&slot) = Some(id);

        subscribers.emit(&(), "test");
        assert!(subscribers.is_empty());
    }
}
