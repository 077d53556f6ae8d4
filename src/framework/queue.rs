//! # Global Queue
//!
//! A FIFO of pending operations plus a running-set for operations that bypass it.
//!
//! The head of the FIFO stays in the FIFO while it executes; it is removed by
//! [`OperationQueue::dequeue`] once it finishes or cancels. Waiters are woken through a
//! `watch` version counter bumped on every mutation.

use super::cancel::CancellationToken;
use super::events::{SubscriptionId, Subscribers};
use super::operation::{OperationId, SceneOperation};
use crate::sync::lock;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Default)]
struct QueueState {
    pending: VecDeque<SceneOperation>,
    running: HashMap<OperationId, SceneOperation>,
}

pub struct OperationQueue {
    state: Mutex<QueueState>,
    version: watch::Sender<u64>,
    queue_empty: Subscribers<()>,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            version: watch::Sender::new(0),
            queue_empty: Subscribers::new(),
        }
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    pub fn enqueue(&self, operation: SceneOperation) {
        let id = operation.id();
        let position = {
            let mut state = lock(&self.state);
            state.pending.push_back(operation);
            state.pending.len()
        };
        info!(operation = %id, position, "Queued");
        self.bump();
    }

    /// Tracks an operation that executes outside the FIFO.
    pub fn mark_running(&self, operation: SceneOperation) {
        lock(&self.state).running.insert(operation.id(), operation);
        self.bump();
    }

    /// Removes `id` from both the FIFO and the running-set. Returns `true` when this
    /// emptied the FIFO.
    pub fn dequeue(&self, id: OperationId) -> bool {
        let emptied = {
            let mut state = lock(&self.state);
            let before = state.pending.len();
            state.pending.retain(|op| op.id() != id);
            state.running.remove(&id);
            before > 0 && state.pending.is_empty()
        };
        debug!(operation = %id, emptied, "Dequeued");
        self.bump();
        emptied
    }

    /// Moves a queued operation to the running-set. Used when an operation opts out of
    /// the queue after it was created.
    pub fn bypass(&self, operation: SceneOperation) -> bool {
        let id = operation.id();
        let emptied = {
            let mut state = lock(&self.state);
            let before = state.pending.len();
            state.pending.retain(|op| op.id() != id);
            state.running.insert(id, operation);
            before > 0 && state.pending.is_empty()
        };
        self.bump();
        emptied
    }

    pub fn is_busy(&self) -> bool {
        let state = lock(&self.state);
        !state.pending.is_empty() || !state.running.is_empty()
    }

    pub fn head(&self) -> Option<SceneOperation> {
        lock(&self.state).pending.front().cloned()
    }

    pub fn is_head(&self, id: OperationId) -> bool {
        lock(&self.state)
            .pending
            .front()
            .is_some_and(|op| op.id() == id)
    }

    pub fn contains(&self, id: OperationId) -> bool {
        let state = lock(&self.state);
        state.running.contains_key(&id) || state.pending.iter().any(|op| op.id() == id)
    }

    /// Number of operations in the FIFO, head included.
    pub fn len(&self) -> usize {
        lock(&self.state).pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every tracked operation: the FIFO in order, then the running-set.
    pub fn snapshot(&self) -> Vec<SceneOperation> {
        let state = lock(&self.state);
        state
            .pending
            .iter()
            .chain(state.running.values())
            .cloned()
            .collect()
    }

    /// Suspends until `id` is at the head. Returns `false` if `cancel` fires first or
    /// the operation is no longer queued.
    pub async fn wait_for_head(&self, id: OperationId, cancel: &CancellationToken) -> bool {
        loop {
            let mut changes = self.version.subscribe();
            if cancel.is_cancelled() {
                return false;
            }
            if self.is_head(id) {
                return true;
            }
            if !self.contains(id) {
                return false;
            }
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = changes.changed() => {}
            }
        }
    }

    /// Resolves once neither the FIFO nor the running-set holds anything.
    pub async fn wait_idle(&self) {
        loop {
            let mut changes = self.version.subscribe();
            if !self.is_busy() {
                return;
            }
            if changes.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn on_queue_empty(
        &self,
        handler: impl Fn(&()) -> super::events::CallbackResult + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.queue_empty.subscribe(handler)
    }

    pub fn queue_empty(&self) -> &Subscribers<()> {
        &self.queue_empty
    }

    pub(crate) fn emit_empty(&self) {
        info!("Queue empty");
        self.queue_empty.emit(&(), "queue_empty");
    }
}

impl Default for OperationQueue {
    fn default() -> Self {
        Self::new()
    }
}
