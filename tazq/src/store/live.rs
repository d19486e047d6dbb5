//! Live query subscriptions over the task table.
//!
//! A [`Subscription`] yields an initial snapshot as soon as it is created and
//! a fresh snapshot after every committed mutation. Stores call
//! [`Watchers::publish`] while their write lock is still held, so every
//! subscriber sees snapshots in commit order and receives one before the
//! next mutation is accepted.
//!
//! Subscriptions must be released explicitly ([`Subscription::unsubscribe`])
//! or by dropping them; the store forgets the subscriber either way.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use tazq_proto::task::{Task, TaskId};

/// Identifies one registered subscription within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Where a snapshot goes.
enum Target {
    /// Every row, in insertion order.
    All(mpsc::UnboundedSender<Vec<Task>>),
    /// A single row. Nothing is sent while the row does not exist.
    One(TaskId, mpsc::UnboundedSender<Task>),
}

/// Registry of live subscribers owned by a store.
#[derive(Default)]
pub(crate) struct Watchers {
    next_id: AtomicU64,
    targets: Mutex<HashMap<u64, Target>>,
}

impl Watchers {
    /// Registers a whole-table subscriber and hands it `snapshot` right away.
    pub(crate) fn watch_all(self: &Arc<Self>, snapshot: &[Task]) -> Subscription<Vec<Task>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(snapshot.to_vec());
        self.register(Target::All(tx), rx)
    }

    /// Registers a single-row subscriber. The row from `snapshot` is handed
    /// over right away if it exists.
    pub(crate) fn watch_one(self: &Arc<Self>, id: TaskId, snapshot: &[Task]) -> Subscription<Task> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(task) = snapshot.iter().find(|t| t.id == id) {
            let _ = tx.send(task.clone());
        }
        self.register(Target::One(id, tx), rx)
    }

    fn register<T>(
        self: &Arc<Self>,
        target: Target,
        rx: mpsc::UnboundedReceiver<T>,
    ) -> Subscription<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.targets.lock().insert(id, target);
        tracing::debug!(subscription = id, "live query registered");
        Subscription {
            id: SubscriptionId(id),
            rx,
            watchers: Arc::downgrade(self),
        }
    }

    /// Pushes `snapshot` to every subscriber, pruning those whose receiver
    /// is gone.
    pub(crate) fn publish(&self, snapshot: &[Task]) {
        self.targets.lock().retain(|_, target| match target {
            Target::All(tx) => tx.send(snapshot.to_vec()).is_ok(),
            Target::One(id, tx) => match snapshot.iter().find(|t| t.id == *id) {
                Some(task) => tx.send(task.clone()).is_ok(),
                None => !tx.is_closed(),
            },
        });
    }

    /// Number of registered subscribers.
    pub(crate) fn len(&self) -> usize {
        self.targets.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        if self.targets.lock().remove(&id).is_some() {
            tracing::debug!(subscription = id, "live query released");
        }
    }
}

/// A live query handle yielding snapshots of type `T`.
pub struct Subscription<T> {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<T>,
    watchers: Weak<Watchers>,
}

impl<T> Subscription<T> {
    /// Identifier of this subscription within its store.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Returns the next already-delivered snapshot without waiting.
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drains every delivered snapshot and returns the newest one.
    pub fn latest(&mut self) -> Option<T> {
        let mut newest = None;
        while let Ok(snapshot) = self.rx.try_recv() {
            newest = Some(snapshot);
        }
        newest
    }

    /// Releases this subscription. Equivalent to dropping it.
    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(watchers) = self.watchers.upgrade() {
            watchers.remove(self.id.0);
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
    }
}
