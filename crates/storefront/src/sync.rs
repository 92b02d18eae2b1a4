//! Background remote writes.
//!
//! Cart mutations apply locally first and push to the backend from a
//! background task. Writes that touch the same key run one after another in
//! the order they were queued; writes for different keys do not wait on each
//! other. Each queued write hands back a [`PendingSync`] that callers may await
//! or simply drop.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinHandle;

/// How a background sync ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The backend accepted the write or returned the snapshot.
    Synced,
    /// Nothing to push: the shopper is not signed in.
    LocalOnly,
    /// The backend call failed; the local state was kept.
    Failed,
    /// The result arrived after the session changed and was ignored.
    Discarded,
}

/// Handle to a background sync.
///
/// Dropping it detaches the task; the sync still runs to completion.
#[derive(Debug)]
pub struct PendingSync {
    handle: Option<JoinHandle<SyncOutcome>>,
}

impl PendingSync {
    /// A sync that never left the device.
    #[must_use]
    pub const fn local() -> Self {
        Self { handle: None }
    }

    pub(crate) fn spawn<F>(task: F) -> Self
    where
        F: Future<Output = SyncOutcome> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(task)),
        }
    }

    /// Whether a background task is attached.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        self.handle.is_some()
    }

    /// Wait for the sync to finish.
    pub async fn wait(self) -> SyncOutcome {
        let Some(handle) = self.handle else {
            return SyncOutcome::LocalOnly;
        };
        handle.await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Sync task did not complete");
            SyncOutcome::Failed
        })
    }
}

/// Per-key FIFO of background tasks.
///
/// The queue keeps, for every key with work in flight, a receiver that
/// resolves when the most recently queued task for that key finishes. A new
/// task waits on that receiver before it starts.
#[derive(Debug)]
pub struct KeyedQueue<K> {
    tails: Mutex<HashMap<K, oneshot::Receiver<()>>>,
}

impl<K> Default for KeyedQueue<K> {
    fn default() -> Self {
        Self {
            tails: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedQueue<K>
where
    K: Eq + Hash + Send + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` behind every earlier task for `key`.
    ///
    /// The slot is taken synchronously, so call order is queue order.
    /// Must be called from within a tokio runtime.
    pub fn push<F>(&self, key: K, task: F) -> PendingSync
    where
        F: Future<Output = SyncOutcome> + Send + 'static,
    {
        let (done, tail) = oneshot::channel::<()>();
        let previous = {
            let mut tails = self.tails.lock().unwrap_or_else(PoisonError::into_inner);
            // Forget keys whose last task already finished
            tails.retain(|_, rx| matches!(rx.try_recv(), Err(TryRecvError::Empty)));
            tails.insert(key, tail)
        };

        PendingSync::spawn(async move {
            if let Some(previous) = previous {
                // Resolves with an error once the earlier task drops its sender
                let _ = previous.await;
            }
            let outcome = task.await;
            drop(done);
            outcome
        })
    }

    /// Number of keys with work possibly still in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        let mut tails = self.tails.lock().unwrap_or_else(PoisonError::into_inner);
        tails.retain(|_, rx| matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        tails.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_local_sync_resolves_immediately() {
        let pending = PendingSync::local();
        assert!(!pending.is_remote());
        assert_eq!(pending.wait().await, SyncOutcome::LocalOnly);
    }

    #[tokio::test]
    async fn test_same_key_runs_in_call_order() {
        let queue = KeyedQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut pending = Vec::new();
        // Earlier tasks sleep longer; order must still follow call order
        for (i, delay) in [(1, 30), (2, 10), (3, 0)] {
            let log = Arc::clone(&log);
            pending.push(queue.push("p1:M", async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                log.lock().unwrap().push(i);
                SyncOutcome::Synced
            }));
        }
        for p in pending {
            assert_eq!(p.wait().await, SyncOutcome::Synced);
        }

        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_wait() {
        let queue = KeyedQueue::new();
        let (release, blocked) = oneshot::channel::<()>();

        let slow = queue.push("p1:M", async move {
            let _ = blocked.await;
            SyncOutcome::Synced
        });
        let fast = queue.push("p2:S", async { SyncOutcome::Failed });

        // Finishes while the other key is still blocked
        assert_eq!(fast.wait().await, SyncOutcome::Failed);
        assert_eq!(queue.in_flight(), 1);

        release.send(()).unwrap();
        assert_eq!(slow.wait().await, SyncOutcome::Synced);
    }

    #[tokio::test]
    async fn test_dropped_handle_still_runs() {
        let queue = KeyedQueue::new();
        let (tx, rx) = oneshot::channel();
        drop(queue.push("k", async move {
            tx.send(()).unwrap();
            SyncOutcome::Synced
        }));
        rx.await.unwrap();
    }
}
