//! Per-key trailing-edge debounce on tokio timers.

use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::AbortHandle;

struct Pending {
    generation: u64,
    handle: AbortHandle,
}

/// Each `schedule` for a key cancels that key's pending timer and arms a new
/// one. A timer removes its own entry before running the action, so only
/// waiting timers are ever cancelled; a running action always completes.
pub struct Debouncer<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pending: Arc<DashMap<K, Pending>>,
    next_generation: AtomicU64,
}

impl<K> Default for Debouncer<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&self, key: K, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let task_key = key.clone();
        let timer = async move {
            tokio::time::sleep(delay).await;
            let ours = pending
                .remove_if(&task_key, |_, p| p.generation == generation)
                .is_some();
            if ours {
                action().await;
            }
        };

        // The entry lock is held while spawning so the timer cannot look up
        // its slot before it exists.
        match self.pending.entry(key) {
            Entry::Occupied(mut slot) => {
                slot.get().handle.abort();
                let handle = tokio::spawn(timer).abort_handle();
                slot.insert(Pending { generation, handle });
            }
            Entry::Vacant(slot) => {
                let handle = tokio::spawn(timer).abort_handle();
                slot.insert(Pending { generation, handle });
            }
        }
    }

    /// Cancel the pending timer for `key`. Returns false when none was armed.
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some((_, p)) => {
                p.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        self.pending.retain(|_, p| {
            p.handle.abort();
            false
        });
    }

    /// Number of armed timers.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl<K> Drop for Debouncer<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.cancel_all();
    }
}
