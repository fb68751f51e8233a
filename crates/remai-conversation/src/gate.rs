use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;

use remai_core::types::ChannelId;

type LockMap = HashMap<ChannelId, Arc<tokio::sync::Mutex<()>>>;

/// Per-thread serialization point. Holding a [`ThreadGuard`] for a thread
/// means no other event for that thread is being handled.
#[derive(Clone, Default)]
pub struct ThreadGate {
    locks: Arc<Mutex<LockMap>>,
}

fn lock_map(locks: &Mutex<LockMap>) -> MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ThreadGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `thread` is free, then hold it until the guard drops.
    /// Waiters are served in arrival order.
    pub async fn acquire(&self, thread: &ChannelId) -> ThreadGuard {
        let lock = lock_map(&self.locks)
            .entry(thread.clone())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        ThreadGuard {
            thread: thread.clone(),
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Number of threads currently held or waited on.
    pub fn active(&self) -> usize {
        lock_map(&self.locks).len()
    }
}

pub struct ThreadGuard {
    thread: ChannelId,
    locks: Arc<Mutex<LockMap>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ThreadGuard {
    pub fn thread(&self) -> &ChannelId {
        &self.thread
    }
}

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut map = lock_map(&self.locks);
        // only the map still points at the lock: nobody is waiting
        if map
            .get(&self.thread)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.thread);
        }
    }
}
