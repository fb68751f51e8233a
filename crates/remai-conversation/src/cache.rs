//! Bounded LRU map from thread id to conversation entry.
//!
//! Entries are handed out as shared handles so a caller can keep working on
//! one after releasing the map lock. `contains` is a peek: it neither
//! promotes nor evicts.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use tracing::debug;

use remai_core::types::ChannelId;

use crate::entry::ConversationEntry;

pub type SharedEntry = Arc<tokio::sync::Mutex<ConversationEntry>>;

pub struct ConversationCache {
    entries: Mutex<LruCache<ChannelId, SharedEntry>>,
}

impl ConversationCache {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<ChannelId, SharedEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a thread and mark it most recently used.
    pub fn get(&self, thread: &ChannelId) -> Option<SharedEntry> {
        self.lock().get(thread).cloned()
    }

    /// Insert or replace. When the cache is full the least recently used
    /// entry is dropped.
    pub fn add(&self, thread: ChannelId, entry: ConversationEntry) -> SharedEntry {
        let shared = Arc::new(tokio::sync::Mutex::new(entry));
        let evicted = self.lock().push(thread.clone(), shared.clone());
        if let Some((old, _)) = evicted {
            if old != thread {
                debug!(thread = %old, "evicted conversation from cache");
            }
        }
        shared
    }

    pub fn remove(&self, thread: &ChannelId) -> Option<SharedEntry> {
        self.lock().pop(thread)
    }

    pub fn contains(&self, thread: &ChannelId) -> bool {
        self.lock().contains(thread)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }
}
