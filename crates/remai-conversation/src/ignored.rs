use dashmap::DashSet;

use remai_core::types::ChannelId;

/// Threads known not to be managed conversations, plus plain channels that
/// can never host one. Owned by whoever builds the command state.
#[derive(Debug, Default)]
pub struct IgnoredSet {
    threads: DashSet<ChannelId>,
}

impl IgnoredSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the id was not already ignored.
    pub fn insert(&self, thread: ChannelId) -> bool {
        self.threads.insert(thread)
    }

    pub fn contains(&self, thread: &ChannelId) -> bool {
        self.threads.contains(thread)
    }

    pub fn remove(&self, thread: &ChannelId) -> bool {
        self.threads.remove(thread).is_some()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}
