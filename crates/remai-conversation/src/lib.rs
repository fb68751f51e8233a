//! Per-thread conversation state: token accounting, the bounded LRU cache,
//! the ignored-thread set, truncation and lazy reconstruction from history.

pub mod cache;
pub mod entry;
pub mod gate;
pub mod history;
pub mod ignored;
pub mod reconstruct;
pub mod starter;
pub mod tokens;
pub mod truncate;

pub use cache::{ConversationCache, SharedEntry};
pub use entry::ConversationEntry;
pub use gate::{ThreadGate, ThreadGuard};
pub use history::HistorySource;
pub use ignored::IgnoredSet;
pub use reconstruct::{HistoryReconstructor, Reconstruction};
pub use starter::{StarterMetadata, SystemContext};
pub use tokens::{TiktokenAccountant, TokenAccountant};
pub use truncate::TruncationPolicy;
