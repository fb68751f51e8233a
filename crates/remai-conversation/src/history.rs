use async_trait::async_trait;

use remai_core::types::{ChannelId, ChatMessage, MessageId};
use remai_core::TransportError;

/// Paginated read access to a thread's message history.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch up to `limit` messages older than `before` (or the newest page
    /// when `before` is `None`). Messages come back newest first.
    async fn fetch_history(
        &self,
        channel: &ChannelId,
        limit: u8,
        before: Option<&MessageId>,
    ) -> Result<Vec<ChatMessage>, TransportError>;
}
