//! Reaction-based progress on the message being answered: ⌛ while the
//! answer is generated, ❌ when something failed.

use std::sync::Arc;

use tracing::debug;

use remai_core::types::{ChannelId, MessageId};
use remai_router::Transport;

pub const PENDING: &str = "\u{231b}"; // ⌛
pub const FAILED: &str = "\u{274c}"; // ❌

pub struct AckHandle {
    transport: Arc<dyn Transport>,
    channel: ChannelId,
    message: MessageId,
    pending: bool,
}

impl AckHandle {
    pub fn new(transport: Arc<dyn Transport>, channel: ChannelId, message: MessageId) -> Self {
        Self {
            transport,
            channel,
            message,
            pending: false,
        }
    }

    /// Show ⌛. Errors are swallowed: the bot may lack the permission.
    pub async fn pending(&mut self) {
        if let Err(e) = self
            .transport
            .add_reaction(&self.channel, &self.message, PENDING)
            .await
        {
            debug!(message = %self.message, error = %e, "could not add reaction");
            return;
        }
        self.pending = true;
    }

    /// Show ❌ next to whatever is already there.
    pub async fn failed(&self) {
        if let Err(e) = self
            .transport
            .add_reaction(&self.channel, &self.message, FAILED)
            .await
        {
            debug!(message = %self.message, error = %e, "could not add reaction");
        }
    }

    /// Remove ⌛ if it was shown.
    pub async fn done(&mut self) {
        if !self.pending {
            return;
        }
        self.pending = false;
        if let Err(e) = self
            .transport
            .remove_reaction(&self.channel, &self.message, PENDING)
            .await
        {
            debug!(message = %self.message, error = %e, "could not remove reaction");
        }
    }
}
