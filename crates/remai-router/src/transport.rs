use async_trait::async_trait;

use remai_conversation::HistorySource;
use remai_core::types::{
    ChannelId, ChannelInfo, Interaction, MessageEdit, MessageId, MessageRef, OutgoingMessage,
    UserId,
};
use remai_core::TransportError;

/// Everything handlers need from the chat platform.
#[async_trait]
pub trait Transport: HistorySource {
    /// The bot's own user id, once the gateway session is ready.
    fn current_user_id(&self) -> Option<UserId>;

    async fn channel_info(&self, channel: &ChannelId) -> Result<ChannelInfo, TransportError>;

    async fn send_message(
        &self,
        channel: &ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageRef, TransportError>;

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        edit: MessageEdit,
    ) -> Result<(), TransportError>;

    async fn set_thread_locked(&self, thread: &ChannelId, locked: bool)
        -> Result<(), TransportError>;

    async fn rename_thread(&self, thread: &ChannelId, name: &str) -> Result<(), TransportError>;

    /// Start a public thread on `message` and return the thread id.
    async fn start_thread(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        name: &str,
        auto_archive_minutes: u16,
    ) -> Result<ChannelId, TransportError>;

    async fn add_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), TransportError>;

    /// Remove the bot's own reaction.
    async fn remove_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), TransportError>;

    async fn broadcast_typing(&self, channel: &ChannelId) -> Result<(), TransportError>;

    /// Acknowledge an interaction now and answer it later with follow-ups.
    async fn defer(&self, interaction: &Interaction, ephemeral: bool)
        -> Result<(), TransportError>;

    /// Initial response to an interaction that was not deferred.
    async fn respond(
        &self,
        interaction: &Interaction,
        message: OutgoingMessage,
    ) -> Result<(), TransportError>;

    async fn followup(
        &self,
        interaction: &Interaction,
        message: OutgoingMessage,
    ) -> Result<MessageRef, TransportError>;

    /// Fetch the text content of an uploaded attachment.
    async fn download_attachment(&self, url: &str) -> Result<String, TransportError>;
}
