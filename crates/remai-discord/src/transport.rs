//! [`Transport`] over Discord's REST API.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serenity::builder::{
    CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateMessage, CreateThread, EditMessage, EditThread,
    GetMessages,
};
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::application::CommandInteraction;
use serenity::model::channel::{ChannelType, GuildChannel, ReactionType};
use serenity::model::id::ChannelId as SerenityChannelId;
use tracing::debug;

use remai_conversation::HistorySource;
use remai_core::types::{
    ChannelId, ChannelInfo, ChatMessage, Interaction, InteractionId, MessageEdit, MessageId,
    MessageRef, OutgoingMessage, UserId,
};
use remai_core::TransportError;
use remai_router::Transport;

use crate::convert;
use crate::error::{request_error, retry_after_ms, DiscordError, DEFAULT_RETRY_AFTER_MS};

pub struct DiscordTransport {
    http: Arc<Http>,
    /// Gateway cache, consulted before REST for channel metadata.
    cache: Arc<Cache>,
    bot_id: UserId,
    /// Interactions being dispatched, kept so handlers can answer them.
    interactions: DashMap<InteractionId, CommandInteraction>,
    client: reqwest::Client,
}

impl DiscordTransport {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, bot_id: UserId) -> Self {
        Self {
            http,
            cache,
            bot_id,
            interactions: DashMap::new(),
            client: reqwest::Client::new(),
        }
    }

    pub fn http(&self) -> &Arc<Http> {
        &self.http
    }

    /// Keep `command` answerable until [`forget`](Self::forget).
    pub fn track(&self, command: CommandInteraction) {
        self.interactions
            .insert(command.id.to_string().into(), command);
    }

    pub fn forget(&self, id: &InteractionId) {
        self.interactions.remove(id);
    }

    fn command(&self, interaction: &Interaction) -> Result<CommandInteraction, TransportError> {
        self.interactions
            .get(&interaction.id)
            .map(|c| c.value().clone())
            .ok_or_else(|| DiscordError::UnknownInteraction(interaction.id.to_string()).into())
    }
}

/// Guild channel or thread as last seen on the gateway.
pub(crate) fn cached_channel(cache: &Cache, id: SerenityChannelId) -> Option<GuildChannel> {
    if let Some(channel) = cache.channel(id) {
        return Some(GuildChannel::clone(&channel));
    }
    // threads live on their guild, not in the channel map
    cache.guilds().into_iter().find_map(|guild| {
        cache
            .guild(guild)?
            .threads
            .iter()
            .find(|thread| thread.id == id)
            .cloned()
    })
}

fn message_ref(msg: &serenity::model::channel::Message) -> MessageRef {
    MessageRef {
        channel_id: msg.channel_id.to_string().into(),
        message_id: msg.id.to_string().into(),
    }
}

#[async_trait]
impl HistorySource for DiscordTransport {
    async fn fetch_history(
        &self,
        channel: &ChannelId,
        limit: u8,
        before: Option<&MessageId>,
    ) -> Result<Vec<ChatMessage>, TransportError> {
        let mut query = GetMessages::new().limit(limit);
        if let Some(before) = before {
            query = query.before(convert::message_id(before)?);
        }
        let messages = convert::channel_id(channel)?
            .messages(&self.http, query)
            .await
            .map_err(request_error)?;
        Ok(messages.iter().map(convert::chat_message).collect())
    }
}

#[async_trait]
impl Transport for DiscordTransport {
    fn current_user_id(&self) -> Option<UserId> {
        Some(self.bot_id.clone())
    }

    async fn channel_info(&self, channel: &ChannelId) -> Result<ChannelInfo, TransportError> {
        let id = convert::channel_id(channel)?;
        if let Some(cached) = cached_channel(&self.cache, id) {
            return Ok(convert::guild_channel_info(&cached));
        }
        debug!(channel = %id, "channel not cached, asking the API");
        let channel = id.to_channel(&self.http).await.map_err(request_error)?;
        Ok(convert::channel_info(&channel))
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageRef, TransportError> {
        let channel = convert::channel_id(channel)?;
        let mut builder = CreateMessage::new()
            .embeds(message.embeds.iter().map(convert::create_embed).collect());
        if let Some(content) = message.content {
            builder = builder.content(content);
        }
        if let Some(reply_to) = &message.reply_to {
            builder = builder.reference_message((channel, convert::message_id(reply_to)?));
        }
        let sent = channel
            .send_message(&self.http, builder)
            .await
            .map_err(request_error)?;
        Ok(message_ref(&sent))
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        edit: MessageEdit,
    ) -> Result<(), TransportError> {
        let mut builder = EditMessage::new();
        if let Some(content) = edit.content {
            builder = builder.content(content);
        }
        if let Some(embeds) = edit.embeds {
            builder = builder.embeds(embeds.iter().map(convert::create_embed).collect());
        }
        convert::channel_id(channel)?
            .edit_message(&self.http, convert::message_id(message)?, builder)
            .await
            .map_err(request_error)?;
        Ok(())
    }

    async fn set_thread_locked(
        &self,
        thread: &ChannelId,
        locked: bool,
    ) -> Result<(), TransportError> {
        convert::channel_id(thread)?
            .edit_thread(&self.http, EditThread::new().locked(locked))
            .await
            .map_err(request_error)?;
        Ok(())
    }

    async fn rename_thread(&self, thread: &ChannelId, name: &str) -> Result<(), TransportError> {
        convert::channel_id(thread)?
            .edit_thread(&self.http, EditThread::new().name(name))
            .await
            .map_err(request_error)?;
        Ok(())
    }

    async fn start_thread(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        name: &str,
        auto_archive_minutes: u16,
    ) -> Result<ChannelId, TransportError> {
        let builder = CreateThread::new(name)
            .kind(ChannelType::PublicThread)
            .auto_archive_duration(convert::auto_archive(auto_archive_minutes));
        let thread = convert::channel_id(channel)?
            .create_thread_from_message(&self.http, convert::message_id(message)?, builder)
            .await
            .map_err(request_error)?;
        Ok(thread.id.to_string().into())
    }

    async fn add_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), TransportError> {
        self.http
            .create_reaction(
                convert::channel_id(channel)?,
                convert::message_id(message)?,
                &ReactionType::Unicode(emoji.to_string()),
            )
            .await
            .map_err(request_error)
    }

    async fn remove_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), TransportError> {
        self.http
            .delete_reaction_me(
                convert::channel_id(channel)?,
                convert::message_id(message)?,
                &ReactionType::Unicode(emoji.to_string()),
            )
            .await
            .map_err(request_error)
    }

    async fn broadcast_typing(&self, channel: &ChannelId) -> Result<(), TransportError> {
        convert::channel_id(channel)?
            .broadcast_typing(&self.http)
            .await
            .map_err(request_error)
    }

    async fn defer(&self, interaction: &Interaction, ephemeral: bool) -> Result<(), TransportError> {
        self.command(interaction)?
            .create_response(
                &self.http,
                CreateInteractionResponse::Defer(
                    CreateInteractionResponseMessage::new().ephemeral(ephemeral),
                ),
            )
            .await
            .map_err(request_error)
    }

    async fn respond(
        &self,
        interaction: &Interaction,
        message: OutgoingMessage,
    ) -> Result<(), TransportError> {
        let mut builder = CreateInteractionResponseMessage::new()
            .embeds(message.embeds.iter().map(convert::create_embed).collect())
            .ephemeral(message.ephemeral);
        if let Some(content) = message.content {
            builder = builder.content(content);
        }
        self.command(interaction)?
            .create_response(&self.http, CreateInteractionResponse::Message(builder))
            .await
            .map_err(request_error)
    }

    async fn followup(
        &self,
        interaction: &Interaction,
        message: OutgoingMessage,
    ) -> Result<MessageRef, TransportError> {
        let mut builder = CreateInteractionResponseFollowup::new()
            .embeds(message.embeds.iter().map(convert::create_embed).collect())
            .ephemeral(message.ephemeral);
        if let Some(content) = message.content {
            builder = builder.content(content);
        }
        let sent = self
            .command(interaction)?
            .create_followup(&self.http, builder)
            .await
            .map_err(request_error)?;
        Ok(message_ref(&sent))
    }

    async fn download_attachment(&self, url: &str) -> Result<String, TransportError> {
        debug!(url, "downloading attachment");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(DiscordError::from)?;
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = retry_after_ms(resp.headers()).unwrap_or(DEFAULT_RETRY_AFTER_MS);
            return Err(DiscordError::RateLimited { retry_after_ms }.into());
        }
        let text = resp
            .error_for_status()
            .map_err(DiscordError::from)?
            .text()
            .await
            .map_err(DiscordError::from)?;
        Ok(text)
    }
}
