use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use remai_conversation::{Reconstruction, SharedEntry};
use remai_core::types::{ChatMessage, Embed, MessageEdit, UserId};
use remai_router::{MessageContext, MessageHandler};

use super::usage::usage_embed;
use super::{set_locked, GptState};
use crate::ack::AckHandle;
use crate::split::{split_reply, MESSAGE_MAX_CHARS};

/// Free-form entry point: answers ordinary messages posted in conversation
/// threads. Returns `true` only for messages it answered (or tried to).
pub struct GptMessage {
    state: Arc<GptState>,
}

impl GptMessage {
    pub fn new(state: Arc<GptState>) -> Self {
        Self { state }
    }

    /// Cheap checks that need no transport call.
    fn wants(&self, message: &ChatMessage, bot_id: &UserId) -> bool {
        message.kind.is_conversational()
            && &message.author.id != bot_id
            && !message.content.is_empty()
            && !self.state.ignored.contains(&message.channel_id)
    }

    /// Cached entry for the thread, or one rebuilt from its history. The
    /// triggering message is part of the result either way.
    async fn conversation(&self, ctx: &MessageContext, bot_id: &UserId) -> Option<SharedEntry> {
        let state = &self.state;
        let thread = &ctx.message.channel_id;

        if let Some(shared) = state.cache.get(thread) {
            shared
                .lock()
                .await
                .push_user(ctx.message.content.clone(), state.accountant.as_ref());
            return Some(shared);
        }

        match state
            .reconstructor
            .reconstruct(ctx.transport.as_ref(), thread, bot_id)
            .await
        {
            Reconstruction::Reconstructed {
                mut entry,
                context_file,
            } => {
                if let Some(url) = context_file {
                    match ctx.transport.download_attachment(&url).await {
                        Ok(text) => entry.set_system_message(Some(text), state.accountant.as_ref()),
                        Err(e) => {
                            warn!(thread = %thread, error = %e, "context file unavailable, keeping its URL")
                        }
                    }
                }
                Some(state.cache.add(thread.clone(), entry))
            }
            Reconstruction::NotAConversation => {
                info!(thread = %thread, "not a conversation thread, ignoring from now on");
                state.ignored.insert(thread.clone());
                None
            }
            Reconstruction::FetchFailed(e) => {
                warn!(thread = %thread, error = %e, "could not read thread history, dropping message");
                None
            }
        }
    }
}

#[async_trait]
impl MessageHandler for GptMessage {
    async fn handle(&self, ctx: &mut MessageContext) -> bool {
        let state = &self.state;
        let Some(bot_id) = ctx.transport.current_user_id() else {
            return false;
        };
        if !self.wants(&ctx.message, &bot_id) {
            return false;
        }

        let thread = ctx.message.channel_id.clone();
        let channel = match ctx.transport.channel_info(&thread).await {
            Ok(channel) => channel,
            Err(e) => {
                warn!(channel = %thread, error = %e, "failed to get channel info");
                return false;
            }
        };
        if !channel.is_thread() {
            state.ignored.insert(thread);
            return false;
        }
        if !channel.accepts_conversation() {
            debug!(thread = %thread, "thread is locked or archived, ignoring message");
            return false;
        }

        let _turn = state.gate.acquire(&thread).await;
        // another event may have classified the thread while we waited
        if state.ignored.contains(&thread) {
            return false;
        }
        debug!(thread = %thread, message = %ctx.message.id, "handling message in a potential conversation");

        let Some(shared) = self.conversation(ctx, &bot_id).await else {
            return false;
        };
        let mut entry = shared.lock().await;
        state.fit(&thread, &mut entry);

        let transport = ctx.transport.as_ref();
        set_locked(transport, &thread, true).await;
        let mut ack = AckHandle::new(
            Arc::clone(&ctx.transport),
            thread.clone(),
            ctx.message.id.clone(),
        );
        ack.pending().await;
        ctx.typing().await;

        match state.complete(&thread, &mut entry).await {
            Ok(resp) => {
                let mut last = None;
                for chunk in split_reply(&resp.content, MESSAGE_MAX_CHARS) {
                    match ctx.reply(chunk).await {
                        Ok(sent) => last = Some(sent),
                        Err(e) => {
                            warn!(thread = %thread, error = %e, "failed to reply");
                            ack.failed().await;
                            report(ctx, "❌ Discord API Error", e.to_string()).await;
                            last = None;
                            break;
                        }
                    }
                }
                if let Some(last) = last {
                    let footer = MessageEdit {
                        content: None,
                        embeds: Some(vec![usage_embed(
                            &resp.usage,
                            entry.model(),
                            &state.settings.pricing,
                        )]),
                    };
                    if let Err(e) = transport
                        .edit_message(&last.channel_id, &last.message_id, footer)
                        .await
                    {
                        warn!(thread = %thread, error = %e, "failed to attach usage");
                    }
                }
            }
            Err(e) => {
                warn!(thread = %thread, error = %e, "completion failed");
                ack.failed().await;
                report(ctx, "❌ OpenAI API failed", e.to_string()).await;
            }
        }

        ack.done().await;
        set_locked(transport, &thread, false).await;
        true
    }
}

async fn report(ctx: &MessageContext, title: &str, description: String) {
    if let Err(e) = ctx.embed_reply(Embed::error(title, description)).await {
        warn!(channel = %ctx.message.channel_id, error = %e, "failed to report error");
    }
}
