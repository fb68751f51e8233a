use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use remai_conversation::ConversationEntry;
use remai_core::types::{
    ChannelId, Embed, EmbedAuthor, MessageEdit, MessageRef, OutgoingMessage,
};
use remai_router::{Context, Handler};

use super::options::{
    field_label, GptOptions, OPTION_CONTEXT, OPTION_CONTEXT_FILE, OPTION_MODEL,
    OPTION_TEMPERATURE,
};
use super::title::spawn_title;
use super::usage::usage_embed;
use super::{set_locked, GptState, PENDING_MESSAGE, THREAD_NAME};
use crate::split::{split_reply, MESSAGE_MAX_CHARS};
use crate::OPENAI_ICON_URL;

const REQUEST_EMBED_COLOR: u32 = 0x000000;

/// Slash-command entry point: post the request, open a thread on it and
/// answer the first prompt there.
pub struct GptInteraction {
    state: Arc<GptState>,
}

impl GptInteraction {
    pub fn new(state: Arc<GptState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Handler<GptOptions> for GptInteraction {
    async fn handle(&self, ctx: &mut Context<GptOptions>) {
        let state = &self.state;
        let opts = ctx.options.clone();
        let model = opts
            .model
            .clone()
            .unwrap_or_else(|| state.settings.default_model().to_string());

        let mut entry = ConversationEntry::new(model.clone()).with_temperature(opts.temperature);
        let mut fields: Vec<(&str, String)> = Vec::with_capacity(3);

        // a context file wins over inline context
        if let Some(url) = &opts.context_file {
            let text = match ctx.transport.download_attachment(url).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(interaction = %ctx.interaction.id, error = %e, "context file download failed");
                    ctx.error("❌ Failed to get attachment data", e.to_string())
                        .await;
                    return;
                }
            };
            entry.set_system_message(Some(text), state.accountant.as_ref());
            fields.push((field_label(OPTION_CONTEXT_FILE), url.clone()));
        } else if let Some(context) = &opts.context {
            entry.set_system_message(Some(context.clone()), state.accountant.as_ref());
            fields.push((field_label(OPTION_CONTEXT), context.clone()));
        }
        fields.push((field_label(OPTION_MODEL), model.clone()));
        if let Some(t) = opts.temperature {
            fields.push((field_label(OPTION_TEMPERATURE), t.to_string()));
        }
        entry.push_user(opts.prompt.clone(), state.accountant.as_ref());

        let user = &ctx.interaction.user;
        let mut request = Embed {
            description: Some(opts.prompt.clone()),
            color: Some(REQUEST_EMBED_COLOR),
            author: Some(EmbedAuthor {
                name: format!("OpenAI chat request by {}", user.name),
                icon_url: user
                    .avatar_url
                    .clone()
                    .or_else(|| Some(OPENAI_ICON_URL.to_string())),
            }),
            ..Embed::default()
        };
        for (name, value) in fields {
            request = request.field(name, value);
        }

        let posted = match ctx.followup(OutgoingMessage::embed(request)).await {
            Ok(posted) => posted,
            Err(e) => {
                warn!(interaction = %ctx.interaction.id, error = %e, "failed to post request message");
                return;
            }
        };

        let thread = match ctx
            .transport
            .start_thread(
                &posted.channel_id,
                &posted.message_id,
                THREAD_NAME,
                state.settings.auto_archive_minutes,
            )
            .await
        {
            Ok(thread) => thread,
            Err(e) => {
                warn!(interaction = %ctx.interaction.id, error = %e, "failed to start thread");
                ctx.error("❌ Failed to start a thread", e.to_string()).await;
                return;
            }
        };
        info!(
            interaction = %ctx.interaction.id,
            thread = %thread,
            model = %model,
            "conversation thread started"
        );

        let _turn = state.gate.acquire(&thread).await;
        set_locked(ctx.transport.as_ref(), &thread, true).await;
        self.answer(ctx, &thread, entry).await;
        set_locked(ctx.transport.as_ref(), &thread, false).await;
    }
}

impl GptInteraction {
    /// Everything between locking and unlocking the new thread.
    async fn answer(
        &self,
        ctx: &Context<GptOptions>,
        thread: &ChannelId,
        mut entry: ConversationEntry,
    ) {
        let state = &self.state;
        let transport = ctx.transport.as_ref();

        let placeholder = match transport
            .send_message(thread, OutgoingMessage::text(PENDING_MESSAGE))
            .await
        {
            Ok(placeholder) => placeholder,
            Err(e) => {
                warn!(thread = %thread, error = %e, "failed to post placeholder");
                return;
            }
        };

        state.fit(thread, &mut entry);
        let shared = state.cache.add(thread.clone(), entry);
        let mut entry = shared.lock().await;

        let resp = match state.complete(thread, &mut entry).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(thread = %thread, error = %e, "completion failed");
                edit_error(ctx, &placeholder, "❌ OpenAI API failed", e.to_string()).await;
                return;
            }
        };

        spawn_title(
            Arc::clone(&state.provider),
            Arc::clone(&ctx.transport),
            thread.clone(),
            state.settings.title_model.clone(),
            entry.messages().to_vec(),
        );

        let chunks = split_reply(&resp.content, MESSAGE_MAX_CHARS);
        let mut chunks = chunks.into_iter();
        let first = chunks.next().unwrap_or_default();
        if let Err(e) = transport
            .edit_message(thread, &placeholder.message_id, MessageEdit::content(first))
            .await
        {
            warn!(thread = %thread, error = %e, "failed to deliver answer");
            edit_error(ctx, &placeholder, "❌ Discord API Error", e.to_string()).await;
            return;
        }

        let mut last = placeholder;
        for chunk in chunks {
            match transport.send_message(thread, OutgoingMessage::text(chunk)).await {
                Ok(sent) => last = sent,
                Err(e) => warn!(thread = %thread, error = %e, "failed to send answer part"),
            }
        }

        let footer = MessageEdit {
            content: None,
            embeds: Some(vec![usage_embed(
                &resp.usage,
                entry.model(),
                &state.settings.pricing,
            )]),
        };
        if let Err(e) = transport
            .edit_message(thread, &last.message_id, footer)
            .await
        {
            warn!(thread = %thread, error = %e, "failed to attach usage");
        }
    }
}

async fn edit_error(
    ctx: &Context<GptOptions>,
    target: &MessageRef,
    title: &str,
    description: String,
) {
    let edit = MessageEdit::error(Embed::error(title, description));
    if let Err(e) = ctx
        .transport
        .edit_message(&target.channel_id, &target.message_id, edit)
        .await
    {
        warn!(message = %target.message_id, error = %e, "failed to report error");
    }
}
