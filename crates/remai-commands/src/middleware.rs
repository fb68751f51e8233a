//! Middlewares shared by structured commands.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use remai_agent::CompletionProvider;
use remai_router::{CommandOptions, Context, Handler};

/// Options that carry a user prompt.
pub trait PromptOptions: CommandOptions {
    fn prompt(&self) -> &str;
}

/// Refuses invocations made inside a thread.
pub struct OutsideThreads;

#[async_trait]
impl<O: CommandOptions> Handler<O> for OutsideThreads {
    async fn handle(&self, ctx: &mut Context<O>) {
        let channel = &ctx.interaction.channel_id;
        match ctx.transport.channel_info(channel).await {
            Ok(info) if info.is_thread() => {
                debug!(
                    interaction = %ctx.interaction.id,
                    channel = %channel,
                    "invoked inside a thread, ignoring"
                );
                ctx.error(
                    "❌ Error",
                    "Start a new conversation from a channel, not from a thread.",
                )
                .await;
            }
            Ok(_) => ctx.next().await,
            // unknown channels (e.g. DMs without cache) are not threads
            Err(e) => {
                debug!(channel = %channel, error = %e, "channel lookup failed");
                ctx.next().await;
            }
        }
    }
}

/// Acknowledges the interaction so the chain may take longer than the
/// transport's response deadline.
pub struct Defer {
    pub ephemeral: bool,
}

#[async_trait]
impl<O: CommandOptions> Handler<O> for Defer {
    async fn handle(&self, ctx: &mut Context<O>) {
        info!(
            interaction = %ctx.interaction.id,
            user = %ctx.interaction.user.id,
            "interaction invoked"
        );
        if let Err(e) = ctx.defer(self.ephemeral).await {
            warn!(interaction = %ctx.interaction.id, error = %e, "failed to defer interaction");
            return;
        }
        ctx.next().await;
    }
}

pub const FLAGGED_PROMPT: &str = "The provided prompt contains text that violates OpenAI's usage policies and is not allowed by their safety system";

/// Runs the prompt through the provider's moderation endpoint. Flagged
/// prompts end the chain; a moderation failure lets the request through.
pub struct Moderation<O> {
    provider: Arc<dyn CompletionProvider>,
    _options: PhantomData<fn() -> O>,
}

impl<O> Moderation<O> {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            _options: PhantomData,
        }
    }
}

#[async_trait]
impl<O: PromptOptions> Handler<O> for Moderation<O> {
    async fn handle(&self, ctx: &mut Context<O>) {
        let verdict = match self.provider.moderate(ctx.options.prompt()).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(interaction = %ctx.interaction.id, error = %e, "moderation request failed");
                ctx.next().await;
                return;
            }
        };

        if verdict.flagged {
            info!(
                interaction = %ctx.interaction.id,
                categories = ?verdict.categories,
                "prompt flagged by moderation"
            );
            ctx.error("❌ Error", FLAGGED_PROMPT).await;
            return;
        }
        ctx.next().await;
    }
}
