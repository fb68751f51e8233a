//! The `gpt` command: starts a conversation thread from a slash command and
//! keeps answering inside it.

mod interaction;
mod message;
pub mod options;
pub mod title;
pub mod usage;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use remai_agent::{CompletionProvider, CompletionRequest, CompletionResponse, ProviderError};
use remai_conversation::{
    ConversationCache, ConversationEntry, HistoryReconstructor, IgnoredSet, ThreadGate,
    TokenAccountant, TruncationPolicy,
};
use remai_core::config::ModelPricing;
use remai_core::types::ChannelId;
use remai_core::RemaiConfig;
use remai_router::{Command, Transport};

use crate::middleware::{Defer, Moderation, OutsideThreads};

pub use interaction::GptInteraction;
pub use message::GptMessage;
pub use options::GptOptions;

pub const NAME: &str = "gpt";
pub const THREAD_NAME: &str = "New chat";
pub const PENDING_MESSAGE: &str = "⌛ Wait a moment, please...";

#[derive(Debug, Clone)]
pub struct GptSettings {
    /// Enabled models, default first.
    pub models: Vec<String>,
    pub title_model: String,
    pub auto_archive_minutes: u16,
    pub pricing: HashMap<String, ModelPricing>,
    pub moderation: bool,
}

impl GptSettings {
    pub fn from_config(config: &RemaiConfig) -> Self {
        Self {
            models: config.openai.completion_models.clone(),
            title_model: config.openai.title_model.clone(),
            auto_archive_minutes: config.conversation.thread_auto_archive_minutes,
            pricing: config.pricing.clone(),
            moderation: config.openai.moderation,
        }
    }

    pub fn default_model(&self) -> &str {
        self.models
            .first()
            .map(String::as_str)
            .unwrap_or(remai_core::config::GPT_3_5_TURBO)
    }
}

/// Everything the two entry points of `gpt` share. One instance per bot.
pub struct GptState {
    pub cache: ConversationCache,
    pub ignored: IgnoredSet,
    pub gate: ThreadGate,
    pub accountant: Arc<dyn TokenAccountant>,
    pub truncation: TruncationPolicy,
    pub reconstructor: HistoryReconstructor,
    pub provider: Arc<dyn CompletionProvider>,
    pub settings: GptSettings,
}

impl GptState {
    pub fn from_config(
        config: &RemaiConfig,
        provider: Arc<dyn CompletionProvider>,
        accountant: Arc<dyn TokenAccountant>,
    ) -> Self {
        let settings = GptSettings::from_config(config);
        Self {
            cache: ConversationCache::new(config.conversation.cache_size),
            ignored: IgnoredSet::new(),
            gate: ThreadGate::new(),
            accountant,
            truncation: TruncationPolicy::new(config.conversation.context_windows.clone()),
            reconstructor: HistoryReconstructor::from_config(
                &config.conversation,
                settings.default_model(),
            ),
            provider,
            settings,
        }
    }

    /// Send the entry to the completion API and record the answer in it.
    /// On failure the entry is left as it was, unanswered user turn included.
    pub(crate) async fn complete(
        &self,
        thread: &ChannelId,
        entry: &mut ConversationEntry,
    ) -> Result<CompletionResponse, ProviderError> {
        let req = CompletionRequest::new(entry.model(), entry.request_turns())
            .temperature(entry.temperature());
        info!(
            thread = %thread,
            model = %entry.model(),
            turns = req.turns.len(),
            tokens = entry.token_count(),
            "requesting completion"
        );

        let resp = self.provider.complete(&req).await?;
        info!(
            thread = %thread,
            model = %entry.model(),
            prompt_tokens = resp.usage.prompt_tokens,
            completion_tokens = resp.usage.completion_tokens,
            total_tokens = resp.usage.total_tokens,
            "completion received"
        );
        entry.record_reply(resp.content.clone(), resp.usage.total_tokens as usize);
        Ok(resp)
    }

    /// Truncate the entry to its model's budget, logging what was dropped.
    pub(crate) fn fit(&self, thread: &ChannelId, entry: &mut ConversationEntry) {
        let removed = self.truncation.fit(entry, self.accountant.as_ref());
        if removed > 0 {
            info!(
                thread = %thread,
                removed,
                tokens = entry.token_count(),
                "dropped oldest turns to fit the context window"
            );
        }
    }
}

pub(crate) async fn set_locked(transport: &dyn Transport, thread: &ChannelId, locked: bool) {
    if let Err(e) = transport.set_thread_locked(thread, locked).await {
        warn!(thread = %thread, locked, error = %e, "failed to toggle thread lock");
    }
}

/// Build the `gpt` command over `state`.
pub fn command(state: Arc<GptState>) -> Command<GptOptions> {
    let mut command = Command::new(
        NAME,
        "Start conversation with ChatGPT",
        GptInteraction::new(Arc::clone(&state)),
    )
    .middleware(OutsideThreads)
    .middleware(Defer { ephemeral: false });

    if state.settings.moderation {
        command = command.middleware(Moderation::new(Arc::clone(&state.provider)));
    }
    for spec in options::schema(&state.settings.models) {
        command = command.option(spec);
    }
    command.message_handler(GptMessage::new(state))
}
