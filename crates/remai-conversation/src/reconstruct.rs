//! Lazy rebuild of a conversation from its thread history.
//!
//! Pages are read newest first with a `(limit, before)` cursor. Each page is
//! reversed and prepended, so the working entry ends up oldest first. The
//! thread starter decides whether the thread is a managed conversation at
//! all: it must be ours and must point at a request message with a prompt.

use std::time::Duration;

use tracing::{debug, info, warn};

use remai_core::config::ConversationConfig;
use remai_core::types::{ChannelId, ChatMessage, MessageId, MessageKind, Turn, UserId};
use remai_core::TransportError;

use crate::entry::ConversationEntry;
use crate::history::HistorySource;
use crate::starter::{StarterMetadata, SystemContext};

#[derive(Debug)]
pub enum Reconstruction {
    Reconstructed {
        entry: ConversationEntry,
        /// URL the system message should be re-read from, when the request
        /// carried a context file.
        context_file: Option<String>,
    },
    NotAConversation,
    FetchFailed(TransportError),
}

#[derive(Debug, Clone)]
pub struct HistoryReconstructor {
    page_size: u8,
    max_retries: u32,
    backoff: Duration,
    default_model: String,
}

impl HistoryReconstructor {
    pub fn new(
        page_size: u8,
        max_retries: u32,
        backoff: Duration,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            page_size: page_size.max(1),
            max_retries: max_retries.max(1),
            backoff,
            default_model: default_model.into(),
        }
    }

    pub fn from_config(config: &ConversationConfig, default_model: impl Into<String>) -> Self {
        Self::new(
            config.history_page_size,
            config.history_max_retries,
            Duration::from_millis(config.history_retry_backoff_ms),
            default_model,
        )
    }

    /// Linear back-off, stretched to the server's wait when it named one.
    fn retry_delay(&self, error: &TransportError, failures: u32) -> Duration {
        let backoff = self.backoff * failures;
        match error {
            TransportError::RateLimited { retry_after_ms } => {
                backoff.max(Duration::from_millis(*retry_after_ms))
            }
            _ => backoff,
        }
    }

    /// Read the whole history of `thread` and rebuild its entry. Never
    /// touches any cache; the caller records the outcome.
    pub async fn reconstruct<S: HistorySource + ?Sized>(
        &self,
        source: &S,
        thread: &ChannelId,
        bot_id: &UserId,
    ) -> Reconstruction {
        debug!(thread = %thread, "fetching thread history");

        let mut turns: Vec<Turn> = Vec::new();
        let mut starter: Option<StarterMetadata> = None;
        let mut cursor: Option<MessageId> = None;
        let mut failures = 0u32;
        let mut pages = 0usize;

        loop {
            let batch = match source
                .fetch_history(thread, self.page_size, cursor.as_ref())
                .await
            {
                Ok(batch) => batch,
                Err(e) if !e.is_transient() => {
                    warn!(thread = %thread, error = %e, "history fetch failed, not retrying");
                    return Reconstruction::FetchFailed(e);
                }
                Err(e) => {
                    failures += 1;
                    if failures >= self.max_retries {
                        warn!(thread = %thread, error = %e, "history fetch failed, retries exhausted");
                        return Reconstruction::FetchFailed(e);
                    }
                    let delay = self.retry_delay(&e, failures);
                    warn!(
                        thread = %thread,
                        error = %e,
                        retries_left = self.max_retries - failures,
                        delay_ms = delay.as_millis() as u64,
                        "history fetch failed"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            if batch.is_empty() {
                break;
            }
            pages += 1;

            let mut page = Vec::with_capacity(batch.len());
            for message in &batch {
                if message.kind == MessageKind::ThreadStarter {
                    match starter_metadata(message, bot_id) {
                        Some(meta) => {
                            page.push(Turn::user(meta.prompt.clone()));
                            starter = Some(meta);
                        }
                        None => {
                            info!(thread = %thread, "thread starter is not a conversation request");
                            return Reconstruction::NotAConversation;
                        }
                    }
                    continue;
                }
                if let Some(turn) = history_turn(message, bot_id) {
                    page.push(turn);
                }
            }

            page.reverse();
            page.append(&mut turns);
            turns = page;

            cursor = batch.last().map(|m| m.id.clone());
        }

        let Some(meta) = starter else {
            info!(thread = %thread, pages, "no thread starter found");
            return Reconstruction::NotAConversation;
        };

        let (system_message, context_file) = match meta.context {
            Some(SystemContext::Text(text)) => (Some(Turn::system(text)), None),
            Some(SystemContext::File(url)) => (Some(Turn::system(url.clone())), Some(url)),
            None => (None, None),
        };

        let entry = ConversationEntry {
            messages: turns,
            system_message,
            model: meta.model.unwrap_or_else(|| self.default_model.clone()),
            temperature: meta.temperature,
            token_count: 0,
        };

        info!(
            thread = %thread,
            pages,
            turns = entry.messages.len(),
            model = %entry.model,
            "conversation reconstructed"
        );
        Reconstruction::Reconstructed {
            entry,
            context_file,
        }
    }
}

fn starter_metadata(message: &ChatMessage, bot_id: &UserId) -> Option<StarterMetadata> {
    if &message.author.id != bot_id {
        return None;
    }
    StarterMetadata::parse(message.referenced.as_deref()?)
}

/// Map an ordinary history message to a turn. Notices and messages without
/// text (error embeds, attachments only) carry nothing for the model.
fn history_turn(message: &ChatMessage, bot_id: &UserId) -> Option<Turn> {
    if !message.kind.is_conversational() || message.content.is_empty() {
        return None;
    }
    Some(if &message.author.id == bot_id {
        Turn::assistant(message.content.clone())
    } else {
        Turn::user(message.content.clone())
    })
}
