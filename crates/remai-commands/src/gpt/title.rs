//! Detached thread-title generation. Runs after the first answer and never
//! affects it: every failure is only logged.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use remai_agent::{CompletionProvider, CompletionRequest, ProviderError};
use remai_core::types::{ChannelId, Turn};
use remai_router::Transport;

const TITLE_MAX_CHARS: usize = 60;

pub fn spawn_title(
    provider: Arc<dyn CompletionProvider>,
    transport: Arc<dyn Transport>,
    thread: ChannelId,
    model: String,
    turns: Vec<Turn>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let title = match generate_title(provider.as_ref(), &model, &turns).await {
            Ok(Some(title)) => title,
            Ok(None) => {
                debug!(thread = %thread, "title model returned nothing usable");
                return;
            }
            Err(e) => {
                warn!(thread = %thread, error = %e, "failed to generate thread title");
                return;
            }
        };
        if let Err(e) = transport.rename_thread(&thread, &title).await {
            warn!(thread = %thread, error = %e, "failed to rename thread");
        }
    })
}

async fn generate_title(
    provider: &dyn CompletionProvider,
    model: &str,
    turns: &[Turn],
) -> Result<Option<String>, ProviderError> {
    let conversation: String = turns
        .iter()
        .map(|t| format!("{}: {}\n", t.role, t.content))
        .collect();
    let prompt = format!(
        "{conversation}\nGenerate a short and concise title summarizing the conversation in the same language. The title must not contain any quotes. The title should be no longer than {TITLE_MAX_CHARS} characters:"
    );

    let req = CompletionRequest::new(model, vec![Turn::user(prompt)])
        .temperature(Some(0.5))
        .max_tokens(75);
    let resp = provider.complete(&req).await?;
    Ok(clean_title(&resp.content))
}

fn clean_title(raw: &str) -> Option<String> {
    let title: String = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '«' || c == '»')
        .trim()
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect();
    let title = title.trim_end().to_string();
    (!title.is_empty()).then_some(title)
}
