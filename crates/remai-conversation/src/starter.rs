//! Conversation metadata carried by the message a thread was started from.
//!
//! The `gpt` command posts an embed whose description is the prompt and whose
//! fields name the context, model and temperature. Older threads carry the
//! prompt in a `Prompt` field instead, and the oldest ones are plain text:
//!
//! ```text
//! <header line>
//! > prompt
//! <label line>
//! > context
//! ```

use tracing::debug;

use remai_core::types::ChatMessage;

pub const FIELD_PROMPT: &str = "Prompt";
pub const FIELD_CONTEXT: &str = "Context";
pub const FIELD_CONTEXT_FILE: &str = "Context file";
pub const FIELD_MODEL: &str = "Model";
pub const FIELD_TEMPERATURE: &str = "Temperature";

/// Where the system message of a conversation came from.
#[derive(Debug, Clone, PartialEq)]
pub enum SystemContext {
    Text(String),
    /// URL of an uploaded file whose text is the system message.
    File(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StarterMetadata {
    pub prompt: String,
    pub context: Option<SystemContext>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

impl StarterMetadata {
    /// Extract metadata from the request message. `None` when no prompt can
    /// be found, meaning the thread was not started by a conversation request.
    pub fn parse(message: &ChatMessage) -> Option<Self> {
        let meta = if message.embeds.is_empty() {
            parse_legacy_text(&message.content)
        } else {
            parse_embeds(message)
        };
        meta.filter(|m| !m.prompt.is_empty())
    }
}

fn parse_embeds(message: &ChatMessage) -> Option<StarterMetadata> {
    let mut prompt = String::new();
    let mut text_context = None;
    let mut file_context = None;
    let mut model = None;
    let mut temperature = None;

    for embed in &message.embeds {
        if let Some(description) = embed.description.as_deref().filter(|d| !d.is_empty()) {
            prompt = description.to_string();
        }
        for field in &embed.fields {
            match field.name.as_str() {
                FIELD_PROMPT => prompt = field.value.clone(),
                FIELD_CONTEXT => text_context = Some(field.value.clone()),
                FIELD_CONTEXT_FILE => file_context = Some(field.value.clone()),
                FIELD_MODEL => model = Some(field.value.clone()),
                FIELD_TEMPERATURE => match field.value.trim().parse::<f32>() {
                    Ok(t) => temperature = Some(t),
                    Err(e) => debug!(
                        message = %message.id,
                        value = %field.value,
                        error = %e,
                        "unparseable temperature in starter message"
                    ),
                },
                _ => {}
            }
        }
    }

    // a context file always wins over inline context
    let context = file_context
        .map(SystemContext::File)
        .or(text_context.map(SystemContext::Text));

    Some(StarterMetadata {
        prompt,
        context,
        model: model.filter(|m| !m.is_empty()),
        temperature,
    })
}

fn parse_legacy_text(content: &str) -> Option<StarterMetadata> {
    if !content.contains('\n') {
        return None;
    }
    let lines: Vec<&str> = content.split('\n').collect();
    let quoted = |i: usize| -> Option<String> {
        lines
            .get(i)
            .copied()
            .map(|l| l.strip_prefix("> ").unwrap_or(l).to_string())
    };

    Some(StarterMetadata {
        prompt: quoted(1)?,
        context: quoted(3).filter(|c| !c.is_empty()).map(SystemContext::Text),
        model: None,
        temperature: None,
    })
}
