use std::collections::HashMap;

use remai_agent::Usage;
use remai_core::config::ModelPricing;
use remai_core::types::{Embed, EmbedFooter};

use crate::OPENAI_ICON_URL;

/// "Completion Tokens: N, Total: M", plus the dollar cost when the model's
/// pricing is known.
pub fn usage_footer(usage: &Usage, model: &str, pricing: &HashMap<String, ModelPricing>) -> String {
    let mut text = format!(
        "Completion Tokens: {}, Total: {}",
        usage.completion_tokens, usage.total_tokens
    );
    if let Some(price) = pricing.get(model) {
        let cost = f64::from(usage.prompt_tokens) * price.prompt
            + f64::from(usage.completion_tokens) * price.completion;
        text.push_str(&format!("\nLLM Cost: ${cost:.6}"));
    }
    text
}

pub fn usage_embed(usage: &Usage, model: &str, pricing: &HashMap<String, ModelPricing>) -> Embed {
    Embed {
        footer: Some(EmbedFooter {
            text: usage_footer(usage, model, pricing),
            icon_url: Some(OPENAI_ICON_URL.to_string()),
        }),
        ..Embed::default()
    }
}
