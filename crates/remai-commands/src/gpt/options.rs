use remai_conversation::starter::{
    FIELD_CONTEXT, FIELD_CONTEXT_FILE, FIELD_MODEL, FIELD_PROMPT, FIELD_TEMPERATURE,
};
use remai_router::{CommandOptions, OptionError, OptionMap, OptionSpec};

use crate::middleware::PromptOptions;

pub const OPTION_PROMPT: &str = "prompt";
pub const OPTION_CONTEXT: &str = "context";
pub const OPTION_CONTEXT_FILE: &str = "context-file";
pub const OPTION_MODEL: &str = "model";
pub const OPTION_TEMPERATURE: &str = "temperature";

pub const TEMPERATURE_MIN: f64 = 0.0;
pub const TEMPERATURE_MAX: f64 = 2.0;

/// Parsed options of one `gpt` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct GptOptions {
    pub prompt: String,
    pub context: Option<String>,
    /// URL of the uploaded context file.
    pub context_file: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

impl CommandOptions for GptOptions {
    fn from_options(options: &OptionMap) -> Result<Self, OptionError> {
        let prompt = options.required_string(OPTION_PROMPT)?;
        if prompt.trim().is_empty() {
            return Err(OptionError::Invalid {
                name: OPTION_PROMPT.to_string(),
                reason: "prompt cannot be empty".to_string(),
            });
        }
        Ok(Self {
            prompt,
            context: options
                .string(OPTION_CONTEXT)?
                .filter(|c| !c.trim().is_empty()),
            context_file: options.attachment_url(OPTION_CONTEXT_FILE)?,
            model: options.string(OPTION_MODEL)?,
            temperature: options.number(OPTION_TEMPERATURE)?.map(|t| t as f32),
        })
    }
}

impl PromptOptions for GptOptions {
    fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Option schema. The model option is only offered when there is a choice
/// to make; the first model is the default.
pub fn schema(models: &[String]) -> Vec<OptionSpec> {
    let mut specs = vec![
        OptionSpec::string(OPTION_PROMPT, "ChatGPT prompt").required(),
        OptionSpec::string(
            OPTION_CONTEXT,
            "Sets context that guides the AI assistant's behavior during the conversation",
        ),
        OptionSpec::attachment(
            OPTION_CONTEXT_FILE,
            "File that sets context that guides the AI assistant's behavior during the conversation",
        ),
    ];

    if models.len() > 1 {
        let mut model = OptionSpec::string(OPTION_MODEL, "GPT model");
        for (i, name) in models.iter().enumerate() {
            let label = if i == 0 {
                format!("{name} (Default)")
            } else {
                name.clone()
            };
            model = model.choice(label, name.clone());
        }
        specs.push(model);
    }

    specs.push(
        OptionSpec::number(
            OPTION_TEMPERATURE,
            "What sampling temperature to use, between 0.0 and 2.0. Lower - more focused and deterministic",
        )
        .range(TEMPERATURE_MIN, TEMPERATURE_MAX),
    );
    specs
}

/// Embed field label of each option, as read back from a thread starter.
pub fn field_label(option: &str) -> &'static str {
    match option {
        OPTION_CONTEXT => FIELD_CONTEXT,
        OPTION_CONTEXT_FILE => FIELD_CONTEXT_FILE,
        OPTION_MODEL => FIELD_MODEL,
        OPTION_TEMPERATURE => FIELD_TEMPERATURE,
        _ => FIELD_PROMPT,
    }
}
