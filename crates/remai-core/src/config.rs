use std::collections::HashMap;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{RemaiError, Result};

pub const DEFAULT_CACHE_SIZE: usize = 64;
/// Largest page the transport serves for history reads.
pub const MAX_HISTORY_PAGE_SIZE: u8 = 100;
pub const DEFAULT_HISTORY_MAX_RETRIES: u32 = 4;
pub const DEFAULT_HISTORY_RETRY_BACKOFF_MS: u64 = 200;
/// Auto-archive durations (minutes) the transport accepts for new threads.
pub const AUTO_ARCHIVE_CHOICES: [u16; 4] = [60, 1440, 4320, 10080];

pub const GPT_3_5_TURBO: &str = "gpt-3.5-turbo";
pub const GPT_3_5_TURBO_16K: &str = "gpt-3.5-turbo-16k";
pub const GPT_4_TURBO_PREVIEW: &str = "gpt-4-turbo-preview";

/// Top-level config (remai.toml + REMAI_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemaiConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default = "default_pricing")]
    pub pricing: HashMap<String, ModelPricing>,
}

impl Default for RemaiConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig::default(),
            openai: OpenAiConfig::default(),
            conversation: ConversationConfig::default(),
            router: RouterConfig::default(),
            pricing: default_pricing(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Register commands for this guild only. Global registration when unset.
    pub guild_id: Option<String>,
    /// Remove the registered commands when the process shuts down.
    #[serde(default = "bool_true")]
    pub remove_commands_on_shutdown: bool,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            guild_id: None,
            remove_commands_on_shutdown: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// Models offered by the `gpt` command. The first one is the default.
    #[serde(default = "default_completion_models")]
    pub completion_models: Vec<String>,
    /// Model used to generate thread titles.
    #[serde(default = "default_title_model")]
    pub title_model: String,
    /// Run prompts through the moderation endpoint before answering.
    #[serde(default)]
    pub moderation: bool,
    /// Offer the `image` command.
    #[serde(default = "bool_true")]
    pub image_generation: bool,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            completion_models: default_completion_models(),
            title_model: default_title_model(),
            moderation: false,
            image_generation: true,
        }
    }
}

impl OpenAiConfig {
    /// First enabled model.
    pub fn default_model(&self) -> &str {
        self.completion_models
            .first()
            .map(String::as_str)
            .unwrap_or(GPT_3_5_TURBO)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Maximum number of conversation threads kept in memory.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u8,
    #[serde(default = "default_history_max_retries")]
    pub history_max_retries: u32,
    #[serde(default = "default_history_retry_backoff_ms")]
    pub history_retry_backoff_ms: u64,
    #[serde(default = "default_auto_archive")]
    pub thread_auto_archive_minutes: u16,
    /// Per-model token threshold above which the oldest turns are dropped.
    /// Models without an entry are never truncated.
    #[serde(default = "default_context_windows")]
    pub context_windows: HashMap<String, usize>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
            history_page_size: default_history_page_size(),
            history_max_retries: default_history_max_retries(),
            history_retry_backoff_ms: default_history_retry_backoff_ms(),
            thread_auto_archive_minutes: default_auto_archive(),
            context_windows: default_context_windows(),
        }
    }
}

/// How the router offers an incoming message to message-capable commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageDispatch {
    /// Every message-capable command sees every message.
    #[default]
    All,
    /// Stop at the first command that reports a hit.
    FirstHit,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub message_dispatch: MessageDispatch,
}

/// USD price per token.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub prompt: f64,
    pub completion: f64,
}

fn bool_true() -> bool {
    true
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_completion_models() -> Vec<String> {
    vec![GPT_3_5_TURBO.to_string()]
}
fn default_title_model() -> String {
    GPT_3_5_TURBO.to_string()
}
fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}
fn default_history_page_size() -> u8 {
    MAX_HISTORY_PAGE_SIZE
}
fn default_history_max_retries() -> u32 {
    DEFAULT_HISTORY_MAX_RETRIES
}
fn default_history_retry_backoff_ms() -> u64 {
    DEFAULT_HISTORY_RETRY_BACKOFF_MS
}
fn default_auto_archive() -> u16 {
    60
}
fn default_context_windows() -> HashMap<String, usize> {
    HashMap::from([
        (GPT_3_5_TURBO_16K.to_string(), 14_000),
        (GPT_4_TURBO_PREVIEW.to_string(), 20_000),
    ])
}
fn default_pricing() -> HashMap<String, ModelPricing> {
    HashMap::from([
        (
            GPT_3_5_TURBO_16K.to_string(),
            ModelPricing {
                prompt: 0.000001,
                completion: 0.000002,
            },
        ),
        (
            GPT_4_TURBO_PREVIEW.to_string(),
            ModelPricing {
                prompt: 0.00001,
                completion: 0.00003,
            },
        ),
    ])
}

impl RemaiConfig {
    /// Load config from a TOML file with REMAI_* env var overrides.
    ///
    /// Nested keys use a double underscore:
    /// `REMAI_CONVERSATION__CACHE_SIZE=128`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: RemaiConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("REMAI_").split("__"))
            .extract()
            .map_err(|e| RemaiError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the core relies on.
    pub fn validate(&self) -> Result<()> {
        if self.openai.completion_models.is_empty() {
            return Err(RemaiError::Config(
                "openai.completion_models must list at least one model".to_string(),
            ));
        }
        if self.conversation.cache_size == 0 {
            return Err(RemaiError::Config(
                "conversation.cache_size must be greater than zero".to_string(),
            ));
        }
        let page = self.conversation.history_page_size;
        if page == 0 || page > MAX_HISTORY_PAGE_SIZE {
            return Err(RemaiError::Config(format!(
                "conversation.history_page_size must be within 1..={MAX_HISTORY_PAGE_SIZE}, got {page}"
            )));
        }
        let archive = self.conversation.thread_auto_archive_minutes;
        if !AUTO_ARCHIVE_CHOICES.contains(&archive) {
            return Err(RemaiError::Config(format!(
                "conversation.thread_auto_archive_minutes must be one of {AUTO_ARCHIVE_CHOICES:?}, got {archive}"
            )));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.remai/remai.toml", home)
}
