use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use remai_agent::{CompletionProvider, OpenAiProvider};
use remai_commands::{gpt, image, info as info_command, GptState};
use remai_conversation::TiktokenAccountant;
use remai_core::RemaiConfig;
use remai_discord::DiscordAdapter;
use remai_router::Router;

#[derive(Parser, Debug)]
#[command(name = "remai")]
#[command(about = "Discord bot holding ChatGPT conversations in threads")]
#[command(version)]
struct Cli {
    /// Config file (default ~/.remai/remai.toml)
    #[arg(long, env = "REMAI_CONFIG")]
    config: Option<String>,

    /// Register slash commands in this guild only
    #[arg(long)]
    guild: Option<String>,

    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    discord_token: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_TOKEN", hide_env_values = true)]
    openai_token: Option<String>,

    /// Remove the registered slash commands on shutdown
    #[arg(long)]
    remove_commands: Option<bool>,
}

impl Cli {
    /// Flags win over the config file and REMAI_* variables.
    fn apply(&self, config: &mut RemaiConfig) {
        if let Some(guild) = &self.guild {
            config.discord.guild_id = Some(guild.clone());
        }
        if let Some(token) = &self.discord_token {
            config.discord.bot_token = token.clone();
        }
        if let Some(key) = &self.openai_token {
            config.openai.api_key = key.clone();
        }
        if let Some(remove) = self.remove_commands {
            config.discord.remove_commands_on_shutdown = remove;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "remai=info,remai_gateway=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = RemaiConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;
    if config.openai.api_key.is_empty() {
        anyhow::bail!("no OpenAI API key configured (openai.api_key or --openai-token)");
    }

    let provider: Arc<dyn CompletionProvider> = Arc::new(OpenAiProvider::new(
        config.openai.api_key.clone(),
        Some(config.openai.base_url.clone()),
    ));
    let state = Arc::new(GptState::from_config(
        &config,
        Arc::clone(&provider),
        Arc::new(TiktokenAccountant::new()),
    ));

    let mut router = Router::new(config.router.message_dispatch);
    router.register(info_command::command());
    router.register(gpt::command(state));
    if config.openai.image_generation {
        router.register(image::command(provider));
    }
    info!(
        commands = router.len(),
        models = ?config.openai.completion_models,
        dispatch = ?config.router.message_dispatch,
        "router ready"
    );

    DiscordAdapter::new(&config.discord, Arc::new(router))
        .run(shutdown_signal())
        .await?;
    info!("bye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
