use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use serenity::model::id::GuildId;
use serenity::Client;
use tracing::{error, info, warn};

use remai_core::config::DiscordConfig;
use remai_router::Router;

use crate::convert;
use crate::error::DiscordError;
use crate::handler::RemaiHandler;
use crate::register;

/// Discord channel adapter.
///
/// Wraps a serenity `Client` and drives the event loop until shutdown.
/// Reconnects whenever the gateway drops.
pub struct DiscordAdapter {
    router: Arc<Router>,
    config: DiscordConfig,
}

impl DiscordAdapter {
    pub fn new(config: &DiscordConfig, router: Arc<Router>) -> Self {
        Self {
            router,
            config: config.clone(),
        }
    }

    fn guild(&self) -> Result<Option<GuildId>, DiscordError> {
        self.config
            .guild_id
            .as_deref()
            .filter(|g| !g.is_empty())
            .map(convert::guild_id)
            .transpose()
    }

    /// Connect and keep reconnecting until `shutdown` resolves. On shutdown
    /// the shards are stopped and, when configured, the slash commands are
    /// removed.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<(), DiscordError> {
        if self.config.bot_token.is_empty() {
            return Err(DiscordError::NoToken);
        }
        let guild = self.guild()?;
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        tokio::pin!(shutdown);

        loop {
            let mut client = loop {
                match self.build_client(intents, guild).await {
                    Ok(c) => break c,
                    Err(e) => {
                        error!("Discord: connect failed ({e}), retrying in 30s");
                        tokio::select! {
                            _ = tokio::time::sleep(Duration::from_secs(30)) => {}
                            _ = &mut shutdown => return Ok(()),
                        }
                    }
                }
            };
            let shards = Arc::clone(&client.shard_manager);
            let http = Arc::clone(&client.http);

            info!("Discord: gateway connecting");
            tokio::select! {
                result = client.start() => match result {
                    Err(e) => warn!("Discord: gateway error ({e}), reconnecting in 5s"),
                    Ok(()) => info!("Discord: gateway stopped cleanly, reconnecting in 5s"),
                },
                _ = &mut shutdown => {
                    info!("Discord: shutting down");
                    shards.shutdown_all().await;
                    if self.config.remove_commands_on_shutdown {
                        if let Err(e) = register::clear(&http, guild).await {
                            warn!(error = %e, "failed to remove slash commands");
                        }
                    }
                    return Ok(());
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                _ = &mut shutdown => return Ok(()),
            }
        }
    }

    async fn build_client(
        &self,
        intents: GatewayIntents,
        guild: Option<GuildId>,
    ) -> Result<Client, serenity::Error> {
        let handler = RemaiHandler::new(Arc::clone(&self.router), guild);
        Client::builder(&self.config.bot_token, intents)
            .event_handler(handler)
            .await
    }
}
