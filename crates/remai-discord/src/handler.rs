use std::sync::{Arc, OnceLock};

use serenity::async_trait;
use serenity::model::application::Interaction as SerenityInteraction;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::{Context, EventHandler};
use tracing::{debug, info, warn};

use remai_router::{Router, Transport};

use crate::convert;
use crate::register;
use crate::transport::DiscordTransport;

/// Serenity event handler feeding the router.
pub struct RemaiHandler {
    pub router: Arc<Router>,
    pub guild: Option<GuildId>,
    /// Built at ready, once the bot's own id is known.
    pub transport: OnceLock<Arc<DiscordTransport>>,
}

impl RemaiHandler {
    pub fn new(router: Arc<Router>, guild: Option<GuildId>) -> Self {
        Self {
            router,
            guild,
            transport: OnceLock::new(),
        }
    }

    fn transport(&self) -> Option<Arc<dyn Transport>> {
        let transport = self.transport.get()?;
        Some(Arc::clone(transport) as Arc<dyn Transport>)
    }
}

#[async_trait]
impl EventHandler for RemaiHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        let transport = DiscordTransport::new(
            Arc::clone(&ctx.http),
            Arc::clone(&ctx.cache),
            ready.user.id.to_string().into(),
        );
        if self.transport.set(Arc::new(transport)).is_err() {
            debug!("transport already built, keeping it");
        }
        info!(name = %ready.user.name, "Discord bot connected");

        if let Err(e) = register::register(&ctx.http, self.guild, &self.router.specs()).await {
            warn!(error = %e, "failed to register slash commands");
        }
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let Some(transport) = self.transport() else {
            debug!(message = %msg.id, "message before ready, ignoring");
            return;
        };
        self.router
            .dispatch_message(transport, convert::chat_message(&msg))
            .await;
    }

    async fn interaction_create(&self, _ctx: Context, interaction: SerenityInteraction) {
        let SerenityInteraction::Command(command) = interaction else {
            return;
        };
        let Some(transport) = self.transport.get() else {
            debug!(interaction = %command.id, "interaction before ready, ignoring");
            return;
        };

        let interaction = convert::interaction(&command);
        let id = interaction.id.clone();
        transport.track(command);
        self.router
            .dispatch_interaction(Arc::clone(transport) as Arc<dyn Transport>, interaction)
            .await;
        transport.forget(&id);
    }
}
