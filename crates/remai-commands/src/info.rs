use async_trait::async_trait;
use tracing::warn;

use remai_core::types::{Embed, OutgoingMessage};
use remai_router::{Command, Context, Handler};

use crate::VERSION;

pub const NAME: &str = "info";

struct InfoHandler;

#[async_trait]
impl Handler<()> for InfoHandler {
    async fn handle(&self, ctx: &mut Context<()>) {
        let embed = Embed {
            title: Some("Bot Version".to_string()),
            description: Some(format!("Version: {VERSION}")),
            color: Some(0x00bfff),
            ..Embed::default()
        };
        if let Err(e) = ctx.respond(OutgoingMessage::embed(embed).ephemeral()).await {
            warn!(interaction = %ctx.interaction.id, error = %e, "failed to answer info");
        }
    }
}

pub fn command() -> Command<()> {
    Command::new(NAME, "Show information about current version of Rem AI", InfoHandler)
        .dm_permission(true)
}
