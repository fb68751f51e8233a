//! The `image` command: turns a text prompt into DALL·E pictures posted as
//! an embed gallery.

pub mod options;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use remai_agent::{CompletionProvider, GeneratedImage};
use remai_core::types::{Embed, EmbedAuthor, EmbedFooter, OutgoingMessage, UserInfo};
use remai_router::{Command, Context, Handler};

use crate::middleware::{Defer, Moderation};
use crate::OPENAI_ICON_URL;

pub use options::{ImageModel, ImageOptions, ImageQuality, ImageSize, ImageStyle};

pub const NAME: &str = "image";

/// Longest embed author name the transport accepts.
const AUTHOR_NAME_MAX_CHARS: usize = 256;

/// USD per image.
pub fn price(model: ImageModel, size: ImageSize, quality: Option<ImageQuality>) -> f64 {
    let hd = quality == Some(ImageQuality::Hd);
    match (model, size) {
        (ImageModel::DallE2, ImageSize::Square256) => 0.016,
        (ImageModel::DallE2, ImageSize::Square512) => 0.018,
        (ImageModel::DallE2, ImageSize::Square1024) => 0.02,
        (ImageModel::DallE3, ImageSize::Square1024) if hd => 0.08,
        (ImageModel::DallE3, ImageSize::Square1024) => 0.04,
        (ImageModel::DallE3, ImageSize::Wide | ImageSize::Tall) if hd => 0.12,
        (ImageModel::DallE3, ImageSize::Wide | ImageSize::Tall) => 0.08,
        _ => 0.0,
    }
}

/// "Size: WxH", plus the generation cost when it is known.
pub fn usage_footer(opts: &ImageOptions, count: usize) -> String {
    let mut text = format!("Size: {}", opts.size.as_str());
    if count > 1 {
        text.push_str(&format!(", Images: {count}"));
    }
    let cost = price(opts.model, opts.size, opts.quality) * count as f64;
    if cost > 0.0 {
        text.push_str(&format!("\nGeneration Cost: ${cost:.3}"));
    }
    text
}

/// Header embed naming the prompt and its author, then one embed per image.
/// All of them share a URL so the transport renders them as one gallery.
pub fn gallery(user: &UserInfo, opts: &ImageOptions, images: &[GeneratedImage]) -> Vec<Embed> {
    let mut embeds = vec![Embed {
        url: Some(OPENAI_ICON_URL.to_string()),
        author: Some(EmbedAuthor {
            name: opts.prompt.chars().take(AUTHOR_NAME_MAX_CHARS).collect(),
            icon_url: user
                .avatar_url
                .clone()
                .or_else(|| Some(OPENAI_ICON_URL.to_string())),
        }),
        footer: Some(EmbedFooter {
            text: usage_footer(opts, images.len()),
            icon_url: Some(OPENAI_ICON_URL.to_string()),
        }),
        ..Embed::default()
    }];
    embeds.extend(images.iter().map(|image| Embed {
        url: Some(OPENAI_ICON_URL.to_string()),
        image_url: Some(image.url.clone()),
        ..Embed::default()
    }));
    embeds
}

struct ImageHandler {
    provider: Arc<dyn CompletionProvider>,
}

#[async_trait]
impl Handler<ImageOptions> for ImageHandler {
    async fn handle(&self, ctx: &mut Context<ImageOptions>) {
        let req = ctx
            .options
            .request(Some(ctx.interaction.user.id.to_string()));
        info!(
            interaction = %ctx.interaction.id,
            model = %req.model,
            size = %req.size,
            "requesting images"
        );

        let images = match self.provider.generate_image(&req).await {
            Ok(images) => images,
            Err(e) => {
                warn!(interaction = %ctx.interaction.id, error = %e, "image request failed");
                ctx.error("❌ OpenAI API failed", e.user_message()).await;
                return;
            }
        };
        info!(interaction = %ctx.interaction.id, images = images.len(), "images received");

        let message = OutgoingMessage {
            embeds: gallery(&ctx.interaction.user, &ctx.options, &images),
            ..OutgoingMessage::default()
        };
        if let Err(e) = ctx.followup(message).await {
            warn!(interaction = %ctx.interaction.id, error = %e, "failed to post images");
            ctx.error("❌ Discord API Error", e.to_string()).await;
        }
    }
}

/// Build the `image` command. Prompts always go through moderation first.
pub fn command(provider: Arc<dyn CompletionProvider>) -> Command<ImageOptions> {
    let mut command = Command::new(
        NAME,
        "Generate creative images from textual descriptions",
        ImageHandler {
            provider: Arc::clone(&provider),
        },
    )
    .middleware(Defer { ephemeral: false })
    .middleware(Moderation::new(provider));

    for spec in options::schema() {
        command = command.option(spec);
    }
    command
}
