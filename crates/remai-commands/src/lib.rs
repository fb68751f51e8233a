//! Commands served by the bot: the `gpt` conversation command, `image`,
//! `info`, and the middlewares and reply helpers they share.

pub mod ack;
pub mod gpt;
pub mod image;
pub mod info;
pub mod middleware;
pub mod split;

pub use gpt::{GptOptions, GptSettings, GptState};
pub use image::ImageOptions;

/// Bot version reported by `info`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Footer icon of completion replies.
pub const OPENAI_ICON_URL: &str =
    "https://ph-files.imgix.net/b739ac93-2899-4cc1-a893-40ea8afde77e.png";
