//! Discord transport: serenity event handler, the [`remai_router::Transport`]
//! implementation over Discord's REST API, slash-command registration and the
//! gateway reconnect loop.

pub mod adapter;
pub mod convert;
pub mod error;
pub mod handler;
pub mod register;
pub mod transport;

pub use adapter::DiscordAdapter;
pub use error::DiscordError;
pub use transport::DiscordTransport;
