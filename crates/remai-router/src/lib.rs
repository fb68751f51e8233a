//! Command registry and dispatcher.
//!
//! A [`Command`] owns a structured slash-command entry point and, optionally,
//! a free-form message entry point. Each entry point runs as a linear chain:
//! middlewares first, handler last. Every link advances explicitly with
//! `next()`; a link that does not call it ends the chain.

pub mod command;
pub mod context;
pub mod options;
pub mod router;
pub mod transport;

pub use command::{Command, CommandSpec, Handler, MessageHandler};
pub use context::{Context, MessageContext};
pub use options::{CommandOptions, OptionChoice, OptionError, OptionKind, OptionMap, OptionSpec};
pub use router::Router;
pub use transport::Transport;
