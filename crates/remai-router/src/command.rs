use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use remai_core::types::{ChatMessage, Interaction};

use crate::context::{Context, MessageContext};
use crate::options::{CommandOptions, OptionMap, OptionSpec};
use crate::transport::Transport;

/// A link of a structured-invocation chain: middleware or final handler.
#[async_trait]
pub trait Handler<O>: Send + Sync {
    async fn handle(&self, ctx: &mut Context<O>);
}

/// A link of a message chain. Returns whether the message was consumed.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, ctx: &mut MessageContext) -> bool;
}

/// Registration data handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    pub options: Vec<OptionSpec>,
    pub dm_permission: bool,
}

pub struct Command<O> {
    name: String,
    description: String,
    options: Vec<OptionSpec>,
    dm_permission: bool,
    handler: Arc<dyn Handler<O>>,
    middlewares: Vec<Arc<dyn Handler<O>>>,
    message_handler: Option<Arc<dyn MessageHandler>>,
    message_middlewares: Vec<Arc<dyn MessageHandler>>,
}

impl<O: CommandOptions> Command<O> {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl Handler<O> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
            dm_permission: false,
            handler: Arc::new(handler),
            middlewares: Vec::new(),
            message_handler: None,
            message_middlewares: Vec::new(),
        }
    }

    pub fn option(mut self, spec: OptionSpec) -> Self {
        self.options.push(spec);
        self
    }

    pub fn dm_permission(mut self, allowed: bool) -> Self {
        self.dm_permission = allowed;
        self
    }

    /// Append a middleware; middlewares run in the order they were added.
    pub fn middleware(mut self, middleware: impl Handler<O> + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn message_handler(mut self, handler: impl MessageHandler + 'static) -> Self {
        self.message_handler = Some(Arc::new(handler));
        self
    }

    pub fn message_middleware(mut self, middleware: impl MessageHandler + 'static) -> Self {
        self.message_middlewares.push(Arc::new(middleware));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Options-erased view of a command, as stored by the router.
#[async_trait]
pub(crate) trait DynCommand: Send + Sync {
    fn name(&self) -> &str;

    fn spec(&self) -> CommandSpec;

    fn handles_messages(&self) -> bool;

    async fn run_interaction(&self, transport: Arc<dyn Transport>, interaction: Interaction);

    async fn run_message(&self, transport: Arc<dyn Transport>, message: ChatMessage) -> bool;
}

#[async_trait]
impl<O: CommandOptions> DynCommand for Command<O> {
    fn name(&self) -> &str {
        &self.name
    }

    fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            options: self.options.clone(),
            dm_permission: self.dm_permission,
        }
    }

    fn handles_messages(&self) -> bool {
        self.message_handler.is_some()
    }

    async fn run_interaction(&self, transport: Arc<dyn Transport>, interaction: Interaction) {
        let raw = OptionMap::new(&interaction.options);
        let parsed = raw
            .validate(&self.options)
            .and_then(|_| O::from_options(&raw));

        let options = match parsed {
            Ok(options) => options,
            Err(e) => {
                warn!(command = %self.name, error = %e, "rejected invocation options");
                let ctx = Context::new(transport, interaction, (), VecDeque::new());
                ctx.error("❌ Invalid options", e.to_string()).await;
                return;
            }
        };

        let mut chain: VecDeque<Arc<dyn Handler<O>>> =
            self.middlewares.iter().cloned().collect();
        chain.push_back(Arc::clone(&self.handler));

        let mut ctx = Context::new(transport, interaction, options, chain);
        ctx.next().await;
        if ctx.remaining() > 0 {
            debug!(command = %self.name, skipped = ctx.remaining(), "chain stopped early");
        }
    }

    async fn run_message(&self, transport: Arc<dyn Transport>, message: ChatMessage) -> bool {
        let Some(handler) = &self.message_handler else {
            return false;
        };
        let mut chain: VecDeque<Arc<dyn MessageHandler>> =
            self.message_middlewares.iter().cloned().collect();
        chain.push_back(Arc::clone(handler));

        let mut ctx = MessageContext::new(transport, message, chain);
        ctx.next().await
    }
}
