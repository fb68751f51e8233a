use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use remai_core::config::MessageDispatch;
use remai_core::types::{ChatMessage, Interaction};

use crate::command::{Command, CommandSpec, DynCommand};
use crate::options::CommandOptions;
use crate::transport::Transport;

/// Registry of commands, looked up by name.
pub struct Router {
    commands: Vec<Box<dyn DynCommand>>,
    by_name: HashMap<String, usize>,
    message_dispatch: MessageDispatch,
}

impl Router {
    pub fn new(message_dispatch: MessageDispatch) -> Self {
        Self {
            commands: Vec::new(),
            by_name: HashMap::new(),
            message_dispatch,
        }
    }

    /// Add a command. A name that is already taken keeps its first
    /// registration and `false` is returned.
    pub fn register<O: CommandOptions>(&mut self, command: Command<O>) -> bool {
        let name = command.name().to_string();
        if self.by_name.contains_key(&name) {
            info!(command = %name, "duplicate command name, keeping first registration");
            return false;
        }
        self.by_name.insert(name.clone(), self.commands.len());
        self.commands.push(Box::new(command));
        debug!(command = %name, "registered command");
        true
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Schemas of every registered command, in registration order.
    pub fn specs(&self) -> Vec<CommandSpec> {
        self.commands.iter().map(|c| c.spec()).collect()
    }

    /// Run the chain of the command named by `interaction`. Unknown names are
    /// ignored without touching the transport.
    pub async fn dispatch_interaction(
        &self,
        transport: Arc<dyn Transport>,
        interaction: Interaction,
    ) {
        let Some(&index) = self.by_name.get(&interaction.command) else {
            debug!(command = %interaction.command, "no such command, ignoring interaction");
            return;
        };
        let command = &self.commands[index];

        let span = info_span!(
            "interaction",
            dispatch = %Uuid::now_v7(),
            command = %interaction.command,
            id = %interaction.id,
            guild = ?interaction.guild_id.as_ref().map(|g| g.as_str()),
        );
        command
            .run_interaction(transport, interaction)
            .instrument(span)
            .await;
    }

    /// Offer `message` to the message-capable commands in registration order.
    /// Returns whether any of them consumed it. With
    /// [`MessageDispatch::FirstHit`] the first consumer ends the dispatch.
    pub async fn dispatch_message(&self, transport: Arc<dyn Transport>, message: ChatMessage) -> bool {
        let span = info_span!(
            "message",
            dispatch = %Uuid::now_v7(),
            channel = %message.channel_id,
            id = %message.id,
        );

        async {
            let mut any_hit = false;
            for command in self.commands.iter().filter(|c| c.handles_messages()) {
                let hit = command
                    .run_message(Arc::clone(&transport), message.clone())
                    .await;
                if hit {
                    debug!(command = %command.name(), "message consumed");
                    any_hit = true;
                    if self.message_dispatch == MessageDispatch::FirstHit {
                        break;
                    }
                }
            }
            any_hit
        }
        .instrument(span)
        .await
    }
}
