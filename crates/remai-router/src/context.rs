use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::warn;

use remai_core::types::{ChatMessage, Embed, Interaction, MessageRef, OutgoingMessage};
use remai_core::TransportError;

use crate::command::{Handler, MessageHandler};
use crate::transport::Transport;

/// One structured invocation in flight.
pub struct Context<O> {
    pub transport: Arc<dyn Transport>,
    pub interaction: Interaction,
    pub options: O,
    chain: VecDeque<Arc<dyn Handler<O>>>,
    deferred: bool,
}

impl<O: Send + Sync + 'static> Context<O> {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        interaction: Interaction,
        options: O,
        chain: VecDeque<Arc<dyn Handler<O>>>,
    ) -> Self {
        Self {
            transport,
            interaction,
            options,
            chain,
            deferred: false,
        }
    }

    /// Run the next link of the chain. Does nothing once the handler ran.
    pub fn next(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Some(link) = self.chain.pop_front() {
                link.handle(self).await;
            }
        })
    }

    /// Links not yet run, handler included.
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    pub async fn defer(&mut self, ephemeral: bool) -> Result<(), TransportError> {
        self.transport.defer(&self.interaction, ephemeral).await?;
        self.deferred = true;
        Ok(())
    }

    pub async fn respond(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        self.transport.respond(&self.interaction, message).await
    }

    pub async fn followup(&self, message: OutgoingMessage) -> Result<MessageRef, TransportError> {
        self.transport.followup(&self.interaction, message).await
    }

    /// Ephemeral error embed, as a follow-up when the interaction was
    /// deferred and as the initial response otherwise. Failures are logged.
    pub async fn error(&self, title: &str, description: impl Into<String>) {
        let message = OutgoingMessage::embed(Embed::error(title, description)).ephemeral();
        let result = if self.deferred {
            self.followup(message).await.map(|_| ())
        } else {
            self.respond(message).await
        };
        if let Err(e) = result {
            warn!(
                interaction = %self.interaction.id,
                error = %e,
                "failed to report error to user"
            );
        }
    }
}

/// One free-form message offered to one command.
pub struct MessageContext {
    pub transport: Arc<dyn Transport>,
    pub message: ChatMessage,
    chain: VecDeque<Arc<dyn MessageHandler>>,
}

impl MessageContext {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        message: ChatMessage,
        chain: VecDeque<Arc<dyn MessageHandler>>,
    ) -> Self {
        Self {
            transport,
            message,
            chain,
        }
    }

    /// Run the next link. Resolves to the link's hit flag; `false` once the
    /// chain is exhausted.
    pub fn next(&mut self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            match self.chain.pop_front() {
                Some(link) => link.handle(self).await,
                None => false,
            }
        })
    }

    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    /// Reply to the triggering message in its channel.
    pub async fn reply(&self, content: impl Into<String>) -> Result<MessageRef, TransportError> {
        let message = OutgoingMessage::text(content).reply_to(self.message.id.clone());
        self.transport
            .send_message(&self.message.channel_id, message)
            .await
    }

    pub async fn embed_reply(&self, embed: Embed) -> Result<MessageRef, TransportError> {
        let message = OutgoingMessage::embed(embed).reply_to(self.message.id.clone());
        self.transport
            .send_message(&self.message.channel_id, message)
            .await
    }

    pub async fn typing(&self) {
        if let Err(e) = self
            .transport
            .broadcast_typing(&self.message.channel_id)
            .await
        {
            warn!(channel = %self.message.channel_id, error = %e, "typing indicator failed");
        }
    }
}
