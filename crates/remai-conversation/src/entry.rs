use remai_core::types::Turn;

use crate::tokens::TokenAccountant;

/// Per-thread conversation payload.
///
/// `messages` holds user and assistant turns oldest first. The system turn is
/// stored apart and only prepended when a request is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationEntry {
    pub(crate) messages: Vec<Turn>,
    pub(crate) system_message: Option<Turn>,
    pub(crate) model: String,
    pub(crate) temperature: Option<f32>,
    pub(crate) token_count: usize,
}

impl ConversationEntry {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            system_message: None,
            model: model.into(),
            temperature: None,
            token_count: 0,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn messages(&self) -> &[Turn] {
        &self.messages
    }

    pub fn system_message(&self) -> Option<&Turn> {
        self.system_message.as_ref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn push_user(&mut self, content: impl Into<String>, accountant: &dyn TokenAccountant) {
        self.messages.push(Turn::user(content));
        self.recount(accountant);
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, accountant: &dyn TokenAccountant) {
        self.messages.push(Turn::assistant(content));
        self.recount(accountant);
    }

    /// Replace the system turn. Content is wrapped as a `system` turn.
    pub fn set_system_message(
        &mut self,
        content: Option<String>,
        accountant: &dyn TokenAccountant,
    ) {
        self.system_message = content.map(Turn::system);
        self.recount(accountant);
    }

    pub fn set_model(&mut self, model: impl Into<String>, accountant: &dyn TokenAccountant) {
        self.model = model.into();
        self.recount(accountant);
    }

    /// Record a completed answer. The API-reported total becomes the new
    /// token count, since it covers exactly the request that was just sent
    /// plus the reply.
    pub fn record_reply(&mut self, content: impl Into<String>, total_tokens: usize) {
        self.messages.push(Turn::assistant(content));
        self.token_count = total_tokens;
    }

    /// Recompute `token_count` over the full request. Unsupported models keep
    /// the previous value.
    pub fn recount(&mut self, accountant: &dyn TokenAccountant) {
        if let Some(count) = accountant.count_turns(&self.request_turns(), &self.model) {
            self.token_count = count;
        }
    }

    /// Turns in request order: system first when present.
    pub fn request_turns(&self) -> Vec<Turn> {
        self.system_message
            .iter()
            .chain(self.messages.iter())
            .cloned()
            .collect()
    }

    pub(crate) fn pop_oldest(&mut self) -> Option<Turn> {
        if self.messages.is_empty() {
            None
        } else {
            Some(self.messages.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::tests::FixedCost;
    use remai_core::types::Role;

    const TEN: FixedCost = FixedCost {
        per_turn: 10,
        supported: &["m"],
    };

    #[test]
    fn system_message_is_kept_apart_but_sent_first() {
        let mut entry = ConversationEntry::new("m");
        entry.push_user("hi", &TEN);
        entry.set_system_message(Some("be terse".into()), &TEN);

        assert_eq!(entry.messages().len(), 1);
        let turns = entry.request_turns();
        assert_eq!(turns[0].role, Role::System);
        assert_eq!(turns[1].content, "hi");
        assert_eq!(entry.token_count(), 20);
    }

    #[test]
    fn every_mutator_recounts() {
        let mut entry = ConversationEntry::new("m");
        entry.push_user("a", &TEN);
        entry.push_assistant("b", &TEN);
        assert_eq!(entry.token_count(), 20);

        entry.set_system_message(None, &TEN);
        assert_eq!(entry.token_count(), 20);

        // unsupported model keeps the last known count
        entry.set_model("other", &TEN);
        assert_eq!(entry.token_count(), 20);
    }

    #[test]
    fn reply_takes_reported_usage() {
        let mut entry = ConversationEntry::new("m");
        entry.push_user("q", &TEN);
        entry.record_reply("a", 42);
        assert_eq!(entry.messages().last().map(|t| t.role), Some(Role::Assistant));
        assert_eq!(entry.token_count(), 42);
    }
}
