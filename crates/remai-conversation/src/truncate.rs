use std::collections::HashMap;

use tracing::{debug, warn};

use crate::entry::ConversationEntry;
use crate::tokens::TokenAccountant;

/// Drops the oldest turns of an entry until it fits the model's threshold.
/// Models without a threshold are never truncated; the system turn is never
/// removed.
#[derive(Debug, Clone, Default)]
pub struct TruncationPolicy {
    windows: HashMap<String, usize>,
}

impl TruncationPolicy {
    pub fn new(windows: HashMap<String, usize>) -> Self {
        Self { windows }
    }

    pub fn threshold(&self, model: &str) -> Option<usize> {
        self.windows.get(model).copied()
    }

    /// Recount the entry, then truncate it. Returns the number of turns removed.
    pub fn fit(&self, entry: &mut ConversationEntry, accountant: &dyn TokenAccountant) -> usize {
        entry.recount(accountant);
        self.apply(entry, accountant)
    }

    /// Remove oldest turns while `token_count` is above the threshold,
    /// subtracting each removed turn's own cost. Stops once `messages` is
    /// empty even if the entry is still over budget.
    pub fn apply(&self, entry: &mut ConversationEntry, accountant: &dyn TokenAccountant) -> usize {
        let Some(limit) = self.threshold(&entry.model) else {
            return 0;
        };
        if accountant.count_turns(&[], &entry.model).is_none() {
            debug!(model = %entry.model, "tokenizer unsupported, skipping truncation");
            return 0;
        }

        let mut removed = 0;
        while entry.token_count > limit {
            let Some(turn) = entry.pop_oldest() else {
                warn!(
                    model = %entry.model,
                    tokens = entry.token_count,
                    limit,
                    "conversation still over budget with no turns left"
                );
                break;
            };
            removed += 1;
            match accountant.count_turn(&turn, &entry.model) {
                Some(cost) => entry.token_count = entry.token_count.saturating_sub(cost),
                None => warn!(model = %entry.model, "could not price removed turn"),
            }
        }

        if removed > 0 {
            debug!(
                model = %entry.model,
                removed,
                tokens = entry.token_count,
                limit,
                "truncated conversation"
            );
        }
        removed
    }
}
