//! Token accounting.
//!
//! Counts follow the chat-completion framing: every message costs a fixed
//! overhead plus the encoded role and content (and name, when set), and the
//! whole request is primed with a few extra tokens for the assistant reply.

use std::sync::Arc;

use dashmap::DashMap;
use tiktoken_rs::CoreBPE;
use tracing::debug;

use remai_core::types::Turn;

const TOKENS_PER_MESSAGE: usize = 3;
const TOKENS_PER_NAME: usize = 1;
const REPLY_PRIMING_TOKENS: usize = 3;

/// Model-keyed token estimation. `None` means the model is not supported and
/// callers skip whatever depended on the count.
pub trait TokenAccountant: Send + Sync {
    /// Cost of a single turn inside a request.
    fn count_turn(&self, turn: &Turn, model: &str) -> Option<usize>;

    /// Cost of a full request made of `turns`.
    fn count_turns(&self, turns: &[Turn], model: &str) -> Option<usize> {
        let mut total = REPLY_PRIMING_TOKENS;
        for turn in turns {
            total += self.count_turn(turn, model)?;
        }
        Some(total)
    }
}

/// Exact BPE counts via `tiktoken-rs`. Encoders are built once per model and
/// shared; models tiktoken does not know are remembered as unsupported.
#[derive(Default)]
pub struct TiktokenAccountant {
    encoders: DashMap<String, Option<Arc<CoreBPE>>>,
}

impl TiktokenAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    fn encoder(&self, model: &str) -> Option<Arc<CoreBPE>> {
        if let Some(cached) = self.encoders.get(model) {
            return cached.clone();
        }
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => Some(Arc::new(bpe)),
            Err(e) => {
                debug!(model, error = %e, "no tokenizer for model");
                None
            }
        };
        self.encoders.insert(model.to_string(), bpe.clone());
        bpe
    }
}

fn encoded_turn(bpe: &CoreBPE, turn: &Turn) -> usize {
    let mut tokens = TOKENS_PER_MESSAGE;
    tokens += bpe.encode_with_special_tokens(turn.role.as_str()).len();
    tokens += bpe.encode_with_special_tokens(&turn.content).len();
    if let Some(name) = &turn.name {
        tokens += TOKENS_PER_NAME;
        tokens += bpe.encode_with_special_tokens(name).len();
    }
    tokens
}

impl TokenAccountant for TiktokenAccountant {
    fn count_turn(&self, turn: &Turn, model: &str) -> Option<usize> {
        let bpe = self.encoder(model)?;
        Some(encoded_turn(&bpe, turn))
    }

    fn count_turns(&self, turns: &[Turn], model: &str) -> Option<usize> {
        let bpe = self.encoder(model)?;
        let total = turns.iter().map(|t| encoded_turn(&bpe, t)).sum::<usize>();
        Some(total + REPLY_PRIMING_TOKENS)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Every turn costs exactly `per_turn` tokens for models in `supported`.
    pub(crate) struct FixedCost {
        pub per_turn: usize,
        pub supported: &'static [&'static str],
    }

    impl TokenAccountant for FixedCost {
        fn count_turn(&self, _turn: &Turn, model: &str) -> Option<usize> {
            self.supported.contains(&model).then_some(self.per_turn)
        }

        fn count_turns(&self, turns: &[Turn], model: &str) -> Option<usize> {
            self.supported
                .contains(&model)
                .then_some(turns.len() * self.per_turn)
        }
    }

    #[test]
    fn known_model_is_counted_with_framing() {
        let accountant = TiktokenAccountant::new();
        let turn = Turn::user("hello world");
        let single = accountant.count_turn(&turn, "gpt-3.5-turbo").unwrap();
        // overhead + "user" + "hello world"
        assert_eq!(single, TOKENS_PER_MESSAGE + 1 + 2);

        let total = accountant
            .count_turns(&[turn.clone(), turn], "gpt-3.5-turbo")
            .unwrap();
        assert_eq!(total, single * 2 + REPLY_PRIMING_TOKENS);
    }

    #[test]
    fn name_adds_its_own_cost() {
        let accountant = TiktokenAccountant::new();
        let plain = Turn::user("hi");
        let mut named = plain.clone();
        named.name = Some("alice".into());
        let a = accountant.count_turn(&plain, "gpt-4").unwrap();
        let b = accountant.count_turn(&named, "gpt-4").unwrap();
        assert!(b >= a + TOKENS_PER_NAME + 1);
    }

    #[test]
    fn unknown_model_is_unsupported() {
        let accountant = TiktokenAccountant::new();
        assert_eq!(accountant.count_turn(&Turn::user("hi"), "not-a-model"), None);
        assert_eq!(accountant.count_turns(&[], "not-a-model"), None);
        // the miss is remembered
        assert!(accountant.encoders.get("not-a-model").is_some());
    }
}
