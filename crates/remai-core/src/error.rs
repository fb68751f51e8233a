use thiserror::Error;

/// Startup failures of the bot itself.
#[derive(Debug, Error)]
pub enum RemaiError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures reported by the chat transport (history reads, sends, edits,
/// thread lock toggles, interaction responses).
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("transport not ready: {0}")]
    NotReady(String),
}

impl TransportError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Request(_) | TransportError::RateLimited { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RemaiError>;
