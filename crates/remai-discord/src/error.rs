use reqwest::header::{HeaderMap, RETRY_AFTER};
use serenity::http::HttpError;

use remai_core::TransportError;

/// Wait assumed for a 429 that did not say how long to back off. Serenity's
/// ratelimiter has already waited out the announced delay before such an
/// error reaches us.
pub const DEFAULT_RETRY_AFTER_MS: u64 = 1000;

/// Errors produced by the Discord adapter.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("serenity error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("attachment download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("invalid {what} id: {id:?}")]
    InvalidId { what: &'static str, id: String },

    #[error("unknown interaction {0}")]
    UnknownInteraction(String),

    #[error("no bot token configured")]
    NoToken,

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
}

impl From<DiscordError> for TransportError {
    fn from(e: DiscordError) -> Self {
        match e {
            DiscordError::Serenity(serenity::Error::Http(HttpError::UnsuccessfulRequest(
                ref resp,
            ))) => match resp.status_code.as_u16() {
                404 => TransportError::NotFound {
                    what: "resource",
                    id: resp.url.clone(),
                },
                429 => TransportError::RateLimited {
                    retry_after_ms: DEFAULT_RETRY_AFTER_MS,
                },
                _ => TransportError::Request(e.to_string()),
            },
            DiscordError::InvalidId { what, id } => TransportError::NotFound { what, id },
            DiscordError::UnknownInteraction(id) => TransportError::NotFound {
                what: "interaction",
                id,
            },
            DiscordError::NoToken => TransportError::NotReady(e.to_string()),
            DiscordError::RateLimited { retry_after_ms } => {
                TransportError::RateLimited { retry_after_ms }
            }
            other => TransportError::Request(other.to_string()),
        }
    }
}

/// `Retry-After` in milliseconds. Discord sends fractional seconds.
pub(crate) fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    let secs: f64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| (secs * 1000.0).ceil() as u64)
}

/// Shorthand for `map_err` on serenity calls.
pub(crate) fn request_error(e: serenity::Error) -> TransportError {
    DiscordError::from(e).into()
}
