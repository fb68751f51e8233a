pub mod config;
pub mod error;
pub mod types;

pub use config::RemaiConfig;
pub use error::{RemaiError, TransportError};
