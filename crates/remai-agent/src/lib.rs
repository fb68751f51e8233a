//! Completion-API collaborator.
//!
//! The conversation core only sees [`CompletionProvider`]; the OpenAI HTTP
//! client is one implementation of it.

pub mod openai;
pub mod provider;

pub use openai::OpenAiProvider;
pub use provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, GeneratedImage, ImageRequest,
    ModerationVerdict, ProviderError, Usage,
};
