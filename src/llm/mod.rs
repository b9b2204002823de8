//! LLM integration for the travel planner
//!
//! This module implements:
//! - The `LLMProvider` trait, which starts a streamed completion for a request
//! - The `FragmentSource` trait through which a turn pulls text fragments
//! - An OpenRouter client speaking the OpenAI compatible SSE protocol
//! - Recording of streamed responses and playback of such recordings


#[cfg(test)]
pub(crate) mod test_utils;

mod utils;

pub mod openrouter;
pub mod recording;
pub mod streaming;
pub mod types;

pub use openrouter::OpenRouterClient;
pub use recording::{APIRecorder, PlaybackProvider};
pub use streaming::FragmentSource;
pub use types::*;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for different LLM provider implementations
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Start a streamed completion for the request.
    ///
    /// Errors returned here happened before any fragment was produced,
    /// errors from the returned source happened mid-stream.
    async fn stream_message(&self, request: LLMRequest) -> Result<Box<dyn FragmentSource>>;
}
