pub mod streaming;
pub mod terminal;

use crate::types::ItineraryArtifact;
use async_trait::async_trait;
pub use streaming::Emission;
use thiserror::Error;

#[derive(Debug, Clone)]
pub enum UIMessage {
    // Informational output, e.g. command results
    Info(String),
    // A turn failed, shown in place of the assistant response
    Error(String),
    // Show the current itinerary on request
    Itinerary(String),
}

#[derive(Error, Debug)]
pub enum UIError {
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Line editor error: {0}")]
    LineEditor(String),
    #[error("Input closed")]
    InputClosed,
}

#[async_trait]
pub trait UserInterface: Send + Sync {
    /// Display a message to the user
    async fn display(&self, message: UIMessage) -> Result<(), UIError>;

    /// Get input from the user
    async fn get_input(&self) -> Result<String, UIError>;

    /// Informs the UI that an assistant turn is starting
    async fn begin_turn(&self) -> Result<(), UIError>;

    /// Informs the UI that the assistant turn has ended
    async fn end_turn(&self) -> Result<(), UIError>;

    /// Append streamed text to the live assistant message
    fn display_chat_delta(&self, text: &str) -> Result<(), UIError>;

    /// Re-render the itinerary surface after it changed
    fn display_itinerary(&self, itinerary: &ItineraryArtifact) -> Result<(), UIError>;
}
