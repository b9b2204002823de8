use crate::llm::Message;
use crate::ui::streaming::strip_marker_literals;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry of the chat transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    /// Text as shown in the transcript
    pub content: String,
    /// Unfiltered model output for assistant turns that produced a response.
    /// Sent back to the model as history so it keeps its own itinerary context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_output: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            model_output: None,
        }
    }

    pub fn assistant() -> Self {
        Self {
            role: ChatRole::Assistant,
            content: String::new(),
            model_output: None,
        }
    }
}

/// Ordered chat history of the session, kept in memory only
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    /// Start the (empty) assistant message that the current turn writes into
    pub fn begin_assistant(&mut self) {
        self.messages.push(ChatMessage::assistant());
    }

    /// The most recent message, if it belongs to the assistant
    pub fn current_assistant(&self) -> Option<&ChatMessage> {
        self.messages
            .last()
            .filter(|message| message.role == ChatRole::Assistant)
    }

    fn current_assistant_mut(&mut self) -> Option<&mut ChatMessage> {
        self.messages
            .last_mut()
            .filter(|message| message.role == ChatRole::Assistant)
    }

    pub fn append_to_assistant(&mut self, text: &str) {
        if let Some(message) = self.current_assistant_mut() {
            message.content.push_str(text);
        }
    }

    pub fn replace_assistant_content(&mut self, text: &str) {
        if let Some(message) = self.current_assistant_mut() {
            message.content = text.to_string();
        }
    }

    /// Commit the current assistant message once its stream has ended.
    ///
    /// Stray marker literals that slipped through a malformed stream are
    /// removed from the shown text.
    pub fn commit_assistant(&mut self, model_output: String) {
        if let Some(message) = self.current_assistant_mut() {
            message.content = strip_marker_literals(&message.content);
            message.model_output = Some(model_output);
        }
    }

    /// Conversation history in the shape sent to the model.
    ///
    /// Assistant messages without model output (failed turns) are left out.
    pub fn history(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter_map(|message| match message.role {
                ChatRole::User => Some(Message::user(message.content.clone())),
                ChatRole::Assistant => message.model_output.clone().map(Message::assistant),
            })
            .collect()
    }
}

/// The itinerary shown on its own surface, next to the chat.
///
/// It outlives single turns: a later turn may regenerate it. While a turn is
/// streaming a new itinerary, the text goes into a draft which replaces the
/// committed itinerary only once the block is complete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItineraryArtifact {
    committed: String,
    draft: Option<String>,
}

impl ItineraryArtifact {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to display: the draft while streaming, otherwise the committed itinerary
    pub fn content(&self) -> &str {
        self.draft.as_deref().unwrap_or(&self.committed)
    }

    pub fn is_streaming(&self) -> bool {
        self.draft.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.content().is_empty()
    }

    pub fn begin_draft(&mut self) {
        self.draft = Some(String::new());
    }

    pub fn append_draft(&mut self, text: &str) {
        self.draft.get_or_insert_with(String::new).push_str(text);
    }

    pub fn commit(&mut self, itinerary: String) {
        self.draft = None;
        self.committed = itinerary;
    }

    /// Drop an unfinished draft, keeping the previously committed itinerary
    pub fn discard_draft(&mut self) -> bool {
        self.draft.take().is_some()
    }

    pub fn clear(&mut self) {
        self.draft = None;
        self.committed.clear();
    }
}
