use crate::agent::{TurnOrchestrator, TurnOutcome};
use crate::config::Settings;
use crate::llm::{LLMProvider, LLMRequest, Message};
use crate::prompt;
use crate::types::{ItineraryArtifact, Transcript};
use crate::ui::UserInterface;
use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error("Message is required")]
    EmptyMessage,
}

/// Sampling options sent with every request
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&Settings> for SessionOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

/// One conversation with the travel planner.
///
/// Transcript and itinerary live in memory for the lifetime of the session.
pub struct ChatSession {
    provider: Box<dyn LLMProvider>,
    ui: Arc<dyn UserInterface>,
    transcript: Transcript,
    itinerary: ItineraryArtifact,
    options: SessionOptions,
}

impl ChatSession {
    pub fn new(
        provider: Box<dyn LLMProvider>,
        ui: Arc<dyn UserInterface>,
        options: SessionOptions,
    ) -> Self {
        Self {
            provider,
            ui,
            transcript: Transcript::new(),
            itinerary: ItineraryArtifact::new(),
            options,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn itinerary(&self) -> &ItineraryArtifact {
        &self.itinerary
    }

    pub fn ui(&self) -> &Arc<dyn UserInterface> {
        &self.ui
    }

    /// Send a user message and run the assistant turn answering it.
    ///
    /// Blank messages are rejected with [`SessionError::EmptyMessage`] without
    /// contacting the model.
    pub async fn send_user_message(&mut self, text: &str) -> Result<TurnOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage.into());
        }

        let mut messages = self.transcript.history();
        messages.push(Message::user(text));
        let request = LLMRequest {
            system_prompt: prompt::system_prompt_for_today(),
            messages,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };
        debug!(
            "Starting turn with {} messages of history",
            request.messages.len() - 1
        );

        self.transcript.push_user(text);
        TurnOrchestrator::new(&mut self.transcript, &mut self.itinerary, self.ui.as_ref())
            .run(self.provider.as_ref(), request)
            .await
    }

    /// Clean up after a turn whose future was dropped mid-stream.
    ///
    /// An itinerary draft of that turn is discarded, the chat text it produced
    /// stays in the transcript but is not sent back to the model.
    pub fn abandon_turn(&mut self) -> Result<()> {
        info!("Assistant turn cancelled");
        if self.itinerary.discard_draft() {
            self.ui.display_itinerary(&self.itinerary)?;
        }
        Ok(())
    }

    /// Forget the conversation and the itinerary
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.itinerary.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::test_utils::{ScriptedProvider, Step};
    use crate::llm::MessageRole;
    use crate::ui::streaming::test_utils::TestUI;
    use crate::ui::streaming::ITINERARY_PLACEHOLDER;
    use std::time::Duration;

    fn options() -> SessionOptions {
        SessionOptions {
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    #[tokio::test]
    async fn test_empty_message_rejected() -> Result<()> {
        let provider = ScriptedProvider::new();
        let requests = provider.requests();
        let mut session = ChatSession::new(Box::new(provider), Arc::new(TestUI::new()), options());

        let error = session.send_user_message("   \n").await.unwrap_err();

        assert_eq!(
            error.downcast_ref::<SessionError>(),
            Some(&SessionError::EmptyMessage)
        );
        assert_eq!(error.to_string(), "Message is required");
        assert!(requests.lock().unwrap().is_empty());
        assert!(session.transcript().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_history_uses_raw_model_output() -> Result<()> {
        let first = "Here:[ITINERARY_START]Day 1: Porto[ITINERARY_END]";
        let provider = ScriptedProvider::new()
            .with_fragments(&[first])
            .with_fragments(&["Added a wine tasting."]);
        let requests = provider.requests();
        let mut session = ChatSession::new(Box::new(provider), Arc::new(TestUI::new()), options());

        session.send_user_message("Plan a day in Porto").await?;
        session.send_user_message("  Add port wine  ").await?;

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].messages, vec![Message::user("Plan a day in Porto")]);
        assert_eq!(
            requests[1].messages,
            vec![
                Message::user("Plan a day in Porto"),
                Message::assistant(first),
                Message::user("Add port wine"),
            ]
        );
        assert!(requests[1].system_prompt.contains("[ITINERARY_START]"));
        assert_eq!(requests[1].temperature, 0.7);
        assert_eq!(requests[1].max_tokens, 1024);

        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, format!("Here:{ITINERARY_PLACEHOLDER}"));
        assert_eq!(session.itinerary().content(), "Day 1: Porto");
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_turn_left_out_of_history() -> Result<()> {
        let provider = ScriptedProvider::new()
            .with_handshake_error("rate limited")
            .with_fragments(&["Sure!"]);
        let requests = provider.requests();
        let mut session = ChatSession::new(Box::new(provider), Arc::new(TestUI::new()), options());

        let outcome = session.send_user_message("Plan Rome").await?;
        assert!(matches!(outcome, TurnOutcome::Failed(_)));
        session.send_user_message("Plan Rome please").await?;

        let requests = requests.lock().unwrap();
        let roles: Vec<MessageRole> = requests[1].messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::User]);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_turn_keeps_previous_itinerary() -> Result<()> {
        let provider = ScriptedProvider::new()
            .with_fragments(&["[ITINERARY_START]Day 1: Rome[ITINERARY_END]"])
            .with_steps(vec![
                Step::Fragment("New plan:".to_string()),
                Step::Fragment("[ITINERARY_START]Day 1: Pa".to_string()),
                Step::Hang,
            ]);
        let ui = TestUI::new();
        let mut session = ChatSession::new(Box::new(provider), Arc::new(ui.clone()), options());

        session.send_user_message("Plan Rome").await?;
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            session.send_user_message("Actually, Paris"),
        )
        .await;
        assert!(result.is_err(), "Turn should still be streaming");
        assert!(session.itinerary().is_streaming());

        session.abandon_turn()?;

        assert_eq!(session.itinerary().content(), "Day 1: Rome");
        assert!(!session.itinerary().is_streaming());
        assert_eq!(ui.last_itinerary(), Some(("Day 1: Rome".to_string(), false)));

        // Chat text received before the cancellation stays visible
        let last = session.transcript().current_assistant().unwrap();
        assert_eq!(last.content, format!("New plan:{ITINERARY_PLACEHOLDER}"));
        assert_eq!(last.model_output, None);
        assert_eq!(session.transcript().history().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_resets_session() -> Result<()> {
        let provider =
            ScriptedProvider::new().with_fragments(&["[ITINERARY_START]Day 1[ITINERARY_END]"]);
        let mut session = ChatSession::new(Box::new(provider), Arc::new(TestUI::new()), options());

        session.send_user_message("Plan something").await?;
        assert!(!session.itinerary().is_empty());

        session.clear();

        assert!(session.transcript().is_empty());
        assert!(session.itinerary().is_empty());
        Ok(())
    }
}
