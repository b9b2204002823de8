use crate::llm::{LLMProvider, LLMRequest};
use crate::types::{ItineraryArtifact, Transcript};
use crate::ui::streaming::ItineraryStreamProcessor;
use crate::ui::{Emission, UIError, UIMessage, UserInterface};
use anyhow::Result;
use tracing::{debug, error, trace};

/// Shown in place of the assistant response when a turn fails
pub const TURN_ERROR_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed,
    /// The transport failed, carries the error description
    Failed(String),
}

/// Runs one assistant turn: streams the response, splits it into chat and
/// itinerary text and applies both to the session state and the UI.
///
/// The user message must already be in the transcript. Dropping the future
/// returned by [`run`](TurnOrchestrator::run) cancels the turn, leaving the
/// chat text received so far in the transcript and any itinerary draft
/// uncommitted.
pub struct TurnOrchestrator<'a> {
    transcript: &'a mut Transcript,
    itinerary: &'a mut ItineraryArtifact,
    ui: &'a dyn UserInterface,
}

impl<'a> TurnOrchestrator<'a> {
    pub fn new(
        transcript: &'a mut Transcript,
        itinerary: &'a mut ItineraryArtifact,
        ui: &'a dyn UserInterface,
    ) -> Self {
        Self {
            transcript,
            itinerary,
            ui,
        }
    }

    /// Run the turn to completion.
    ///
    /// Transport failures end the turn with [`TurnOutcome::Failed`], only UI
    /// errors are returned as `Err`.
    pub async fn run(mut self, provider: &dyn LLMProvider, request: LLMRequest) -> Result<TurnOutcome> {
        self.transcript.begin_assistant();
        self.ui.begin_turn().await?;

        let mut source = match provider.stream_message(request).await {
            Ok(source) => source,
            Err(e) => return self.fail(e).await,
        };

        let mut processor = ItineraryStreamProcessor::new();
        let mut model_output = String::new();

        loop {
            match source.next_fragment().await {
                Ok(Some(fragment)) => {
                    trace!("Fragment: {:?}", fragment);
                    model_output.push_str(&fragment);
                    for emission in processor.process(&fragment) {
                        self.apply(emission)?;
                    }
                }
                Ok(None) => break,
                // The processor is dropped without flushing
                Err(e) => return self.fail(e).await,
            }
        }

        for emission in processor.finalize() {
            self.apply(emission)?;
        }

        debug!("Turn completed with {} bytes of model output", model_output.len());
        self.transcript.commit_assistant(model_output);
        self.ui.end_turn().await?;
        Ok(TurnOutcome::Completed)
    }

    fn apply(&mut self, emission: Emission) -> Result<(), UIError> {
        match emission {
            Emission::ChatDelta(text) => {
                self.transcript.append_to_assistant(&text);
                self.ui.display_chat_delta(&text)
            }
            Emission::ItineraryStarted => {
                self.itinerary.begin_draft();
                self.ui.display_itinerary(self.itinerary)
            }
            Emission::ItineraryDelta(text) => {
                self.itinerary.append_draft(&text);
                self.ui.display_itinerary(self.itinerary)
            }
            Emission::ItineraryComplete(text) => {
                self.itinerary.commit(text);
                self.ui.display_itinerary(self.itinerary)
            }
        }
    }

    async fn fail(self, e: anyhow::Error) -> Result<TurnOutcome> {
        error!("Assistant turn failed: {:#}", e);

        self.transcript.replace_assistant_content(TURN_ERROR_MESSAGE);
        if self.itinerary.discard_draft() {
            self.ui.display_itinerary(self.itinerary)?;
        }
        self.ui
            .display(UIMessage::Error(TURN_ERROR_MESSAGE.to_string()))
            .await?;
        self.ui.end_turn().await?;

        Ok(TurnOutcome::Failed(format!("{e:#}")))
    }
}
