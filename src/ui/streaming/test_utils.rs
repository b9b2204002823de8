//! Common test utilities for the stream processor and the turn orchestrator
use crate::types::ItineraryArtifact;
use crate::ui::streaming::{Emission, ItineraryStreamProcessor};
use crate::ui::{UIError, UIMessage, UserInterface};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Result of running a whole stream through a fresh processor
#[derive(Debug, Default)]
pub struct ProcessedStream {
    /// All emissions in order, unmerged
    pub raw: Vec<Emission>,
    /// Concatenated chat deltas
    pub chat: String,
    /// Itinerary as the consumer sees it after the stream: reset on start,
    /// appended by deltas, replaced by the completed text
    pub itinerary: Option<String>,
    /// Concatenated itinerary deltas since the last start marker
    pub itinerary_deltas: String,
}

impl ProcessedStream {
    fn apply(&mut self, emission: Emission) {
        match &emission {
            Emission::ChatDelta(text) => self.chat.push_str(text),
            Emission::ItineraryStarted => {
                self.itinerary = Some(String::new());
                self.itinerary_deltas.clear();
            }
            Emission::ItineraryDelta(text) => {
                self.itinerary_deltas.push_str(text);
                self.itinerary
                    .get_or_insert_with(String::new)
                    .push_str(text);
            }
            Emission::ItineraryComplete(text) => self.itinerary = Some(text.clone()),
        }
        self.raw.push(emission);
    }

    pub fn contains_marker(&self) -> bool {
        self.raw.iter().any(|emission| match emission {
            Emission::ChatDelta(text)
            | Emission::ItineraryDelta(text)
            | Emission::ItineraryComplete(text) => {
                text.contains("[ITINERARY_START]") || text.contains("[ITINERARY_END]")
            }
            Emission::ItineraryStarted => false,
        })
    }
}

/// Feed the fragments to a new processor and finalize it
pub fn process_fragments<S: AsRef<str>>(fragments: &[S]) -> ProcessedStream {
    let mut processor = ItineraryStreamProcessor::new();
    let mut result = ProcessedStream::default();

    for fragment in fragments {
        for emission in processor.process(fragment.as_ref()) {
            result.apply(emission);
        }
    }
    for emission in processor.finalize() {
        result.apply(emission);
    }

    result
}

/// Helper function to split text into small chunks for testing marker handling
pub fn chunk_str(s: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut chunks = Vec::new();

    for chunk in chars.chunks(chunk_size) {
        chunks.push(chunk.iter().collect::<String>());
    }

    chunks
}

/// Snapshot of what the UI was told, in order
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    BeginTurn,
    ChatDelta(String),
    Itinerary { content: String, streaming: bool },
    Message(String),
    EndTurn,
}

/// A test UI that records everything it is asked to display
#[derive(Clone, Default)]
pub struct TestUI {
    events: Arc<Mutex<Vec<UiEvent>>>,
    inputs: Arc<Mutex<VecDeque<String>>>,
}

impl TestUI {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue lines returned by `get_input`; once drained the input is closed
    pub fn with_inputs(inputs: &[&str]) -> Self {
        let ui = Self::new();
        ui.inputs
            .lock()
            .unwrap()
            .extend(inputs.iter().map(|line| line.to_string()));
        ui
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    /// All chat deltas concatenated
    pub fn chat_text(&self) -> String {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::ChatDelta(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::Message(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    /// The last itinerary render, if any
    pub fn last_itinerary(&self) -> Option<(String, bool)> {
        self.events().into_iter().rev().find_map(|event| match event {
            UiEvent::Itinerary { content, streaming } => Some((content, streaming)),
            _ => None,
        })
    }

    fn push(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl UserInterface for TestUI {
    async fn display(&self, message: UIMessage) -> Result<(), UIError> {
        let text = match message {
            UIMessage::Info(text) => format!("info: {text}"),
            UIMessage::Error(text) => format!("error: {text}"),
            UIMessage::Itinerary(text) => format!("itinerary: {text}"),
        };
        self.push(UiEvent::Message(text));
        Ok(())
    }

    async fn get_input(&self) -> Result<String, UIError> {
        self.inputs
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(UIError::InputClosed)
    }

    async fn begin_turn(&self) -> Result<(), UIError> {
        self.push(UiEvent::BeginTurn);
        Ok(())
    }

    async fn end_turn(&self) -> Result<(), UIError> {
        self.push(UiEvent::EndTurn);
        Ok(())
    }

    fn display_chat_delta(&self, text: &str) -> Result<(), UIError> {
        self.push(UiEvent::ChatDelta(text.to_string()));
        Ok(())
    }

    fn display_itinerary(&self, itinerary: &ItineraryArtifact) -> Result<(), UIError> {
        self.push(UiEvent::Itinerary {
            content: itinerary.content().to_string(),
            streaming: itinerary.is_streaming(),
        });
        Ok(())
    }
}
