//! Itinerary block processor for streaming responses
//!
//! The model wraps day-by-day itineraries in sentinel markers:
//!
//! ```text
//! Here is your plan!
//! [ITINERARY_START]
//! Day 1: Fly to Lisbon
//! Day 2: Sintra day trip
//! [ITINERARY_END]
//! Anything else?
//! ```
//!
//! Everything outside the markers is chat text, everything inside goes to the
//! itinerary panel, and the markers themselves are never emitted.
//!
//! # Buffering Strategy
//!
//! Fragments arrive with arbitrary boundaries, so a marker may be split over
//! any number of fragments. Only the tail of the pending text that could still
//! grow into the marker we are looking for is held back:
//!
//! - `"Sure! [ITIN"` → emit `"Sure! "`, keep `"[ITIN"`
//! - `"[ITIN"` + `"ERARY_START]Day 1"` → marker recognized, `"Day 1"` is itinerary
//! - `"[approx]"` → diverges from the marker at `a`, emitted at once
//!
//! The held-back tail is always a strict prefix of the active marker, so it is
//! never longer than the marker minus one byte.

use super::Emission;
use tracing::{debug, warn};

pub const ITINERARY_START: &str = "[ITINERARY_START]";
pub const ITINERARY_END: &str = "[ITINERARY_END]";

/// Shown in the chat transcript where the itinerary block used to be
pub const ITINERARY_PLACEHOLDER: &str = "_(Itinerary moved to the itinerary panel)_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessorState {
    /// Outside an itinerary block, text is chat text
    Idle,
    /// Inside an itinerary block, text is itinerary text
    Collecting,
}

/// Splits one assistant turn into chat text and itinerary text.
///
/// Create one instance per turn, feed every fragment to [`process`] in order
/// and call [`finalize`] once the stream has ended.
///
/// [`process`]: ItineraryStreamProcessor::process
/// [`finalize`]: ItineraryStreamProcessor::finalize
#[derive(Debug)]
pub struct ItineraryStreamProcessor {
    state: ProcessorState,
    /// Text whose disposition is not decided yet
    pending: String,
    /// Itinerary text collected since the last start marker
    itinerary: String,
}

impl Default for ItineraryStreamProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ItineraryStreamProcessor {
    pub fn new() -> Self {
        Self {
            state: ProcessorState::Idle,
            pending: String::new(),
            itinerary: String::new(),
        }
    }

    /// Whether an itinerary block is currently open
    pub fn is_collecting(&self) -> bool {
        self.state == ProcessorState::Collecting
    }

    /// Process one fragment of model output
    pub fn process(&mut self, fragment: &str) -> Vec<Emission> {
        let mut emissions = Vec::new();
        self.pending.push_str(fragment);

        loop {
            let marker = self.active_marker();

            if let Some(pos) = self.pending.find(marker) {
                let after_marker = self.pending.split_off(pos + marker.len());
                self.pending.truncate(pos);
                let before_marker = std::mem::replace(&mut self.pending, after_marker);

                self.emit_text(&before_marker, &mut emissions);
                self.switch_state(&mut emissions);
                // Text after the marker is re-examined under the new state
                continue;
            }

            let keep = partial_marker_len(&self.pending, marker);
            let decided = self.pending.len() - keep;
            if decided > 0 {
                let undecided = self.pending.split_off(decided);
                let text = std::mem::replace(&mut self.pending, undecided);
                self.emit_text(&text, &mut emissions);
            }
            break;
        }

        emissions
    }

    /// Flush whatever is still buffered once the stream has ended.
    ///
    /// An unterminated itinerary block is handed off as it is rather than
    /// dropped.
    pub fn finalize(mut self) -> Vec<Emission> {
        let mut emissions = Vec::new();
        let residual = std::mem::take(&mut self.pending);

        match self.state {
            ProcessorState::Idle => {
                let text = strip_marker_literals(&residual);
                if !text.is_empty() {
                    emissions.push(Emission::ChatDelta(text));
                }
            }
            ProcessorState::Collecting => {
                warn!(
                    "Stream ended inside an itinerary block, keeping {} bytes of partial itinerary",
                    self.itinerary.len() + residual.len()
                );
                self.emit_text(&residual, &mut emissions);
                emissions.push(Emission::ItineraryComplete(
                    self.itinerary.trim().to_string(),
                ));
            }
        }

        emissions
    }

    fn active_marker(&self) -> &'static str {
        match self.state {
            ProcessorState::Idle => ITINERARY_START,
            ProcessorState::Collecting => ITINERARY_END,
        }
    }

    fn emit_text(&mut self, text: &str, emissions: &mut Vec<Emission>) {
        if text.is_empty() {
            return;
        }
        match self.state {
            ProcessorState::Idle => emissions.push(Emission::ChatDelta(text.to_string())),
            ProcessorState::Collecting => {
                self.itinerary.push_str(text);
                emissions.push(Emission::ItineraryDelta(text.to_string()));
            }
        }
    }

    fn switch_state(&mut self, emissions: &mut Vec<Emission>) {
        match self.state {
            ProcessorState::Idle => {
                debug!("Itinerary start marker recognized");
                emissions.push(Emission::ChatDelta(ITINERARY_PLACEHOLDER.to_string()));
                self.itinerary.clear();
                self.state = ProcessorState::Collecting;
                emissions.push(Emission::ItineraryStarted);
            }
            ProcessorState::Collecting => {
                debug!(
                    "Itinerary end marker recognized after {} bytes",
                    self.itinerary.len()
                );
                self.state = ProcessorState::Idle;
                emissions.push(Emission::ItineraryComplete(
                    self.itinerary.trim().to_string(),
                ));
            }
        }
    }
}

/// Length of the longest suffix of `text` that is a strict prefix of `marker`.
///
/// Markers are ASCII, so a matching suffix always starts on a char boundary.
fn partial_marker_len(text: &str, marker: &str) -> usize {
    (1..marker.len())
        .rev()
        .find(|&len| text.ends_with(&marker[..len]))
        .unwrap_or(0)
}

/// Remove any marker literal from `text`
pub fn strip_marker_literals(text: &str) -> String {
    text.replace(ITINERARY_START, "").replace(ITINERARY_END, "")
}
