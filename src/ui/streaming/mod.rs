//! Streaming processor for splitting model output into chat and itinerary text

mod itinerary_processor;

#[cfg(test)]
pub(crate) mod test_utils;

pub use itinerary_processor::{
    strip_marker_literals, ItineraryStreamProcessor, ITINERARY_END, ITINERARY_PLACEHOLDER,
    ITINERARY_START,
};

/// Output of the stream processor for a single fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// Text to append to the current assistant message
    ChatDelta(String),
    /// An itinerary block was opened, any previous itinerary draft starts over
    ItineraryStarted,
    /// Text to append to the itinerary being collected
    ItineraryDelta(String),
    /// The itinerary block was closed (or flushed at end of stream), trimmed
    ItineraryComplete(String),
}
