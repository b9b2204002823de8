
mod turn;

pub use turn::{TurnOrchestrator, TurnOutcome, TURN_ERROR_MESSAGE};
