use super::{ReplCommand, ReplInput, HELP_TEXT};
use crate::agent::TurnOutcome;
use crate::session::ChatSession;
use crate::ui::{UIError, UIMessage};
use anyhow::Result;
use tracing::{debug, info, warn};

const WELCOME: &str =
    "Travel Planner. Ask about destinations or request a day-by-day itinerary. Type /help for commands.";

/// Chat until the user quits or closes the input
pub async fn run_interactive(mut session: ChatSession) -> Result<()> {
    let ui = session.ui().clone();
    ui.display(UIMessage::Info(WELCOME.to_string())).await?;

    loop {
        let line = match ui.get_input().await {
            Ok(line) => line,
            Err(UIError::InputClosed) => break,
            Err(e) => return Err(e.into()),
        };

        match ReplInput::parse(&line) {
            ReplInput::Empty => continue,
            ReplInput::Command(ReplCommand::Quit) => break,
            ReplInput::Command(ReplCommand::Help) => {
                ui.display(UIMessage::Info(HELP_TEXT.to_string())).await?;
            }
            ReplInput::Command(ReplCommand::Clear) => {
                session.clear();
                ui.display(UIMessage::Info(
                    "Started a new conversation.".to_string(),
                ))
                .await?;
            }
            ReplInput::Command(ReplCommand::Itinerary) => {
                let itinerary = session.itinerary().content().to_string();
                ui.display(UIMessage::Itinerary(itinerary)).await?;
            }
            ReplInput::UnknownCommand(command) => {
                ui.display(UIMessage::Error(format!(
                    "Unknown command: {command} (type /help)"
                )))
                .await?;
            }
            ReplInput::Message(text) => run_turn(&mut session, &text).await?,
        }
    }

    info!(
        "Chat session ended with {} messages",
        session.transcript().messages().len()
    );
    Ok(())
}

/// Run one turn, cancelling it on Ctrl-C
async fn run_turn(session: &mut ChatSession, text: &str) -> Result<()> {
    let outcome = tokio::select! {
        outcome = session.send_user_message(text) => Some(outcome?),
        Ok(()) = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        Some(TurnOutcome::Completed) => {}
        Some(TurnOutcome::Failed(reason)) => warn!("Turn failed: {}", reason),
        None => {
            session.abandon_turn()?;
            let ui = session.ui().clone();
            ui.display(UIMessage::Info("Response cancelled.".to_string()))
                .await?;
            ui.end_turn().await?;
        }
    }
    Ok(())
}

/// Answer a single message and exit
pub async fn run_once(mut session: ChatSession, message: &str) -> Result<()> {
    match session.send_user_message(message).await? {
        TurnOutcome::Completed => {
            debug!(
                "One-shot turn completed, itinerary present: {}",
                !session.itinerary().is_empty()
            );
            Ok(())
        }
        TurnOutcome::Failed(reason) => anyhow::bail!("Request failed: {reason}"),
    }
}
