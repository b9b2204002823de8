use super::{UIError, UIMessage, UserInterface};
use crate::types::ItineraryArtifact;
use async_trait::async_trait;
use crossterm::style::{self, Color, Stylize};
use rustyline::{error::ReadlineError, history::DefaultHistory, Config, Editor};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

const PANEL_WIDTH: usize = 48;

/// What the terminal already showed during the current turn
#[derive(Debug, Default)]
struct RenderState {
    /// The "building itinerary" status line was printed for the open block
    itinerary_announced: bool,
    /// The cursor is at the start of a line
    at_line_start: bool,
    /// Content of the last itinerary panel printed
    last_panel: Option<String>,
}

pub struct TerminalUI {
    // Created on first input so that output-only use never touches the tty
    line_editor: Mutex<Option<Editor<(), DefaultHistory>>>,
    // In production code, this isn't used
    writer: Option<Arc<Mutex<Box<dyn Write + Send>>>>,
    state: Mutex<RenderState>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, UIError> {
    mutex
        .lock()
        .map_err(|_| UIError::IOError(io::Error::new(io::ErrorKind::Other, "UI lock poisoned")))
}

impl Default for TerminalUI {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalUI {
    pub fn new() -> Self {
        Self {
            line_editor: Mutex::new(None),
            writer: None,
            state: Mutex::new(RenderState {
                at_line_start: true,
                ..Default::default()
            }),
        }
    }

    #[cfg(test)]
    pub fn with_test_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Some(Arc::new(Mutex::new(writer))),
            ..Self::new()
        }
    }

    fn create_editor() -> Result<Editor<(), DefaultHistory>, UIError> {
        let config = Config::builder()
            .edit_mode(rustyline::EditMode::Emacs)
            .auto_add_history(true)
            .build();
        Editor::with_config(config).map_err(|e| UIError::LineEditor(e.to_string()))
    }

    /// Run `f` against the test writer or stdout and flush
    fn write_with<F>(&self, f: F) -> Result<(), UIError>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        if let Some(writer) = &self.writer {
            let mut writer = lock(writer)?;
            f(&mut **writer)?;
            writer.flush()?;
        } else {
            let mut stdout = io::stdout().lock();
            f(&mut stdout)?;
            stdout.flush()?;
        }
        Ok(())
    }

    /// Write whole lines, starting on a fresh line
    fn write_lines(&self, state: &mut RenderState, text: &str) -> Result<(), UIError> {
        let needs_newline = !state.at_line_start;
        self.write_with(|w| {
            if needs_newline {
                writeln!(w)?;
            }
            writeln!(w, "{text}")
        })?;
        state.at_line_start = true;
        Ok(())
    }

    fn render_panel(content: &str) -> String {
        let rule = "─".repeat(PANEL_WIDTH);
        let mut lines = vec![
            rule.clone().with(Color::Cyan).to_string(),
            format!("{} {}", "✈".with(Color::Cyan), "Travel Itinerary".bold()),
            "Day-by-day travel plan".dark_grey().to_string(),
            rule.clone().with(Color::Cyan).to_string(),
        ];
        if content.trim().is_empty() {
            lines.push("No itinerary yet.".dark_grey().italic().to_string());
        } else {
            lines.extend(content.lines().map(str::to_string));
        }
        lines.push(rule.with(Color::Cyan).to_string());
        lines.join("\n")
    }

    fn show_panel(&self, state: &mut RenderState, content: &str) -> Result<(), UIError> {
        self.write_lines(state, &Self::render_panel(content))?;
        state.last_panel = Some(content.to_string());
        Ok(())
    }
}

#[async_trait]
impl UserInterface for TerminalUI {
    async fn display(&self, message: UIMessage) -> Result<(), UIError> {
        let mut state = lock(&self.state)?;
        match message {
            UIMessage::Info(text) => self.write_lines(&mut state, &text.dark_grey().to_string()),
            UIMessage::Error(text) => {
                self.write_lines(&mut state, &format!("{} {}", "✗".with(Color::Red), text.red()))
            }
            UIMessage::Itinerary(text) => self.show_panel(&mut state, &text),
        }
    }

    async fn get_input(&self) -> Result<String, UIError> {
        let mut editor = lock(&self.line_editor)?;
        if editor.is_none() {
            *editor = Some(Self::create_editor()?);
        }
        let Some(editor) = editor.as_mut() else {
            return Err(UIError::LineEditor("Line editor unavailable".to_string()));
        };

        let colored_prompt = format!("{}{} ", ">".with(Color::Green), style::ResetColor);

        match editor.readline(&colored_prompt) {
            Ok(line) => Ok(line.trim().to_string()),
            // Ctrl-C and Ctrl-D at the prompt both end the session
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Err(UIError::InputClosed),
            Err(e) => Err(UIError::LineEditor(e.to_string())),
        }
    }

    async fn begin_turn(&self) -> Result<(), UIError> {
        let mut state = lock(&self.state)?;
        state.itinerary_announced = false;
        let needs_newline = !state.at_line_start;
        self.write_with(|w| {
            if needs_newline {
                writeln!(w)?;
            }
            write!(w, "{} ", "Assistant:".bold().with(Color::Blue))
        })?;
        state.at_line_start = false;
        Ok(())
    }

    async fn end_turn(&self) -> Result<(), UIError> {
        let mut state = lock(&self.state)?;
        let needs_newline = !state.at_line_start;
        self.write_with(|w| {
            if needs_newline {
                writeln!(w)?;
            }
            writeln!(w)
        })?;
        state.at_line_start = true;
        state.itinerary_announced = false;
        Ok(())
    }

    fn display_chat_delta(&self, text: &str) -> Result<(), UIError> {
        if text.is_empty() {
            return Ok(());
        }
        let mut state = lock(&self.state)?;
        self.write_with(|w| write!(w, "{text}"))?;
        state.at_line_start = text.ends_with('\n');
        Ok(())
    }

    fn display_itinerary(&self, itinerary: &ItineraryArtifact) -> Result<(), UIError> {
        let mut state = lock(&self.state)?;

        if itinerary.is_streaming() {
            // The terminal can't redraw, so a streaming itinerary is only announced
            if !state.itinerary_announced {
                state.itinerary_announced = true;
                self.write_lines(&mut state, &"✈ Building itinerary…".dark_grey().to_string())?;
            }
            return Ok(());
        }

        state.itinerary_announced = false;
        if state.last_panel.as_deref() == Some(itinerary.content()) {
            return Ok(());
        }
        if itinerary.is_empty() && state.last_panel.is_none() {
            return Ok(());
        }
        self.show_panel(&mut state, itinerary.content())
    }
}
