use super::{SessionEvent, SessionObserver};
use crossterm::style::{self, Color, Stylize};
use rustyline::{error::ReadlineError, history::DefaultHistory, Config, Editor};
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::debug;

/// Line input for the REPL
pub struct TerminalInput {
    line_editor: Editor<(), DefaultHistory>,
}

impl TerminalInput {
    pub fn new() -> anyhow::Result<Self> {
        let config = Config::builder()
            .edit_mode(rustyline::EditMode::Emacs)
            .build();
        let line_editor = Editor::with_config(config)?;
        Ok(Self { line_editor })
    }

    /// Next trimmed line, or `None` on Ctrl-C / Ctrl-D
    pub fn read_line(&mut self) -> anyhow::Result<Option<String>> {
        let colored_prompt = format!("{}{} ", ">".with(Color::Green), style::ResetColor);

        match self.line_editor.readline(&colored_prompt) {
            Ok(line) => {
                let _ = self.line_editor.add_history_entry(line.as_str());
                Ok(Some(line.trim().to_string()))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Streams transcripts to the terminal.
///
/// Updates carry the full text so far; only the part not yet shown is
/// written. If an update does not extend what is on screen, the whole text is
/// printed again on a fresh line.
pub struct TerminalObserver {
    writer: Mutex<Box<dyn Write + Send>>,
    shown: Mutex<String>,
}

impl Default for TerminalObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalObserver {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            shown: Mutex::new(String::new()),
        }
    }

    fn write(&self, text: &str) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = write!(writer, "{}", text);
            let _ = writer.flush();
        }
    }

    fn write_status(&self, symbol: &str, color: Color, text: &str) {
        self.write(&format!("{} {}\n", symbol.with(color), text));
    }

    fn write_update(&self, text: &str) {
        let Ok(mut shown) = self.shown.lock() else {
            return;
        };
        let output = match text.strip_prefix(shown.as_str()) {
            Some(suffix) => suffix.to_string(),
            None => format!("\n{}", text),
        };
        shown.clear();
        shown.push_str(text);
        drop(shown);
        self.write(&output);
    }

    fn reset(&self) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.clear();
        }
    }
}

impl SessionObserver for TerminalObserver {
    fn on_event(&self, event: &SessionEvent<'_>) {
        match event {
            SessionEvent::TurnStarted { model, backend } => {
                self.reset();
                self.write_status("▶", Color::Cyan, &format!("{} ({})", model, backend));
            }
            SessionEvent::TranscriptUpdated { text } => self.write_update(text),
            SessionEvent::PreviewAvailable { html } => {
                debug!("Preview available ({} bytes)", html.len());
            }
            SessionEvent::TurnCompleted { text } => {
                if !text.ends_with('\n') {
                    self.write("\n");
                }
                self.reset();
            }
            SessionEvent::TurnFailed { message } => {
                self.write("\n");
                self.write_status("✗", Color::Red, message);
                self.reset();
            }
            SessionEvent::CreationAdded(creation) => {
                self.write_status("✓", Color::Green, &format!("Saved '{}'", creation.name));
            }
            SessionEvent::ActiveCreationChanged(Some(creation)) => {
                self.write_status("•", Color::Blue, &format!("Previewing '{}'", creation.name));
            }
            SessionEvent::ActiveCreationChanged(None) => {
                self.write_status("•", Color::Blue, "Preview closed");
            }
        }
    }
}
