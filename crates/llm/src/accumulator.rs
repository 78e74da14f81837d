use serde::{Deserialize, Serialize};

/// How a backend's fragments relate to the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AccumulationMode {
    /// Each fragment is a delta that extends the text
    #[default]
    Append,
    /// Each fragment is the complete text so far
    Replace,
}

/// Growing transcript of the model turn currently being streamed
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    mode: AccumulationMode,
    text: String,
}

impl TranscriptAccumulator {
    pub fn new(mode: AccumulationMode) -> Self {
        Self {
            mode,
            text: String::new(),
        }
    }

    pub fn mode(&self) -> AccumulationMode {
        self.mode
    }

    /// Fold one fragment in and return the full text so far
    pub fn apply(&mut self, fragment: &str) -> &str {
        match self.mode {
            AccumulationMode::Append => self.text.push_str(fragment),
            AccumulationMode::Replace => {
                self.text.clear();
                self.text.push_str(fragment);
            }
        }
        &self.text
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
