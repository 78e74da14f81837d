use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of prompt characters kept in a creation name
const NAME_PREFIX_CHARS: usize = 30;

/// An extracted HTML artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Creation {
    pub id: String,
    pub name: String,
    pub html: String,
    pub timestamp: DateTime<Utc>,
}

impl Creation {
    /// New history entry named after the prompt that produced it
    pub fn from_prompt(prompt: &str, html: impl Into<String>) -> Self {
        let prefix: String = prompt.chars().take(NAME_PREFIX_CHARS).collect();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: format!("{prefix}..."),
            html: html.into(),
            timestamp: Utc::now(),
        }
    }

    /// Ad-hoc preview built from an existing turn; never enters the history
    pub fn temporary(html: impl Into<String>) -> Self {
        Self {
            id: "temp".to_string(),
            name: "Verified Preview".to_string(),
            html: html.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Extracted artifacts, most recent first, plus the active preview
#[derive(Debug, Default)]
pub struct CreationHistory {
    entries: Vec<Creation>,
    active: Option<Creation>,
}

impl CreationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `creation` and make it the active preview
    pub fn record(&mut self, creation: Creation) {
        self.entries.insert(0, creation.clone());
        self.active = Some(creation);
    }

    pub fn entries(&self) -> &[Creation] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active(&self) -> Option<&Creation> {
        self.active.as_ref()
    }

    pub fn set_active(&mut self, creation: Option<Creation>) {
        self.active = creation;
    }

    /// Activate the history entry with `id`. Unknown ids leave the active
    /// preview untouched.
    pub fn select(&mut self, id: &str) -> Option<&Creation> {
        let creation = self.entries.iter().find(|c| c.id == id)?.clone();
        self.active = Some(creation);
        self.active.as_ref()
    }
}
