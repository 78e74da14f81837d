pub mod commands;
pub mod terminal;

use crate::creations::Creation;
use crate::router::BackendKind;

/// Everything a front end can observe while the session works
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent<'a> {
    TurnStarted {
        model: &'a str,
        backend: BackendKind,
    },
    /// Full transcript of the in-flight turn so far
    TranscriptUpdated {
        text: &'a str,
    },
    /// A complete artifact showed up while the turn is still streaming
    PreviewAvailable {
        html: &'a str,
    },
    TurnCompleted {
        text: &'a str,
    },
    TurnFailed {
        message: &'a str,
    },
    CreationAdded(&'a Creation),
    ActiveCreationChanged(Option<&'a Creation>),
}

/// Receives session events; called on the task driving the session
pub trait SessionObserver: Send + Sync {
    fn on_event(&self, event: &SessionEvent<'_>);
}
