//! The session context: conversation, creations, provider configuration and
//! the observers a front end registers to follow along.

use crate::artifact::{extract_from_turn, extract_html};
use crate::config::{resolve_model, ProviderConfig};
use crate::conversation::Conversation;
use crate::creations::{Creation, CreationHistory};
use crate::preview::PreviewTracker;
use crate::router::{LocalModels, ProviderRouter, TurnOutcome, FAILURE_MESSAGE};
use crate::ui::{SessionEvent, SessionObserver};
use anyhow::Result;
use llm::InlineData;
use std::sync::Arc;
use tracing::{debug, info};

/// What a finished send produced
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSummary {
    pub outcome: TurnOutcome,
    /// New history entry, if the final text contained an artifact
    pub creation: Option<Creation>,
}

pub struct Session {
    config: ProviderConfig,
    router: ProviderRouter,
    conversation: Conversation,
    creations: CreationHistory,
    observers: Vec<Arc<dyn SessionObserver>>,
}

fn notify(observers: &[Arc<dyn SessionObserver>], event: &SessionEvent<'_>) {
    for observer in observers {
        observer.on_event(event);
    }
}

impl Session {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            router: ProviderRouter::new(),
            conversation: Conversation::new(),
            creations: CreationHistory::new(),
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn creations(&self) -> &CreationHistory {
        &self.creations
    }

    pub fn active_creation(&self) -> Option<&Creation> {
        self.creations.active()
    }

    pub fn local_models(&self) -> &LocalModels {
        self.router.local_models()
    }

    /// Catalog alias or concrete model name; takes effect on the next send
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = model.into();
        info!("Selected model '{}'", self.config.model);
    }

    pub fn set_local_url(&mut self, url: impl Into<String>) {
        self.config.local_url = url.into();
    }

    pub async fn probe_local_models(&mut self) -> &LocalModels {
        self.router.probe(&self.config).await
    }

    /// Run one turn: append the user turn and a placeholder model turn, stream
    /// into the placeholder, then record any artifact in the final text.
    ///
    /// A blank prompt without an attachment is ignored and yields `None`.
    pub async fn send(
        &mut self,
        prompt: &str,
        attachment: Option<InlineData>,
    ) -> Option<TurnSummary> {
        if prompt.trim().is_empty() && attachment.is_none() {
            debug!("Ignoring empty prompt");
            return None;
        }

        let model = resolve_model(&self.config.model);
        let backend = self.router.select(&model);

        self.conversation.push_user(prompt, attachment);
        let history = self.conversation.messages().to_vec();
        let placeholder = self.conversation.push_model("", Some(model.clone()));
        notify(
            &self.observers,
            &SessionEvent::TurnStarted {
                model: &model,
                backend,
            },
        );

        let outcome = {
            let conversation = &mut self.conversation;
            let observers = &self.observers;
            let mut tracker = PreviewTracker::new();
            let mut on_update = |text: &str| -> Result<()> {
                conversation.set_turn_text(placeholder, text);
                notify(observers, &SessionEvent::TranscriptUpdated { text });
                if let Some(html) = tracker.observe(text) {
                    notify(observers, &SessionEvent::PreviewAvailable { html });
                }
                Ok(())
            };
            self.router
                .stream_chat(&self.config, history, &model, &mut on_update)
                .await
        };

        let creation = match &outcome {
            TurnOutcome::Completed(text) => {
                notify(&self.observers, &SessionEvent::TurnCompleted { text });
                extract_html(text).map(|html| {
                    let creation = Creation::from_prompt(prompt, html);
                    self.creations.record(creation.clone());
                    notify(&self.observers, &SessionEvent::CreationAdded(&creation));
                    notify(
                        &self.observers,
                        &SessionEvent::ActiveCreationChanged(Some(&creation)),
                    );
                    creation
                })
            }
            TurnOutcome::Failed => {
                self.conversation.push_model(FAILURE_MESSAGE, None);
                notify(
                    &self.observers,
                    &SessionEvent::TurnFailed {
                        message: FAILURE_MESSAGE,
                    },
                );
                None
            }
        };

        Some(TurnSummary { outcome, creation })
    }

    /// Ask the model to review the active creation. `None` without one.
    pub async fn verify_active(&mut self) -> Option<TurnSummary> {
        let html = self.creations.active()?.html.clone();
        self.send(&verify_prompt(&html), None).await
    }

    /// Clear the conversation and the active preview; the creation history
    /// survives
    pub fn new_chat(&mut self) {
        self.conversation.clear();
        self.clear_active();
    }

    /// Make the history entry with `id` the active preview
    pub fn select_creation(&mut self, id: &str) -> Option<&Creation> {
        let creation = self.creations.select(id)?;
        notify(
            &self.observers,
            &SessionEvent::ActiveCreationChanged(Some(creation)),
        );
        Some(creation)
    }

    pub fn clear_active(&mut self) {
        if self.creations.active().is_some() {
            self.creations.set_active(None);
            notify(&self.observers, &SessionEvent::ActiveCreationChanged(None));
        }
    }

    /// Preview the artifact in conversation turn `index` without adding it
    /// to the history
    pub fn preview_turn(&mut self, index: usize) -> Option<&Creation> {
        let creation = extract_from_turn(self.conversation.get(index)?)?;
        self.creations.set_active(Some(creation));
        let active = self.creations.active();
        notify(&self.observers, &SessionEvent::ActiveCreationChanged(active));
        active
    }
}

pub fn verify_prompt(html: &str) -> String {
    format!(
        "Review the following codebase and optimize for production efficiency. \
         Correct any logic gaps or UI inconsistencies.\n\nCODEBASE:\n{html}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_prompt() {
        assert_eq!(
            verify_prompt("<html></html>"),
            "Review the following codebase and optimize for production efficiency. \
             Correct any logic gaps or UI inconsistencies.\n\nCODEBASE:\n<html></html>"
        );
    }

    #[tokio::test]
    async fn test_blank_prompt_is_ignored() {
        let mut session = Session::new(ProviderConfig::default());
        assert!(session.send("   ", None).await.is_none());
        assert!(session.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_verify_without_active_creation() {
        let mut session = Session::new(ProviderConfig::default());
        assert!(session.verify_active().await.is_none());
        assert!(session.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_collapses_to_sentinel() {
        let mut session = Session::new(ProviderConfig::default());
        let summary = session.send("make a clock", None).await.unwrap();

        assert_eq!(summary.outcome, TurnOutcome::Failed);
        assert!(summary.creation.is_none());
        let texts: Vec<String> = session
            .conversation()
            .messages()
            .iter()
            .map(|m| m.text())
            .collect();
        assert_eq!(texts, vec!["make a clock", "", FAILURE_MESSAGE]);
    }

    #[test]
    fn test_preview_turn_ignores_user_turns() {
        let mut session = Session::new(ProviderConfig::default());
        session.conversation.push_user("<html></html>", None);
        assert!(session.preview_turn(0).is_none());
        assert!(session.preview_turn(5).is_none());
        assert!(session.active_creation().is_none());
    }
}
