use llm::{InlineData, Message};

/// Ordered turns of the current chat
#[derive(Debug, Default, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push_user(&mut self, prompt: &str, attachment: Option<InlineData>) -> usize {
        self.messages.push(Message::user(prompt, attachment));
        self.messages.len() - 1
    }

    /// Append a model turn and return its index
    pub fn push_model(&mut self, text: &str, model_name: Option<String>) -> usize {
        self.messages.push(Message::model(text, model_name));
        self.messages.len() - 1
    }

    /// Overwrite the text of turn `index` with the full text so far
    pub fn set_turn_text(&mut self, index: usize, text: &str) {
        if let Some(message) = self.messages.get_mut(index) {
            message.set_text(text);
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
