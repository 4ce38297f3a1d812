use chrono::Utc;

use crate::models::{ChatMessage, Document, MessageAuthor, PromptShortcut};

/// Whether the view is waiting on the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    AwaitingResponse { bot_message_id: String },
}

/// Why a send did not start a new turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    Empty,
    AwaitingResponse,
}

/// Everything the caller needs to run one turn against the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub user_message: ChatMessage,
    pub bot_message_id: String,
    pub message: String,
    pub document_context: String,
}

/// Millisecond-derived ids that stay strictly increasing within one view.
#[derive(Debug, Default)]
struct MessageIds {
    last: i64,
}

impl MessageIds {
    fn next(&mut self) -> String {
        let id = Utc::now().timestamp_millis().max(self.last + 1);
        self.last = id;
        id.to_string()
    }
}

/// One conversation about one document.
#[derive(Debug)]
pub struct ChatView {
    document_name: String,
    document_context: String,
    messages: Vec<ChatMessage>,
    state: ChatState,
    ids: MessageIds,
}

impl ChatView {
    pub fn new(document: &Document) -> Self {
        let greeting = format!(
            "Hello! I'm ready to help you with \"{}\". Ask me anything or use one of the prompts below.",
            document.name
        );
        Self {
            document_name: document.name.clone(),
            document_context: document.chat_context().to_string(),
            messages: vec![ChatMessage::new("initial".to_string(), MessageAuthor::Bot, greeting)],
            state: ChatState::Idle,
            ids: MessageIds::default(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.state, ChatState::AwaitingResponse { .. })
    }

    /// Starts a turn: the user message plus an empty bot placeholder.
    pub fn begin_send(&mut self, text: &str) -> Result<PendingReply, SendRejected> {
        if text.trim().is_empty() {
            return Err(SendRejected::Empty);
        }
        if self.is_awaiting() {
            return Err(SendRejected::AwaitingResponse);
        }

        let message = text.to_string();
        let user_message = ChatMessage::new(self.ids.next(), MessageAuthor::User, message.clone());
        let bot_message_id = self.ids.next();

        self.messages.push(user_message.clone());
        self.messages
            .push(ChatMessage::new(bot_message_id.clone(), MessageAuthor::Bot, String::new()));
        self.state = ChatState::AwaitingResponse { bot_message_id: bot_message_id.clone() };

        Ok(PendingReply {
            user_message,
            bot_message_id,
            message,
            document_context: self.document_context.clone(),
        })
    }

    pub fn begin_shortcut(&mut self, shortcut: PromptShortcut) -> Result<PendingReply, SendRejected> {
        let prompt = shortcut.render(&self.document_name);
        self.begin_send(&prompt)
    }

    /// Appends a streamed fragment to the placeholder. Returns `false` if no
    /// message with that id exists.
    pub fn append_chunk(&mut self, bot_message_id: &str, chunk: &str) -> bool {
        match self.messages.iter_mut().rev().find(|m| m.id == bot_message_id) {
            Some(message) => {
                message.text.push_str(chunk);
                true
            }
            None => false,
        }
    }

    /// Ends the turn and returns the placeholder's final text.
    pub fn finish(&mut self, bot_message_id: &str) -> String {
        if let ChatState::AwaitingResponse { bot_message_id: pending } = &self.state {
            if pending == bot_message_id {
                self.state = ChatState::Idle;
            }
        }
        self.messages
            .iter()
            .rev()
            .find(|m| m.id == bot_message_id)
            .map(|m| m.text.clone())
            .unwrap_or_default()
    }
}
