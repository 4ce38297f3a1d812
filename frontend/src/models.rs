use serde::{Deserialize, Serialize};

/// Matches the backend `DocumentSummary`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: usize,
    pub is_text: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
    pub selected: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageAuthor {
    User,
    Bot,
}

/// Matches the backend `ChatMessage`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub author: MessageAuthor,
    pub text: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ShortcutView {
    pub id: String,
    pub label: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatSnapshot {
    pub document_id: String,
    pub messages: Vec<ChatMessage>,
    pub awaiting_response: bool,
    pub shortcuts: Vec<ShortcutView>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ImageStudioSnapshot {
    pub prompt: String,
    pub image_url: Option<String>,
    pub error: Option<String>,
    pub generating: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Free text or the id of a canned prompt.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ChatInput {
    Text(String),
    Shortcut(String),
}

/// WebSocket request sent by the client.
#[derive(Clone, Debug, Serialize)]
pub struct WsChatRequest {
    pub document_id: String,
    pub input: ChatInput,
}

/// WebSocket event received from the server.
/// Matches the backend `WsEvent` enum (internally tagged).
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsEvent {
    StreamStart {
        document_id: String,
        user_message: ChatMessage,
        bot_message_id: String,
    },
    StreamChunk {
        document_id: String,
        message_id: String,
        content: String,
    },
    StreamEnd {
        document_id: String,
        message_id: String,
        full_content: String,
    },
    Rejected {
        reason: String,
    },
    Error {
        message: String,
    },
}
