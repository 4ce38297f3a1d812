use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An uploaded file. Immutable once created; shared as `Arc<Document>`.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// Decoded text for `text/*` uploads, empty otherwise.
    pub content: String,
    pub data: Bytes,
}

impl Document {
    pub fn is_text(&self) -> bool {
        is_text_mime(&self.mime_type)
    }

    /// What the assistant gets to see: the full text for text documents,
    /// the display name for everything else.
    pub fn chat_context(&self) -> &str {
        if self.is_text() {
            &self.content
        } else {
            &self.name
        }
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size: self.data.len(),
            is_text: self.is_text(),
        }
    }
}

pub fn is_text_mime(mime_type: &str) -> bool {
    mime_type.starts_with("text/")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: usize,
    pub is_text: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageAuthor {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub author: MessageAuthor,
    pub text: String,
}

impl ChatMessage {
    pub fn new(id: String, author: MessageAuthor, text: impl Into<String>) -> Self {
        Self { id, author, text: text.into() }
    }
}

/// Canned prompts offered under the chat input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptShortcut {
    Summarize,
    ExplainSimply,
    CreateTest,
}

impl PromptShortcut {
    pub const ALL: [PromptShortcut; 3] = [
        PromptShortcut::Summarize,
        PromptShortcut::ExplainSimply,
        PromptShortcut::CreateTest,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PromptShortcut::Summarize => "Summarize this file",
            PromptShortcut::ExplainSimply => "Explain it simply",
            PromptShortcut::CreateTest => "Create a test",
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            PromptShortcut::Summarize => "Create a concise summary of",
            PromptShortcut::ExplainSimply => {
                "Explain the key concepts in this file like I'm a beginner"
            }
            PromptShortcut::CreateTest => "Create a multiple choice test based on this file",
        }
    }

    pub fn render(&self, document_name: &str) -> String {
        format!("{} the document \"{document_name}\"", self.template())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortcutView {
    pub id: PromptShortcut,
    pub label: &'static str,
}

// ── HTTP payloads ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSnapshot {
    pub document_id: String,
    pub messages: Vec<ChatMessage>,
    pub awaiting_response: bool,
    pub shortcuts: Vec<ShortcutView>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageStudioSnapshot {
    pub prompt: String,
    pub image_url: Option<String>,
    pub error: Option<String>,
    pub generating: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

// ── WebSocket protocol ────────────────────────────────────────────────────────

/// What the user asked for: free text or one of the canned prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ChatInput {
    Text(String),
    Shortcut(PromptShortcut),
}

/// WebSocket request sent by the client.
#[derive(Debug, Deserialize)]
pub struct WsChatRequest {
    pub document_id: String,
    pub input: ChatInput,
}

/// WebSocket event sent to the client (internally tagged).
#[derive(Debug, Clone, Serialize)]
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
