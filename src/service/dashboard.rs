use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::agent::AiGateway;
use crate::errors::AppError;
use crate::models::{
    ChatInput, ChatMessage, ChatSnapshot, Document, DocumentSummary, PromptShortcut, ShortcutView,
};
use crate::service::chat_view::{ChatView, SendRejected};
use crate::service::upload::{UploadedFile, first_file};

/// Progress of one chat turn, in the order it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Started {
        user_message: ChatMessage,
        bot_message_id: String,
    },
    Chunk {
        message_id: String,
        content: String,
    },
    Finished {
        message_id: String,
        full_content: String,
    },
}

struct Entry {
    document: Arc<Document>,
    view: Arc<Mutex<ChatView>>,
}

#[derive(Default)]
struct DashboardState {
    entries: Vec<Entry>,
    selected: Option<String>,
}

impl DashboardState {
    fn find(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.document.id == id)
    }

    fn unique_id(&self, name: &str) -> String {
        let base = format!("{name}-{}", Utc::now().timestamp_millis());
        let mut id = base.clone();
        let mut n = 1;
        while self.find(&id).is_some() {
            id = format!("{base}-{n}");
            n += 1;
        }
        id
    }
}

/// Returns the view to `Idle` even when the turn is abandoned mid-stream.
struct TurnGuard {
    view: Arc<Mutex<ChatView>>,
    bot_message_id: String,
    done: bool,
}

impl TurnGuard {
    fn finish(mut self) -> String {
        self.done = true;
        self.view.lock().finish(&self.bot_message_id)
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        if !self.done {
            warn!("Chat turn {} abandoned before the stream finished", self.bot_message_id);
            self.view.lock().finish(&self.bot_message_id);
        }
    }
}

/// The uploaded documents, the current selection and one chat view per document.
#[derive(Clone)]
pub struct Dashboard {
    state: Arc<RwLock<DashboardState>>,
    gateway: AiGateway,
}

impl Dashboard {
    pub fn new(gateway: AiGateway) -> Self {
        Self { state: Arc::new(RwLock::new(DashboardState::default())), gateway }
    }

    /// Adds the first of `files` to the list and selects it.
    pub fn upload(
        &self,
        files: impl IntoIterator<Item = UploadedFile>,
    ) -> Result<DocumentSummary, AppError> {
        let file = first_file(files).ok_or_else(|| AppError::UploadFailed {
            message: "no file was provided".to_string(),
        })?;

        let mut state = self.state.write();
        let id = state.unique_id(&file.name);
        let document = Document::from_upload(id.clone(), file);
        info!(
            "Uploaded {} ({}, {} bytes, text: {})",
            document.name,
            document.mime_type,
            document.data.len(),
            document.is_text()
        );

        let summary = document.summary();
        let view = ChatView::new(&document);
        state.entries.push(Entry {
            document: Arc::new(document),
            view: Arc::new(Mutex::new(view)),
        });
        state.selected = Some(id);
        Ok(summary)
    }

    pub fn documents(&self) -> Vec<DocumentSummary> {
        self.state.read().entries.iter().map(|e| e.document.summary()).collect()
    }

    pub fn selected(&self) -> Option<String> {
        self.state.read().selected.clone()
    }

    pub fn select(&self, document_id: &str) -> Result<DocumentSummary, AppError> {
        let mut state = self.state.write();
        let summary = state
            .find(document_id)
            .map(|e| e.document.summary())
            .ok_or_else(|| not_found(document_id))?;
        state.selected = Some(document_id.to_string());
        debug!("Selected document {document_id}");
        Ok(summary)
    }

    pub fn chat(&self, document_id: &str) -> Result<ChatSnapshot, AppError> {
        let (_, view) = self.entry(document_id)?;
        let view = view.lock();
        Ok(ChatSnapshot {
            document_id: document_id.to_string(),
            messages: view.messages().to_vec(),
            awaiting_response: view.is_awaiting(),
            shortcuts: PromptShortcut::ALL
                .iter()
                .map(|s| ShortcutView { id: *s, label: s.label() })
                .collect(),
        })
    }

    fn entry(&self, document_id: &str) -> Result<(Arc<Document>, Arc<Mutex<ChatView>>), AppError> {
        self.state
            .read()
            .find(document_id)
            .map(|e| (e.document.clone(), e.view.clone()))
            .ok_or_else(|| not_found(document_id))
    }

    /// Runs one chat turn for `document_id`, reporting progress through `on_event`.
    ///
    /// Fails without touching the conversation when the input is blank or a
    /// reply is already streaming for this document.
    pub async fn send(
        &self,
        document_id: &str,
        input: ChatInput,
        mut on_event: impl FnMut(ChatEvent) + Send,
    ) -> Result<(), AppError> {
        let (document, view) = self.entry(document_id)?;

        let started = {
            let mut view = view.lock();
            match input {
                ChatInput::Text(text) => view.begin_send(&text),
                ChatInput::Shortcut(shortcut) => view.begin_shortcut(shortcut),
            }
        };
        let pending = started.map_err(|rejected| match rejected {
            SendRejected::Empty => AppError::EmptyField { field_name: "message".to_string() },
            SendRejected::AwaitingResponse => AppError::ResponsePending {
                document_id: document_id.to_string(),
            },
        })?;

        let bot_id = pending.bot_message_id.clone();
        let guard = TurnGuard { view: view.clone(), bot_message_id: bot_id.clone(), done: false };

        on_event(ChatEvent::Started {
            user_message: pending.user_message.clone(),
            bot_message_id: bot_id.clone(),
        });

        self.gateway
            .stream_reply(&document.id, &pending.message, &pending.document_context, |chunk| {
                view.lock().append_chunk(&bot_id, chunk);
                on_event(ChatEvent::Chunk { message_id: bot_id.clone(), content: chunk.to_string() });
            })
            .await;

        let full_content = guard.finish();
        on_event(ChatEvent::Finished { message_id: bot_id, full_content });
        Ok(())
    }
}

fn not_found(document_id: &str) -> AppError {
    AppError::DocumentNotFound { id: document_id.to_string() }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::agent::FALLBACK_REPLY;
    use crate::agent::testing::{GatedChat, ScriptedChat, ScriptedImages};
    use crate::config::SessionScope;
    use crate::models::MessageAuthor;

    fn dashboard_with(chat: impl crate::agent::ChatProvider + 'static) -> Dashboard {
        Dashboard::new(AiGateway::new(
            Arc::new(chat),
            Arc::new(ScriptedImages::empty()),
            SessionScope::PerDocument,
        ))
    }

    fn file(name: &str, mime_type: &str, data: &str) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            data: Bytes::from(data.as_bytes().to_vec()),
        }
    }

    async fn run(dashboard: &Dashboard, id: &str, input: ChatInput) -> (Result<(), AppError>, Vec<ChatEvent>) {
        let mut events = Vec::new();
        let result = dashboard.send(id, input, |e| events.push(e)).await;
        (result, events)
    }

    #[test]
    fn dropping_several_files_adds_exactly_one_document() {
        let dashboard = dashboard_with(ScriptedChat::replying(&[]));
        let summary = dashboard
            .upload(vec![file("a.txt", "text/plain", "A"), file("b.txt", "text/plain", "B")])
            .unwrap();

        let documents = dashboard.documents();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].name, "a.txt");
        assert_eq!(dashboard.selected(), Some(summary.id));
    }

    #[test]
    fn empty_upload_is_rejected() {
        let dashboard = dashboard_with(ScriptedChat::replying(&[]));
        let err = dashboard.upload(Vec::new()).unwrap_err();
        assert!(err.is_validation());
        assert!(dashboard.documents().is_empty());
    }

    #[test]
    fn same_name_uploads_get_distinct_ids() {
        let dashboard = dashboard_with(ScriptedChat::replying(&[]));
        let a = dashboard.upload([file("a.txt", "text/plain", "1")]).unwrap();
        let b = dashboard.upload([file("a.txt", "text/plain", "2")]).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(dashboard.selected(), Some(b.id));
    }

    #[test]
    fn selecting_an_unknown_document_fails() {
        let dashboard = dashboard_with(ScriptedChat::replying(&[]));
        assert!(dashboard.select("missing").unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn a_turn_streams_into_the_placeholder() {
        let chat = ScriptedChat::replying(&["Hi", " there"]);
        let dashboard = dashboard_with(chat.clone());
        let doc = dashboard.upload([file("notes.txt", "text/plain", "Hello world")]).unwrap();

        let (result, events) = run(&dashboard, &doc.id, ChatInput::Text("Summarize".into())).await;
        result.unwrap();

        assert_eq!(events.len(), 4);
        let ChatEvent::Started { bot_message_id, .. } = &events[0] else {
            panic!("expected Started, got {:?}", events[0]);
        };
        assert_eq!(
            events[3],
            ChatEvent::Finished { message_id: bot_message_id.clone(), full_content: "Hi there".into() }
        );

        let snapshot = dashboard.chat(&doc.id).unwrap();
        assert!(!snapshot.awaiting_response);
        let last = snapshot.messages.last().unwrap();
        assert_eq!(last.author, MessageAuthor::Bot);
        assert_eq!(last.text, "Hi there");

        let prompt = &chat.calls()[0].prompt;
        assert!(prompt.contains("Hello world"));
        assert!(prompt.contains("Summarize"));
    }

    #[tokio::test]
    async fn non_text_documents_send_only_their_name() {
        let chat = ScriptedChat::replying(&["ok"]);
        let dashboard = dashboard_with(chat.clone());
        let doc = dashboard.upload([file("photo.png", "image/png", "\u{0}PNGDATA")]).unwrap();

        run(&dashboard, &doc.id, ChatInput::Text("Describe it".into())).await.0.unwrap();

        let prompt = &chat.calls()[0].prompt;
        assert!(prompt.contains("photo.png"));
        assert!(!prompt.contains("PNGDATA"));
    }

    #[tokio::test]
    async fn failed_stream_leaves_exactly_the_fallback_and_returns_to_idle() {
        let dashboard = dashboard_with(ScriptedChat::failing_on_open());
        let doc = dashboard.upload([file("n.txt", "text/plain", "x")]).unwrap();

        let (result, events) = run(&dashboard, &doc.id, ChatInput::Text("q".into())).await;
        result.unwrap();

        let chunks: Vec<&ChatEvent> =
            events.iter().filter(|e| matches!(e, ChatEvent::Chunk { .. })).collect();
        assert_eq!(chunks.len(), 1);
        let snapshot = dashboard.chat(&doc.id).unwrap();
        assert_eq!(snapshot.messages.last().unwrap().text, FALLBACK_REPLY);
        assert!(!snapshot.awaiting_response);
    }

    #[tokio::test]
    async fn shortcut_sends_the_rendered_prompt() {
        let chat = ScriptedChat::replying(&["ok"]);
        let dashboard = dashboard_with(chat.clone());
        let doc = dashboard.upload([file("r.pdf", "application/pdf", "%PDF")]).unwrap();

        run(&dashboard, &doc.id, ChatInput::Shortcut(PromptShortcut::Summarize)).await.0.unwrap();

        let snapshot = dashboard.chat(&doc.id).unwrap();
        assert_eq!(snapshot.messages[1].text, "Create a concise summary of the document \"r.pdf\"");
        assert_eq!(snapshot.shortcuts.len(), 3);
    }

    #[tokio::test]
    async fn second_send_while_streaming_is_a_no_op() {
        let (chat, release) = GatedChat::gated();
        let dashboard = dashboard_with(chat);
        let doc = dashboard.upload([file("n.txt", "text/plain", "x")]).unwrap();

        let background = dashboard.clone();
        let id = doc.id.clone();
        let first = tokio::spawn(async move {
            background.send(&id, ChatInput::Text("first".into()), |_| {}).await
        });

        for _ in 0..100 {
            if dashboard.chat(&doc.id).unwrap().awaiting_response {
                break;
            }
            tokio::task::yield_now().await;
        }
        let before = dashboard.chat(&doc.id).unwrap();
        assert!(before.awaiting_response);

        let (result, events) = run(&dashboard, &doc.id, ChatInput::Text("second".into())).await;
        assert!(result.unwrap_err().is_busy());
        assert!(events.is_empty());
        assert_eq!(dashboard.chat(&doc.id).unwrap().messages.len(), before.messages.len());

        release.send("done".to_string()).unwrap();
        first.await.unwrap().unwrap();

        let after = dashboard.chat(&doc.id).unwrap();
        assert!(!after.awaiting_response);
        assert_eq!(after.messages.last().unwrap().text, "done");
    }

    #[tokio::test]
    async fn abandoned_turn_returns_the_view_to_idle() {
        let (chat, _release) = GatedChat::gated();
        let dashboard = dashboard_with(chat);
        let doc = dashboard.upload([file("n.txt", "text/plain", "x")]).unwrap();

        let background = dashboard.clone();
        let id = doc.id.clone();
        let turn = tokio::spawn(async move {
            background.send(&id, ChatInput::Text("q".into()), |_| {}).await
        });
        for _ in 0..100 {
            if dashboard.chat(&doc.id).unwrap().awaiting_response {
                break;
            }
            tokio::task::yield_now().await;
        }

        turn.abort();
        let _ = turn.await;
        assert!(!dashboard.chat(&doc.id).unwrap().awaiting_response);
    }

    #[tokio::test]
    async fn unknown_document_send_fails() {
        let dashboard = dashboard_with(ScriptedChat::replying(&[]));
        let (result, _) = run(&dashboard, "nope", ChatInput::Text("q".into())).await;
        assert!(result.unwrap_err().is_not_found());
    }
}
