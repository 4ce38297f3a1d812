use leptos::prelude::*;
use leptos::task::spawn_local;
use web_sys::File;

use crate::api;
use crate::models::{
    ChatInput, ChatMessage, DocumentSummary, ImageStudioSnapshot, MessageAuthor, ShortcutView,
    WsChatRequest, WsEvent,
};
use crate::ws;

/// Which page the navigation shell shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    ImageStudio,
}

/// Client-side gate: one chat request in flight at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    AwaitingResponse,
}

/// Shared application state, provided via Leptos context.
#[derive(Clone)]
pub struct AppState {
    // --- Read signals (for components to subscribe to) ---
    pub page: ReadSignal<Page>,
    pub documents: ReadSignal<Vec<DocumentSummary>>,
    pub selected: ReadSignal<Option<String>>,
    pub messages: ReadSignal<Vec<ChatMessage>>,
    pub shortcuts: ReadSignal<Vec<ShortcutView>>,
    pub chat_phase: ReadSignal<ChatPhase>,
    pub error: ReadSignal<Option<String>>,
    pub image: ReadSignal<ImageStudioSnapshot>,
    pub image_loading: ReadSignal<bool>,

    // --- Write signals (for mutating state) ---
    pub set_page: WriteSignal<Page>,
    pub set_documents: WriteSignal<Vec<DocumentSummary>>,
    pub set_selected: WriteSignal<Option<String>>,
    pub set_messages: WriteSignal<Vec<ChatMessage>>,
    pub set_shortcuts: WriteSignal<Vec<ShortcutView>>,
    pub set_chat_phase: WriteSignal<ChatPhase>,
    pub set_error: WriteSignal<Option<String>>,
    pub set_image: WriteSignal<ImageStudioSnapshot>,
    pub set_image_loading: WriteSignal<bool>,
}

impl AppState {
    /// Create a new `AppState` and provide it in the current Leptos context.
    pub fn provide() -> Self {
        let (page, set_page) = signal(Page::Dashboard);
        let (documents, set_documents) = signal(Vec::<DocumentSummary>::new());
        let (selected, set_selected) = signal(None::<String>);
        let (messages, set_messages) = signal(Vec::<ChatMessage>::new());
        let (shortcuts, set_shortcuts) = signal(Vec::<ShortcutView>::new());
        let (chat_phase, set_chat_phase) = signal(ChatPhase::Idle);
        let (error, set_error) = signal(None::<String>);
        let (image, set_image) = signal(ImageStudioSnapshot::default());
        let (image_loading, set_image_loading) = signal(false);

        let state = Self {
            page,
            documents,
            selected,
            messages,
            shortcuts,
            chat_phase,
            error,
            image,
            image_loading,
            set_page,
            set_documents,
            set_selected,
            set_messages,
            set_shortcuts,
            set_chat_phase,
            set_error,
            set_image,
            set_image_loading,
        };

        provide_context(state.clone());
        state
    }

    /// Load the document list from the backend.
    pub fn load_documents(&self) {
        let state = self.clone();
        spawn_local(async move {
            match api::fetch_documents().await {
                Ok(list) => {
                    state.set_documents.set(list.documents);
                    if let Some(id) = list.selected {
                        state.open_chat(id);
                    }
                }
                Err(e) => {
                    log::error!("Failed to fetch documents: {e}");
                    state.set_error.set(Some(e));
                }
            }
        });
    }

    /// Upload one file; the backend selects it on success.
    pub fn upload(&self, file: File) {
        let state = self.clone();
        self.set_error.set(None);
        spawn_local(async move {
            match api::upload_document(&file).await {
                Ok(document) => {
                    let id = document.id.clone();
                    state.set_documents.update(|docs| docs.push(document));
                    state.open_chat(id);
                }
                Err(e) => {
                    log::error!("Upload failed: {e}");
                    state.set_error.set(Some(e));
                }
            }
        });
    }

    /// Select a document and load its conversation.
    pub fn select_document(&self, id: String) {
        let state = self.clone();
        spawn_local(async move {
            if let Err(e) = api::select_document(&id).await {
                log::error!("Failed to select document: {e}");
                state.set_error.set(Some(e));
                return;
            }
            state.open_chat(id);
        });
    }

    fn open_chat(&self, id: String) {
        let state = self.clone();
        self.set_selected.set(Some(id.clone()));
        self.set_error.set(None);

        spawn_local(async move {
            match api::fetch_chat(&id).await {
                Ok(snapshot) => {
                    state.set_messages.set(snapshot.messages);
                    state.set_shortcuts.set(snapshot.shortcuts);
                    state.set_chat_phase.set(if snapshot.awaiting_response {
                        ChatPhase::AwaitingResponse
                    } else {
                        ChatPhase::Idle
                    });
                }
                Err(e) => {
                    log::error!("Failed to fetch chat: {e}");
                    state.set_error.set(Some(e));
                }
            }
        });
    }

    /// Send typed text or a canned prompt via WebSocket streaming.
    /// Ignored while a reply is still streaming.
    pub fn send(&self, input: ChatInput) {
        if self.chat_phase.get_untracked() != ChatPhase::Idle {
            return;
        }
        if matches!(&input, ChatInput::Text(text) if text.trim().is_empty()) {
            return;
        }
        let Some(document_id) = self.selected.get_untracked() else {
            return;
        };

        self.set_chat_phase.set(ChatPhase::AwaitingResponse);
        self.set_error.set(None);

        let set_messages = self.set_messages;
        let set_chat_phase = self.set_chat_phase;
        let set_error = self.set_error;
        let selected = self.selected;
        let turn_document = document_id.clone();

        // Events of a turn whose document is no longer on screen leave the
        // visible chat and its gate alone.
        let on_event = move |event: WsEvent| {
            let current =
                is_for_selected(selected.get_untracked().as_deref(), &turn_document, &event);
            match event {
                WsEvent::StreamStart { user_message, bot_message_id, .. } if current => {
                    set_messages.update(|msgs| {
                        msgs.push(user_message);
                        msgs.push(ChatMessage {
                            id: bot_message_id,
                            author: MessageAuthor::Bot,
                            text: String::new(),
                        });
                    });
                }
                WsEvent::StreamChunk { message_id, content, .. } if current => {
                    set_messages.update(|msgs| {
                        if let Some(msg) = msgs.iter_mut().rev().find(|m| m.id == message_id) {
                            msg.text.push_str(&content);
                        }
                    });
                }
                WsEvent::StreamEnd { .. } if current => {
                    set_chat_phase.set(ChatPhase::Idle);
                }
                WsEvent::Rejected { reason } => {
                    log::warn!("Chat send rejected: {reason}");
                    if current {
                        set_chat_phase.set(ChatPhase::Idle);
                    }
                }
                WsEvent::Error { message } => {
                    log::error!("Chat stream error: {message}");
                    if current {
                        set_error.set(Some(message));
                        set_chat_phase.set(ChatPhase::Idle);
                    }
                }
                _ => log::debug!("Ignoring event for {turn_document}: not selected"),
            }
        };

        ws::start_streaming(WsChatRequest { document_id, input }, on_event);
    }

    /// Generate an image; errors are shown inline from the returned snapshot.
    pub fn generate_image(&self, prompt: String) {
        if prompt.trim().is_empty() {
            self.set_image.update(|img| img.error = Some("Please enter a prompt.".to_string()));
            return;
        }
        if self.image_loading.get_untracked() {
            return;
        }

        let state = self.clone();
        self.set_image_loading.set(true);
        self.set_image.update(|img| {
            img.image_url = None;
            img.error = None;
        });

        spawn_local(async move {
            match api::generate_image(&prompt).await {
                Ok(snapshot) => state.set_image.set(snapshot),
                Err(e) => state.set_image.update(|img| {
                    img.image_url = None;
                    img.error = Some(e);
                }),
            }
            state.set_image_loading.set(false);
        });
    }
}

/// Whether `event`, from the turn on `turn_document`, belongs to the chat
/// currently on screen.
fn is_for_selected(selected: Option<&str>, turn_document: &str, event: &WsEvent) -> bool {
    let document_id = match event {
        WsEvent::StreamStart { document_id, .. }
        | WsEvent::StreamChunk { document_id, .. }
        | WsEvent::StreamEnd { document_id, .. } => document_id.as_str(),
        WsEvent::Rejected { .. } | WsEvent::Error { .. } => turn_document,
    };
    selected == Some(document_id)
}
