use leptos::ev;
use leptos::prelude::*;

use crate::models::{ChatInput, ChatMessage, MessageAuthor};
use crate::state::{AppState, ChatPhase};

/// Conversation about the selected document, with canned prompts and input.
#[component]
pub fn DocumentChat() -> impl IntoView {
    let state = expect_context::<AppState>();
    let documents = state.documents;
    let selected = state.selected;
    let messages = state.messages;
    let error = state.error;
    let chat_phase = state.chat_phase;

    let title = move || {
        let id = selected.get();
        documents
            .get()
            .into_iter()
            .find(|d| Some(&d.id) == id.as_ref())
            .map(|d| d.name)
            .unwrap_or_default()
    };

    let awaiting_placeholder = move || {
        chat_phase.get() == ChatPhase::AwaitingResponse
            && messages
                .get()
                .last()
                .is_some_and(|m| m.author == MessageAuthor::Bot && m.text.is_empty())
    };

    view! {
        <div class="chat-area">
            <div class="chat-header">"Chat with: " {title}</div>

            {move || error.get().map(|err| view! { <div class="error-banner">{err}</div> })}

            <div class="messages-container">
                {move || {
                    messages
                        .get()
                        .into_iter()
                        .map(|message| view! { <MessageBubble message /> })
                        .collect_view()
                }}
                {move || {
                    awaiting_placeholder()
                        .then(|| view! { <div class="typing-indicator">"..."</div> })
                }}
            </div>

            <PromptShortcuts />
            <ChatInputRow />
        </div>
    }
}

/// A single chat message bubble.
#[component]
fn MessageBubble(message: ChatMessage) -> impl IntoView {
    let css_class = match message.author {
        MessageAuthor::User => "message user",
        MessageAuthor::Bot => "message bot",
    };
    let text = if message.text.is_empty() { "...".to_string() } else { message.text };

    view! {
        <div class=css_class>
            <p class="message-text">{text}</p>
        </div>
    }
}

#[component]
fn PromptShortcuts() -> impl IntoView {
    let state = expect_context::<AppState>();
    let shortcuts = state.shortcuts;

    view! {
        <div class="prompt-shortcuts">
            {move || {
                shortcuts
                    .get()
                    .into_iter()
                    .map(|shortcut| {
                        let state = state.clone();
                        let id = shortcut.id.clone();
                        view! {
                            <button
                                class="prompt-btn"
                                on:click=move |_| state.send(ChatInput::Shortcut(id.clone()))
                            >
                                {shortcut.label}
                            </button>
                        }
                    })
                    .collect_view()
            }}
        </div>
    }
}

/// Text input and send button; disabled while a reply is streaming.
#[component]
fn ChatInputRow() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (input, set_input) = signal(String::new());
    let chat_phase = state.chat_phase;

    let is_sending = move || chat_phase.get() == ChatPhase::AwaitingResponse;

    let send = move || {
        let text = input.get_untracked();
        if text.trim().is_empty() || is_sending() {
            return;
        }
        set_input.set(String::new());
        state.send(ChatInput::Text(text));
    };

    let send_clone = send.clone();
    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" {
            ev.prevent_default();
            send_clone();
        }
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <input
                    type="text"
                    placeholder="Ask a question about the document..."
                    prop:value=input
                    on:input=move |ev| set_input.set(event_target_value(&ev))
                    on:keydown=on_keydown
                    disabled=is_sending
                />
                <button
                    class="send-btn"
                    on:click=move |_| send()
                    disabled=move || is_sending() || input.get().trim().is_empty()
                >
                    {move || if is_sending() { "Sending…" } else { "Send" }}
                </button>
            </div>
        </div>
    }
}
