use leptos::prelude::*;

use crate::components::chat::DocumentChat;
use crate::components::upload::FileUpload;
use crate::state::AppState;

/// Document list on the left, chat for the selected document on the right.
#[component]
pub fn Dashboard() -> impl IntoView {
    let state = expect_context::<AppState>();
    let selected = state.selected;

    view! {
        <div class="dashboard">
            <section class="documents-panel">
                <h2>"Your Documents"</h2>
                <FileUpload />
                <FileList />
            </section>
            <section class="chat-panel">
                {move || {
                    if selected.get().is_some() {
                        view! { <DocumentChat /> }.into_any()
                    } else {
                        view! {
                            <div class="empty-state">
                                <h2>"Welcome to your AI Assistant"</h2>
                                <p>"Upload a document to get started."</p>
                            </div>
                        }
                        .into_any()
                    }
                }}
            </section>
        </div>
    }
}

#[component]
fn FileList() -> impl IntoView {
    let state = expect_context::<AppState>();
    let documents = state.documents;
    let selected = state.selected;

    view! {
        <div class="file-list">
            {move || {
                let docs = documents.get();
                if docs.is_empty() {
                    view! { <p class="file-list-empty">"No files uploaded yet."</p> }.into_any()
                } else {
                    docs.into_iter()
                        .map(|doc| {
                            let state = state.clone();
                            let id = doc.id.clone();
                            let id_active = doc.id.clone();
                            view! {
                                <button
                                    class="file-item"
                                    class:active=move || {
                                        selected.get().as_deref() == Some(id_active.as_str())
                                    }
                                    on:click=move |_| state.select_document(id.clone())
                                >
                                    {doc.name}
                                </button>
                            }
                        })
                        .collect_view()
                        .into_any()
                }
            }}
        </div>
    }
}
