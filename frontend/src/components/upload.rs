use leptos::ev;
use leptos::prelude::*;
use web_sys::{FileList, HtmlInputElement};

use crate::state::AppState;

/// Drop zone plus file picker. Only the first file of a drop is uploaded.
#[component]
pub fn FileUpload() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (is_dragging, set_is_dragging) = signal(false);

    let upload_first = {
        let state = state.clone();
        move |files: Option<FileList>| {
            if let Some(file) = files.and_then(|f| f.get(0)) {
                state.upload(file);
            }
        }
    };

    let on_drop = {
        let upload_first = upload_first.clone();
        move |ev: ev::DragEvent| {
            ev.prevent_default();
            ev.stop_propagation();
            set_is_dragging.set(false);
            upload_first(ev.data_transfer().and_then(|dt| dt.files()));
        }
    };

    let on_change = move |ev: ev::Event| {
        let input = event_target::<HtmlInputElement>(&ev);
        upload_first(input.files());
        input.set_value("");
    };

    view! {
        <div class="upload-zone">
            <label
                for="file-upload"
                class="upload-label"
                class:dragging=move || is_dragging.get()
                on:dragenter=move |ev: ev::DragEvent| {
                    ev.prevent_default();
                    set_is_dragging.set(true);
                }
                on:dragleave=move |ev: ev::DragEvent| {
                    ev.prevent_default();
                    set_is_dragging.set(false);
                }
                on:dragover=move |ev: ev::DragEvent| ev.prevent_default()
                on:drop=on_drop
            >
                <p class="upload-title">"Click to upload or drag and drop"</p>
                <p class="upload-hint">"PDF, DOCX, JPG, PNG, or TXT (max 100MB)"</p>
                <input id="file-upload" type="file" class="hidden" on:change=on_change />
            </label>
        </div>
    }
}
