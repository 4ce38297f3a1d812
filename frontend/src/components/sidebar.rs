use leptos::prelude::*;

use crate::state::{AppState, Page};

/// Navigation between the document dashboard and the image studio.
#[component]
pub fn Sidebar() -> impl IntoView {
    let state = expect_context::<AppState>();
    let current = state.page;
    let set_page = state.set_page;

    let nav_item = move |page: Page, label: &'static str| {
        view! {
            <button
                class="nav-item"
                class:active=move || current.get() == page
                on:click=move |_| set_page.set(page)
            >
                {label}
            </button>
        }
    };

    view! {
        <aside class="sidebar">
            <div class="sidebar-header">
                <h2>"Doc Studio"</h2>
            </div>
            <nav class="nav-list">
                {nav_item(Page::Dashboard, "Dashboard")}
                {nav_item(Page::ImageStudio, "Image Studio")}
            </nav>
        </aside>
    }
}
