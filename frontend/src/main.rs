mod api;
mod components;
mod models;
mod state;
mod ws;

use leptos::mount::mount_to_body;
use leptos::prelude::*;

use components::dashboard::Dashboard;
use components::image_studio::ImageStudio;
use components::sidebar::Sidebar;
use state::{AppState, Page};

/// Root application component.
#[component]
fn App() -> impl IntoView {
    let state = AppState::provide();

    // Load documents on mount
    state.load_documents();

    view! {
        <div class="app-container">
            <Sidebar />
            <main class="main-area">
                {move || match state.page.get() {
                    Page::Dashboard => view! { <Dashboard /> }.into_any(),
                    Page::ImageStudio => view! { <ImageStudio /> }.into_any(),
                }}
            </main>
        </div>
    }
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    mount_to_body(App);
}
