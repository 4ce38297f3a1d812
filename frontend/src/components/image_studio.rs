use leptos::ev;
use leptos::prelude::*;

use crate::state::AppState;

#[component]
pub fn ImageStudio() -> impl IntoView {
    let state = expect_context::<AppState>();
    let image = state.image;
    let loading = state.image_loading;
    let (prompt, set_prompt) = signal(String::new());

    let generate = move || {
        if loading.get_untracked() {
            return;
        }
        state.generate_image(prompt.get_untracked());
    };

    let generate_on_enter = generate.clone();
    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" {
            ev.prevent_default();
            generate_on_enter();
        }
    };

    view! {
        <div class="image-studio">
            <h2>"Image Studio"</h2>
            <div class="image-prompt-row">
                <input
                    type="text"
                    placeholder="Describe the image you want to create..."
                    prop:value=prompt
                    on:input=move |ev| set_prompt.set(event_target_value(&ev))
                    on:keydown=on_keydown
                    disabled=move || loading.get()
                />
                <button
                    class="generate-btn"
                    on:click=move |_| generate()
                    disabled=move || loading.get() || prompt.get().trim().is_empty()
                >
                    {move || if loading.get() { "Generating..." } else { "Generate" }}
                </button>
            </div>

            {move || image.get().error.map(|err| view! { <p class="image-error">{err}</p> })}

            <div class="image-canvas">
                {move || {
                    if loading.get() {
                        view! {
                            <div class="spinner-wrap">
                                <div class="spinner"></div>
                                <p>"Generating your masterpiece..."</p>
                            </div>
                        }
                            .into_any()
                    } else if let Some(url) = image.get().image_url {
                        view! { <img class="generated-image" src=url alt="Generated image" /> }
                            .into_any()
                    } else {
                        view! {
                            <p class="image-placeholder">"Your generated image will appear here"</p>
                        }
                            .into_any()
                    }
                }}
            </div>
        </div>
    }
}
