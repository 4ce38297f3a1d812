use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::agent::AiGateway;
use crate::errors::AppError;
use crate::models::ImageStudioSnapshot;

const EMPTY_PROMPT: &str = "Please enter a prompt.";

/// Text-to-image view state. One generation at a time.
#[derive(Clone)]
pub struct ImageStudio {
    state: Arc<Mutex<ImageStudioSnapshot>>,
    gateway: AiGateway,
}

impl ImageStudio {
    pub fn new(gateway: AiGateway) -> Self {
        Self { state: Arc::new(Mutex::new(ImageStudioSnapshot::default())), gateway }
    }

    pub fn snapshot(&self) -> ImageStudioSnapshot {
        self.state.lock().clone()
    }

    /// Generates an image for `prompt` and returns the resulting state.
    ///
    /// Failures are reported through the snapshot's `error`, not as `Err`;
    /// `Err` only signals that another generation is still running.
    pub async fn generate(&self, prompt: &str) -> Result<ImageStudioSnapshot, AppError> {
        {
            let mut state = self.state.lock();
            if state.generating {
                return Err(AppError::GenerationInProgress);
            }
            state.prompt = prompt.to_string();
            if prompt.trim().is_empty() {
                state.error = Some(EMPTY_PROMPT.to_string());
                return Ok(state.clone());
            }
            state.generating = true;
            state.error = None;
            state.image_url = None;
        }

        let _reset = GeneratingGuard(self.state.clone());
        info!("Generating image for prompt of {} chars", prompt.len());
        let result = self.gateway.generate_image(prompt).await;

        let mut state = self.state.lock();
        state.generating = false;
        match result {
            Ok(url) => {
                state.image_url = Some(url);
                state.error = None;
            }
            Err(e) => {
                state.image_url = None;
                state.error = Some(e.to_string());
            }
        }
        Ok(state.clone())
    }
}

/// Clears `generating` if the request is dropped mid-flight.
struct GeneratingGuard(Arc<Mutex<ImageStudioSnapshot>>);

impl Drop for GeneratingGuard {
    fn drop(&mut self) {
        self.0.lock().generating = false;
    }
}
