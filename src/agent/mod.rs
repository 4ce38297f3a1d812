pub mod gemini;
pub mod imagen;
pub mod prompt;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tracing::{debug, error};

use crate::config::{AppConfig, SessionScope};
use crate::errors::AppError;

use self::gemini::GeminiChat;
use self::imagen::ImagenClient;

/// Delivered as the only chunk when a chat stream cannot be produced.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";
pub const IMAGE_FAILURE: &str = "Failed to generate image. Please check the prompt and try again.";
pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

const SHARED_SESSION: &str = "shared";

/// Ordered text fragments of one streamed reply.
pub type ChunkStream = BoxStream<'static, Result<String, AppError>>;

/// A conversational model that streams its reply.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// `session` selects the conversation history the prompt continues.
    async fn stream(&self, session: &str, prompt: String) -> Result<ChunkStream, AppError>;
}

/// Parameters of one image generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    pub prompt: String,
    pub count: u32,
    pub mime_type: &'static str,
    pub aspect_ratio: &'static str,
}

impl ImageSpec {
    pub fn square_jpeg(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            count: 1,
            mime_type: IMAGE_MIME_TYPE,
            aspect_ratio: "1:1",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Bytes,
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate(&self, spec: &ImageSpec) -> Result<Vec<GeneratedImage>, AppError>;
}

/// Single entry point to the generative-AI provider, shared by every view.
#[derive(Clone)]
pub struct AiGateway {
    chat: Arc<dyn ChatProvider>,
    images: Arc<dyn ImageProvider>,
    scope: SessionScope,
}

impl AiGateway {
    pub fn new(
        chat: Arc<dyn ChatProvider>,
        images: Arc<dyn ImageProvider>,
        scope: SessionScope,
    ) -> Self {
        Self { chat, images, scope }
    }

    /// Wires the Gemini chat model and the Imagen client from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let chat = GeminiChat::new(&config.api_key, &config.chat_model)?;
        let images = ImagenClient::new(&config.api_base_url, &config.api_key, &config.image_model)?;
        Ok(Self::new(Arc::new(chat), Arc::new(images), config.session_scope))
    }

    fn session_key<'a>(&self, document_id: &'a str) -> &'a str {
        match self.scope {
            SessionScope::PerDocument => document_id,
            SessionScope::Shared => SHARED_SESSION,
        }
    }

    /// Streams the assistant's reply to `message` about a document, calling
    /// `on_chunk` for every fragment in the order the provider yields them.
    ///
    /// Never fails: any provider error is logged and replaced by a single
    /// [`FALLBACK_REPLY`] chunk. Returns once the reply is fully delivered.
    pub async fn stream_reply(
        &self,
        document_id: &str,
        message: &str,
        document_context: &str,
        mut on_chunk: impl FnMut(&str) + Send,
    ) {
        let full_prompt = prompt::build_prompt(message, document_context);
        let session = self.session_key(document_id);

        let mut stream = match self.chat.stream(session, full_prompt).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Error streaming chat response for {document_id}: {e}");
                on_chunk(FALLBACK_REPLY);
                return;
            }
        };

        let mut delivered = 0usize;
        while let Some(item) = stream.next().await {
            match item {
                Ok(text) => {
                    delivered += 1;
                    on_chunk(&text);
                }
                Err(e) => {
                    error!("Error streaming chat response for {document_id} after {delivered} chunks: {e}");
                    on_chunk(FALLBACK_REPLY);
                    return;
                }
            }
        }
        debug!("Chat stream for {document_id} finished after {delivered} chunks");
    }

    /// Generates one square JPEG and returns it as a `data:` URI.
    pub async fn generate_image(&self, prompt: &str) -> Result<String, AppError> {
        let spec = ImageSpec::square_jpeg(prompt);

        let images = self.images.generate(&spec).await.map_err(|e| {
            error!("Error generating image: {e}");
            generation_failed()
        })?;

        let image = images.into_iter().next().ok_or_else(|| {
            error!("Error generating image: No image was generated.");
            generation_failed()
        })?;

        Ok(format!(
            "data:{};base64,{}",
            spec.mime_type,
            BASE64.encode(&image.bytes)
        ))
    }
}

fn generation_failed() -> AppError {
    AppError::GenerationFailed { message: IMAGE_FAILURE.to_string() }
}
