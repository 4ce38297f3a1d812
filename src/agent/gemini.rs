use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use rig::agent::{Agent, MultiTurnStreamItem};
use rig::client::CompletionClient;
use rig::message::Message as RigMessage;
use rig::providers::gemini;
use rig::streaming::{StreamedAssistantContent, StreamingPrompt};
use tracing::{debug, info};

use super::{ChatProvider, ChunkStream};
use crate::errors::AppError;

const PREAMBLE: &str = "You are a helpful assistant that answers questions about documents \
                        the user has uploaded. Be accurate and clear. \
                        If the document does not contain the answer, say so.";

type GeminiAgent = Agent<gemini::completion::CompletionModel>;

/// Streaming chat against Gemini through rig.
///
/// The agent is the conversation session handle: built on first use and
/// reused for the life of the process. History is kept per session key and
/// only grows once a reply has streamed to completion.
pub struct GeminiChat {
    client: gemini::Client,
    model: String,
    agent: OnceLock<GeminiAgent>,
    histories: Arc<Mutex<HashMap<String, Vec<RigMessage>>>>,
}

impl GeminiChat {
    pub fn new(api_key: &str, model: &str) -> Result<Self, AppError> {
        let client = gemini::Client::new(api_key)
            .map_err(|e| AppError::provider(format!("Failed to build Gemini client: {e}")))?;
        Ok(Self {
            client,
            model: model.to_string(),
            agent: OnceLock::new(),
            histories: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn agent(&self) -> &GeminiAgent {
        self.agent.get_or_init(|| {
            info!("Creating chat session for model {}", self.model);
            self.client.agent(&self.model).preamble(PREAMBLE).build()
        })
    }
}

#[async_trait]
impl ChatProvider for GeminiChat {
    async fn stream(&self, session: &str, prompt: String) -> Result<ChunkStream, AppError> {
        let agent = self.agent().clone();
        let histories = self.histories.clone();
        let session = session.to_string();
        let history = histories.lock().get(&session).cloned().unwrap_or_default();
        debug!("Streaming turn for session {session} with {} prior messages", history.len());

        let stream = async_stream::stream! {
            let mut inner = agent
                .stream_prompt(RigMessage::user(&prompt))
                .with_history(history)
                .await;

            let mut reply = String::new();
            while let Some(item) = inner.next().await {
                match item {
                    Ok(MultiTurnStreamItem::StreamAssistantItem(StreamedAssistantContent::Text(text))) => {
                        reply.push_str(&text.text);
                        yield Ok(text.text);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(AppError::provider(e.to_string()));
                        return;
                    }
                }
            }

            histories
                .lock()
                .entry(session)
                .or_default()
                .extend([RigMessage::user(&prompt), RigMessage::assistant(&reply)]);
        };

        Ok(Box::pin(stream))
    }
}
