//! Scripted providers for exercising the gateway and the views without a network.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::{ChatProvider, ChunkStream, GeneratedImage, ImageProvider, ImageSpec};
use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct ChatCall {
    pub session: String,
    pub prompt: String,
}

#[derive(Clone)]
enum ChatScript {
    Reply(Vec<String>),
    FailOnOpen,
    FailAfter(Vec<String>),
}

/// Replies with a fixed list of chunks and records every prompt it receives.
#[derive(Clone)]
pub struct ScriptedChat {
    script: ChatScript,
    calls: Arc<Mutex<Vec<ChatCall>>>,
}

impl ScriptedChat {
    fn with(script: ChatScript) -> Self {
        Self { script, calls: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn replying(chunks: &[&str]) -> Self {
        Self::with(ChatScript::Reply(chunks.iter().map(|c| c.to_string()).collect()))
    }

    pub fn failing_on_open() -> Self {
        Self::with(ChatScript::FailOnOpen)
    }

    pub fn failing_after(chunks: &[&str]) -> Self {
        Self::with(ChatScript::FailAfter(chunks.iter().map(|c| c.to_string()).collect()))
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedChat {
    async fn stream(&self, session: &str, prompt: String) -> Result<ChunkStream, AppError> {
        self.calls.lock().push(ChatCall { session: session.to_string(), prompt });

        match &self.script {
            ChatScript::FailOnOpen => Err(AppError::provider("connection refused")),
            ChatScript::Reply(chunks) => {
                Ok(Box::pin(stream::iter(chunks.clone().into_iter().map(Ok::<String, AppError>))))
            }
            ChatScript::FailAfter(chunks) => {
                let items = chunks
                    .clone()
                    .into_iter()
                    .map(Ok::<String, AppError>)
                    .chain(std::iter::once(Err(AppError::provider("stream reset"))));
                Ok(Box::pin(stream::iter(items)))
            }
        }
    }
}

/// Holds its single reply back until the test releases it.
pub struct GatedChat {
    gate: Mutex<Option<oneshot::Receiver<String>>>,
}

impl GatedChat {
    pub fn gated() -> (Self, oneshot::Sender<String>) {
        let (tx, rx) = oneshot::channel();
        (Self { gate: Mutex::new(Some(rx)) }, tx)
    }
}

#[async_trait]
impl ChatProvider for GatedChat {
    async fn stream(&self, _session: &str, _prompt: String) -> Result<ChunkStream, AppError> {
        let rx = self
            .gate
            .lock()
            .take()
            .ok_or_else(|| AppError::provider("gate already used"))?;
        let reply = stream::once(async move {
            rx.await.map_err(|_| AppError::provider("gate dropped"))
        });
        Ok(Box::pin(reply))
    }
}

/// Returns canned image payloads and records every spec.
#[derive(Clone)]
pub struct ScriptedImages {
    result: Option<Vec<Vec<u8>>>,
    specs: Arc<Mutex<Vec<ImageSpec>>>,
}

impl ScriptedImages {
    pub fn returning(images: Vec<Vec<u8>>) -> Self {
        Self { result: Some(images), specs: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    pub fn failing() -> Self {
        Self { result: None, specs: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn specs(&self) -> Vec<ImageSpec> {
        self.specs.lock().clone()
    }
}

#[async_trait]
impl ImageProvider for ScriptedImages {
    async fn generate(&self, spec: &ImageSpec) -> Result<Vec<GeneratedImage>, AppError> {
        self.specs.lock().push(spec.clone());
        match &self.result {
            Some(images) => Ok(images
                .iter()
                .map(|b| GeneratedImage { bytes: Bytes::from(b.clone()) })
                .collect()),
            None => Err(AppError::provider("quota exceeded")),
        }
    }
}
