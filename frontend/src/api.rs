use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;
use web_sys::{File, FormData};

use crate::models::{
    ChatSnapshot, DocumentListResponse, DocumentSummary, ErrorBody, ImageRequest,
    ImageStudioSnapshot,
};

/// Base URL of the backend API server.
const API_BASE: &str = "http://localhost:3000";

/// Decodes a JSON body, turning error responses into their message.
async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, String> {
    if !resp.ok() {
        let status = resp.status();
        return Err(match resp.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("Server error: {status}"),
        });
    }
    resp.json::<T>().await.map_err(|e| format!("Parse error: {e}"))
}

/// Fetches the uploaded documents and the current selection.
pub async fn fetch_documents() -> Result<DocumentListResponse, String> {
    let resp = Request::get(&format!("{API_BASE}/api/documents"))
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read_json(resp).await
}

/// Uploads a single file as multipart form data.
pub async fn upload_document(file: &File) -> Result<DocumentSummary, String> {
    let form = FormData::new().map_err(|e| format!("Form error: {e:?}"))?;
    form.append_with_blob_and_filename("file", file, &file.name())
        .map_err(|e| format!("Form error: {e:?}"))?;

    let resp = Request::post(&format!("{API_BASE}/api/documents"))
        .body(form)
        .map_err(|e| format!("Request error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read_json(resp).await
}

pub async fn select_document(document_id: &str) -> Result<DocumentSummary, String> {
    let resp = Request::post(&format!("{API_BASE}/api/documents/{document_id}/select"))
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read_json(resp).await
}

/// Fetches the conversation for a document.
pub async fn fetch_chat(document_id: &str) -> Result<ChatSnapshot, String> {
    let resp = Request::get(&format!("{API_BASE}/api/documents/{document_id}/chat"))
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read_json(resp).await
}

pub async fn generate_image(prompt: &str) -> Result<ImageStudioSnapshot, String> {
    let body = ImageRequest { prompt: prompt.to_string() };
    let resp = Request::post(&format!("{API_BASE}/api/images"))
        .json(&body)
        .map_err(|e| format!("Serialize error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read_json(resp).await
}

/// Returns the WebSocket URL for the chat streaming endpoint.
pub fn ws_url() -> String {
    "ws://localhost:3000/ws/chat".to_string()
}
