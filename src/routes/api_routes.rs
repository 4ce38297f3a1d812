use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use super::{AppState, error_response};
use crate::errors::AppError;
use crate::models::{DocumentListResponse, ImageRequest};
use crate::service::upload::UploadedFile;

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

// ── Documents ────────────────────────────────────────────────────────────────

/// GET `/api/documents` — the document list and current selection
pub async fn list_documents_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(DocumentListResponse {
        documents: state.dashboard.documents(),
        selected: state.dashboard.selected(),
    })
}

/// POST `/api/documents` — multipart upload; the first file field wins
pub async fn upload_document_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let mut first: Option<UploadedFile> = None;
    let mut ignored = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read multipart upload: {e}");
                return error_response(&AppError::UploadFailed { message: e.to_string() });
            }
        };

        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if first.is_some() {
            ignored += 1;
            continue;
        }

        let mime_type = field.content_type().unwrap_or(FALLBACK_MIME_TYPE).to_string();
        match field.bytes().await {
            Ok(data) => first = Some(UploadedFile { name, mime_type, data }),
            Err(e) => {
                warn!("Failed to read upload bytes: {e}");
                return error_response(&AppError::UploadFailed { message: e.to_string() });
            }
        }
    }

    if ignored > 0 {
        debug!("Ignoring {ignored} additional file(s) in upload");
    }

    match state.dashboard.upload(first) {
        Ok(summary) => (StatusCode::CREATED, Json(summary)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/documents/{id}/select`
pub async fn select_document_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.dashboard.select(&id) {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET `/api/documents/{id}/chat` — messages and whether a reply is streaming
pub async fn chat_snapshot_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.dashboard.chat(&id) {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(&e),
    }
}

// ── Image studio ─────────────────────────────────────────────────────────────

/// GET `/api/images`
pub async fn image_studio_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.studio.snapshot())
}

/// POST `/api/images` — generation errors come back inside the snapshot
pub async fn generate_image_handler(
    State(state): State<AppState>,
    Json(request): Json<ImageRequest>,
) -> Response {
    match state.studio.generate(&request.prompt).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(&e),
    }
}
