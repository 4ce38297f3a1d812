pub mod api_routes;
pub mod ws_routes;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::models::ErrorBody;
use crate::service::dashboard::Dashboard;
use crate::service::image_studio::ImageStudio;

use self::api_routes::{
    chat_snapshot_handler, generate_image_handler, image_studio_handler, list_documents_handler,
    select_document_handler, upload_document_handler,
};
use self::ws_routes::ws_chat_handler;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Dashboard,
    pub studio: ImageStudio,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/documents",
            get(list_documents_handler)
                .post(upload_document_handler)
                .layer(DefaultBodyLimit::disable()),
        )
        .route("/api/documents/{id}/select", post(select_document_handler))
        .route("/api/documents/{id}/chat", get(chat_snapshot_handler))
        .route("/api/images", get(image_studio_handler).post(generate_image_handler))
        .route("/ws/chat", get(ws_chat_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub(crate) fn error_response(err: &AppError) -> Response {
    let status = if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.is_busy() {
        StatusCode::CONFLICT
    } else if matches!(err, AppError::GenerationFailed { .. } | AppError::Provider { .. }) {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ErrorBody { error: err.to_string() })).into_response()
}
