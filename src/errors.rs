use thiserror::Error;

/// Top-level application error.
/// All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Startup errors ───────────────────────────────────────────────────────
    #[error("{var} environment variable is not set.")]
    MissingCredential { var: String },

    #[error("Invalid value '{value}' for {key}")]
    InvalidConfig { key: String, value: String },

    // ── AI provider errors ───────────────────────────────────────────────────
    #[error("Provider request failed: {message}")]
    Provider { message: String },

    #[error("{message}")]
    GenerationFailed { message: String },

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("Upload failed: {message}")]
    UploadFailed { message: String },

    // ── Document / conversation errors ───────────────────────────────────────
    #[error("Document '{id}' not found")]
    DocumentNotFound { id: String },

    #[error("A response is already being generated for '{document_id}'")]
    ResponsePending { document_id: String },

    #[error("An image is already being generated")]
    GenerationInProgress,
}

impl AppError {
    pub fn provider(message: impl Into<String>) -> Self {
        AppError::Provider { message: message.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::DocumentNotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::EmptyField { .. } | AppError::UploadFailed { .. })
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            AppError::ResponsePending { .. } | AppError::GenerationInProgress
        )
    }
}
