use crate::errors::AppError;

const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";
const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_PORT: u16 = 3000;

/// How conversation history is keyed on the provider side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionScope {
    /// One history per document id.
    #[default]
    PerDocument,
    /// A single history shared by every document.
    Shared,
}

impl SessionScope {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per_document" | "per-document" | "document" => Some(SessionScope::PerDocument),
            "shared" | "global" => Some(SessionScope::Shared),
            _ => None,
        }
    }
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub chat_model: String,
    pub image_model: String,
    pub api_base_url: String,
    pub session_scope: SessionScope,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    /// `API_KEY` is the only required entry.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("API_KEY").ok_or_else(|| AppError::MissingCredential {
            var: "API_KEY".to_string(),
        })?;

        let session_scope = match non_empty("SESSION_SCOPE") {
            None => SessionScope::default(),
            Some(raw) => SessionScope::parse(&raw).ok_or(AppError::InvalidConfig {
                key: "SESSION_SCOPE".to_string(),
                value: raw,
            })?,
        };

        let port = match non_empty("PORT") {
            None => DEFAULT_PORT,
            Some(raw) => raw.trim().parse().map_err(|_| AppError::InvalidConfig {
                key: "PORT".to_string(),
                value: raw,
            })?,
        };

        Ok(Self {
            api_key,
            chat_model: non_empty("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            image_model: non_empty("IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            api_base_url: non_empty("GEMINI_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            session_scope,
            port,
        })
    }
}
