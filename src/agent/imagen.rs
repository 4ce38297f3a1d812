use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{GeneratedImage, ImageProvider, ImageSpec};
use crate::errors::AppError;

// ── Wire types for `models/{model}:predict` ───────────────────────────────────

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: [Instance<'a>; 1],
    parameters: Parameters<'a>,
}

#[derive(Debug, Serialize)]
struct Instance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters<'a> {
    sample_count: u32,
    aspect_ratio: &'a str,
    output_options: OutputOptions<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputOptions<'a> {
    mime_type: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    rai_filtered_reason: Option<String>,
}

impl<'a> From<&'a ImageSpec> for PredictRequest<'a> {
    fn from(spec: &'a ImageSpec) -> Self {
        PredictRequest {
            instances: [Instance { prompt: &spec.prompt }],
            parameters: Parameters {
                sample_count: spec.count,
                aspect_ratio: spec.aspect_ratio,
                output_options: OutputOptions { mime_type: spec.mime_type },
            },
        }
    }
}

/// Decodes every prediction that carries image bytes. Filtered predictions
/// are skipped, so a fully filtered response yields an empty list.
fn decode_predictions(response: PredictResponse) -> Result<Vec<GeneratedImage>, AppError> {
    let mut images = Vec::with_capacity(response.predictions.len());
    for prediction in response.predictions {
        match prediction.bytes_base64_encoded {
            Some(encoded) => {
                let raw = BASE64
                    .decode(encoded.as_bytes())
                    .map_err(|e| AppError::provider(format!("Malformed image payload: {e}")))?;
                images.push(GeneratedImage { bytes: Bytes::from(raw) });
            }
            None => {
                let reason = prediction.rai_filtered_reason.unwrap_or_default();
                warn!("Image prediction carried no payload {reason}");
            }
        }
    }
    Ok(images)
}

/// Imagen over the Generative Language REST API.
pub struct ImagenClient {
    http: reqwest::Client,
    url: String,
}

impl ImagenClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| AppError::InvalidConfig {
                key: "API_KEY".to_string(),
                value: "<redacted>".to_string(),
            })?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::provider(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url: format!("{}/models/{model}:predict", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ImageProvider for ImagenClient {
    async fn generate(&self, spec: &ImageSpec) -> Result<Vec<GeneratedImage>, AppError> {
        debug!("Requesting {} image(s) from {}", spec.count, self.url);

        let response = self
            .http
            .post(&self.url)
            .json(&PredictRequest::from(spec))
            .send()
            .await
            .map_err(|e| AppError::provider(format!("Network error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::provider(format!("Server error {status}: {body}")));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| AppError::provider(format!("Parse error: {e}")))?;

        decode_predictions(body)
    }
}
