//! HTTP backend for the Generative Language `generateContent` endpoint

use super::{
    wire::{ApiErrorEnvelope, IsolationRequest, IsolationResponse},
    IsolationBackend,
};
use crate::{
    config::PureBgConfig,
    error::{PureBgError, Result},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

/// Header carrying the API key
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Production isolation backend
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    url: String,
}

impl GeminiBackend {
    /// Create a backend for the configured endpoint and model
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(config: &PureBgConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PureBgError::unknown(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: Self::generate_url(&config.endpoint, &config.model),
        })
    }

    /// `{endpoint}/models/{model}:generateContent`
    #[must_use]
    pub fn generate_url(endpoint: &str, model: &str) -> String {
        let model = model.trim_start_matches("models/");
        format!(
            "{}/models/{}:generateContent",
            endpoint.trim_end_matches('/'),
            model
        )
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IsolationBackend for GeminiBackend {
    async fn send(&self, request: &IsolationRequest, api_key: &str) -> Result<IsolationResponse> {
        debug!(url = %self.url, mime_type = %request.image.mime_type(), "Sending isolation request");

        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, api_key)
            .json(&request.to_wire())
            .send()
            .await
            .map_err(|e| PureBgError::unknown(format!("Failed to reach the image model: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return response.json::<IsolationResponse>().await.map_err(|e| {
                PureBgError::unknown(format!("Failed to parse the model response: {}", e))
            });
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(status = status.as_u16(), "Failed to read error body: {}", e);
                String::new()
            },
        };
        let error = classify_failure(status, &body);
        warn!(status = status.as_u16(), kind = %error.kind(), "Isolation request failed");
        Err(error)
    }
}

/// Map a non-success response onto the failure taxonomy
///
/// The HTTP status decides first; the service's own status string in the
/// error envelope refines ambiguous cases such as 400 and 403.
#[must_use]
pub fn classify_failure(status: StatusCode, body: &str) -> PureBgError {
    let envelope: ApiErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let api_status = envelope.error.status.unwrap_or_default();
    let message = envelope
        .error
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("no error details")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        });
    let lowered = message.to_lowercase();
    let mentions_key = lowered.contains("api key") || lowered.contains("api_key");
    let mentions_model = lowered.contains("model")
        || lowered.contains("not available")
        || lowered.contains("not supported");

    match (status, api_status.as_str()) {
        (StatusCode::TOO_MANY_REQUESTS, _) | (_, "RESOURCE_EXHAUSTED") => {
            PureBgError::rate_limit(format!("Quota limit reached, try again shortly: {}", message))
        },
        (StatusCode::UNAUTHORIZED, _) | (_, "UNAUTHENTICATED") => {
            PureBgError::auth(format!("Invalid API key or missing permissions: {}", message))
        },
        (StatusCode::NOT_FOUND, _) | (_, "NOT_FOUND") => PureBgError::model_unavailable(format!(
            "The image model is not available for this API key: {}",
            message
        )),
        (StatusCode::BAD_REQUEST, _) if mentions_key => {
            PureBgError::auth(format!("Invalid API key or missing permissions: {}", message))
        },
        (StatusCode::FORBIDDEN, _) | (_, "PERMISSION_DENIED") if mentions_model && !mentions_key => {
            PureBgError::model_unavailable(format!(
                "The image model is not available for this API key: {}",
                message
            ))
        },
        (StatusCode::FORBIDDEN, _) | (_, "PERMISSION_DENIED") => {
            PureBgError::auth(format!("Invalid API key or missing permissions: {}", message))
        },
        _ => PureBgError::unknown(format!(
            "Image model request failed with status {}: {}",
            status.as_u16(),
            message
        )),
    }
}
