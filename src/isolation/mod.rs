//! Subject isolation through a remote image model
//!
//! The client owns the request contract: it resolves the credential, pairs
//! the image with the fixed instruction, hands the request to an
//! [`IsolationBackend`] and extracts the returned image. Backends own the
//! transport and map transport failures onto the error taxonomy.

pub mod gemini;
pub mod test_utils;
pub mod wire;

pub use gemini::{classify_failure, GeminiBackend};
pub use wire::{IsolationRequest, IsolationResponse, ISOLATION_INSTRUCTION};

use crate::{
    config::{CredentialSource, PureBgConfig},
    error::Result,
    types::EncodedPayload,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Transport for isolation requests
#[async_trait]
pub trait IsolationBackend: Send + Sync {
    /// Send one request and return the parsed response
    ///
    /// Implementations must not retry.
    ///
    /// # Errors
    /// - `PureBgError::Auth`, `RateLimit`, `ModelUnavailable` for classified service failures
    /// - `PureBgError::Unknown` for everything else
    async fn send(&self, request: &IsolationRequest, api_key: &str) -> Result<IsolationResponse>;
}

/// Builds isolation requests and interprets their responses
#[derive(Clone)]
pub struct SubjectIsolationClient {
    credential: CredentialSource,
    backend: Arc<dyn IsolationBackend>,
}

impl std::fmt::Debug for SubjectIsolationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubjectIsolationClient")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl SubjectIsolationClient {
    /// Create a client talking to the configured remote model
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(config: &PureBgConfig) -> Result<Self> {
        let backend = GeminiBackend::new(config)?;
        Ok(Self::with_backend(config.credential.clone(), Arc::new(backend)))
    }

    /// Create a client with a custom backend
    #[must_use]
    pub fn with_backend(credential: CredentialSource, backend: Arc<dyn IsolationBackend>) -> Self {
        Self {
            credential,
            backend,
        }
    }

    /// Isolate the subject of `payload` onto a white background
    ///
    /// The credential is resolved before anything is sent; a missing or
    /// placeholder key fails without touching the network.
    ///
    /// # Errors
    /// - `PureBgError::Config` for a missing or placeholder credential
    /// - `PureBgError::EmptyResponse` when the response carries no image
    /// - Whatever the backend reports for transport and service failures
    #[instrument(skip_all, fields(mime_type = %payload.mime_type()))]
    pub async fn isolate(&self, payload: &EncodedPayload) -> Result<EncodedPayload> {
        let api_key = self.credential.resolve()?;
        let request = IsolationRequest::new(payload.clone());

        let response = self.backend.send(&request, &api_key).await?;
        debug!(candidates = response.candidates.len(), "Received isolation response");

        let image = response.into_first_image()?;
        info!(mime_type = %image.mime_type(), "Subject isolated");
        Ok(image)
    }
}
