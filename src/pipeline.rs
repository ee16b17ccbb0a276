//! Background removal pipeline
//!
//! `PipelineOrchestrator` owns the processing state and sequences ingestion,
//! subject isolation and matting. It is the boundary where every failure is
//! caught and turned into an [`ErrorReport`]; nothing below it is retried
//! automatically.
//!
//! ```text
//! Idle ──select──▶ ImageSelected ──process──▶ Processing ──▶ Complete
//!   ▲                    ▲                                 └─▶ Failed
//!   └──────reset─────────┴──────────── process (retry) ◀───────┘
//! ```

use crate::{
    config::PureBgConfig,
    error::{ErrorReport, PureBgError, Result},
    isolation::SubjectIsolationClient,
    matte::{AlphaMatteConverter, MatteResult},
    services::ImageIngestor,
    types::{Download, EncodedPayload, ProcessingState},
};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Everything a caller needs to render the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSnapshot {
    pub state: ProcessingState,
    pub source: Option<EncodedPayload>,
    pub result: Option<EncodedPayload>,
    pub error: Option<ErrorReport>,
    /// False when the result was returned without the matte applied
    pub matte_applied: bool,
}

#[derive(Debug, Default)]
struct Inner {
    snapshot: PipelineSnapshot,
    /// Set while a remote call is outstanding, even if its run was invalidated
    in_flight: bool,
    /// Bumped on select and reset so late outcomes of older runs are dropped
    generation: u64,
}

/// Sequences ingestion, isolation and matting for one user session
#[derive(Debug)]
pub struct PipelineOrchestrator {
    client: SubjectIsolationClient,
    converter: AlphaMatteConverter,
    inner: Mutex<Inner>,
}

impl PipelineOrchestrator {
    /// Create a pipeline talking to the configured remote model
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(config: &PureBgConfig) -> Result<Self> {
        let client = SubjectIsolationClient::new(config)?;
        let converter =
            AlphaMatteConverter::new(config.white_threshold).with_format(config.output_format);
        Ok(Self::with_components(client, converter))
    }

    /// Create a pipeline from prepared components
    #[must_use]
    pub fn with_components(client: SubjectIsolationClient, converter: AlphaMatteConverter) -> Self {
        Self {
            client,
            converter,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Select an image file for processing
    ///
    /// # Errors
    /// - `PureBgError::Decode` if the file cannot be read or is not a supported
    ///   image; the state is left unchanged and the error is also recorded
    pub async fn select_image<P: AsRef<Path>>(&self, path: P) -> Result<ProcessingState> {
        let ingested = ImageIngestor::ingest_path(path).await;
        self.apply_selection(ingested)
    }

    /// Select an image held in memory
    ///
    /// # Errors
    /// - See [`PipelineOrchestrator::select_image`]
    pub fn select_image_bytes(
        &self,
        bytes: &[u8],
        declared_mime: Option<&str>,
    ) -> Result<ProcessingState> {
        self.apply_selection(ImageIngestor::ingest_bytes(bytes, declared_mime))
    }

    fn apply_selection(&self, ingested: Result<EncodedPayload>) -> Result<ProcessingState> {
        let mut inner = self.lock();
        match ingested {
            Ok(payload) => {
                info!(
                    mime_type = %payload.mime_type(),
                    previous = %inner.snapshot.state,
                    "Image selected"
                );
                inner.generation += 1;
                inner.snapshot = PipelineSnapshot {
                    state: ProcessingState::ImageSelected,
                    source: Some(payload),
                    ..PipelineSnapshot::default()
                };
                Ok(inner.snapshot.state)
            },
            Err(error) => {
                warn!(state = %inner.snapshot.state, "Image selection failed: {}", error);
                inner.snapshot.error = Some(ErrorReport::from(&error));
                Err(error)
            },
        }
    }

    /// Remove the background of the selected image
    ///
    /// Ignored while a request is outstanding and when nothing is selected.
    /// From `Complete` or `Failed` this is a retry with the same image.
    /// Returns the state after the call.
    #[instrument(skip(self))]
    pub async fn process(&self) -> ProcessingState {
        let (payload, generation) = {
            let mut inner = self.lock();
            if inner.in_flight || inner.snapshot.state == ProcessingState::Processing {
                debug!("Request already in flight, ignoring process()");
                return inner.snapshot.state;
            }
            let Some(payload) = inner.snapshot.source.clone() else {
                debug!("No image selected, ignoring process()");
                return inner.snapshot.state;
            };
            if matches!(
                inner.snapshot.state,
                ProcessingState::Complete | ProcessingState::Failed
            ) {
                info!(previous = %inner.snapshot.state, "Retrying with the selected image");
            }

            inner.snapshot.state = ProcessingState::Processing;
            inner.snapshot.result = None;
            inner.snapshot.error = None;
            inner.snapshot.matte_applied = false;
            inner.in_flight = true;
            (payload, inner.generation)
        };

        let mut guard = InFlightGuard {
            inner: &self.inner,
            generation,
            armed: true,
        };
        let outcome = self.run(&payload).await;
        guard.armed = false;

        let mut inner = self.lock();
        inner.in_flight = false;
        if inner.generation != generation {
            debug!("Selection changed while processing, discarding outcome");
            return inner.snapshot.state;
        }

        match outcome {
            Ok(matted) => {
                if !matted.applied {
                    warn!("Result returned without transparency applied");
                }
                info!(cleared_pixels = matted.cleared_pixels, "Background removed");
                inner.snapshot.state = ProcessingState::Complete;
                inner.snapshot.result = Some(matted.payload);
                inner.snapshot.matte_applied = matted.applied;
            },
            Err(error) => {
                warn!(kind = %error.kind(), "Background removal failed: {}", error);
                inner.snapshot.state = ProcessingState::Failed;
                inner.snapshot.error = Some(ErrorReport::from(&error));
            },
        }
        inner.snapshot.state
    }

    async fn run(&self, payload: &EncodedPayload) -> Result<MatteResult> {
        let isolated = self.client.isolate(payload).await?;
        self.converter.matte(isolated)
    }

    /// Drop the selected image, result and error and return to `Idle`
    pub fn reset(&self) {
        let mut inner = self.lock();
        debug!(previous = %inner.snapshot.state, "Pipeline reset");
        inner.generation += 1;
        inner.snapshot = PipelineSnapshot::default();
    }

    /// The completed result, named `purebg-<unix-millis>.<ext>`
    ///
    /// `None` unless the state is `Complete`.
    #[must_use]
    pub fn download(&self) -> Option<Download> {
        self.download_at(Utc::now().timestamp_millis())
    }

    /// Like [`PipelineOrchestrator::download`] with a fixed timestamp
    #[must_use]
    pub fn download_at(&self, timestamp_millis: i64) -> Option<Download> {
        let inner = self.lock();
        if inner.snapshot.state != ProcessingState::Complete {
            return None;
        }
        let result = inner.snapshot.result.as_ref()?;
        match Download::from_payload(result, timestamp_millis) {
            Ok(download) => Some(download),
            Err(error) => {
                warn!("Result cannot be downloaded: {}", error);
                None
            },
        }
    }

    #[must_use]
    pub fn state(&self) -> ProcessingState {
        self.lock().snapshot.state
    }

    #[must_use]
    pub fn error(&self) -> Option<ErrorReport> {
        self.lock().snapshot.error.clone()
    }

    #[must_use]
    pub fn result(&self) -> Option<EncodedPayload> {
        self.lock().snapshot.result.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.lock().snapshot.clone()
    }

    /// Whether a remote call is outstanding
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.lock().in_flight
    }
}

/// Restores the pipeline if a `process()` future is dropped mid-call
struct InFlightGuard<'a> {
    inner: &'a Mutex<Inner>,
    generation: u64,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.in_flight = false;
        if inner.generation == self.generation
            && inner.snapshot.state == ProcessingState::Processing
        {
            inner.snapshot.state = ProcessingState::Failed;
            inner.snapshot.error = Some(ErrorReport::from(PureBgError::unknown(
                "Processing was interrupted before the model answered",
            )));
        }
    }
}
