#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # PureBG
//!
//! Background removal built from two halves: a remote image model isolates
//! the subject of a photo onto a solid white background, and a local
//! white-key matte turns that background into real alpha transparency.
//!
//! ## Components
//!
//! - [`ImageIngestor`]: reads an upload into an [`EncodedPayload`]
//! - [`SubjectIsolationClient`]: sends the isolation request and classifies failures
//! - [`AlphaMatteConverter`]: keys out near-white pixels and re-encodes with alpha
//! - [`PipelineOrchestrator`]: owns the processing state and sequences the above
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use purebg::{PipelineOrchestrator, ProcessingState, PureBgConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // The API key is read from the API_KEY environment variable on every call
//! let config = PureBgConfig::builder().white_threshold(245).build()?;
//! let pipeline = PipelineOrchestrator::new(&config)?;
//!
//! pipeline.select_image("portrait.jpg").await?;
//! if pipeline.process().await == ProcessingState::Complete {
//!     if let Some(download) = pipeline.download() {
//!         download.save(".")?;
//!     }
//! } else if let Some(error) = pipeline.error() {
//!     eprintln!("{}", error);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): the `purebg` command-line front end
//! - `webp-support` (default): WebP input decoding and output encoding
//! - `tracing-json`: JSON log output for the CLI

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod isolation;
pub mod matte;
pub mod pipeline;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

pub use config::{CredentialSource, PureBgConfig, PureBgConfigBuilder, DEFAULT_WHITE_THRESHOLD};
pub use error::{ErrorKind, ErrorReport, PureBgError, Result};
pub use isolation::{GeminiBackend, IsolationBackend, SubjectIsolationClient};
pub use matte::{AlphaMatteConverter, MatteResult};
pub use pipeline::{PipelineOrchestrator, PipelineSnapshot};
pub use services::{ImageIngestor, MatteFormat};
pub use types::{Download, EncodedPayload, PixelBuffer, ProcessingState, SourceImage};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Remove the background of an in-memory image in one call
///
/// Runs isolation and matting directly, without the pipeline's state
/// tracking. Useful for services that handle one request at a time.
///
/// # Examples
/// ```rust,no_run
/// use purebg::{remove_background_from_bytes, PureBgConfig};
///
/// # async fn example(upload: Vec<u8>) -> anyhow::Result<()> {
/// let config = PureBgConfig::default();
/// let matted = remove_background_from_bytes(&upload, &config).await?;
/// std::fs::write("output.png", matted.payload.decode_bytes()?)?;
/// # Ok(())
/// # }
/// ```
pub async fn remove_background_from_bytes(
    image_bytes: &[u8],
    config: &PureBgConfig,
) -> Result<MatteResult> {
    let payload = ImageIngestor::ingest_bytes(image_bytes, None)?;
    let client = SubjectIsolationClient::new(config)?;
    let isolated = client.isolate(&payload).await?;

    AlphaMatteConverter::new(config.white_threshold)
        .with_format(config.output_format)
        .matte(isolated)
}
