//! Image ingestion service
//!
//! Turns a user-supplied file into the encoded payload the pipeline works
//! with. The bytes are passed through untouched: no resizing, recompression
//! or dimension checks.

use crate::{
    error::{PureBgError, Result},
    types::{EncodedPayload, SourceImage},
};
use image::ImageFormat;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Raster formats accepted as input
const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];

/// Service for reading user uploads
pub struct ImageIngestor;

impl ImageIngestor {
    /// Read an image file and encode it
    ///
    /// # Errors
    /// - `PureBgError::Decode` when the file cannot be read or is not a supported raster image
    ///
    /// # Examples
    /// ```rust,no_run
    /// use purebg::services::ImageIngestor;
    ///
    /// # async fn example() -> purebg::Result<()> {
    /// let payload = ImageIngestor::ingest_path("portrait.jpg").await?;
    /// println!("{}", payload.mime_type());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn ingest_path<P: AsRef<Path>>(path: P) -> Result<EncodedPayload> {
        let path_ref = path.as_ref();
        let bytes = tokio::fs::read(path_ref)
            .await
            .map_err(|e| PureBgError::file_io_error("read image file", path_ref, &e))?;

        let source = Self::load_bytes(bytes, None).map_err(|e| {
            PureBgError::decode(format!("{} ({})", e.message(), path_ref.display()))
        })?;
        debug!(
            path = %path_ref.display(),
            mime_type = %source.mime_type,
            size = source.bytes.len(),
            "Ingested image file"
        );
        Ok(source.to_payload())
    }

    /// Encode image bytes received from memory
    ///
    /// `declared_mime` is what the upload claims to be; it must be an `image/*`
    /// type when present. The encoded mime type always comes from the content.
    ///
    /// # Errors
    /// - `PureBgError::Decode` for non-image declarations, empty input or unsupported content
    pub fn ingest_bytes(bytes: &[u8], declared_mime: Option<&str>) -> Result<EncodedPayload> {
        Self::load_bytes(bytes.to_vec(), declared_mime).map(|source| source.to_payload())
    }

    /// Read an async stream to the end and encode it
    ///
    /// # Errors
    /// - `PureBgError::Decode` when the stream fails or the content is not a supported image
    pub async fn ingest_reader<R: AsyncRead + Unpin>(mut reader: R) -> Result<EncodedPayload> {
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| PureBgError::decode(format!("Failed to read from stream: {}", e)))?;
        Self::load_bytes(buffer, None).map(|source| source.to_payload())
    }

    /// Detect the raster type of `bytes` and wrap them as a [`SourceImage`]
    ///
    /// # Errors
    /// - `PureBgError::Decode` for non-image declarations, empty input or unsupported content
    pub fn load_bytes(bytes: Vec<u8>, declared_mime: Option<&str>) -> Result<SourceImage> {
        if let Some(mime) = declared_mime {
            if !mime.trim().to_ascii_lowercase().starts_with("image/") {
                return Err(PureBgError::decode(format!(
                    "Only image files are accepted, got '{}'",
                    mime
                )));
            }
        }
        if bytes.is_empty() {
            return Err(PureBgError::decode("The image file is empty"));
        }

        let format = Self::detect_format(&bytes)?;
        Ok(SourceImage::new(bytes, format.to_mime_type()))
    }

    /// Identify a supported, readable raster format from magic bytes
    ///
    /// # Errors
    /// - `PureBgError::Decode` when the content is unrecognized or not supported
    pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat> {
        let format = image::guess_format(bytes)
            .map_err(|_| PureBgError::decode("Unrecognized image format"))?;

        if !SUPPORTED_FORMATS.contains(&format) || !format.reading_enabled() {
            return Err(PureBgError::decode(format!(
                "Unsupported image format {:?}; supported formats: PNG, JPEG, WebP, GIF, BMP, TIFF",
                format
            )));
        }
        Ok(format)
    }

    /// Check if a file path has a supported image extension
    #[must_use]
    pub fn is_supported_extension<P: AsRef<Path>>(path: P) -> bool {
        ImageFormat::from_path(path)
            .map(|format| SUPPORTED_FORMATS.contains(&format))
            .unwrap_or(false)
    }
}
