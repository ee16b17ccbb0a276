//! Core types for background removal operations

use crate::error::{PureBgError, Result};
use crate::services::MatteFormat;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raw bytes of a user upload together with their detected mime type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl SourceImage {
    #[must_use]
    pub fn new<S: Into<String>>(bytes: Vec<u8>, mime_type: S) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Encode into the portable representation exchanged with the model
    #[must_use]
    pub fn to_payload(&self) -> EncodedPayload {
        EncodedPayload::from_bytes(&self.mime_type, &self.bytes)
    }
}

/// Self-describing image encoding: mime type plus a base64 body
///
/// The textual form is a `data:` URL (`data:image/png;base64,iVBOR...`),
/// which is what [`std::fmt::Display`] and [`std::str::FromStr`] use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedPayload {
    mime_type: String,
    data: String,
}

impl EncodedPayload {
    /// Wrap an already base64-encoded body
    #[must_use]
    pub fn new<M: Into<String>, D: Into<String>>(mime_type: M, data: D) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw bytes
    #[must_use]
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self::new(mime_type, STANDARD.encode(bytes))
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The base64 body
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Decode the base64 body back into raw bytes
    ///
    /// # Errors
    /// - The body is not valid base64
    pub fn decode_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| PureBgError::decode(format!("Invalid base64 image data: {}", e)))
    }

    /// Render as a `data:` URL suitable for direct display
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Parse a `data:<mime>;base64,<body>` URL
    ///
    /// # Errors
    /// - Missing `data:` scheme, mime type, `;base64` marker or body separator
    pub fn parse_data_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| PureBgError::decode("Data URL must start with 'data:'"))?;
        let (header, body) = rest
            .split_once(',')
            .ok_or_else(|| PureBgError::decode("Data URL is missing the ',' separator"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| PureBgError::decode("Only base64 data URLs are supported"))?;
        if mime_type.is_empty() {
            return Err(PureBgError::decode("Data URL has no mime type"));
        }
        Ok(Self::new(mime_type, body))
    }
}

impl std::fmt::Display for EncodedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}

impl std::str::FromStr for EncodedPayload {
    type Err = PureBgError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_data_url(s)
    }
}

/// Dense RGBA8 pixel samples
///
/// Owned exclusively by one matte conversion and dropped after re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl PixelBuffer {
    /// Build a buffer from raw RGBA samples
    ///
    /// # Errors
    /// - `samples.len()` is not `width * height * 4`
    pub fn new(width: u32, height: u32, samples: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if samples.len() != expected {
            return Err(PureBgError::decode(format!(
                "Pixel buffer of {}x{} needs {} samples, got {}",
                width,
                height,
                expected,
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Build a buffer from row-major RGBA pixels
    ///
    /// # Errors
    /// - `pixels.len()` is not `width * height`
    pub fn from_pixels(width: u32, height: u32, pixels: &[[u8; 4]]) -> Result<Self> {
        Self::new(width, height, pixels.iter().flatten().copied().collect())
    }

    /// Convert any decoded image into RGBA8 samples
    #[must_use]
    pub fn from_image(image: DynamicImage) -> Self {
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            samples: rgba.into_raw(),
        }
    }

    /// Hand the samples back to the `image` crate for encoding
    ///
    /// # Errors
    /// - Never for buffers built through this type's constructors
    pub fn into_image(self) -> Result<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.samples)
            .ok_or_else(|| PureBgError::unknown("Pixel buffer does not match its dimensions"))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }

    /// Iterate pixels as `[r, g, b, a]` slices
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.samples.chunks_exact(4)
    }

    /// The alpha sample of every pixel, row-major
    #[must_use]
    pub fn alpha_channel(&self) -> Vec<u8> {
        self.pixels().filter_map(|px| px.get(3).copied()).collect()
    }
}

/// Pipeline processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    #[default]
    Idle,
    ImageSelected,
    Processing,
    Complete,
    Failed,
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ImageSelected => "image_selected",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Prefix of every downloadable artifact name
pub const DOWNLOAD_PREFIX: &str = "purebg";

/// A completed result ready to be written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Download {
    /// `purebg-<unix-millis>.<extension>`
    #[must_use]
    pub fn file_name_for(timestamp_millis: i64, extension: &str) -> String {
        format!("{}-{}.{}", DOWNLOAD_PREFIX, timestamp_millis, extension)
    }

    /// Package a result payload; the extension follows its mime type
    ///
    /// # Errors
    /// - The payload body is not valid base64
    pub fn from_payload(payload: &EncodedPayload, timestamp_millis: i64) -> Result<Self> {
        let extension = MatteFormat::from_mime_type(payload.mime_type())
            .map(MatteFormat::extension)
            .or_else(|| {
                image::ImageFormat::from_mime_type(payload.mime_type())
                    .and_then(|format| format.extensions_str().first().copied())
            })
            .unwrap_or("png");
        Ok(Self {
            file_name: Self::file_name_for(timestamp_millis, extension),
            mime_type: payload.mime_type().to_string(),
            bytes: payload.decode_bytes()?,
        })
    }

    /// Write the artifact into `dir`, returning the full path
    ///
    /// # Errors
    /// - The directory cannot be created or the file cannot be written
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> std::io::Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}
