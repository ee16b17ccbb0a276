//! White-key alpha matting
//!
//! The isolation model returns the subject on a solid white background. This
//! module turns every near-white pixel fully transparent and leaves all other
//! pixels untouched. There is no partial transparency and no edge feathering.

use crate::{
    config::DEFAULT_WHITE_THRESHOLD,
    error::{PureBgError, Result},
    services::MatteFormat,
    types::{EncodedPayload, PixelBuffer},
};
use image::ImageError;
use tracing::{debug, instrument, warn};

impl PixelBuffer {
    /// Clear alpha on every pixel whose R, G and B all strictly exceed `threshold`
    ///
    /// Returns the number of pixels whose alpha changed.
    pub fn key_out_white(&mut self, threshold: u8) -> usize {
        let mut cleared = 0;
        for px in self.samples_mut().chunks_exact_mut(4) {
            if let [r, g, b, a] = px {
                if *r > threshold && *g > threshold && *b > threshold && *a != 0 {
                    *a = 0;
                    cleared += 1;
                }
            }
        }
        cleared
    }
}

/// Outcome of a matte conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatteResult {
    /// Re-encoded image, or the untouched input when `applied` is false
    pub payload: EncodedPayload,
    /// False when the input could not be decoded in this build
    pub applied: bool,
    /// Pixels made transparent
    pub cleared_pixels: usize,
}

/// Converts white-background images into transparent-background images
#[derive(Debug, Clone, Copy)]
pub struct AlphaMatteConverter {
    threshold: u8,
    format: MatteFormat,
}

impl Default for AlphaMatteConverter {
    fn default() -> Self {
        Self::new(DEFAULT_WHITE_THRESHOLD)
    }
}

impl AlphaMatteConverter {
    #[must_use]
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold,
            format: MatteFormat::default(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: MatteFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    #[must_use]
    pub fn format(&self) -> MatteFormat {
        self.format
    }

    /// Apply the matte with this converter's threshold
    ///
    /// # Errors
    /// - See [`AlphaMatteConverter::matte_with_threshold`]
    pub fn matte(&self, payload: EncodedPayload) -> Result<MatteResult> {
        self.matte_with_threshold(payload, self.threshold)
    }

    /// Decode, key out near-white pixels, and re-encode
    ///
    /// If the payload's format cannot be decoded in this build, the input is
    /// returned unchanged with `applied == false`.
    ///
    /// # Errors
    /// - `PureBgError::Unknown` when the payload is not base64, the image data
    ///   is corrupt, or the result cannot be encoded
    #[instrument(skip(self, payload), fields(mime_type = %payload.mime_type()))]
    pub fn matte_with_threshold(
        &self,
        payload: EncodedPayload,
        threshold: u8,
    ) -> Result<MatteResult> {
        let bytes = payload.decode_bytes().map_err(|e| {
            PureBgError::unknown(format!("Failed to generate transparency: {}", e.message()))
        })?;

        let image = match image::load_from_memory(&bytes) {
            Ok(image) => image,
            Err(ImageError::Unsupported(e)) => {
                warn!("Pixel decoding unavailable, returning image without matte: {}", e);
                return Ok(MatteResult {
                    payload,
                    applied: false,
                    cleared_pixels: 0,
                });
            },
            Err(e) => {
                return Err(PureBgError::unknown(format!(
                    "Failed to generate transparency: {}",
                    e
                )))
            },
        };

        let mut buffer = PixelBuffer::from_image(image);
        let (width, height) = buffer.dimensions();
        let cleared_pixels = buffer.key_out_white(threshold);
        debug!(width, height, threshold, cleared_pixels, "Applied white-key matte");

        let encoded = self.format.encode(buffer.into_image()?)?;
        Ok(MatteResult {
            payload: EncodedPayload::from_bytes(self.format.mime_type(), &encoded),
            applied: true,
            cleared_pixels,
        })
    }
}
