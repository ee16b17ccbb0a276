//! Output format handling service
//!
//! The matte result must keep its alpha channel, so only formats that carry
//! transparency are offered here.

use crate::error::{PureBgError, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Encoding of the matted result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatteFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// Lossless WebP with alpha channel transparency
    #[cfg(feature = "webp-support")]
    WebP,
    /// TIFF with alpha channel transparency
    Tiff,
}

impl MatteFormat {
    /// Get the appropriate file extension (without the dot)
    ///
    /// # Examples
    /// ```rust
    /// use purebg::services::MatteFormat;
    ///
    /// assert_eq!(MatteFormat::Png.extension(), "png");
    /// assert_eq!(MatteFormat::Tiff.extension(), "tiff");
    /// ```
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            #[cfg(feature = "webp-support")]
            Self::WebP => "webp",
            Self::Tiff => "tiff",
        }
    }

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            #[cfg(feature = "webp-support")]
            Self::WebP => "image/webp",
            Self::Tiff => "image/tiff",
        }
    }

    /// The matte format producing `mime_type`, if any
    #[must_use]
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        match mime_type.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            #[cfg(feature = "webp-support")]
            "image/webp" => Some(Self::WebP),
            "image/tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    #[must_use]
    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            #[cfg(feature = "webp-support")]
            Self::WebP => ImageFormat::WebP,
            Self::Tiff => ImageFormat::Tiff,
        }
    }

    /// Encode an RGBA image in this format
    ///
    /// # Errors
    /// - The encoder rejects the image
    pub fn encode(self, image: RgbaImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut buffer), self.image_format())
            .map_err(|e| {
                PureBgError::unknown(format!(
                    "Failed to encode {}: {}",
                    self.extension().to_uppercase(),
                    e
                ))
            })?;
        Ok(buffer)
    }
}

impl std::fmt::Display for MatteFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for MatteFormat {
    type Err = PureBgError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            #[cfg(feature = "webp-support")]
            "webp" => Ok(Self::WebP),
            "tif" | "tiff" => Ok(Self::Tiff),
            other => Err(PureBgError::config(format!(
                "Unsupported output format '{}'; expected one with an alpha channel",
                other
            ))),
        }
    }
}
