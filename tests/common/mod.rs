//! Shared helpers for the integration tests

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use purebg::{
    config::CredentialSource, isolation::test_utils::MockIsolationBackend, AlphaMatteConverter,
    EncodedPayload, PipelineOrchestrator, SubjectIsolationClient,
};
use std::io::Cursor;
use std::sync::Arc;

pub const TEST_KEY: &str = "test-key-123";

/// Encode an RGBA image in the given container
pub fn encode(image: &RgbaImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    let dynamic = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image.clone()).to_rgb8())
    } else {
        DynamicImage::ImageRgba8(image.clone())
    };
    dynamic
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode test image");
    bytes
}

/// A small photo-like image without any white
pub fn photo_png() -> Vec<u8> {
    let image = RgbaImage::from_fn(8, 8, |x, y| Rgba([(x * 20) as u8, (y * 20) as u8, 90, 255]));
    encode(&image, ImageFormat::Png)
}

/// What the remote model would return: a dark subject on pure white
pub fn isolated_subject() -> RgbaImage {
    RgbaImage::from_fn(6, 6, |x, y| {
        if (2..4).contains(&x) && (2..4).contains(&y) {
            Rgba([30, 60, 90, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    })
}

pub fn isolated_subject_payload() -> EncodedPayload {
    EncodedPayload::from_bytes("image/png", &encode(&isolated_subject(), ImageFormat::Png))
}

pub fn pipeline_with(backend: Arc<MockIsolationBackend>) -> PipelineOrchestrator {
    let client =
        SubjectIsolationClient::with_backend(CredentialSource::Static(TEST_KEY.into()), backend);
    PipelineOrchestrator::with_components(client, AlphaMatteConverter::default())
}

pub fn decode_rgba(payload: &EncodedPayload) -> RgbaImage {
    image::load_from_memory(&payload.decode_bytes().expect("valid base64"))
        .expect("decodable result")
        .to_rgba8()
}
