//! End-to-end pipeline workflows against a scripted isolation backend
//!
//! Covers the complete select → process → download cycle, retries, and the
//! single-flight guarantee of `process()`.

mod common;

use common::{
    decode_rgba, encode, isolated_subject, isolated_subject_payload, photo_png, pipeline_with,
    TEST_KEY,
};
use image::{ImageFormat, Rgba, RgbaImage};
use purebg::{
    isolation::{test_utils::MockIsolationBackend, IsolationResponse, ISOLATION_INSTRUCTION},
    EncodedPayload, ErrorKind, ProcessingState, PureBgError, Result,
};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_file_to_transparent_download() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("portrait.png");
    std::fs::write(&input, photo_png()).unwrap();

    let backend = Arc::new(MockIsolationBackend::returning_image(
        &isolated_subject_payload(),
    ));
    let pipeline = pipeline_with(backend.clone());

    assert_eq!(pipeline.select_image(&input).await?, ProcessingState::ImageSelected);
    assert_eq!(pipeline.process().await, ProcessingState::Complete);
    assert_eq!(backend.call_count(), 1);

    let snapshot = pipeline.snapshot();
    assert!(snapshot.matte_applied);
    assert!(snapshot.error.is_none());

    let download = pipeline.download_at(1_700_000_000_000).expect("download available");
    assert_eq!(download.file_name, "purebg-1700000000000.png");
    assert_eq!(download.mime_type, "image/png");

    let out_dir = temp_dir.path().join("out");
    let saved = download.save(&out_dir).unwrap();
    assert!(saved.exists());

    let result = image::open(&saved).unwrap().to_rgba8();
    assert_eq!(result.dimensions(), (6, 6));
    assert_eq!(result.get_pixel(0, 0)[3], 0);
    assert_eq!(result.get_pixel(5, 5)[3], 0);
    assert_eq!(*result.get_pixel(2, 2), Rgba([30, 60, 90, 255]));
    assert_eq!(*result.get_pixel(3, 3), Rgba([30, 60, 90, 255]));
    Ok(())
}

#[tokio::test]
async fn test_request_carries_image_instruction_and_key() -> Result<()> {
    let backend = Arc::new(MockIsolationBackend::returning_image(
        &isolated_subject_payload(),
    ));
    let pipeline = pipeline_with(backend.clone());

    let photo = photo_png();
    pipeline.select_image_bytes(&photo, Some("image/png"))?;
    pipeline.process().await;

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].api_key, TEST_KEY);

    let wire = serde_json::to_value(calls[0].request.to_wire()).unwrap();
    let parts = &wire["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
    assert_eq!(
        parts[0]["inlineData"]["data"],
        EncodedPayload::from_bytes("image/png", &photo).data()
    );
    assert_eq!(parts[1]["text"], ISOLATION_INSTRUCTION);
    Ok(())
}

#[tokio::test]
async fn test_reference_two_by_two_buffer() -> Result<()> {
    let isolated = RgbaImage::from_fn(2, 2, |x, y| match (x, y) {
        (0, 0) => Rgba([255, 255, 255, 255]),
        (1, 0) => Rgba([10, 20, 30, 255]),
        (0, 1) => Rgba([250, 250, 250, 255]),
        _ => Rgba([240, 240, 240, 255]),
    });
    let payload = EncodedPayload::from_bytes("image/png", &encode(&isolated, ImageFormat::Png));
    let pipeline = pipeline_with(Arc::new(MockIsolationBackend::returning_image(&payload)));

    pipeline.select_image_bytes(&photo_png(), None)?;
    assert_eq!(pipeline.process().await, ProcessingState::Complete);

    let result = decode_rgba(&pipeline.result().expect("result"));
    let alpha: Vec<u8> = result.pixels().map(|p| p[3]).collect();
    assert_eq!(alpha, vec![0, 255, 0, 255]);
    Ok(())
}

#[tokio::test]
async fn test_jpeg_isolation_result_is_matted_to_png() -> Result<()> {
    let isolated = RgbaImage::from_fn(64, 64, |x, y| {
        if (28..36).contains(&x) && (28..36).contains(&y) {
            Rgba([30, 60, 90, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    let jpeg = encode(&isolated, ImageFormat::Jpeg);
    let payload = EncodedPayload::from_bytes("image/jpeg", &jpeg);
    let pipeline = pipeline_with(Arc::new(MockIsolationBackend::returning_image(&payload)));

    pipeline.select_image_bytes(&photo_png(), None)?;
    assert_eq!(pipeline.process().await, ProcessingState::Complete);

    let result = pipeline.result().expect("result");
    assert_eq!(result.mime_type(), "image/png");
    // Corners are far enough from the subject to survive JPEG ringing
    assert_eq!(decode_rgba(&result).get_pixel(0, 0)[3], 0);
    Ok(())
}

#[tokio::test]
async fn test_failure_then_retry_succeeds() -> Result<()> {
    let backend = Arc::new(MockIsolationBackend::new(vec![
        Err(PureBgError::rate_limit("Quota exceeded")),
        Ok(IsolationResponse::with_image(&isolated_subject_payload())),
    ]));
    let pipeline = pipeline_with(backend.clone());
    pipeline.select_image_bytes(&photo_png(), None)?;

    assert_eq!(pipeline.process().await, ProcessingState::Failed);
    let error = pipeline.error().expect("error recorded");
    assert_eq!(error.kind, ErrorKind::RateLimit);
    assert!(pipeline.snapshot().source.is_some());
    assert!(pipeline.download().is_none());

    assert_eq!(pipeline.process().await, ProcessingState::Complete);
    assert!(pipeline.error().is_none());
    assert_eq!(backend.call_count(), 2);
    assert_eq!(backend.calls()[0].request, backend.calls()[1].request);
    Ok(())
}

#[tokio::test]
async fn test_process_from_complete_reruns_same_image() -> Result<()> {
    let backend = Arc::new(MockIsolationBackend::returning_image(
        &isolated_subject_payload(),
    ));
    let pipeline = pipeline_with(backend.clone());
    pipeline.select_image_bytes(&photo_png(), None)?;

    assert_eq!(pipeline.process().await, ProcessingState::Complete);
    assert_eq!(pipeline.process().await, ProcessingState::Complete);
    assert_eq!(backend.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_process_makes_single_call() -> Result<()> {
    let backend = Arc::new(
        MockIsolationBackend::returning_image(&isolated_subject_payload()).gated(),
    );
    let pipeline = Arc::new(pipeline_with(backend.clone()));
    pipeline.select_image_bytes(&photo_png(), None)?;

    let first = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.process().await })
    };
    while !pipeline.is_busy() {
        tokio::task::yield_now().await;
    }

    assert_eq!(pipeline.state(), ProcessingState::Processing);
    assert_eq!(pipeline.process().await, ProcessingState::Processing);
    assert_eq!(pipeline.process().await, ProcessingState::Processing);

    backend.release(1);
    assert_eq!(first.await.unwrap(), ProcessingState::Complete);
    assert_eq!(backend.call_count(), 1);
    assert!(!pipeline.is_busy());
    Ok(())
}

#[tokio::test]
async fn test_new_selection_while_processing_discards_old_outcome() -> Result<()> {
    let backend = Arc::new(
        MockIsolationBackend::returning_image(&isolated_subject_payload()).gated(),
    );
    let pipeline = Arc::new(pipeline_with(backend.clone()));
    pipeline.select_image_bytes(&photo_png(), None)?;

    let first = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.process().await })
    };
    while !pipeline.is_busy() {
        tokio::task::yield_now().await;
    }

    let replacement = encode(&isolated_subject(), ImageFormat::Bmp);
    assert_eq!(
        pipeline.select_image_bytes(&replacement, Some("image/bmp"))?,
        ProcessingState::ImageSelected
    );

    backend.release(1);
    assert_eq!(first.await.unwrap(), ProcessingState::ImageSelected);

    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.state, ProcessingState::ImageSelected);
    assert!(snapshot.result.is_none());
    assert_eq!(snapshot.source.expect("source").mime_type(), "image/bmp");
    Ok(())
}

#[tokio::test]
async fn test_reset_returns_to_idle() -> Result<()> {
    let pipeline = pipeline_with(Arc::new(MockIsolationBackend::returning_image(
        &isolated_subject_payload(),
    )));
    pipeline.select_image_bytes(&photo_png(), None)?;
    pipeline.process().await;

    pipeline.reset();
    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.state, ProcessingState::Idle);
    assert!(snapshot.source.is_none());
    assert!(snapshot.result.is_none());
    assert!(snapshot.error.is_none());

    // Nothing selected: process is a no-op
    assert_eq!(pipeline.process().await, ProcessingState::Idle);
    Ok(())
}
