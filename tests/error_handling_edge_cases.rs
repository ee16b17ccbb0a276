//! Error handling and edge case testing
//!
//! Failures must surface as the right error kind, leave the pipeline in a
//! usable state, and never reach the network when the credential is missing.

mod common;

use common::{isolated_subject_payload, photo_png, pipeline_with};
use purebg::{
    config::CredentialSource,
    isolation::{
        classify_failure, test_utils::MockIsolationBackend, wire::Part, IsolationResponse,
    },
    AlphaMatteConverter, EncodedPayload, ErrorKind, PipelineOrchestrator, ProcessingState,
    PureBgConfig, PureBgError, SubjectIsolationClient,
};
use reqwest::StatusCode;
use std::sync::Arc;
use tempfile::TempDir;

fn pipeline_with_credential(
    credential: CredentialSource,
    backend: Arc<MockIsolationBackend>,
) -> PipelineOrchestrator {
    let client = SubjectIsolationClient::with_backend(credential, backend);
    PipelineOrchestrator::with_components(client, AlphaMatteConverter::default())
}

#[tokio::test]
async fn test_missing_credential_fails_before_network() {
    let backend = Arc::new(MockIsolationBackend::returning_image(
        &isolated_subject_payload(),
    ));
    let pipeline = pipeline_with_credential(
        CredentialSource::Env("PUREBG_TEST_KEY_THAT_IS_NEVER_SET".into()),
        backend.clone(),
    );
    pipeline.select_image_bytes(&photo_png(), None).unwrap();

    assert_eq!(pipeline.process().await, ProcessingState::Failed);
    assert_eq!(pipeline.error().unwrap().kind, ErrorKind::Config);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_placeholder_credentials_are_absent() {
    for placeholder in ["", "   ", "undefined", "YOUR_API_KEY", "<api-key>", "${API_KEY}"] {
        let backend = Arc::new(MockIsolationBackend::returning_image(
            &isolated_subject_payload(),
        ));
        let pipeline =
            pipeline_with_credential(CredentialSource::Static(placeholder.into()), backend.clone());
        pipeline.select_image_bytes(&photo_png(), None).unwrap();

        assert_eq!(pipeline.process().await, ProcessingState::Failed, "{:?}", placeholder);
        assert_eq!(pipeline.error().unwrap().kind, ErrorKind::Config);
        assert_eq!(backend.call_count(), 0);
    }
}

#[tokio::test]
async fn test_empty_candidates_is_empty_response() {
    let backend = Arc::new(MockIsolationBackend::new(vec![Ok(IsolationResponse::default())]));
    let pipeline = pipeline_with(backend);
    pipeline.select_image_bytes(&photo_png(), None).unwrap();

    assert_eq!(pipeline.process().await, ProcessingState::Failed);
    assert_eq!(pipeline.error().unwrap().kind, ErrorKind::EmptyResponse);
    assert!(pipeline.result().is_none());
}

#[tokio::test]
async fn test_text_only_response_is_empty_response() {
    let backend = Arc::new(MockIsolationBackend::new(vec![Ok(
        IsolationResponse::with_parts(vec![Part::text("I cannot edit this image.")]),
    )]));
    let pipeline = pipeline_with(backend);
    pipeline.select_image_bytes(&photo_png(), None).unwrap();

    assert_eq!(pipeline.process().await, ProcessingState::Failed);
    assert_eq!(pipeline.error().unwrap().kind, ErrorKind::EmptyResponse);
}

#[tokio::test]
async fn test_service_failures_keep_their_kind() {
    let cases = [
        PureBgError::auth("API key not valid"),
        PureBgError::rate_limit("Resource has been exhausted"),
        PureBgError::model_unavailable("Model not found"),
        PureBgError::unknown("connection reset"),
    ];

    for error in cases {
        let expected = error.kind();
        let pipeline = pipeline_with(Arc::new(MockIsolationBackend::failing(error)));
        pipeline.select_image_bytes(&photo_png(), None).unwrap();

        assert_eq!(pipeline.process().await, ProcessingState::Failed);
        let report = pipeline.error().unwrap();
        assert_eq!(report.kind, expected);
        assert!(!report.message.is_empty());
    }
}

#[test]
fn test_http_status_classification() {
    assert_eq!(
        classify_failure(StatusCode::TOO_MANY_REQUESTS, "{}").kind(),
        ErrorKind::RateLimit
    );
    assert_eq!(
        classify_failure(StatusCode::UNAUTHORIZED, "{}").kind(),
        ErrorKind::Auth
    );
    assert_eq!(
        classify_failure(StatusCode::NOT_FOUND, "{}").kind(),
        ErrorKind::ModelUnavailable
    );
    assert_eq!(
        classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "{}").kind(),
        ErrorKind::Unknown
    );

    let quota = r#"{"error":{"code":400,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#;
    assert_eq!(
        classify_failure(StatusCode::BAD_REQUEST, quota).kind(),
        ErrorKind::RateLimit
    );
}

#[tokio::test]
async fn test_selecting_missing_file_keeps_state() {
    let pipeline = pipeline_with(Arc::new(MockIsolationBackend::returning_image(
        &isolated_subject_payload(),
    )));

    let error = pipeline
        .select_image("/definitely/not/here/photo.png")
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Decode);
    assert_eq!(pipeline.state(), ProcessingState::Idle);
    assert_eq!(pipeline.error().unwrap().kind, ErrorKind::Decode);
}

#[tokio::test]
async fn test_selecting_non_image_keeps_previous_selection() {
    let temp_dir = TempDir::new().unwrap();
    let notes = temp_dir.path().join("notes.txt");
    std::fs::write(&notes, b"just some text, not pixels").unwrap();

    let pipeline = pipeline_with(Arc::new(MockIsolationBackend::returning_image(
        &isolated_subject_payload(),
    )));
    pipeline.select_image_bytes(&photo_png(), None).unwrap();

    let error = pipeline.select_image(&notes).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Decode);
    assert_eq!(pipeline.state(), ProcessingState::ImageSelected);

    // The earlier image is still there and processes normally
    assert_eq!(pipeline.process().await, ProcessingState::Complete);
}

#[test]
fn test_non_image_declaration_is_rejected() {
    let pipeline = pipeline_with(Arc::new(MockIsolationBackend::returning_image(
        &isolated_subject_payload(),
    )));

    let error = pipeline
        .select_image_bytes(&photo_png(), Some("application/pdf"))
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Decode);
    assert_eq!(pipeline.state(), ProcessingState::Idle);
}

#[tokio::test]
async fn test_corrupt_isolation_result_fails_matting() {
    let mut truncated = photo_png();
    truncated.truncate(40);
    let backend = Arc::new(MockIsolationBackend::returning_image(
        &EncodedPayload::from_bytes("image/png", &truncated),
    ));
    let pipeline = pipeline_with(backend);
    pipeline.select_image_bytes(&photo_png(), None).unwrap();

    assert_eq!(pipeline.process().await, ProcessingState::Failed);
    let report = pipeline.error().unwrap();
    assert_eq!(report.kind, ErrorKind::Unknown);
    assert!(report.message.contains("Failed to generate transparency"));
}

#[test]
fn test_config_validation_edge_cases() {
    assert!(PureBgConfig::builder().model("  ").build().is_err());
    assert!(PureBgConfig::builder().endpoint("localhost:8080").build().is_err());

    let config = PureBgConfig::builder()
        .white_threshold(0)
        .endpoint("http://127.0.0.1:9/")
        .build()
        .unwrap();
    assert_eq!(config.white_threshold, 0);
    assert_eq!(config.endpoint, "http://127.0.0.1:9");
}

#[test]
fn test_error_reports_serialize_with_stable_kinds() {
    let report = purebg::ErrorReport::from(PureBgError::model_unavailable("no access"));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["kind"], "model_unavailable");
    assert_eq!(json["message"], "no access");
}
