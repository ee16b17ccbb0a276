//! Mock isolation backend for testing
//!
//! Lets the pipeline be exercised without network access or an API key.
//! Responses are scripted up front and every call is recorded.

use super::{
    wire::{IsolationRequest, IsolationResponse},
    IsolationBackend,
};
use crate::{
    error::{PureBgError, Result},
    types::EncodedPayload,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// A call observed by [`MockIsolationBackend`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: IsolationRequest,
    pub api_key: String,
}

/// Scripted isolation backend
///
/// Scripted results are returned in order; once they run out, the last one
/// is repeated. A gated backend holds every call until [`release`] is called,
/// which keeps a request in flight for as long as a test needs.
///
/// [`release`]: MockIsolationBackend::release
#[derive(Debug)]
pub struct MockIsolationBackend {
    script: Mutex<VecDeque<Result<IsolationResponse>>>,
    last: Mutex<Option<Result<IsolationResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockIsolationBackend {
    /// Create a backend answering with `script` in order
    #[must_use]
    pub fn new(script: Vec<Result<IsolationResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Create a backend that always answers with `image`
    #[must_use]
    pub fn returning_image(image: &EncodedPayload) -> Self {
        Self::new(vec![Ok(IsolationResponse::with_image(image))])
    }

    /// Create a backend that always fails with `error`
    #[must_use]
    pub fn failing(error: PureBgError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Hold every call until [`MockIsolationBackend::release`] is called
    #[must_use]
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `count` held calls complete
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn next_result(&self) -> Result<IsolationResponse> {
        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(result) = script.pop_front() {
            *last = Some(result.clone());
            return result;
        }
        last.clone().unwrap_or_else(|| {
            Err(PureBgError::unknown("Mock backend has no scripted response"))
        })
    }
}

#[async_trait]
impl IsolationBackend for MockIsolationBackend {
    async fn send(&self, request: &IsolationRequest, api_key: &str) -> Result<IsolationResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            request: request.clone(),
            api_key: api_key.to_string(),
        });

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| PureBgError::unknown(format!("Mock gate closed: {}", e)))?
                .forget();
        }

        self.next_result()
    }
}
