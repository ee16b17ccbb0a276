//! Request and response payloads of the `generateContent` call

use crate::{
    error::{PureBgError, Result},
    types::EncodedPayload,
};
use serde::{Deserialize, Serialize};

/// Instruction sent alongside every image
pub const ISOLATION_INSTRUCTION: &str = "Isolate the main subject from the image. \
Remove all background elements. Place the subject on a solid #FFFFFF white background. \
Ensure clean and sharp edges. Return only the image.";

/// The image to isolate paired with the fixed instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationRequest {
    pub image: EncodedPayload,
    pub instruction: &'static str,
}

impl IsolationRequest {
    #[must_use]
    pub fn new(image: EncodedPayload) -> Self {
        Self {
            image,
            instruction: ISOLATION_INSTRUCTION,
        }
    }

    /// JSON body for the remote call: image part first, instruction second
    #[must_use]
    pub fn to_wire(&self) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::inline(InlineData {
                        mime_type: self.image.mime_type().to_string(),
                        data: self.image.data().to_string(),
                    }),
                    Part::text(self.instruction),
                ],
            }],
        }
    }
}

/// Top-level `generateContent` request envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

/// Content container used in both requests and responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A content part; responses may mix text and inline media
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    #[must_use]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    #[must_use]
    pub fn inline(data: InlineData) -> Self {
        Self {
            text: None,
            inline_data: Some(data),
        }
    }
}

/// Base64 inline media
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl From<InlineData> for EncodedPayload {
    fn from(inline: InlineData) -> Self {
        EncodedPayload::new(inline.mime_type, inline.data)
    }
}

/// Top-level `generateContent` response envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IsolationResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Candidate completion item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl IsolationResponse {
    /// A response with one candidate holding the given parts
    #[must_use]
    pub fn with_parts(parts: Vec<Part>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Content { role: None, parts },
                finish_reason: None,
            }],
        }
    }

    /// A response with one candidate holding one image
    #[must_use]
    pub fn with_image(image: &EncodedPayload) -> Self {
        Self::with_parts(vec![Part::inline(InlineData {
            mime_type: image.mime_type().to_string(),
            data: image.data().to_string(),
        })])
    }

    /// The first image-bearing part of the first candidate
    ///
    /// Other candidates and parts are ignored.
    ///
    /// # Errors
    /// - `PureBgError::EmptyResponse` when there is no candidate, or the first
    ///   candidate carries no inline image
    pub fn into_first_image(self) -> Result<EncodedPayload> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| PureBgError::empty_response("The model did not return a valid image"))?;

        let finish_reason = candidate.finish_reason;
        candidate
            .content
            .parts
            .into_iter()
            .find_map(|part| part.inline_data)
            .map(EncodedPayload::from)
            .ok_or_else(|| {
                let reason = finish_reason
                    .map(|r| format!(" (finish reason: {})", r))
                    .unwrap_or_default();
                PureBgError::empty_response(format!(
                    "The model processed the request but did not produce an image file{}",
                    reason
                ))
            })
    }
}

/// Error envelope returned with non-success statuses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorEnvelope {
    #[serde(default)]
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
