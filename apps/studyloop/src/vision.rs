//! # Visual Augmenter
//!
//! Best-effort image description through the generation service. The bundled
//! augmenter only handles image sources - text pages have nothing to render.
//! Every failure degrades; a missing description never affects the run.

use crate::config::GenerationSettings;
use crate::http::{self, ClientError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use studyloop_core::{Soft, SourceKind, StudyloopError, VisualAugmenter};

/// Images larger than this are skipped rather than uploaded.
const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

const DESCRIBE_PROMPT: &str = "Analyze this study page/image. Extract key ideas, definitions, \
formulas, table/chart findings, and diagram relationships. Keep it concise and factual.";

// =============================================================================
// CLIENT
// =============================================================================

/// Vision-capable client for the generation service.
pub struct VisionClient {
    http: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl VisionClient {
    /// Create a client using the configured vision model.
    pub fn new(
        settings: &GenerationSettings,
        model: impl Into<String>,
        api_key: String,
    ) -> Result<Self, StudyloopError> {
        Ok(Self {
            http: http::blocking_client(Duration::from_secs(settings.request_timeout_secs))?,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    fn describe_image(&self, path: &Path) -> Result<String, ClientError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ClientError::ParseError(format!("{}: {e}", path.display())))?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ClientError::ParseError(format!(
                "{} exceeds the {} byte upload limit",
                path.display(),
                MAX_IMAGE_BYTES
            )));
        }
        let encoded = STANDARD.encode(&bytes);
        let data_url = format!("data:{};base64,{}", mime_of(path), encoded);

        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You extract learning-relevant visual details from study material.",
                },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": DESCRIBE_PROMPT },
                        { "type": "image_url", "image_url": { "url": data_url } },
                    ],
                },
            ],
        });

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| ClientError::ConnectionFailed(format!("{}: {e}", self.api_base)))?;
        let payload = http::handle_json_response(resp)?;

        Ok(payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}

impl VisualAugmenter for VisionClient {
    fn describe(&self, path: &Path, _unit_index: usize, kind: SourceKind) -> Soft<String> {
        // Text-backed pages have no renderable form here; external
        // implementations of the trait may do better.
        if kind != SourceKind::Image {
            return Soft::Degraded;
        }
        match self.describe_image(path) {
            Ok(text) => Soft::Value(text),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "visual augmentation degraded");
                Soft::Degraded
            }
        }
    }
}

fn mime_of(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
        .as_str()
    {
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

// =============================================================================
// TESTS
// =============================================================================
