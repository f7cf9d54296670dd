//! Vision tool: ask the completion service about a local image.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ironjudge_core::error::ToolError;
use ironjudge_core::message::{ImageAttachment, Message};
use ironjudge_core::provider::{Provider, ProviderRequest};
use ironjudge_core::tool::Tool;
use tracing::debug;

use crate::path_guard::PathGuard;
use crate::payload::{AnalyzeImagePayload, ToolPayload};

const VISION_PROMPT: &str = "You are an expert Vision API tool. Answer the user's question about the image accurately based on visual evidence.";

pub struct AnalyzeImageTool {
    provider: Option<Arc<dyn Provider>>,
    model: String,
    guard: PathGuard,
}

impl AnalyzeImageTool {
    /// `provider` may be absent (e.g. no API key); the tool then reports
    /// that vision is unavailable instead of failing registration.
    pub fn new(provider: Option<Arc<dyn Provider>>, model: impl Into<String>, guard: PathGuard) -> Self {
        Self {
            provider,
            model: model.into(),
            guard,
        }
    }
}

/// MIME type by extension: png is png, everything else is sent as jpeg.
fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        _ => "image/jpeg",
    }
}

#[async_trait]
impl Tool for AnalyzeImageTool {
    fn name(&self) -> &str {
        "analyze_image"
    }

    fn description(&self) -> &str {
        "Payload: filepath|question\n   - Use: Utilizing the Vision API to inspect pixels, verify screenshots, or analyze image data."
    }

    async fn invoke(&self, payload: &str) -> Result<String, ToolError> {
        let AnalyzeImagePayload { path, question } = AnalyzeImagePayload::parse(payload)?;

        let resolved = self
            .guard
            .check(&path)
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: "analyze_image".into(),
                reason: e.to_string(),
            })?;

        if !resolved.exists() {
            return Ok(format!("[ERROR] Image not found: {path}"));
        }

        let Some(provider) = &self.provider else {
            return Ok("[ERROR] Image analysis failed: no completion provider configured".into());
        };

        let bytes = match tokio::fs::read(&resolved).await {
            Ok(bytes) => bytes,
            Err(e) => return Ok(format!("[ERROR] Image analysis failed: {e}")),
        };

        let image = ImageAttachment {
            mime_type: mime_for(&resolved).to_string(),
            data: STANDARD.encode(&bytes),
        };
        debug!(path = %resolved.display(), mime = %image.mime_type, bytes = bytes.len(), "Sending image to vision model");

        let mut request = ProviderRequest::new(&self.model, VISION_PROMPT, "");
        request.messages[1] = Message::user(question).with_image(image);

        match provider.complete(request).await {
            Ok(response) => Ok(format!("[VISION RESPONSE]\n{}", response.content)),
            Err(e) => Ok(format!("[ERROR] Image analysis failed: {e}")),
        }
    }
}
