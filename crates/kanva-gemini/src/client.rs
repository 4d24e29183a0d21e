// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for Gemini image generation.
//!
//! One [`GeminiClient`] wraps one backend snapshot; the generation engine
//! constructs a fresh client per resolved backend.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use kanva_core::traits::ImageGenerator;
use kanva_core::types::{BackendConfig, DownloadedImage, ImageResult, Quality};
use kanva_core::KanvaError;
use tracing::debug;

use crate::endpoint::build_generate_url;
use crate::types::{
    Content, GenerateRequest, GenerateResponse, GenerationConfig, ImageConfig, InlineData,
    RequestPart, safety_settings_off,
};

/// Upstream calls are bounded; image generation regularly takes tens of
/// seconds at high quality.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini-backed implementation of [`ImageGenerator`].
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    backend: BackendConfig,
}

impl GeminiClient {
    /// Create a client for one backend snapshot.
    ///
    /// Fails fast with `InvalidBackendConfig` when the snapshot cannot
    /// produce a usable endpoint, so callers surface configuration problems
    /// before any attempt loop starts.
    pub fn new(backend: BackendConfig) -> Result<Self, KanvaError> {
        Self::with_timeout(backend, REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(backend: BackendConfig, timeout: Duration) -> Result<Self, KanvaError> {
        // Validate eagerly; the URL itself is rebuilt per request.
        build_generate_url(&backend)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KanvaError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self { client, backend })
    }

    /// The backend snapshot this client addresses.
    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    fn build_request(
        &self,
        prompt: &str,
        images: &[DownloadedImage],
        quality: Quality,
        aspect_ratio: Option<&str>,
    ) -> GenerateRequest {
        let mut parts = vec![RequestPart::Text {
            text: prompt.to_string(),
        }];
        for img in images {
            parts.push(RequestPart::Inline {
                inline_data: InlineData {
                    mime_type: img.mime_type.clone(),
                    data: BASE64.encode(&img.data),
                },
            });
        }

        GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config: ImageConfig {
                    image_size: quality.to_string(),
                    aspect_ratio: aspect_ratio.map(str::to_string),
                },
            },
            safety_settings: safety_settings_off(),
        }
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        images: &[DownloadedImage],
        quality: Quality,
        aspect_ratio: Option<&str>,
    ) -> Result<ImageResult, KanvaError> {
        let url = build_generate_url(&self.backend)?;
        let request = self.build_request(prompt, images, quality, aspect_ratio);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| KanvaError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| KanvaError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(status = %status, images = images.len(), "generateContent response");

        if !status.is_success() {
            // The raw body is kept verbatim; it ends up in the failed-queue
            // record and in user-facing failure notices.
            return Err(KanvaError::Provider {
                message: format!("API error: {body}"),
                source: None,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| KanvaError::Provider {
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })?;

        let inline = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or_default()
            .iter()
            .find_map(|part| part.inline_data.as_ref());

        let Some(inline) = inline else {
            return Err(KanvaError::Provider {
                message: "no image data in response".to_string(),
                source: None,
            });
        };

        let image_data = BASE64.decode(&inline.data).map_err(|e| KanvaError::Provider {
            message: format!("invalid base64 image in response: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(ImageResult { image_data })
    }
}
