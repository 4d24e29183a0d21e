// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Endpoint construction for the three backend variants.
//!
//! Pure functions of the backend snapshot, unit-testable with zero network
//! access.

use kanva_core::KanvaError;
use kanva_core::types::{BackendConfig, BackendVariant};
use reqwest::Url;

/// Default base URL for the official generative-language API.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default base URL for Vertex AI.
pub const DEFAULT_VERTEX_BASE_URL: &str = "https://aiplatform.googleapis.com";
/// Image model used when the backend does not name one.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";

/// Build the full `generateContent` URL for a backend snapshot, with the
/// API key appended as a query parameter.
///
/// A base URL that already contains `:generateContent` is taken verbatim,
/// which lets users point a Custom service at any compatible endpoint.
pub fn build_generate_url(backend: &BackendConfig) -> Result<String, KanvaError> {
    let api_key = backend.api_key.trim();
    if api_key.is_empty() {
        return Err(KanvaError::InvalidBackendConfig(
            "service api key is empty".to_string(),
        ));
    }

    let base_url = backend.base_url.trim();
    let mut model = backend.model.trim();
    if model.is_empty() {
        model = DEFAULT_IMAGE_MODEL;
    }

    if base_url.contains(":generateContent") {
        return append_api_key(base_url, api_key);
    }

    let endpoint = match backend.variant {
        BackendVariant::Vertex => {
            let base = if base_url.is_empty() {
                DEFAULT_VERTEX_BASE_URL
            } else {
                base_url
            };
            let project_id = backend.project_id.trim();
            let location = backend.location.trim();
            if project_id.is_empty() || location.is_empty() {
                return Err(KanvaError::InvalidBackendConfig(
                    "vertex service requires project_id and location".to_string(),
                ));
            }
            format!(
                "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
                base.trim_end_matches('/'),
                project_id,
                location,
                model,
            )
        }
        BackendVariant::Standard | BackendVariant::Custom => {
            let base = if base_url.is_empty() {
                DEFAULT_GEMINI_BASE_URL
            } else {
                base_url
            };
            format!(
                "{}/v1beta/models/{}:generateContent",
                base.trim_end_matches('/'),
                model,
            )
        }
    };

    append_api_key(&endpoint, api_key)
}

fn append_api_key(raw_url: &str, api_key: &str) -> Result<String, KanvaError> {
    let mut url = Url::parse(raw_url).map_err(|e| {
        KanvaError::InvalidBackendConfig(format!("invalid endpoint URL `{raw_url}`: {e}"))
    })?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url.into())
}
