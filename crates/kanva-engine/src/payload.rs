// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable payload for queued failed generations.
//!
//! Everything a replay needs is frozen at enqueue time, including the
//! backend snapshot, so the retry runs with the exact configuration the
//! user had when the request failed.

use kanva_core::KanvaError;
use kanva_core::types::{BackendConfig, Quality};
use serde::{Deserialize, Serialize};

/// JSON document stored in `failed_generations.payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedGenerationPayload {
    pub prompt: String,
    pub quality: Quality,
    /// Ratio resolved for the original request; absent means the provider
    /// chooses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    /// Platform file refs of the input images, in their original order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_file_ids: Vec<String>,
    /// Backend snapshot the request ran against.
    pub service: BackendConfig,
}

impl FailedGenerationPayload {
    pub fn to_json(&self) -> Result<String, KanvaError> {
        serde_json::to_string(self).map_err(|e| KanvaError::Internal(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self, KanvaError> {
        serde_json::from_str(raw).map_err(|e| KanvaError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanva_core::types::BackendVariant;

    #[test]
    fn round_trips_with_all_fields() {
        let payload = FailedGenerationPayload {
            prompt: "a red fox".to_string(),
            quality: Quality::High,
            aspect_ratio: Some("16:9".to_string()),
            image_file_ids: vec!["file-a".to_string(), "file-b".to_string()],
            service: BackendConfig {
                variant: BackendVariant::Vertex,
                name: "vtx".to_string(),
                api_key: "key".to_string(),
                base_url: String::new(),
                project_id: "proj".to_string(),
                location: "us-central1".to_string(),
                model: String::new(),
            },
        };
        let json = payload.to_json().expect("serialize");
        let parsed = FailedGenerationPayload::from_json(&json).expect("parse");
        assert_eq!(parsed, payload);
    }

    #[test]
    fn optional_fields_are_omitted_and_defaulted() {
        let payload = FailedGenerationPayload {
            prompt: "plain".to_string(),
            quality: Quality::Medium,
            aspect_ratio: None,
            image_file_ids: Vec::new(),
            service: BackendConfig::default(),
        };
        let json = payload.to_json().expect("serialize");
        assert!(!json.contains("aspect_ratio"));
        assert!(!json.contains("image_file_ids"));

        let parsed = FailedGenerationPayload::from_json(&json).expect("parse");
        assert_eq!(parsed.aspect_ratio, None);
        assert!(parsed.image_file_ids.is_empty());
    }

    #[test]
    fn corrupt_json_is_an_error() {
        assert!(FailedGenerationPayload::from_json("{not json").is_err());
        assert!(FailedGenerationPayload::from_json(r#"{"prompt":"x"}"#).is_err());
    }

    #[test]
    fn quality_uses_wire_strings() {
        let payload = FailedGenerationPayload {
            prompt: "q".to_string(),
            quality: Quality::Low,
            aspect_ratio: None,
            image_file_ids: Vec::new(),
            service: BackendConfig::default(),
        };
        let json = payload.to_json().expect("serialize");
        assert!(json.contains(r#""quality":"1K""#));
    }
}
