// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend-service resolution.
//!
//! Each generation snapshots one backend configuration up front: the
//! user's stored default service when they registered one, otherwise the
//! process-wide key from the environment/config file. The snapshot rides
//! along through retries and queue replay so later `/service` edits never
//! change an in-flight request.

use kanva_config::GeminiConfig;
use kanva_core::KanvaError;
use kanva_core::types::{BackendConfig, BackendVariant};
use kanva_storage::Database;
use kanva_storage::queries::services;

/// A backend snapshot plus the label shown in status messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedService {
    pub backend: BackendConfig,
    pub display_name: String,
}

/// Pick the backend for a user's request.
///
/// Stored default service wins; the environment key is the fallback. When
/// neither exists the request cannot proceed.
pub async fn resolve_service(
    db: &Database,
    fallback: &GeminiConfig,
    user_id: i64,
) -> Result<ResolvedService, KanvaError> {
    if let Some(service) = services::get_default_service(db, user_id).await? {
        let display_name = format!("{} (#{})", service.name, service.id);
        return Ok(ResolvedService {
            backend: BackendConfig::from_service(&service),
            display_name,
        });
    }

    let env_key = fallback
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty());
    if let Some(key) = env_key {
        return Ok(ResolvedService {
            backend: BackendConfig {
                variant: BackendVariant::Standard,
                name: String::new(),
                api_key: key.to_string(),
                base_url: fallback.base_url.clone().unwrap_or_default(),
                project_id: String::new(),
                location: String::new(),
                model: fallback.image_model.clone().unwrap_or_default(),
            },
            display_name: "env-default".to_string(),
        });
    }

    Err(KanvaError::NoServiceConfigured)
}

/// Redact a secret for display: keep at most the first and last four
/// characters.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
