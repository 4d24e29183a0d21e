// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Kanva workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output quality tier, passed through to the provider unchanged.
///
/// The wire strings (`1K`/`2K`/`4K`) match what the generation provider
/// expects in `imageConfig.imageSize`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Quality {
    #[strum(serialize = "1K")]
    #[serde(rename = "1K")]
    Low,
    #[default]
    #[strum(serialize = "2K")]
    #[serde(rename = "2K")]
    Medium,
    #[strum(serialize = "4K")]
    #[serde(rename = "4K")]
    High,
}

/// The three backend-configuration shapes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum BackendVariant {
    /// Official API addressed by key only.
    #[default]
    #[strum(serialize = "gemini", serialize = "origin", serialize = "standard", to_string = "standard")]
    Standard,
    /// User-supplied base URL plus key (proxies, compatible gateways).
    Custom,
    /// Project/location-scoped Vertex endpoint.
    #[strum(serialize = "gcp", serialize = "vertex", to_string = "vertex")]
    Vertex,
}

/// A stored backend service record owned by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendService {
    pub id: i64,
    pub owner_user_id: i64,
    pub name: String,
    pub variant: BackendVariant,
    pub api_key: String,
    /// Empty means the variant default.
    pub base_url: String,
    pub project_id: String,
    pub location: String,
    /// Empty means the provider default model.
    pub model: String,
    pub is_default: bool,
    pub created_at: String,
}

/// A resolved backend snapshot, embedded in generation requests and in
/// queued failed-generation payloads. Serialization must be lossless.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    pub variant: BackendVariant,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
}

impl BackendConfig {
    /// Snapshot a stored service record.
    pub fn from_service(service: &BackendService) -> Self {
        Self {
            variant: service.variant,
            name: service.name.clone(),
            api_key: service.api_key.clone(),
            base_url: service.base_url.clone(),
            project_id: service.project_id.clone(),
            location: service.location.clone(),
            model: service.model.clone(),
        }
    }
}

/// An input image downloaded from the chat platform.
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// One generated image returned by the provider.
#[derive(Debug, Clone)]
pub struct ImageResult {
    pub image_data: Vec<u8>,
}

/// One logical "produce an image" request.
///
/// `aspect_ratio` is resolved exactly once per request and frozen for all
/// retry attempts; `None` means "let the provider decide".
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub quality: Quality,
    pub aspect_ratio: Option<String>,
    pub image_refs: Vec<String>,
    pub backend: BackendConfig,
}

/// Context about the message an inbound event replies to.
#[derive(Debug, Clone, Default)]
pub struct ReplyContext {
    pub message_id: i32,
    pub text: Option<String>,
    pub photo_ref: Option<String>,
    pub media_group_id: Option<String>,
    pub sticker_ref: Option<String>,
    pub document_ref: Option<String>,
}

/// An inbound chat event, normalized from the platform's update shape.
#[derive(Debug, Clone, Default)]
pub struct InboundEvent {
    pub user_id: i64,
    pub chat_id: i64,
    pub message_id: i32,
    /// Message text or media caption.
    pub text: Option<String>,
    /// File reference of the largest photo variant, if any.
    pub photo_ref: Option<String>,
    /// Batch-correlation key supplied by the platform.
    pub media_group_id: Option<String>,
    /// Sticker file reference (thumbnail preferred).
    pub sticker_ref: Option<String>,
    /// Document file reference, only set for image documents.
    pub document_ref: Option<String>,
    pub reply: Option<ReplyContext>,
    pub is_group: bool,
}
