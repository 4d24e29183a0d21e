// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::KanvaError;
use crate::types::{DownloadedImage, ImageResult, Quality};

/// One call against the generation provider.
///
/// Implementations build exactly one provider request per invocation and
/// hold no state between calls; retry policy lives with the caller.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image from a prompt, zero-or-more inline input images,
    /// a quality tier, and an optional aspect ratio (`None` lets the
    /// provider decide).
    async fn generate(
        &self,
        prompt: &str,
        images: &[DownloadedImage],
        quality: Quality,
        aspect_ratio: Option<&str>,
    ) -> Result<ImageResult, KanvaError>;
}
