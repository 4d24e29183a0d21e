// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded generation attempt loop.
//!
//! Live generations funnel through [`run_attempts`]: a fixed number of
//! same-parameter tries with a short pause in between. Configuration errors
//! abort immediately since retrying cannot fix them. Queue replay does not
//! use this loop; it makes one call per scheduler pass.

use std::time::Duration;

use async_trait::async_trait;
use kanva_core::KanvaError;
use kanva_core::traits::ImageGenerator;
use kanva_core::types::{DownloadedImage, ImageResult, Quality};
use tracing::{debug, warn};

/// Tries per generation before the request is declared failed.
pub const MAX_ATTEMPTS: u32 = 6;

/// Pause between consecutive attempts.
const ATTEMPT_DELAY: Duration = Duration::from_secs(2);

/// Receives progress callbacks so the caller can keep a status message
/// current without the driver knowing about chat plumbing.
#[async_trait]
pub trait AttemptObserver: Send + Sync {
    /// Called before each attempt, 1-based.
    async fn on_attempt(&self, attempt: u32, total: u32);
}

/// Drive a generation to success or exhaustion.
///
/// All attempts reuse the same prompt, images, quality, and frozen aspect
/// ratio. On exhaustion the final provider error is returned verbatim so
/// it can be stored with the queued entry. A configuration error from the
/// provider short-circuits the loop.
pub async fn run_attempts(
    generator: &dyn ImageGenerator,
    prompt: &str,
    images: &[DownloadedImage],
    quality: Quality,
    aspect_ratio: Option<&str>,
    observer: &dyn AttemptObserver,
) -> Result<ImageResult, KanvaError> {
    let mut last_err = KanvaError::Internal("generation attempted zero times".to_string());

    for attempt in 1..=MAX_ATTEMPTS {
        observer.on_attempt(attempt, MAX_ATTEMPTS).await;
        match generator.generate(prompt, images, quality, aspect_ratio).await {
            Ok(result) => {
                debug!(attempt, "generation succeeded");
                return Ok(result);
            }
            Err(err) if err.is_config_error() => return Err(err),
            Err(err) => {
                warn!(attempt, error = %err, "generation attempt failed");
                last_err = err;
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(ATTEMPT_DELAY).await;
                }
            }
        }
    }

    Err(last_err)
}
