// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The live generation path.
//!
//! Turns one inbound chat message into a generation request: parameter
//! parsing, backend resolution, image collection (including settled media
//! groups and reply context), the attempt loop, and delivery or enqueueing
//! of the outcome.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use kanva_core::KanvaError;
use kanva_core::traits::ChannelPort;
use kanva_core::types::{DownloadedImage, InboundEvent, Quality};
use kanva_gemini::aspect;
use kanva_storage::queries::{failed, prompts, settings};
use tracing::{info, warn};

use crate::driver::{self, AttemptObserver};
use crate::params::{self, ParsedParams};
use crate::payload::FailedGenerationPayload;
use crate::resolver::{self, ResolvedService};
use crate::{EngineDeps, media_groups};

/// Longest error text shown in a chat message. The full error is still
/// stored with the queued entry.
const STATUS_ERROR_LIMIT: usize = 200;

/// Trim an error for display in a status message.
pub(crate) fn truncate_error(message: &str) -> String {
    if message.chars().count() <= STATUS_ERROR_LIMIT {
        return message.to_string();
    }
    let cut: String = message.chars().take(STATUS_ERROR_LIMIT).collect();
    format!("{cut}…")
}

/// Status-message editor driving "attempt i/n" updates.
struct StatusObserver {
    channel: Arc<dyn ChannelPort>,
    chat_id: i64,
    status_id: i32,
    service_label: String,
}

#[async_trait]
impl AttemptObserver for StatusObserver {
    async fn on_attempt(&self, attempt: u32, total: u32) {
        let text = if attempt == 1 {
            format!("🎨 Generating via {}...", self.service_label)
        } else {
            format!(
                "🎨 Generating via {} (attempt {attempt}/{total})...",
                self.service_label
            )
        };
        if let Err(err) = self
            .channel
            .edit_text(self.chat_id, self.status_id, &text)
            .await
        {
            warn!(error = %err, "status edit failed");
        }
    }
}

/// Handle one generation-triggering message end to end.
///
/// Only infrastructure failures (status message cannot be sent) bubble up;
/// user-visible problems are reported into the chat and resolved here.
pub async fn handle_generation(deps: &EngineDeps, event: &InboundEvent) -> Result<(), KanvaError> {
    let text = event.text.as_deref().unwrap_or("");
    let parsed = params::parse(text);

    if let Some(bad) = &parsed.ratio_error {
        let ratios = aspect::supported_ratios().join(", ");
        deps.channel
            .send_text(
                event.chat_id,
                &format!("Unsupported aspect ratio @{bad}. Supported: {ratios}"),
                Some(event.message_id),
            )
            .await?;
        return Ok(());
    }
    if let Some(bad) = &parsed.quality_error {
        deps.channel
            .send_text(
                event.chat_id,
                &format!("Unsupported quality @{bad}. Supported: 1K, 2K, 4K"),
                Some(event.message_id),
            )
            .await?;
        return Ok(());
    }

    let resolved = match resolver::resolve_service(&deps.db, &deps.config.gemini, event.user_id)
        .await
    {
        Ok(resolved) => resolved,
        Err(KanvaError::NoServiceConfigured) => {
            deps.channel
                .send_text(
                    event.chat_id,
                    "No backend service configured. Add one with /service add, \
                     or ask the operator to set a fallback API key.",
                    Some(event.message_id),
                )
                .await?;
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let image_refs = collect_image_refs(deps, event, &parsed).await;
    let prompt = effective_prompt(deps, event, &parsed, !image_refs.is_empty()).await;
    let Some(prompt) = prompt else {
        // Nothing to draw and nothing to draw from.
        return Ok(());
    };

    let quality = match parsed.quality {
        Some(q) => q,
        None => stored_quality(deps, event.user_id).await,
    };

    if !parsed.prompt.is_empty() {
        if let Err(err) = prompts::add_history(&deps.db, event.user_id, &parsed.prompt).await {
            warn!(error = %err, "prompt history write failed");
        }
    }

    let status_id = deps
        .channel
        .send_text(
            event.chat_id,
            &format!("🎨 Generating via {}...", resolved.display_name),
            Some(event.message_id),
        )
        .await?;

    let images = match download_all(deps.channel.as_ref(), &image_refs).await {
        Ok(images) => images,
        Err(err) => {
            deps.channel
                .edit_text(
                    event.chat_id,
                    status_id,
                    &format!("❌ {}", truncate_error(&err.to_string())),
                )
                .await?;
            return Ok(());
        }
    };

    let aspect_ratio = aspect::resolve(parsed.aspect_ratio.as_deref(), &images);

    let generator = match deps.factory.create(&resolved.backend) {
        Ok(generator) => generator,
        Err(err) => {
            deps.channel
                .edit_text(
                    event.chat_id,
                    status_id,
                    &format!("❌ {}", truncate_error(&err.to_string())),
                )
                .await?;
            return Ok(());
        }
    };

    let observer = StatusObserver {
        channel: deps.channel.clone(),
        chat_id: event.chat_id,
        status_id,
        service_label: resolved.display_name.clone(),
    };

    let outcome = driver::run_attempts(
        generator.as_ref(),
        &prompt,
        &images,
        quality,
        aspect_ratio.as_deref(),
        &observer,
    )
    .await;

    match outcome {
        Ok(result) => {
            deliver(deps, event.chat_id, event.message_id, status_id, result.image_data, quality)
                .await
        }
        Err(err) if err.is_config_error() => {
            deps.channel
                .edit_text(
                    event.chat_id,
                    status_id,
                    &format!("❌ {}", truncate_error(&err.to_string())),
                )
                .await?;
            Ok(())
        }
        Err(err) => {
            enqueue_failure(
                deps,
                event,
                status_id,
                &prompt,
                quality,
                aspect_ratio,
                image_refs,
                &resolved,
                &err,
            )
            .await
        }
    }
}

/// Send the generated image as a photo preview plus a full-quality
/// document, then drop the status message.
async fn deliver(
    deps: &EngineDeps,
    chat_id: i64,
    reply_to: i32,
    status_id: i32,
    image_data: Vec<u8>,
    quality: Quality,
) -> Result<(), KanvaError> {
    if let Err(err) = deps.channel.delete_message(chat_id, status_id).await {
        warn!(error = %err, "status delete failed");
    }
    deps.channel
        .send_photo(chat_id, image_data.clone(), "preview.png", Some(reply_to))
        .await?;
    deps.channel
        .send_document(
            chat_id,
            image_data,
            &format!("generated_{quality}.png"),
            None,
            Some(reply_to),
        )
        .await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn enqueue_failure(
    deps: &EngineDeps,
    event: &InboundEvent,
    status_id: i32,
    prompt: &str,
    quality: Quality,
    aspect_ratio: Option<String>,
    image_refs: Vec<String>,
    resolved: &ResolvedService,
    err: &KanvaError,
) -> Result<(), KanvaError> {
    let payload = FailedGenerationPayload {
        prompt: prompt.to_string(),
        quality,
        aspect_ratio,
        image_file_ids: image_refs,
        service: resolved.backend.clone(),
    };
    let raw = payload.to_json()?;
    let id = failed::enqueue(
        &deps.db,
        event.user_id,
        event.chat_id,
        event.message_id,
        &raw,
        &err.to_string(),
    )
    .await?;
    info!(entry = id, "generation queued for background retry");

    deps.channel
        .edit_text(
            event.chat_id,
            status_id,
            &format!(
                "⏳ Generation failed and was queued for automatic retry.\n{}",
                truncate_error(&err.to_string())
            ),
        )
        .await?;
    Ok(())
}

/// The prompt actually sent to the provider.
///
/// User text wins; with images but no text the replied-to message's text
/// (a common "redraw like this" pattern) is tried, then the user's default
/// saved prompt, then the configured default. Without images an empty
/// prompt means there is no request.
async fn effective_prompt(
    deps: &EngineDeps,
    event: &InboundEvent,
    parsed: &ParsedParams,
    has_images: bool,
) -> Option<String> {
    if !parsed.prompt.is_empty() {
        return Some(parsed.prompt.clone());
    }
    if !has_images {
        return None;
    }
    if let Some(reply) = &event.reply {
        if let Some(text) = reply.text.as_deref() {
            let text = text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    match prompts::get_default_prompt(&deps.db, event.user_id).await {
        Ok(Some(saved)) => return Some(saved.content),
        Ok(None) => {}
        Err(err) => warn!(error = %err, "default prompt read failed"),
    }
    Some(deps.config.relay.default_prompt.clone())
}

async fn stored_quality(deps: &EngineDeps, user_id: i64) -> Quality {
    match settings::get_quality(&deps.db, user_id).await {
        Ok(Some(raw)) => Quality::from_str(&raw).unwrap_or_default(),
        Ok(None) => Quality::default(),
        Err(err) => {
            warn!(error = %err, "quality setting read failed");
            Quality::default()
        }
    }
}

/// Collect input image refs from the message and, when it has none of its
/// own, from the replied-to message. Media groups get a settle delay so
/// the whole album is present before the snapshot.
async fn collect_image_refs(
    deps: &EngineDeps,
    event: &InboundEvent,
    parsed: &ParsedParams,
) -> Vec<String> {
    if let Some(group_id) = event.media_group_id.as_deref() {
        if !parsed.single_image {
            tokio::time::sleep(media_groups::SETTLE_DELAY).await;
            let batch = deps.media_groups.snapshot(group_id).await;
            if !batch.is_empty() {
                return batch;
            }
        }
    }
    if let Some(own) = own_image_ref(event) {
        return vec![own];
    }

    let Some(reply) = &event.reply else {
        return Vec::new();
    };
    if let Some(group_id) = reply.media_group_id.as_deref() {
        if !parsed.single_image {
            let batch = deps.media_groups.snapshot(group_id).await;
            if !batch.is_empty() {
                return batch;
            }
        }
    }
    reply
        .photo_ref
        .clone()
        .or_else(|| reply.sticker_ref.clone())
        .or_else(|| reply.document_ref.clone())
        .map(|r| vec![r])
        .unwrap_or_default()
}

fn own_image_ref(event: &InboundEvent) -> Option<String> {
    event
        .photo_ref
        .clone()
        .or_else(|| event.sticker_ref.clone())
        .or_else(|| event.document_ref.clone())
}

async fn download_all(
    channel: &dyn ChannelPort,
    refs: &[String],
) -> Result<Vec<DownloadedImage>, KanvaError> {
    let mut images = Vec::with_capacity(refs.len());
    for (idx, file_ref) in refs.iter().enumerate() {
        let image = channel
            .download_image(file_ref)
            .await
            .map_err(|err| KanvaError::Download {
                position: idx + 1,
                message: err.to_string(),
            })?;
        images.push(image);
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_errors_pass_through() {
        assert_eq!(truncate_error("boom"), "boom");
    }

    #[test]
    fn long_errors_are_cut_with_ellipsis() {
        let long = "x".repeat(500);
        let cut = truncate_error(&long);
        assert_eq!(cut.chars().count(), STATUS_ERROR_LIMIT + 1);
        assert!(cut.ends_with('…'));
    }
}
