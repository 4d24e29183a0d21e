// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background replay of queued failed generations.
//!
//! A scheduler wakes on a fixed period, picks one random queue entry, and
//! replays it with the frozen payload. Success delivers the image into the
//! original chat and removes the entry; failure bumps the retry counter
//! and leaves the entry for a later pass. Entries whose payload no longer
//! parses are dropped outright.

use std::time::Duration;

use kanva_core::KanvaError;
use kanva_core::types::DownloadedImage;
use kanva_gemini::aspect;
use kanva_storage::models::FailedGeneration;
use kanva_storage::queries::failed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::EngineDeps;
use crate::payload::FailedGenerationPayload;
use crate::resolver;

/// Pause between replay passes.
const REPLAY_PERIOD: Duration = Duration::from_secs(15 * 60);

/// Wall-clock budget for one replayed generation, downloads included.
const REPLAY_TIMEOUT: Duration = Duration::from_secs(3 * 60);

/// What one replay pass did, for logging and tests.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Queue was empty.
    Empty,
    /// Entry payload was corrupt and has been deleted.
    Dropped(i64),
    /// Entry replayed successfully and has been deleted.
    Delivered(i64),
    /// Entry failed again and stays queued.
    Requeued(i64),
}

/// Periodic replay until cancellation.
pub async fn run_replay_loop(deps: EngineDeps, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(REPLAY_PERIOD);
    ticker.tick().await; // skip the immediate tick; first pass after one period
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match replay_once(&deps).await {
                    Ok(outcome) => debug!(?outcome, "replay pass finished"),
                    Err(err) => warn!(error = %err, "replay pass failed"),
                }
            }
            _ = cancel.cancelled() => {
                info!("replay loop stopped");
                return;
            }
        }
    }
}

/// Pick one random queued entry and replay it.
pub async fn replay_once(deps: &EngineDeps) -> Result<ReplayOutcome, KanvaError> {
    let Some(entry) = failed::pick_random(&deps.db).await? else {
        return Ok(ReplayOutcome::Empty);
    };
    let id = entry.id;

    let payload = match FailedGenerationPayload::from_json(&entry.payload) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(entry = id, error = %err, "dropping entry with corrupt payload");
            failed::delete(&deps.db, id).await?;
            return Ok(ReplayOutcome::Dropped(id));
        }
    };

    match tokio::time::timeout(REPLAY_TIMEOUT, replay_entry(deps, &entry, payload)).await {
        Ok(Ok(())) => {
            failed::delete(&deps.db, id).await?;
            info!(entry = id, "queued generation delivered");
            Ok(ReplayOutcome::Delivered(id))
        }
        Ok(Err(err)) => {
            warn!(entry = id, error = %err, "replay attempt failed");
            failed::mark_retry(&deps.db, id, &err.to_string()).await?;
            Ok(ReplayOutcome::Requeued(id))
        }
        Err(_) => {
            let err = KanvaError::Timeout {
                duration: REPLAY_TIMEOUT,
            };
            warn!(entry = id, "replay attempt timed out");
            failed::mark_retry(&deps.db, id, &err.to_string()).await?;
            Ok(ReplayOutcome::Requeued(id))
        }
    }
}

/// Run one entry end to end; any error means "keep it queued".
async fn replay_entry(
    deps: &EngineDeps,
    entry: &FailedGeneration,
    mut payload: FailedGenerationPayload,
) -> Result<(), KanvaError> {
    // Payloads snapshotted before the user had a key resolve against the
    // user's current service so a later /service add unblocks them.
    if payload.service.api_key.trim().is_empty() {
        let resolved =
            resolver::resolve_service(&deps.db, &deps.config.gemini, entry.user_id).await?;
        payload.service = resolved.backend;
    }

    let mut images: Vec<DownloadedImage> = Vec::with_capacity(payload.image_file_ids.len());
    for (idx, file_ref) in payload.image_file_ids.iter().enumerate() {
        let image = deps
            .channel
            .download_image(file_ref)
            .await
            .map_err(|err| KanvaError::Download {
                position: idx + 1,
                message: err.to_string(),
            })?;
        images.push(image);
    }

    let aspect_ratio = aspect::resolve(payload.aspect_ratio.as_deref(), &images);
    let generator = deps.factory.create(&payload.service)?;
    // Exactly one call per pass; the scheduler period is the retry loop.
    let result = generator
        .generate(
            &payload.prompt,
            &images,
            payload.quality,
            aspect_ratio.as_deref(),
        )
        .await?;

    let reply_to = Some(entry.reply_to_message_id);
    if let Err(err) = deps
        .channel
        .send_text(
            entry.chat_id,
            "✅ A previously failed generation has completed.",
            reply_to,
        )
        .await
    {
        // The notice is best-effort; the image itself must go through.
        warn!(entry = entry.id, error = %err, "replay notice failed");
    }
    deps.channel
        .send_photo(
            entry.chat_id,
            result.image_data.clone(),
            "retry_preview.png",
            reply_to,
        )
        .await?;
    deps.channel
        .send_document(
            entry.chat_id,
            result.image_data,
            &format!("retry_generated_{}.png", payload.quality),
            None,
            reply_to,
        )
        .await?;
    Ok(())
}
