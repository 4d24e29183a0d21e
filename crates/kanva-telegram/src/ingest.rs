// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long polling and update normalization.
//!
//! Telegram updates are flattened into [`InboundEvent`]s and pushed onto an
//! mpsc channel; routing decisions (commands, group triggers, media-group
//! assembly) belong to the engine, not this adapter.

use kanva_core::types::{InboundEvent, ReplyContext};
use teloxide::prelude::*;
use teloxide::types::{Message, Sticker};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Start the long-polling dispatcher, forwarding normalized events to `tx`.
///
/// The returned handle aborts polling when dropped; process teardown should
/// stop consuming events first.
pub fn start_polling(bot: Bot, tx: mpsc::Sender<InboundEvent>) -> tokio::task::JoinHandle<()> {
    info!("starting Telegram long polling");
    tokio::spawn(async move {
        let handler = Update::filter_message().endpoint(move |msg: Message| {
            let tx = tx.clone();
            async move {
                match to_inbound_event(&msg) {
                    Some(event) => {
                        if tx.send(event).await.is_err() {
                            warn!("inbound channel closed, dropping message");
                        }
                    }
                    None => {
                        debug!(msg_id = msg.id.0, "ignoring unsupported message");
                    }
                }
                respond(())
            }
        });

        Dispatcher::builder(bot, handler)
            .default_handler(|_| async {}) // ignore non-message updates
            .build()
            .dispatch()
            .await;
    })
}

/// File reference for a sticker, preferring the smaller thumbnail; the
/// provider only needs the artwork, not a full-resolution webp.
fn sticker_ref(sticker: &Sticker) -> String {
    sticker
        .thumbnail
        .as_ref()
        .map(|t| t.file.id.0.clone())
        .unwrap_or_else(|| sticker.file.id.0.clone())
}

/// Normalize a Telegram message into an [`InboundEvent`].
///
/// Returns `None` for messages without a sender (channel posts and other
/// service messages) and for messages carrying nothing the relay reacts to.
pub fn to_inbound_event(msg: &Message) -> Option<InboundEvent> {
    let user = msg.from.as_ref()?;

    let text = msg
        .text()
        .or_else(|| msg.caption())
        .map(|t| t.to_string());

    // Telegram sends multiple sizes; the last entry is the largest.
    let photo_ref = msg
        .photo()
        .and_then(|sizes| sizes.last())
        .map(|p| p.file.id.0.clone());

    let sticker = msg.sticker().map(sticker_ref);

    // Documents only count when they are images sent uncompressed.
    let document_ref = msg.document().and_then(|doc| {
        let is_image = doc
            .mime_type
            .as_ref()
            .is_some_and(|m| m.to_string().starts_with("image/"));
        is_image.then(|| doc.file.id.0.clone())
    });

    if text.is_none() && photo_ref.is_none() && sticker.is_none() && document_ref.is_none() {
        return None;
    }

    let reply = msg.reply_to_message().map(|replied| ReplyContext {
        message_id: replied.id.0,
        text: replied
            .text()
            .or_else(|| replied.caption())
            .map(|t| t.to_string()),
        photo_ref: replied
            .photo()
            .and_then(|sizes| sizes.last())
            .map(|p| p.file.id.0.clone()),
        media_group_id: replied.media_group_id().map(|id| id.to_string()),
        sticker_ref: replied.sticker().map(sticker_ref),
        document_ref: replied.document().and_then(|doc| {
            let is_image = doc
                .mime_type
                .as_ref()
                .is_some_and(|m| m.to_string().starts_with("image/"));
            is_image.then(|| doc.file.id.0.clone())
        }),
    });

    Some(InboundEvent {
        user_id: user.id.0 as i64,
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        text,
        photo_ref,
        media_group_id: msg.media_group_id().map(|id| id.to_string()),
        sticker_ref: sticker,
        document_ref,
        reply,
        is_group: msg.chat.is_group() || msg.chat.is_supergroup(),
    })
}
