// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event loop and dispatch.
//!
//! Consumes normalized inbound events, maintains the media-group cache,
//! and routes each event to the command layer or the generation path. Each
//! event is handled on its own task so a media-group settle delay never
//! stalls the loop.

use kanva_core::types::InboundEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{EngineDeps, commands, generation};

/// How an inbound event should be routed.
#[derive(Debug, PartialEq, Eq)]
enum Route {
    Command,
    /// Generate, with the text the generation path should see (group
    /// trigger prefix already stripped).
    Generate(Option<String>),
    Ignore,
}

/// Routing rules:
/// - `/commands` are handled everywhere.
/// - In group chats a generation must be addressed to the relay with a
///   leading `.`, which is stripped; everything else is other people's
///   conversation.
/// - Caption-less album photos only feed the cache.
/// - Messages with neither text nor an image are noise.
fn route(event: &InboundEvent) -> Route {
    let text = event.text.as_deref().map(str::trim).unwrap_or("");

    if commands::is_command(text) {
        return Route::Command;
    }

    if event.is_group {
        let Some(stripped) = text.strip_prefix('.') else {
            return Route::Ignore;
        };
        return Route::Generate(Some(stripped.trim().to_string()));
    }

    if event.media_group_id.is_some() && text.is_empty() {
        return Route::Ignore;
    }

    let has_image = event.photo_ref.is_some()
        || event.sticker_ref.is_some()
        || event.document_ref.is_some()
        || event.reply.is_some();
    if text.is_empty() && !has_image {
        return Route::Ignore;
    }

    Route::Generate(event.text.clone())
}

/// The relay's event loop.
pub struct Engine {
    deps: EngineDeps,
}

impl Engine {
    pub fn new(deps: EngineDeps) -> Self {
        Self { deps }
    }

    /// Consume events until the channel closes or shutdown is requested.
    pub async fn run(self, mut rx: mpsc::Receiver<InboundEvent>, cancel: CancellationToken) {
        info!("engine started");
        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else {
                        info!("event channel closed");
                        return;
                    };
                    let deps = self.deps.clone();
                    tokio::spawn(async move {
                        Self::handle_event(deps, event).await;
                    });
                }
                _ = cancel.cancelled() => {
                    info!("engine stopped");
                    return;
                }
            }
        }
    }

    /// Handle one event; errors are logged, never fatal to the loop.
    pub async fn handle_event(deps: EngineDeps, event: InboundEvent) {
        // Album photos feed the cache regardless of routing, so a captioned
        // sibling (or a later reply) can pick up the whole batch.
        if let (Some(group_id), Some(photo_ref)) =
            (event.media_group_id.as_deref(), event.photo_ref.as_deref())
        {
            deps.media_groups.append(group_id, photo_ref).await;
        }

        match route(&event) {
            Route::Command => {
                if let Err(err) = commands::handle_command(&deps, &event).await {
                    error!(error = %err, chat = event.chat_id, "command handling failed");
                }
            }
            Route::Generate(text) => {
                let event = InboundEvent { text, ..event };
                if let Err(err) = generation::handle_generation(&deps, &event).await {
                    error!(error = %err, chat = event.chat_id, "generation handling failed");
                }
            }
            Route::Ignore => {
                debug!(chat = event.chat_id, "event ignored");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanva_core::types::ReplyContext;

    fn event(text: Option<&str>) -> InboundEvent {
        InboundEvent {
            user_id: 7,
            chat_id: 42,
            message_id: 1,
            text: text.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn commands_route_everywhere() {
        assert_eq!(route(&event(Some("/help"))), Route::Command);
        let mut grp = event(Some("/service list"));
        grp.is_group = true;
        assert_eq!(route(&grp), Route::Command);
    }

    #[test]
    fn private_text_generates() {
        assert_eq!(
            route(&event(Some("a cat"))),
            Route::Generate(Some("a cat".to_string()))
        );
    }

    #[test]
    fn group_requires_dot_prefix() {
        let mut grp = event(Some("a cat"));
        grp.is_group = true;
        assert_eq!(route(&grp), Route::Ignore);

        let mut grp = event(Some(". a cat @16:9"));
        grp.is_group = true;
        assert_eq!(route(&grp), Route::Generate(Some("a cat @16:9".to_string())));
    }

    #[test]
    fn captionless_album_photo_is_cache_only() {
        let mut ev = event(None);
        ev.photo_ref = Some("f".to_string());
        ev.media_group_id = Some("g".to_string());
        assert_eq!(route(&ev), Route::Ignore);
    }

    #[test]
    fn captioned_album_photo_generates() {
        let mut ev = event(Some("redraw these"));
        ev.photo_ref = Some("f".to_string());
        ev.media_group_id = Some("g".to_string());
        assert_eq!(
            route(&ev),
            Route::Generate(Some("redraw these".to_string()))
        );
    }

    #[test]
    fn bare_photo_generates_with_default_prompt_later() {
        let mut ev = event(None);
        ev.photo_ref = Some("f".to_string());
        assert_eq!(route(&ev), Route::Generate(None));
    }

    #[test]
    fn empty_reply_only_message_still_routes() {
        let mut ev = event(None);
        ev.reply = Some(ReplyContext {
            message_id: 9,
            photo_ref: Some("r".to_string()),
            ..Default::default()
        });
        assert_eq!(route(&ev), Route::Generate(None));
    }

    #[test]
    fn pure_noise_is_ignored() {
        assert_eq!(route(&event(None)), Route::Ignore);
        assert_eq!(route(&event(Some("   "))), Route::Ignore);
    }
}
