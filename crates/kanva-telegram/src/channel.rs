// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound Telegram operations.
//!
//! Thin [`ChannelPort`] implementation over the teloxide `Bot`; all message
//! text is sent plain (no parse mode) so provider error bodies survive
//! verbatim in status messages.

use async_trait::async_trait;
use kanva_core::KanvaError;
use kanva_core::traits::ChannelPort;
use kanva_core::types::DownloadedImage;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatId, FileId, InputFile, MessageId, ReplyParameters};
use tracing::debug;

/// Telegram implementation of [`ChannelPort`].
#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    /// Create the adapter from a bot token.
    pub fn new(token: &str) -> Result<Self, KanvaError> {
        if token.trim().is_empty() {
            return Err(KanvaError::Config(
                "telegram.bot_token cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            bot: Bot::new(token),
        })
    }

    /// The underlying teloxide bot, for the polling loop.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn channel_err(context: &str, err: teloxide::RequestError) -> KanvaError {
    KanvaError::Channel {
        message: format!("{context}: {err}"),
        source: Some(Box::new(err)),
    }
}

/// Guess an image MIME type from the Telegram file path suffix.
fn mime_from_path(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else {
        // Telegram photos are re-encoded as JPEG.
        "image/jpeg"
    }
}

#[async_trait]
impl ChannelPort for TelegramChannel {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<i32, KanvaError> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(id) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(id)));
        }
        let sent = request
            .await
            .map_err(|e| channel_err("failed to send message", e))?;
        Ok(sent.id.0)
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
    ) -> Result<(), KanvaError> {
        let result = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text)
            .await;
        match result {
            Ok(_) => Ok(()),
            // Editing to identical text is not an error worth surfacing.
            Err(e) if e.to_string().contains("message is not modified") => Ok(()),
            Err(e) => Err(channel_err("failed to edit message", e)),
        }
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), KanvaError> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(|e| channel_err("failed to delete message", e))?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        data: Vec<u8>,
        filename: &str,
        reply_to: Option<i32>,
    ) -> Result<i32, KanvaError> {
        let file = InputFile::memory(data).file_name(filename.to_string());
        let mut request = self.bot.send_photo(ChatId(chat_id), file);
        if let Some(id) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(id)));
        }
        let sent = request
            .await
            .map_err(|e| channel_err("failed to send photo", e))?;
        Ok(sent.id.0)
    }

    async fn send_document(
        &self,
        chat_id: i64,
        data: Vec<u8>,
        filename: &str,
        caption: Option<&str>,
        reply_to: Option<i32>,
    ) -> Result<i32, KanvaError> {
        let file = InputFile::memory(data).file_name(filename.to_string());
        let mut request = self.bot.send_document(ChatId(chat_id), file);
        if let Some(text) = caption {
            request = request.caption(text.to_string());
        }
        if let Some(id) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(id)));
        }
        let sent = request
            .await
            .map_err(|e| channel_err("failed to send document", e))?;
        Ok(sent.id.0)
    }

    async fn download_image(&self, file_ref: &str) -> Result<DownloadedImage, KanvaError> {
        let file = self
            .bot
            .get_file(FileId(file_ref.to_string()))
            .await
            .map_err(|e| channel_err("failed to get file info", e))?;

        let mut data = Vec::new();
        self.bot
            .download_file(&file.path, &mut data)
            .await
            .map_err(|e| KanvaError::Channel {
                message: format!("failed to download file: {e}"),
                source: Some(Box::new(e)),
            })?;

        let mime_type = mime_from_path(&file.path).to_string();
        debug!(file_ref, size = data.len(), mime = %mime_type, "downloaded file");
        Ok(DownloadedImage { data, mime_type })
    }
}
