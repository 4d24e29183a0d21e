// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::KanvaError;
use crate::types::DownloadedImage;

/// Outbound operations against the chat platform.
///
/// All operations are opaque to the engine beyond "succeeds or fails";
/// message formatting stays on the adapter side.
#[async_trait]
pub trait ChannelPort: Send + Sync {
    /// Send plain text, optionally replying to a message. Returns the sent
    /// message's id so it can later be edited or deleted.
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<i32, KanvaError>;

    /// Replace the text of a previously sent message.
    async fn edit_text(&self, chat_id: i64, message_id: i32, text: &str)
    -> Result<(), KanvaError>;

    /// Delete a previously sent message.
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), KanvaError>;

    /// Send an image as a compressed photo preview.
    async fn send_photo(
        &self,
        chat_id: i64,
        data: Vec<u8>,
        filename: &str,
        reply_to: Option<i32>,
    ) -> Result<i32, KanvaError>;

    /// Send an image as an uncompressed document.
    async fn send_document(
        &self,
        chat_id: i64,
        data: Vec<u8>,
        filename: &str,
        caption: Option<&str>,
        reply_to: Option<i32>,
    ) -> Result<i32, KanvaError>;

    /// Download an image by its platform file reference.
    async fn download_image(&self, file_ref: &str) -> Result<DownloadedImage, KanvaError>;
}
