// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities.
//!
//! [`BackendService`] is defined in `kanva-core::types` because it crosses
//! crate boundaries; it is re-exported here for convenience.

pub use kanva_core::types::BackendService;

/// A generation that exhausted its live attempts and now waits for replay.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedGeneration {
    pub id: i64,
    /// Telegram user the generation belongs to.
    pub user_id: i64,
    /// Chat where results and notices are delivered.
    pub chat_id: i64,
    /// The original request message, replied to on success.
    pub reply_to_message_id: i32,
    /// JSON snapshot of the request (prompt, quality, ratio, image refs,
    /// backend snapshot).
    pub payload: String,
    /// Verbatim text of the most recent provider error.
    pub last_error: String,
    pub retry_count: i64,
    pub created_at: String,
    pub last_retry_at: Option<String>,
}

/// A named prompt stored by a user for reuse.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedPrompt {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub content: String,
    /// At most one per user; used when an image arrives without text.
    pub is_default: bool,
    pub created_at: String,
}

/// One entry of a user's recent prompt history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPrompt {
    pub id: i64,
    pub user_id: i64,
    pub prompt: String,
    pub created_at: String,
}
