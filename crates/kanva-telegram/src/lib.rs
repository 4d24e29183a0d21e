// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for the Kanva relay.
//!
//! Implements [`kanva_core::traits::ChannelPort`] for the Telegram Bot API
//! via teloxide, and normalizes long-polled updates into
//! [`kanva_core::types::InboundEvent`]s consumed by the engine.

pub mod channel;
pub mod ingest;

pub use channel::TelegramChannel;
pub use ingest::start_polling;
