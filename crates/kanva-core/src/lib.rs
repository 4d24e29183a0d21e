// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Kanva relay.
//!
//! This crate provides the error type, shared domain types, and the port
//! traits used throughout the Kanva workspace. The channel adapter and the
//! provider client implement traits defined here; the engine depends only
//! on these seams.

pub mod error;
pub mod traits;
pub mod types;

pub use error::KanvaError;
pub use traits::{ChannelPort, ImageGenerator};
pub use types::{
    BackendConfig, BackendService, BackendVariant, DownloadedImage, GenerationRequest,
    ImageResult, InboundEvent, Quality, ReplyContext,
};
