// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation-request orchestration core.
//!
//! Ties the channel adapter, the persistent store, and the provider client
//! together: media-group aggregation, backend-service resolution, the
//! bounded attempt driver, the failed-generation replay scheduler, and the
//! user command layer.

pub mod commands;
pub mod driver;
pub mod engine;
pub mod generation;
pub mod media_groups;
pub mod params;
pub mod payload;
pub mod replay;
pub mod resolver;
pub mod shutdown;

use std::sync::Arc;

use kanva_config::KanvaConfig;
use kanva_core::KanvaError;
use kanva_core::traits::{ChannelPort, ImageGenerator};
use kanva_core::types::BackendConfig;
use kanva_gemini::GeminiClient;
use kanva_storage::Database;

pub use engine::Engine;
pub use media_groups::MediaGroupCache;

/// Builds a provider client for a resolved backend snapshot.
///
/// The indirection keeps the orchestration code testable with a fake
/// generator.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, backend: &BackendConfig) -> Result<Box<dyn ImageGenerator>, KanvaError>;
}

/// Production factory backed by [`GeminiClient`].
pub struct GeminiFactory;

impl ProviderFactory for GeminiFactory {
    fn create(&self, backend: &BackendConfig) -> Result<Box<dyn ImageGenerator>, KanvaError> {
        Ok(Box::new(GeminiClient::new(backend.clone())?))
    }
}

/// Shared dependencies threaded through the orchestration paths.
#[derive(Clone)]
pub struct EngineDeps {
    pub channel: Arc<dyn ChannelPort>,
    pub db: Arc<Database>,
    pub factory: Arc<dyn ProviderFactory>,
    pub media_groups: Arc<MediaGroupCache>,
    pub config: Arc<KanvaConfig>,
}
