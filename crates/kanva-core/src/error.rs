// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Kanva relay.

use thiserror::Error;

/// The primary error type used across all Kanva crates.
#[derive(Debug, Error)]
pub enum KanvaError {
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat-platform errors (send/edit/delete failure, rate limiting).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generation-provider errors (non-2xx response, malformed body).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The user has no backend service and no environment fallback exists.
    /// Surfaced immediately, never retried.
    #[error("no backend service configured")]
    NoServiceConfigured,

    /// A backend service record cannot produce a usable endpoint
    /// (e.g. Vertex without project or location). Never retried.
    #[error("invalid backend configuration: {0}")]
    InvalidBackendConfig(String),

    /// Fetching an input image failed. Terminal for the live attempt;
    /// `position` is the 1-based index of the failing image.
    #[error("failed to download input image {position}: {message}")]
    Download { position: usize, message: String },

    /// Operation exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KanvaError {
    /// True for errors caused by the user's configuration rather than by
    /// the provider or the network. These are surfaced immediately and
    /// never enqueued for replay.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            KanvaError::Config(_)
                | KanvaError::NoServiceConfigured
                | KanvaError::InvalidBackendConfig(_)
        )
    }
}
