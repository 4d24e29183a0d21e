// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Kanva relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so unrecognized keys are
//! rejected at startup instead of being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level Kanva configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with `KANVA_*`
/// environment variable overrides. All sections default to sensible values;
/// only `telegram.bot_token` is required to actually serve.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KanvaConfig {
    /// Relay identity and logging settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Process-wide fallback generation backend. Users without a stored
    /// backend service fall back to this key.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Relay identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Display name of the relay.
    #[serde(default = "default_relay_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prompt used when a message carries images but no text and the user
    /// has no stored default prompt.
    #[serde(default = "default_prompt")]
    pub default_prompt: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            name: default_relay_name(),
            log_level: default_log_level(),
            default_prompt: default_prompt(),
        }
    }
}

fn default_relay_name() -> String {
    "kanva".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_prompt() -> String {
    "Redraw this image faithfully, keeping layout and style intact".to_string()
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token from @BotFather. Required for serving.
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// Fallback generation-backend configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key used when a user has no stored backend service.
    /// Absent means users must configure their own service.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override for the provider base URL. Empty means the provider default.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Override for the image model name.
    #[serde(default)]
    pub image_model: Option<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "data/kanva.db".to_string()
}
