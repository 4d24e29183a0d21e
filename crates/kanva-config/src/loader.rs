// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./kanva.toml` > `~/.config/kanva/kanva.toml`
//! > `/etc/kanva/kanva.toml`, with environment variable overrides via the
//! `KANVA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::KanvaConfig;

/// Top-level config sections, used to split `KANVA_SECTION_FIELD` env keys.
const SECTIONS: [&str; 4] = ["relay", "telegram", "gemini", "storage"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier): compiled defaults, then
/// `/etc/kanva/kanva.toml`, `~/.config/kanva/kanva.toml`, `./kanva.toml`,
/// and finally `KANVA_*` environment variables.
pub fn load_config() -> Result<KanvaConfig, figment::Error> {
    let user_file = dirs::config_dir()
        .map(|d| d.join("kanva/kanva.toml"))
        .unwrap_or_default();
    let files = [
        Path::new("/etc/kanva/kanva.toml"),
        user_file.as_path(),
        Path::new("kanva.toml"),
    ];
    let mut figment = defaults();
    for file in files {
        figment = figment.merge(Toml::file(file));
    }
    extract_with_env(figment)
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<KanvaConfig, figment::Error> {
    defaults().merge(Toml::string(toml_content)).extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KanvaConfig, figment::Error> {
    extract_with_env(defaults().merge(Toml::file(path)))
}

fn defaults() -> Figment {
    Figment::from(Serialized::defaults(KanvaConfig::default()))
}

fn extract_with_env(figment: Figment) -> Result<KanvaConfig, figment::Error> {
    figment.merge(env_provider()).extract()
}

/// Environment variable provider with explicit section mapping.
///
/// The section prefix alone becomes a dot, so underscores inside field
/// names survive: `KANVA_TELEGRAM_BOT_TOKEN` maps to `telegram.bot_token`,
/// not `telegram.bot.token` (which `Env::split("_")` would produce).
fn env_provider() -> Env {
    Env::prefixed("KANVA_").map(|key| {
        // Figment hands over the key as the process set it; normalize
        // before matching sections.
        let key = key.as_str().to_ascii_lowercase();
        SECTIONS
            .iter()
            .find_map(|section| {
                key.strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|field| format!("{section}.{field}"))
            })
            .unwrap_or(key)
            .into()
    })
}
