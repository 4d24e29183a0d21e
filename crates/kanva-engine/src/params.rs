// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inline `@` parameter parsing.
//!
//! Users tune a request by embedding tokens in the message text:
//! `@16:9` picks an aspect ratio, `@4K` a quality tier, and `@s` restricts
//! a media-group message to its own photo. Everything else is the prompt.

use std::str::FromStr;

use kanva_core::types::Quality;
use kanva_gemini::aspect;

/// Outcome of scanning one message text.
///
/// An invalid ratio or quality token is consumed (it never leaks into the
/// prompt) and reported via the matching error field so the caller can
/// answer with usage help instead of generating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedParams {
    pub prompt: String,
    pub aspect_ratio: Option<String>,
    pub quality: Option<Quality>,
    /// `@s`: use only the message's own photo even inside a media group.
    pub single_image: bool,
    /// The offending token of a ratio-shaped `@` parameter that is not in
    /// the supported catalog.
    pub ratio_error: Option<String>,
    /// The offending token of a quality-shaped `@` parameter that is not a
    /// known tier.
    pub quality_error: Option<String>,
}

/// Split a message into prompt text and `@` parameters.
///
/// A token counts as ratio-shaped when it contains `:` and quality-shaped
/// when it ends in `k`/`K`; other `@` tokens are left in the prompt
/// untouched (handles like `@someone` are common in groups). Later valid
/// tokens of the same kind win.
pub fn parse(text: &str) -> ParsedParams {
    let mut params = ParsedParams::default();
    let mut prompt_words: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        let Some(value) = word.strip_prefix('@') else {
            prompt_words.push(word);
            continue;
        };

        if value.eq_ignore_ascii_case("s") {
            params.single_image = true;
            continue;
        }

        if value.contains(':') {
            if aspect::is_supported_ratio(value) {
                params.aspect_ratio = Some(value.to_string());
            } else {
                params.ratio_error = Some(value.to_string());
            }
            continue;
        }

        if is_quality_shaped(value) {
            match Quality::from_str(value) {
                Ok(q) => params.quality = Some(q),
                Err(_) => params.quality_error = Some(value.to_string()),
            }
            continue;
        }

        prompt_words.push(word);
    }

    params.prompt = prompt_words.join(" ");
    params
}

/// Digits followed by a trailing `k`/`K`, e.g. `4K` or `8k`. Words that
/// merely end in `k` (handles, normal prose) are not parameters.
fn is_quality_shaped(value: &str) -> bool {
    let Some(digits) = value
        .strip_suffix('K')
        .or_else(|| value.strip_suffix('k'))
    else {
        return false;
    };
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}
