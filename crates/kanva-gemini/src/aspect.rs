// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aspect-ratio resolution.
//!
//! One pure function decides the output ratio for both the live request
//! path and queue replay, so a replay reproduces the original decision.

use std::io::Cursor;

use image::ImageReader;
use kanva_core::types::DownloadedImage;
use tracing::debug;

/// Ratio used when there is no explicit request and no usable input image.
pub const DEFAULT_RATIO: &str = "1:1";

/// Largest relative error against the measured ratio that still counts as
/// a catalog match.
const MATCH_THRESHOLD: f64 = 0.1;

/// Output ratios the provider accepts.
const RATIO_CATALOG: &[(&str, f64)] = &[
    ("1:1", 1.0),
    ("2:3", 2.0 / 3.0),
    ("3:2", 3.0 / 2.0),
    ("3:4", 3.0 / 4.0),
    ("4:3", 4.0 / 3.0),
    ("4:5", 4.0 / 5.0),
    ("5:4", 5.0 / 4.0),
    ("9:16", 9.0 / 16.0),
    ("16:9", 16.0 / 9.0),
    ("21:9", 21.0 / 9.0),
];

/// True when `ratio` names a catalog entry, used to validate explicit
/// user input upstream.
pub fn is_supported_ratio(ratio: &str) -> bool {
    RATIO_CATALOG.iter().any(|(name, _)| *name == ratio)
}

/// All catalog ratio names, for help text.
pub fn supported_ratios() -> Vec<&'static str> {
    RATIO_CATALOG.iter().map(|(name, _)| *name).collect()
}

/// Resolve the effective aspect ratio for a request.
///
/// Precedence:
/// 1. A non-empty explicit ratio is returned unchanged.
/// 2. With input images, the first image's measured width/height is matched
///    against the catalog; a best match further than 10% relative error
///    yields `None` ("let the provider decide") rather than a poor match.
/// 3. No explicit ratio and no image (or an undecodable image) yields the
///    square default.
pub fn resolve(explicit: Option<&str>, images: &[DownloadedImage]) -> Option<String> {
    if let Some(ratio) = explicit {
        let ratio = ratio.trim();
        if !ratio.is_empty() {
            return Some(ratio.to_string());
        }
    }

    let Some(first) = images.first() else {
        return Some(DEFAULT_RATIO.to_string());
    };

    match measure(&first.data) {
        Some((width, height)) => nearest_catalog_ratio(width, height),
        None => {
            debug!("input image dimensions unreadable, using default ratio");
            Some(DEFAULT_RATIO.to_string())
        }
    }
}

/// Decode only the image header to get pixel dimensions.
fn measure(data: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// The catalog entry nearest to `width/height`, or `None` when even the
/// best entry misses by more than the threshold.
fn nearest_catalog_ratio(width: u32, height: u32) -> Option<String> {
    if width == 0 || height == 0 {
        return Some(DEFAULT_RATIO.to_string());
    }
    let actual = f64::from(width) / f64::from(height);

    let mut best_name = DEFAULT_RATIO;
    let mut best_diff = f64::MAX;
    for (name, ratio) in RATIO_CATALOG {
        let diff = (actual - ratio).abs();
        if diff < best_diff {
            best_diff = diff;
            best_name = name;
        }
    }

    if best_diff / actual > MATCH_THRESHOLD {
        None
    } else {
        Some(best_name.to_string())
    }
}
