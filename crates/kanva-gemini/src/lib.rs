// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini image-generation provider adapter.
//!
//! Covers endpoint construction for the Standard/Custom/Vertex backend
//! variants, aspect-ratio resolution from input images, and the HTTP
//! client implementing [`kanva_core::traits::ImageGenerator`].

pub mod aspect;
pub mod client;
pub mod endpoint;
pub mod types;

pub use client::GeminiClient;
pub use endpoint::{DEFAULT_GEMINI_BASE_URL, DEFAULT_IMAGE_MODEL, DEFAULT_VERTEX_BASE_URL, build_generate_url};
