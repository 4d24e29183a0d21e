// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostic rendering for configuration errors.
//!
//! Converts Figment deserialization errors and post-load validation
//! failures into miette diagnostics printed at startup.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error suitable for diagnostic rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A TOML parse or deserialization error reported by Figment.
    #[error("failed to load configuration: {message}")]
    #[diagnostic(
        code(kanva::config::parse),
        help("check kanva.toml and any KANVA_* environment overrides")
    )]
    Parse {
        /// Figment's rendered error, including the offending key path.
        message: String,
    },

    /// A semantic validation error for a loaded value.
    #[error("validation error: {message}")]
    #[diagnostic(code(kanva::config::validation))]
    Validation { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Parse {
            message: err.to_string(),
        }
    }
}

/// Print all collected configuration errors to stderr via miette.
pub fn render_errors(errors: &[ConfigError]) {
    for err in errors {
        eprintln!("{:?}", miette::Report::msg(err.to_string()));
    }
}
