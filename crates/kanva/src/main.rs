// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kanva - a Telegram relay for Gemini image generation.
//!
//! This is the binary entry point for the Kanva relay.

use clap::{Parser, Subcommand};

mod serve;

/// Kanva - a Telegram relay for Gemini image generation.
#[derive(Parser, Debug)]
#[command(name = "kanva", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay: long polling, the event engine, and the
    /// background retry scheduler.
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match kanva_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            kanva_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(err) = serve::run_serve(config).await {
                eprintln!("kanva serve failed: {err}");
                std::process::exit(1);
            }
        }
        None => {
            println!("kanva: use --help for available commands");
        }
    }
}
