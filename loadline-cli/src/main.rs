// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! loadline CLI
//!
//! Measures push/pull latency against an OCI registry over a sweep of
//! synthetic image sizes and layer counts.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use loadline_core::LoadlineError;
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod commands;
mod keychain;
mod oci;

/// loadline - OCI registry push/pull latency benchmark
#[derive(Parser)]
#[command(name = "loadline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (YAML); flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate random images and push/pull
    Roundtrip(commands::roundtrip::RoundtripArgs),
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Dispatch to command handlers
    let result = match cli.command {
        Commands::Roundtrip(args) => commands::roundtrip::execute(cli.config.as_deref(), args),
    };

    if let Err(e) = result {
        report_failure(&e, &mut std::io::stderr());
        std::process::exit(1);
    }
}

/// Emit the one diagnostic line for a fatal error. Falls back to writing
/// directly when the log filter would swallow it.
fn report_failure(err: &LoadlineError, fallback: &mut impl Write) {
    if tracing::enabled!(Level::ERROR) {
        tracing::error!(operation = err.operation(), "{}", err);
    } else {
        let _ = writeln!(fallback, "Error ({}): {}", err.operation(), err);
    }
}
