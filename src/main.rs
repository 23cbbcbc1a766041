// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! pipegraph - pipeline graph checker
//!
//! Validate and visualize pipeline definitions.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipegraph::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipegraph=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Validate { pipeline } => pipegraph::cli::validate::run(pipeline, cli.verbose),
        Commands::Graph { pipeline, format } => {
            pipegraph::cli::graph::run(pipeline, format, cli.verbose)
        }
        Commands::Channels { text, json } => {
            pipegraph::cli::channels::run(&text, json, cli.verbose)
        }
    }
}
