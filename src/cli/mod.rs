// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for pipegraph.

pub mod channels;
pub mod graph;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Pipeline graph checker
///
/// Load pipeline definitions, validate their group structure and OneOf
/// outputs, and render the task graph.
#[derive(Parser, Debug)]
#[clap(
    name = "pipegraph",
    version,
    about = "Validate and visualize pipeline graphs with conditional, loop and exit-handler groups",
    long_about = None,
    after_help = "Examples:\n\
        pipegraph validate pipeline.yaml          Check a pipeline definition\n\
        pipegraph graph pipeline.yaml -f mermaid  Render the task graph\n\
        pipegraph channels '{{channel:task=t;name=out;type=String;}}'\n\n\
        See 'pipegraph <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and compile a pipeline definition
    Validate {
        /// Pipeline definition (.yaml, .yml, .json or .toml)
        #[clap(default_value = "pipeline.yaml")]
        pipeline: PathBuf,
    },

    /// Show pipeline as a graph
    Graph {
        /// Pipeline definition (.yaml, .yml, .json or .toml)
        #[clap(default_value = "pipeline.yaml")]
        pipeline: PathBuf,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// Decode channel placeholders embedded in text
    Channels {
        /// Text containing placeholders
        text: String,

        /// Print channels as JSON
        #[clap(long)]
        json: bool,
    },
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}
