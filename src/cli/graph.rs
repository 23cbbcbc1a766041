// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Graph command - visualize pipeline as a graph

use miette::Result;
use std::path::PathBuf;

use super::GraphFormat;
use crate::pipeline::{compile, PipelineDefinition};

/// Run the graph command
pub fn run(pipeline_path: PathBuf, format: GraphFormat, _verbose: bool) -> Result<()> {
    // Check pipeline exists
    if !pipeline_path.exists() {
        return Err(miette::miette!(
            "Pipeline file not found: {}",
            pipeline_path.display()
        ));
    }

    let pipeline = PipelineDefinition::from_file(&pipeline_path)?.build()?;
    let compiled = compile(&pipeline)?;
    let dag = compiled.dag();

    // Output in requested format
    let output = match format {
        GraphFormat::Text => dag.to_text(&pipeline),
        GraphFormat::Dot => dag.to_dot(&pipeline),
        GraphFormat::Mermaid => dag.to_mermaid(&pipeline),
    };

    print!("{}", output);

    Ok(())
}
