// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Validate command - build and compile a pipeline definition

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::errors::{GraphError, RecoverySuggestion};
use crate::pipeline::{compile, PipelineDefinition};
use crate::utils::{print_bullet, print_error, print_section, print_success, print_warning};

/// Run the validate command
pub fn run(pipeline_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    // Check pipeline exists
    if !pipeline_path.exists() {
        return Err(miette::miette!(
            "Pipeline file not found: {}",
            pipeline_path.display()
        ));
    }

    let definition = PipelineDefinition::from_file(&pipeline_path)
        .map_err(|e| fail("Failed to parse pipeline", e))?;
    print_success("Definition parsed");

    let pipeline = definition
        .build()
        .map_err(|e| fail("Failed to author pipeline", e))?;
    print_success(&format!(
        "Authored {} tasks in {} groups",
        pipeline.tasks().len(),
        pipeline.groups().len()
    ));

    let compiled = compile(&pipeline).map_err(|e| fail("Compilation failed", e))?;
    print_success("Topology, dependencies and OneOf outputs are consistent");

    if compiled.has_warnings() {
        print_section("Warnings");
        for warning in compiled.warnings() {
            print_warning(warning);
        }
    }

    if verbose {
        print_section("Groups");
        for line in compiled.outline().lines() {
            println!("  {}", line);
        }

        if !compiled.one_ofs().is_empty() {
            print_section("OneOf outputs");
            for one_of in compiled.one_ofs() {
                print_bullet(&format!(
                    "{} of [{}]",
                    one_of.channel_type(),
                    one_of.branch_tasks().join(", ")
                ));
            }
        }

        print_section("Execution order");
        print_bullet(&compiled.execution_order().join(" → "));
    }

    println!();
    if compiled.has_warnings() {
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
    }
    Ok(())
}

/// Report a failed step with its recovery hints and turn it into a report
fn fail(step: &str, error: GraphError) -> miette::Report {
    print_error(step);
    if let Some(suggestion) = RecoverySuggestion::for_error(&error) {
        println!();
        println!("{}", suggestion);
    }
    println!();
    error.into()
}
