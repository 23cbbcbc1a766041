// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Channels command - decode placeholders found in text

use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use serde_json::json;

use crate::channel::{decode_all, Channel};
use crate::utils::print_info;

/// Run the channels command
pub fn run(text: &str, as_json: bool, verbose: bool) -> Result<()> {
    let channels = decode_all(text)?;

    if as_json {
        let entries: Vec<_> = channels.iter().map(describe).collect();
        println!("{}", serde_json::to_string_pretty(&entries).into_diagnostic()?);
        return Ok(());
    }

    if channels.is_empty() {
        println!("{}", "No channel placeholders found".dimmed());
        return Ok(());
    }

    for channel in &channels {
        let source = match channel.producing_task() {
            Some(task) => format!("output of {}", task),
            None => "pipeline input".to_string(),
        };
        let kind = if channel.is_parameter() { "parameter" } else { "artifact" };
        print_info(&format!(
            "{} : {} ({}, {})",
            channel.name().bold(),
            channel.channel_type(),
            kind,
            source
        ));
        if verbose {
            println!("      {}", channel.encode().dimmed());
        }
    }

    Ok(())
}

fn describe(channel: &Channel) -> serde_json::Value {
    let kind = if channel.is_parameter() { "parameter" } else { "artifact" };
    json!({
        "name": channel.name(),
        "type": channel.channel_type(),
        "task": channel.producing_task(),
        "kind": kind,
        "placeholder": channel.encode(),
    })
}
