// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! # pipegraph - pipeline graph model
//!
//! `pipegraph` is the graph-construction core of a pipeline compiler: typed
//! channels between tasks, nested control-flow groups, and compile-time
//! checks of the resulting structure.
//!
//! ## Features
//!
//! - **Channels** - typed references that survive embedding in strings
//! - **Groups** - Condition, ParallelFor and ExitHandler scopes under one Root
//! - **Topology** - ancestor chains for every task and group
//! - **OneOf** - mutually exclusive branch outputs checked at compile time
//!
//! ## Quick Start
//!
//! ```
//! use pipegraph::channel::{condition, Channel};
//! use pipegraph::pipeline::{compile, AuthoringContext, GroupSpec, PipelineOutput, TaskSpec};
//!
//! # fn main() -> pipegraph::GraphResult<()> {
//! let mut ctx = AuthoringContext::new();
//! ctx.begin_pipeline("coin")?;
//! ctx.add_task(TaskSpec::new("flip", "flip-coin").output("out", "String"))?;
//! let face = Channel::create("out", "String", Some("flip"), None)?;
//!
//! for (group, task, side) in [("heads", "t1", "heads"), ("tails", "t2", "tails")] {
//!     ctx.scoped(
//!         Some(group),
//!         GroupSpec::Condition(condition::eq(&face, side)?),
//!         |ctx| ctx.add_task(TaskSpec::new(task, "print").output("out", "String")),
//!     )?;
//! }
//!
//! let result = ctx.one_of(vec![
//!     Channel::create("out", "String", Some("t1"), None)?,
//!     Channel::create("out", "String", Some("t2"), None)?,
//! ])?;
//! ctx.set_output("result", PipelineOutput::OneOf(result))?;
//!
//! let pipeline = ctx.finish()?;
//! let compiled = compile(&pipeline)?;
//! assert_eq!(compiled.parent_groups_of("t1").unwrap(), &["heads", "coin"]);
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod cli;
pub mod errors;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use channel::{Channel, ChannelType};
pub use errors::{ErrorKind, GraphError, GraphResult};
pub use pipeline::{compile, AuthoringContext, CompiledGraph, Pipeline, TaskSpec};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
