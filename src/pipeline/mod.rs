// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Pipeline authoring and compilation
//!
//! This module defines the authoring tree (groups and tasks), the explicit
//! [`AuthoringContext`] that builds it, and the passes that validate a
//! finished [`Pipeline`]: topology resolution, OneOf validation and the
//! task dependency DAG.

mod context;
mod dag;
mod definition;
mod graph;
mod group;
mod oneof;
mod task;
mod topology;
mod validation;

pub use context::AuthoringContext;
pub use dag::TaskDag;
pub use definition::*;
pub use graph::{Pipeline, PipelineOutput};
pub use group::{Group, GroupId, GroupKind, GroupSpec, LoopItems, LoopSpec, Node, TaskId};
pub use oneof::{OneOf, OneOfId};
pub use task::{Task, TaskSpec};
pub use topology::Topology;
pub use validation::{compile, CompiledGraph, PipelineValidator};
