// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Error types for graph authoring and compilation
//!
//! Every structural violation is reported synchronously, either at the point
//! of construction or during the single post-build compile pass. Each error
//! carries the task and group names involved so it can be located without
//! re-deriving the graph.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipegraph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Flat classification of [`GraphError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidName,
    ConflictingChannelSource,
    TypeMismatch,
    InvalidType,
    InvalidOperand,
    ArityViolation,
    MissingConditionAncestor,
    NonExclusiveBranches,
    LoopNotAllowed,
    NoActiveScope,
    NestedPipelineNotSupported,
    UnclosedGroup,
    MalformedPlaceholder,
    UnknownTask,
    UnknownDependency,
    UnknownOutput,
    CircularDependency,
    IllegalDependency,
    Definition,
    Io,
}

/// Main error type for pipegraph
#[derive(Error, Debug, Diagnostic)]
pub enum GraphError {
    // ─────────────────────────────────────────────────────────────────────────
    // Channel Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid name '{name}': {reason}")]
    #[diagnostic(
        code(pipegraph::invalid_name),
        help("Names must start with a letter and contain only letters, digits, spaces, '_' and '-'")
    )]
    InvalidName { name: String, reason: String },

    #[error("Channel '{name}' declares both producing task '{task}' and a literal value")]
    #[diagnostic(
        code(pipegraph::conflicting_channel_source),
        help("A channel is either a task output or a literal/pipeline input, never both")
    )]
    ConflictingChannelSource { name: String, task: String },

    #[error("Type mismatch: {reason}")]
    #[diagnostic(code(pipegraph::type_mismatch))]
    TypeMismatch { reason: String },

    #[error("Channel type '{channel_type}' cannot be encoded in a placeholder")]
    #[diagnostic(
        code(pipegraph::invalid_type),
        help("Compound types may only use a single key path of word characters")
    )]
    InvalidType { channel_type: String },

    #[error("Malformed channel placeholder at offset {offset}: {reason}")]
    #[diagnostic(
        code(pipegraph::malformed_placeholder),
        help("Expected {{{{channel:task=<task>;name=<name>;type=<type>;}}}}")
    )]
    MalformedPlaceholder { offset: usize, reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // OneOf Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("OneOf outputs must all be task outputs: {reason}")]
    #[diagnostic(code(pipegraph::invalid_operand))]
    InvalidOperand { reason: String },

    #[error("Expected two or more task outputs in OneOf, got {count}")]
    #[diagnostic(code(pipegraph::arity_violation))]
    ArityViolation { count: usize },

    #[error("OneOf output from task '{task}' is not defined within a Condition group")]
    #[diagnostic(
        code(pipegraph::missing_condition_ancestor),
        help("Every OneOf branch must be gated by its own Condition")
    )]
    MissingConditionAncestor { task: String },

    #[error(
        "OneOf outputs must be mutually exclusive: tasks {tasks:?} are within the same Condition group '{group}'"
    )]
    #[diagnostic(
        code(pipegraph::non_exclusive_branches),
        help("Move each branch into a distinct Condition group")
    )]
    NonExclusiveBranches { group: String, tasks: Vec<String> },

    #[error("OneOf output from task '{task}' cannot be defined within ParallelFor group '{group}'")]
    #[diagnostic(
        code(pipegraph::loop_not_allowed),
        help("A looped branch may produce zero, one or many values")
    )]
    LoopNotAllowed { task: String, group: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Authoring Scope Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("No active scope: {operation} called outside a pipeline group")]
    #[diagnostic(code(pipegraph::no_active_scope))]
    NoActiveScope { operation: String },

    #[error("Cannot begin pipeline '{requested}' while pipeline '{active}' is being built")]
    #[diagnostic(
        code(pipegraph::nested_pipeline),
        help("Finish the active pipeline before starting another one")
    )]
    NestedPipelineNotSupported { active: String, requested: String },

    #[error("Group '{group}' was never exited")]
    #[diagnostic(code(pipegraph::unclosed_group))]
    UnclosedGroup { group: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Topology Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Task '{task}' not found in pipeline")]
    #[diagnostic(code(pipegraph::unknown_task))]
    UnknownTask {
        task: String,
        #[help]
        help: Option<String>,
    },

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    #[diagnostic(
        code(pipegraph::unknown_dependency),
        help("Check that '{dependency}' is defined in your pipeline")
    )]
    UnknownDependency { task: String, dependency: String },

    #[error("Task '{task}' consumes output '{output}' which task '{producer}' does not declare")]
    #[diagnostic(code(pipegraph::unknown_output))]
    UnknownOutput {
        task: String,
        producer: String,
        output: String,
    },

    #[error("Circular dependency detected")]
    #[diagnostic(
        code(pipegraph::circular_dependency),
        help("Review task inputs and 'after' lists to remove the cycle")
    )]
    CircularDependency { tasks: Vec<String> },

    #[error(
        "Illegal dependency across groups: task '{task}' depends on '{upstream}' within {kind} group '{group}'"
    )]
    #[diagnostic(
        code(pipegraph::illegal_dependency),
        help("A downstream task may only consume outputs from its own or enclosing Condition/ParallelFor groups; use a OneOf to aggregate conditional branches")
    )]
    IllegalDependency {
        task: String,
        upstream: String,
        group: String,
        kind: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Definition / IO Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid pipeline definition: {reason}")]
    #[diagnostic(code(pipegraph::invalid_definition))]
    Definition {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(pipegraph::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(pipegraph::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(pipegraph::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(pipegraph::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(pipegraph::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for GraphError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for GraphError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for GraphError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl GraphError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName { .. } => ErrorKind::InvalidName,
            Self::ConflictingChannelSource { .. } => ErrorKind::ConflictingChannelSource,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::InvalidType { .. } => ErrorKind::InvalidType,
            Self::MalformedPlaceholder { .. } => ErrorKind::MalformedPlaceholder,
            Self::InvalidOperand { .. } => ErrorKind::InvalidOperand,
            Self::ArityViolation { .. } => ErrorKind::ArityViolation,
            Self::MissingConditionAncestor { .. } => ErrorKind::MissingConditionAncestor,
            Self::NonExclusiveBranches { .. } => ErrorKind::NonExclusiveBranches,
            Self::LoopNotAllowed { .. } => ErrorKind::LoopNotAllowed,
            Self::NoActiveScope { .. } => ErrorKind::NoActiveScope,
            Self::NestedPipelineNotSupported { .. } => ErrorKind::NestedPipelineNotSupported,
            Self::UnclosedGroup { .. } => ErrorKind::UnclosedGroup,
            Self::UnknownTask { .. } => ErrorKind::UnknownTask,
            Self::UnknownDependency { .. } => ErrorKind::UnknownDependency,
            Self::UnknownOutput { .. } => ErrorKind::UnknownOutput,
            Self::CircularDependency { .. } => ErrorKind::CircularDependency,
            Self::IllegalDependency { .. } => ErrorKind::IllegalDependency,
            Self::Definition { .. } | Self::Yaml { .. } | Self::Json { .. } | Self::Toml { .. } => {
                ErrorKind::Definition
            }
            Self::FileReadError { .. } | Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Create an invalid name error
    pub fn invalid_name(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(reason: impl Into<String>) -> Self {
        Self::TypeMismatch {
            reason: reason.into(),
        }
    }

    /// Create an unknown task error with context
    pub fn unknown_task_in(task: &str, context: &str) -> Self {
        Self::UnknownTask {
            task: task.to_string(),
            help: Some(format!(
                "Referenced by {}. Declare the task before referencing it.",
                context
            )),
        }
    }

    /// Create a definition error with a help line
    pub fn definition(reason: impl Into<String>, help: Option<String>) -> Self {
        Self::Definition {
            reason: reason.into(),
            help,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            GraphError::invalid_name("1task", "must start with a letter").kind(),
            ErrorKind::InvalidName
        );
        assert_eq!(
            GraphError::ArityViolation { count: 1 }.kind(),
            ErrorKind::ArityViolation
        );
        let yaml: GraphError = serde_yaml::from_str::<u32>("[").unwrap_err().into();
        assert_eq!(yaml.kind(), ErrorKind::Definition);
    }

    #[test]
    fn test_messages_name_the_culprits() {
        let err = GraphError::NonExclusiveBranches {
            group: "c1".into(),
            tasks: vec!["t1".into(), "t2".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("c1"));
        assert!(msg.contains("t1"));
        assert!(msg.contains("t2"));
    }
}
