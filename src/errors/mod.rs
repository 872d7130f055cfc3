// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! Error types with actionable diagnostics
//!
//! Every graph operation is check-then-act, so any of these errors means the
//! graph was left exactly as it was before the call.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for stepgraph operations
pub type StepgraphResult<T> = Result<T, StepgraphError>;

/// Main error type for stepgraph
#[derive(Error, Debug, Diagnostic)]
pub enum StepgraphError {
    // ─────────────────────────────────────────────────────────────────────────
    // Graph Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("A step with uuid '{uuid}' already exists")]
    #[diagnostic(
        code(stepgraph::duplicate_uuid),
        help("Leave the uuid empty to have a fresh one generated")
    )]
    DuplicateUuid { uuid: String },

    #[error("Step '{uuid}' not found in pipeline")]
    #[diagnostic(code(stepgraph::step_not_found))]
    StepNotFound { uuid: String },

    #[error("Step '{uuid}' cannot be connected to itself")]
    #[diagnostic(code(stepgraph::self_connection))]
    SelfConnection { uuid: String },

    #[error("Step '{source_uuid}' is already connected to step '{target}'")]
    #[diagnostic(code(stepgraph::duplicate_connection))]
    DuplicateConnection { source_uuid: String, target: String },

    #[error("Connecting '{source_uuid}' to '{target}' would create a cycle")]
    #[diagnostic(code(stepgraph::circular_dependency))]
    CircularDependency {
        source_uuid: String,
        target: String,
        path: Vec<String>,
        #[help]
        help: Option<String>,
    },

    #[error("Pipeline already contains a cycle: {}", .path.join(" → "))]
    #[diagnostic(
        code(stepgraph::existing_cycle),
        help("Remove one of these connections before adding new ones; 'stepgraph validate' lists every problem")
    )]
    ExistingCycle { path: Vec<String> },

    #[error("Pipeline is invalid: {count} error(s) found")]
    #[diagnostic(
        code(stepgraph::validation_failed),
        help("Run 'stepgraph validate' to list every problem")
    )]
    ValidationFailed { count: usize },

    // ─────────────────────────────────────────────────────────────────────────
    // Document Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline document not found: {path}")]
    #[diagnostic(
        code(stepgraph::document_not_found),
        help("Pass the document path explicitly or run from the pipeline directory")
    )]
    DocumentNotFound { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(stepgraph::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(stepgraph::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("Invalid argument: {message}")]
    #[diagnostic(code(stepgraph::invalid_argument))]
    InvalidArgument { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/Format Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(stepgraph::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(stepgraph::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(stepgraph::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(stepgraph::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for StepgraphError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for StepgraphError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for StepgraphError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for StepgraphError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl StepgraphError {
    pub fn step_not_found(uuid: &str) -> Self {
        Self::StepNotFound {
            uuid: uuid.to_string(),
        }
    }

    /// Create a cycle error whose help text spells out the cycle
    pub fn circular_dependency(source: &str, target: &str, path: Vec<String>) -> Self {
        let help = if path.is_empty() {
            None
        } else {
            Some(format!("Pipelines must be acyclic. Cycle: {}", path.join(" → ")))
        };

        Self::CircularDependency {
            source_uuid: source.to_string(),
            target: target.to_string(),
            path,
            help,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Whether the error comes from a rejected graph mutation rather than I/O
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateUuid { .. }
                | Self::StepNotFound { .. }
                | Self::SelfConnection { .. }
                | Self::DuplicateConnection { .. }
                | Self::CircularDependency { .. }
                | Self::ExistingCycle { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_help_lists_path() {
        let err = StepgraphError::circular_dependency(
            "c",
            "a",
            vec!["a".into(), "b".into(), "c".into(), "a".into()],
        );

        let help = err.help().map(|h| h.to_string()).unwrap_or_default();
        assert!(help.contains("a → b → c → a"));
        assert!(err.is_graph_error());
    }

    #[test]
    fn test_existing_cycle_message() {
        let err = StepgraphError::ExistingCycle {
            path: vec!["y".into(), "z".into(), "y".into()],
        };

        assert_eq!(err.to_string(), "Pipeline already contains a cycle: y → z → y");
        assert!(err.is_graph_error());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err: StepgraphError = io.into();

        assert!(matches!(err, StepgraphError::Io { .. }));
        assert!(!err.is_graph_error());
        assert!(err.to_string().contains("disk gone"));
    }
}
