// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! Pipeline validation
//!
//! Checks structural rules that a graph may break after being loaded from a
//! document: notebook files shared between steps, dangling or repeated
//! connections, and cycles.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::definition::{StepKind, DEFAULT_NOTEBOOK_EXTENSIONS};
use super::graph::PipelineGraph;

/// How many file-sharing conflicts to report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationPolicy {
    /// Report every conflicting pair
    #[default]
    CollectAll,
    /// Stop at the first conflicting pair
    FirstError,
}

impl std::str::FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "collect-all" | "all" => Ok(Self::CollectAll),
            "first-error" | "first" => Ok(Self::FirstError),
            _ => Err(format!("Unknown validation policy: {}", s)),
        }
    }
}

/// Options controlling validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    pub policy: ValidationPolicy,
    pub notebook_extensions: Vec<String>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            policy: ValidationPolicy::default(),
            notebook_extensions: DEFAULT_NOTEBOOK_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Identity of a step as shown in validation messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRef {
    pub uuid: String,
    pub title: String,
}

impl fmt::Display for StepRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({})", self.title, self.uuid)
    }
}

/// A rule the graph breaks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Two notebook steps use the same file
    DuplicateNotebookFile {
        file_path: String,
        first: StepRef,
        second: StepRef,
    },
    /// A connection names a step that does not exist
    DanglingConnection { step: StepRef, source: String },
    /// The same source appears twice in an incoming list
    RepeatedConnection { step: StepRef, source: String },
    /// The graph contains a cycle
    Cycle { path: Vec<String> },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNotebookFile {
                file_path,
                first,
                second,
            } => write!(
                f,
                "Notebook steps {} and {} both use '{}'. A notebook can back only one step.",
                first, second, file_path
            ),
            Self::DanglingConnection { step, source } => {
                write!(f, "Step {} has a connection from unknown step '{}'", step, source)
            }
            Self::RepeatedConnection { step, source } => {
                write!(f, "Step {} lists '{}' as input more than once", step, source)
            }
            Self::Cycle { path } => write!(f, "Circular dependency: {}", path.join(" → ")),
        }
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Pipeline graph validator
pub struct GraphValidator;

impl GraphValidator {
    /// Validate a graph
    pub fn validate(graph: &PipelineGraph, options: &ValidationOptions) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_notebook_files(graph, options, &mut result);
        Self::validate_connections(graph, &mut result);

        if let Some(path) = graph.find_cycle() {
            result.add_error(ValidationError::Cycle { path });
        }

        for step in graph.steps() {
            if step.file_path.trim().is_empty() {
                result.add_warning(&format!("Step {} has no file assigned", step.label()));
            }
        }

        tracing::debug!(
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "validated pipeline"
        );
        result
    }

    /// Pairwise scan of notebook steps for a shared file
    fn validate_notebook_files(
        graph: &PipelineGraph,
        options: &ValidationOptions,
        result: &mut ValidationResult,
    ) {
        let notebooks: Vec<_> = graph
            .steps()
            .filter(|s| s.kind(&options.notebook_extensions) == StepKind::Notebook)
            .collect();

        for (i, first) in notebooks.iter().enumerate() {
            for second in &notebooks[i + 1..] {
                if first.file_path != second.file_path || first.uuid() == second.uuid() {
                    continue;
                }

                result.add_error(ValidationError::DuplicateNotebookFile {
                    file_path: first.file_path.clone(),
                    first: StepRef {
                        uuid: first.uuid().to_string(),
                        title: first.title.clone(),
                    },
                    second: StepRef {
                        uuid: second.uuid().to_string(),
                        title: second.title.clone(),
                    },
                });

                if options.policy == ValidationPolicy::FirstError {
                    return;
                }
            }
        }
    }

    fn validate_connections(graph: &PipelineGraph, result: &mut ValidationResult) {
        for step in graph.steps() {
            let mut seen = HashSet::new();
            for source in step.incoming_connections() {
                let step_ref = || StepRef {
                    uuid: step.uuid().to_string(),
                    title: step.title.clone(),
                };

                if !graph.contains(source) {
                    result.add_error(ValidationError::DanglingConnection {
                        step: step_ref(),
                        source: source.clone(),
                    });
                } else if !seen.insert(source.as_str()) {
                    result.add_error(ValidationError::RepeatedConnection {
                        step: step_ref(),
                        source: source.clone(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{GraphDocument, StepDraft};

    fn graph_of(steps: &[(&str, &str)]) -> PipelineGraph {
        let mut graph = PipelineGraph::new();
        for (uuid, file) in steps {
            graph
                .add_step(StepDraft::new(format!("Step {}", uuid), *file).with_uuid(*uuid))
                .unwrap();
        }
        graph
    }

    #[test]
    fn test_duplicate_notebook_file() {
        let graph = graph_of(&[("a", "shared.ipynb"), ("b", "shared.ipynb"), ("c", "other.ipynb")]);

        let result = graph.validate();
        assert!(!result.is_valid());
        assert_eq!(result.errors.len(), 1);

        match &result.errors[0] {
            ValidationError::DuplicateNotebookFile {
                file_path,
                first,
                second,
            } => {
                assert_eq!(file_path, "shared.ipynb");
                assert_eq!(first.uuid, "a");
                assert_eq!(second.uuid, "b");
                assert_eq!(first.title, "Step a");
            }
            other => panic!("unexpected error {:?}", other),
        }

        let message = result.errors[0].to_string();
        assert!(message.contains("'Step a' (a)"));
        assert!(message.contains("'Step b' (b)"));
    }

    #[test]
    fn test_shared_script_file_is_allowed() {
        let graph = graph_of(&[("a", "run.py"), ("b", "run.py"), ("c", "run.sh"), ("d", "run.sh")]);

        let result = graph.validate();
        assert!(result.is_valid());
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_collect_all_policy() {
        let graph = graph_of(&[
            ("a", "x.ipynb"),
            ("b", "x.ipynb"),
            ("c", "x.ipynb"),
            ("d", "y.ipynb"),
            ("e", "y.ipynb"),
        ]);

        let result = graph.validate();
        // a-b, a-c, b-c, d-e
        assert_eq!(result.errors.len(), 4);
    }

    #[test]
    fn test_first_error_policy() {
        let graph = graph_of(&[
            ("a", "x.ipynb"),
            ("b", "x.ipynb"),
            ("c", "y.ipynb"),
            ("d", "y.ipynb"),
        ]);

        let options = ValidationOptions {
            policy: ValidationPolicy::FirstError,
            ..ValidationOptions::default()
        };
        let result = graph.validate_with(&options);

        assert!(!result.is_valid());
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(
            &result.errors[0],
            ValidationError::DuplicateNotebookFile { first, .. } if first.uuid == "a"
        ));
    }

    #[test]
    fn test_custom_notebook_extensions() {
        let graph = graph_of(&[("a", "doc.rmd"), ("b", "doc.rmd")]);
        assert!(graph.validate().is_valid());

        let options = ValidationOptions {
            notebook_extensions: vec!["rmd".into()],
            ..ValidationOptions::default()
        };
        assert!(!graph.validate_with(&options).is_valid());
    }

    #[test]
    fn test_loaded_document_problems() {
        let doc = GraphDocument::from_json(
            r#"{
                "steps": {
                    "a": { "uuid": "a", "title": "A", "file_path": "a.py", "incoming_connections": ["b"] },
                    "b": { "uuid": "b", "title": "B", "file_path": "b.py", "incoming_connections": ["a", "a"] },
                    "c": { "uuid": "c", "title": "C", "file_path": "", "incoming_connections": ["ghost"] }
                }
            }"#,
        )
        .unwrap();
        let graph = PipelineGraph::from_document(doc);

        let result = graph.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::DanglingConnection { source, .. } if source == "ghost")));
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::RepeatedConnection { step, .. } if step.uuid == "b")));
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::Cycle { .. })));
        assert!(result.warnings.iter().any(|w| w.contains("no file")));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("first-error".parse::<ValidationPolicy>(), Ok(ValidationPolicy::FirstError));
        assert_eq!("ALL".parse::<ValidationPolicy>(), Ok(ValidationPolicy::CollectAll));
        assert!("sometimes".parse::<ValidationPolicy>().is_err());
    }
}
