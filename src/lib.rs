// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! # stepgraph - Pipeline Step Graph
//!
//! `stepgraph` models the step graph of a data pipeline: steps backed by
//! scripts or notebooks, directed connections between them, and the rules
//! that keep the graph sound.
//!
//! ## Features
//!
//! - **Cycle-safe editing** - connections that would close a cycle are refused
//! - **Validation** - notebooks shared between steps, dangling connections
//! - **Persistence** - JSON/YAML pipeline documents without editor-only state
//! - **Diagrams** - text, DOT and Mermaid output
//!
//! ## Example
//!
//! ```
//! use stepgraph::{PipelineGraph, StepDraft};
//!
//! let mut graph = PipelineGraph::new();
//! let load = graph.add_step(StepDraft::new("Load", "load.ipynb")).unwrap().uuid().to_string();
//! let train = graph.add_step(StepDraft::new("Train", "train.py")).unwrap().uuid().to_string();
//!
//! graph.connect(&load, &train).unwrap();
//! assert!(graph.connect(&train, &load).is_err());
//! assert!(graph.validate().is_valid());
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use config::StepgraphConfig;
pub use errors::{StepgraphError, StepgraphResult};
pub use pipeline::{GraphDocument, PipelineGraph, Step, StepDraft, ValidationResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
