// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! Pipeline graph model
//!
//! Steps, their connections, validation rules and the persisted document
//! format.

mod dag;
mod definition;
mod graph;
mod validation;

pub use dag::DagBuilder;
pub use definition::*;
pub use graph::PipelineGraph;
pub use validation::{
    GraphValidator, StepRef, ValidationError, ValidationOptions, ValidationPolicy,
    ValidationResult,
};
