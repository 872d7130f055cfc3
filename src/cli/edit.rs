// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! Edit commands - add, delete, connect, disconnect, rename and move steps
//!
//! Each command opens the document, applies one graph operation and saves
//! it. A rejected operation leaves the file untouched.

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};

use super::OpenPipeline;
use crate::config::StepgraphConfig;
use crate::errors::{StepgraphError, StepgraphResult};
use crate::pipeline::Position;
use crate::utils::{print_info, print_success, print_warning};

/// Options for the add command
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub title: Option<String>,
    pub file: String,
    pub environment: Option<String>,
    pub uuid: Option<String>,
    pub position: Option<Position>,
    pub params: Vec<String>,
}

/// Report a refused graph operation. The document on disk was not touched.
fn rejected(pipeline_path: &Path, err: StepgraphError) -> miette::Report {
    if err.is_graph_error() {
        print_warning(&format!("{} left unchanged", pipeline_path.display()));
    }
    err.into()
}

/// Parse `KEY=VALUE`. VALUE is read as JSON, falling back to a plain string.
pub fn parse_param(raw: &str) -> StepgraphResult<(String, serde_json::Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| StepgraphError::invalid_argument(format!("Expected KEY=VALUE but got '{}'", raw)))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(StepgraphError::invalid_argument(format!(
            "Parameter '{}' has an empty key",
            raw
        )));
    }

    let value = value.trim();
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Add a step
pub async fn add(
    pipeline_path: PathBuf,
    options: AddOptions,
    config: &StepgraphConfig,
    _verbose: bool,
) -> Result<()> {
    let mut pipeline = OpenPipeline::open(&pipeline_path).await?;

    let mut draft = config.draft();
    draft.file_path = options.file;
    draft.uuid = options.uuid;
    if let Some(title) = options.title {
        draft.title = title;
    }
    if let Some(environment) = options.environment {
        draft.environment = environment;
    }
    if let Some(position) = options.position {
        draft.position = position;
    }
    for raw in &options.params {
        let (key, value) = parse_param(raw)?;
        draft.parameters.insert(key, value);
    }

    let step = pipeline
        .graph
        .add_step(draft)
        .map_err(|e| rejected(&pipeline_path, e))?;
    let uuid = step.uuid().to_string();
    let label = step.label();

    pipeline.save().await?;

    print_success(&format!("Added step {}", label));
    println!("{}", uuid);
    Ok(())
}

/// Delete a step and its connections
pub async fn delete(pipeline_path: PathBuf, uuid: String, _verbose: bool) -> Result<()> {
    let mut pipeline = OpenPipeline::open(&pipeline_path).await?;

    match pipeline.graph.delete_step(&uuid) {
        Some(step) => {
            pipeline.save().await?;
            print_success(&format!("Deleted step {}", step.label()));
        }
        None => print_warning(&format!("No step '{}', nothing deleted", uuid)),
    }
    Ok(())
}

/// Connect two steps
pub async fn connect(pipeline_path: PathBuf, source: String, target: String, _verbose: bool) -> Result<()> {
    let mut pipeline = OpenPipeline::open(&pipeline_path).await?;

    pipeline
        .graph
        .connect(&source, &target)
        .map_err(|e| rejected(&pipeline_path, e))?;
    pipeline.save().await?;

    print_success(&format!("Connected {} → {}", source, target));
    Ok(())
}

/// Remove a connection
pub async fn disconnect(pipeline_path: PathBuf, source: String, target: String, _verbose: bool) -> Result<()> {
    let mut pipeline = OpenPipeline::open(&pipeline_path).await?;

    if pipeline.graph.disconnect(&source, &target) {
        pipeline.save().await?;
        print_success(&format!("Disconnected {} → {}", source, target));
    } else {
        print_info(&format!("No connection {} → {}", source, target));
    }
    Ok(())
}

/// Rename a step
pub async fn rename(pipeline_path: PathBuf, uuid: String, title: String, _verbose: bool) -> Result<()> {
    let mut pipeline = OpenPipeline::open(&pipeline_path).await?;

    pipeline
        .graph
        .rename_step(&uuid, title.as_str())
        .map_err(|e| rejected(&pipeline_path, e))?;
    pipeline.save().await?;

    print_success(&format!("Renamed {} to '{}'", uuid, title));
    Ok(())
}

/// Move a step
pub async fn move_step(pipeline_path: PathBuf, uuid: String, position: Position, _verbose: bool) -> Result<()> {
    let mut pipeline = OpenPipeline::open(&pipeline_path).await?;

    pipeline
        .graph
        .move_step(&uuid, position)
        .map_err(|e| rejected(&pipeline_path, e))?;
    pipeline.save().await?;

    print_success(&format!("Moved {} to ({}, {})", uuid, position.x, position.y));
    Ok(())
}

/// Report whether a connection would close a cycle, without changing the file
pub async fn check_cycle(pipeline_path: PathBuf, source: String, target: String, _verbose: bool) -> Result<()> {
    let pipeline = OpenPipeline::open(&pipeline_path).await?;

    for uuid in [&source, &target] {
        if !pipeline.graph.contains(uuid) {
            return Err(StepgraphError::step_not_found(uuid).into());
        }
    }

    if pipeline.graph.would_create_cycle(&source, &target) {
        println!("{} {} → {} would create a cycle", "✗".red(), source, target);
    } else {
        println!("{} {} → {} keeps the pipeline acyclic", "✓".green(), source, target);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param_json_value() {
        let (key, value) = parse_param("epochs=10").unwrap();
        assert_eq!(key, "epochs");
        assert_eq!(value, serde_json::json!(10));

        let (_, value) = parse_param("layers=[1, 2]").unwrap();
        assert_eq!(value, serde_json::json!([1, 2]));
    }

    #[test]
    fn test_parse_param_string_fallback() {
        let (key, value) = parse_param("name = raw text").unwrap();
        assert_eq!(key, "name");
        assert_eq!(value, serde_json::json!("raw text"));
    }

    #[test]
    fn test_rejected_keeps_error() {
        let report = rejected(Path::new("p.orchest"), StepgraphError::step_not_found("x"));
        assert!(report.to_string().contains("'x' not found"));
    }

    #[test]
    fn test_parse_param_errors() {
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=5").is_err());
    }
}
