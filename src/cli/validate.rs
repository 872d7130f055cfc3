// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! Validate command - check a pipeline document

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::OpenPipeline;
use crate::config::StepgraphConfig;
use crate::errors::StepgraphError;
use crate::utils::{print_error, print_section, print_success, print_warning};

/// Run the validate command
pub async fn run(pipeline_path: PathBuf, config: &StepgraphConfig, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let pipeline = match OpenPipeline::open(&pipeline_path).await {
        Ok(p) => p,
        Err(e) => {
            print_error("Failed to load pipeline document");
            eprintln!();
            return Err(e.into());
        }
    };

    print_success("Pipeline document parsed");

    let options = config.validation_options();
    let validation = pipeline.graph.validate_with(&options);

    if !validation.errors.is_empty() {
        print_section(&"Errors".red().bold().to_string());
        for error in &validation.errors {
            print_error(&error.to_string());
        }
    }

    if validation.has_warnings() {
        print_section(&"Warnings".yellow().bold().to_string());
        for warning in &validation.warnings {
            print_warning(warning);
        }
    }

    if verbose {
        print_section(&"Pipeline summary".bold().to_string());
        println!("  Steps: {}", pipeline.graph.len());
        println!("  Connections: {}", pipeline.graph.connection_count());
        for step in pipeline.graph.steps() {
            let kind = step.kind(&options.notebook_extensions);
            let inputs = if step.incoming_connections().is_empty() {
                String::new()
            } else {
                format!(" [after: {}]", step.incoming_connections().join(", "))
            };
            println!(
                "    - {} ({}, {}){}",
                step.label(),
                step.file_path,
                kind.name(),
                inputs.dimmed()
            );
        }
    }

    println!();

    if validation.is_valid() {
        if validation.has_warnings() {
            println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
        } else {
            println!("{}", "Pipeline is valid!".green().bold());
        }
        Ok(())
    } else {
        Err(StepgraphError::ValidationFailed {
            count: validation.errors.len(),
        }
        .into())
    }
}
