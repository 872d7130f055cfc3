// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! Normalize command - rewrite a document without editor-only fields

use miette::Result;
use std::path::PathBuf;

use super::OpenPipeline;
use crate::utils::print_success;

/// Run the normalize command
pub async fn run(pipeline_path: PathBuf, output: Option<PathBuf>, _verbose: bool) -> Result<()> {
    let pipeline = OpenPipeline::open(&pipeline_path).await?;
    let target = output.unwrap_or_else(|| pipeline.path.clone());

    pipeline.save_as(&target).await?;

    print_success(&format!(
        "Wrote {} step(s) to {}",
        pipeline.graph.len(),
        target.display()
    ));
    Ok(())
}
