// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! Graph command - visualize the pipeline as a graph

use miette::Result;
use std::path::PathBuf;

use super::{GraphFormat, OpenPipeline};
use crate::pipeline::DagBuilder;

/// Run the graph command
pub async fn run(pipeline_path: PathBuf, format: GraphFormat, _verbose: bool) -> Result<()> {
    let pipeline = OpenPipeline::open(&pipeline_path).await?;

    let dag = DagBuilder::build(&pipeline.graph)?;

    let output = match format {
        GraphFormat::Text => dag.to_text()?,
        GraphFormat::Dot => dag.to_dot(),
        GraphFormat::Mermaid => dag.to_mermaid(),
    };

    print!("{}", output);

    Ok(())
}
