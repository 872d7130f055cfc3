// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for stepgraph.

pub mod edit;
pub mod graph;
pub mod normalize;
pub mod validate;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::StepgraphConfig;
use crate::errors::StepgraphResult;
use crate::pipeline::{GraphDocument, PipelineGraph, Position};

/// Default pipeline document name
pub const DEFAULT_PIPELINE: &str = "pipeline.orchest";

/// Pipeline step graph editor
///
/// Inspect and edit the step graph of a pipeline document.
#[derive(Parser, Debug)]
#[clap(
    name = "stepgraph",
    version,
    about = "Pipeline step graph editor with cycle detection and validation",
    long_about = None,
    after_help = "Examples:\n\
        stepgraph validate                      Validate pipeline.orchest\n\
        stepgraph add --title Load --file load.ipynb\n\
        stepgraph connect <SOURCE> <TARGET>     Connect two steps\n\
        stepgraph graph -f mermaid              Render the graph\n\n\
        See 'stepgraph <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Configuration file (defaults to .stepgraph.toml or the user config)
    #[clap(short, long, global = true, value_name = "FILE", env = "STEPGRAPH_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a pipeline document
    Validate {
        /// Pipeline document
        #[clap(default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,
    },

    /// Show the pipeline as a graph
    Graph {
        /// Pipeline document
        #[clap(default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,

        /// Output format (text, dot, mermaid)
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },

    /// Add a step
    Add {
        #[clap(short, long, default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,

        /// Step title (defaults to the configured title)
        #[clap(short, long)]
        title: Option<String>,

        /// Backing file
        #[clap(short, long)]
        file: String,

        /// Environment reference
        #[clap(short, long)]
        env: Option<String>,

        /// Explicit uuid instead of a generated one
        #[clap(long)]
        uuid: Option<String>,

        /// Canvas position as X,Y
        #[clap(long, allow_hyphen_values = true)]
        at: Option<Position>,

        /// Parameter as KEY=VALUE (VALUE is parsed as JSON when possible)
        #[clap(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },

    /// Delete a step and its connections
    Delete {
        #[clap(short, long, default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,

        /// Step uuid
        uuid: String,
    },

    /// Connect SOURCE so that it feeds TARGET
    Connect {
        #[clap(short, long, default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,

        source: String,
        target: String,
    },

    /// Remove the connection from SOURCE to TARGET
    Disconnect {
        #[clap(short, long, default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,

        source: String,
        target: String,
    },

    /// Rename a step
    Rename {
        #[clap(short, long, default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,

        uuid: String,
        title: String,
    },

    /// Move a step on the canvas
    Move {
        #[clap(short, long, default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,

        uuid: String,

        #[clap(allow_negative_numbers = true)]
        x: f64,

        #[clap(allow_negative_numbers = true)]
        y: f64,
    },

    /// Check whether connecting SOURCE to TARGET would create a cycle
    CheckCycle {
        #[clap(short, long, default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,

        source: String,
        target: String,
    },

    /// Rewrite a document in canonical form
    Normalize {
        /// Pipeline document
        #[clap(default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,

        /// Write to this file instead of in place
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}

/// A pipeline document opened for editing
#[derive(Debug)]
pub struct OpenPipeline {
    pub path: PathBuf,
    /// Pipeline-level fields of the document, without steps
    header: GraphDocument,
    pub graph: PipelineGraph,
}

impl OpenPipeline {
    pub async fn open(path: &Path) -> StepgraphResult<Self> {
        let mut header = GraphDocument::from_file(path).await?;
        let steps = std::mem::take(&mut header.steps);
        let graph = PipelineGraph::from_document(GraphDocument {
            steps,
            ..GraphDocument::default()
        });

        Ok(Self {
            path: path.to_path_buf(),
            header,
            graph,
        })
    }

    /// The full document as it would be saved
    pub fn document(&self) -> GraphDocument {
        GraphDocument {
            steps: self.graph.to_serializable().steps,
            ..self.header.clone()
        }
    }

    pub async fn save(&self) -> StepgraphResult<()> {
        self.save_as(&self.path).await
    }

    pub async fn save_as(&self, path: &Path) -> StepgraphResult<()> {
        tracing::debug!(path = %path.display(), "saving pipeline");
        self.document().to_file(path).await
    }
}

/// Resolve configuration for the current directory
pub async fn load_config(explicit: Option<&Path>) -> miette::Result<StepgraphConfig> {
    let cwd = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    Ok(StepgraphConfig::discover(explicit, &cwd).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_move_with_negative_coordinates() {
        let cli = Cli::parse_from(["stepgraph", "move", "abc", "-10", "-2.5"]);
        match cli.command {
            Commands::Move { uuid, x, y, pipeline } => {
                assert_eq!(uuid, "abc");
                assert_eq!((x, y), (-10.0, -2.5));
                assert_eq!(pipeline, PathBuf::from(DEFAULT_PIPELINE));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_graph_format_parse() {
        assert_eq!("DOT".parse::<GraphFormat>(), Ok(GraphFormat::Dot));
        assert!("svg".parse::<GraphFormat>().is_err());
    }

    #[tokio::test]
    async fn test_open_pipeline_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.orchest");
        std::fs::write(
            &path,
            r#"{
                "name": "etl",
                "uuid": "p-1",
                "settings": { "auto_eviction": true },
                "steps": { "a": { "uuid": "a", "title": "A", "file_path": "a.py" } }
            }"#,
        )
        .unwrap();

        let mut open = OpenPipeline::open(&path).await.unwrap();
        open.graph.rename_step("a", "Extract").unwrap();
        open.save().await.unwrap();

        let saved = GraphDocument::from_file(&path).await.unwrap();
        assert_eq!(saved.name.as_deref(), Some("etl"));
        assert_eq!(saved.settings["auto_eviction"], true);
        assert_eq!(saved.steps["a"].title, "Extract");
    }
}
