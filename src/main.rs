// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! stepgraph - Pipeline Step Graph
//!
//! Inspect, edit and validate pipeline step graphs from the command line.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stepgraph::cli::edit::AddOptions;
use stepgraph::cli::{load_config, Cli, Commands};
use stepgraph::pipeline::Position;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "stepgraph=debug"
    } else {
        "stepgraph=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    stepgraph::utils::configure_colors();
    tracing::debug!(version = stepgraph::VERSION, "starting stepgraph");

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let config = load_config(cli.config.as_deref()).await?;

    // Dispatch to command handlers
    match cli.command {
        Commands::Validate { pipeline } => {
            stepgraph::cli::validate::run(pipeline, &config, cli.verbose).await
        }
        Commands::Graph { pipeline, format } => {
            stepgraph::cli::graph::run(pipeline, format, cli.verbose).await
        }
        Commands::Add {
            pipeline,
            title,
            file,
            env,
            uuid,
            at,
            params,
        } => {
            let options = AddOptions {
                title,
                file,
                environment: env,
                uuid,
                position: at,
                params,
            };
            stepgraph::cli::edit::add(pipeline, options, &config, cli.verbose).await
        }
        Commands::Delete { pipeline, uuid } => {
            stepgraph::cli::edit::delete(pipeline, uuid, cli.verbose).await
        }
        Commands::Connect {
            pipeline,
            source,
            target,
        } => stepgraph::cli::edit::connect(pipeline, source, target, cli.verbose).await,
        Commands::Disconnect {
            pipeline,
            source,
            target,
        } => stepgraph::cli::edit::disconnect(pipeline, source, target, cli.verbose).await,
        Commands::Rename {
            pipeline,
            uuid,
            title,
        } => stepgraph::cli::edit::rename(pipeline, uuid, title, cli.verbose).await,
        Commands::Move { pipeline, uuid, x, y } => {
            stepgraph::cli::edit::move_step(pipeline, uuid, Position::new(x, y), cli.verbose).await
        }
        Commands::CheckCycle {
            pipeline,
            source,
            target,
        } => stepgraph::cli::edit::check_cycle(pipeline, source, target, cli.verbose).await,
        Commands::Normalize { pipeline, output } => {
            stepgraph::cli::normalize::run(pipeline, output, cli.verbose).await
        }
    }
}
