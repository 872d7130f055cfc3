// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! Configuration loading
//!
//! Settings come from `.stepgraph.toml` in the working directory, or from
//! `config.toml` in the user's stepgraph config directory.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::errors::{StepgraphError, StepgraphResult};
use crate::pipeline::{StepDraft, ValidationOptions, ValidationPolicy, DEFAULT_NOTEBOOK_EXTENSIONS};

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = ".stepgraph.toml";

/// stepgraph configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepgraphConfig {
    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Defaults for new steps
    #[serde(default)]
    pub defaults: StepDefaults,
}

/// Validation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub policy: ValidationPolicy,

    /// File extensions that mark a step as a notebook
    #[serde(default = "default_notebook_extensions")]
    pub notebook_extensions: Vec<String>,
}

fn default_notebook_extensions() -> Vec<String> {
    DEFAULT_NOTEBOOK_EXTENSIONS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            policy: ValidationPolicy::default(),
            notebook_extensions: default_notebook_extensions(),
        }
    }
}

/// Defaults applied to steps created from the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefaults {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub environment: String,
}

fn default_title() -> String {
    "Untitled".to_string()
}

impl Default for StepDefaults {
    fn default() -> Self {
        Self {
            title: default_title(),
            environment: String::new(),
        }
    }
}

impl StepgraphConfig {
    /// Parse configuration from TOML
    pub fn from_toml(content: &str) -> StepgraphResult<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Load from an explicit file, which must exist
    pub async fn load(path: &Path) -> StepgraphResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            StepgraphError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            }
        })?;

        Self::from_toml(&content)
    }

    /// Resolve the configuration for a working directory.
    ///
    /// An explicit path must exist; the implicit locations are optional.
    pub async fn discover(explicit: Option<&Path>, cwd: &Path) -> StepgraphResult<Self> {
        if let Some(path) = explicit {
            tracing::debug!(path = %path.display(), "loading config");
            return Self::load(path).await;
        }

        for candidate in Self::search_paths(cwd) {
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "loading config");
                return Self::load(&candidate).await;
            }
        }

        Ok(Self::default())
    }

    /// Implicit config locations, most specific first
    pub fn search_paths(cwd: &Path) -> Vec<PathBuf> {
        let mut paths = vec![cwd.join(LOCAL_CONFIG_FILE)];
        if let Some(dirs) = ProjectDirs::from("", "", "stepgraph") {
            paths.push(dirs.config_dir().join("config.toml"));
        }
        paths
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            policy: self.validation.policy,
            notebook_extensions: self.validation.notebook_extensions.clone(),
        }
    }

    /// A draft pre-filled with the configured defaults
    pub fn draft(&self) -> StepDraft {
        StepDraft::new(self.defaults.title.clone(), String::new())
            .with_environment(self.defaults.environment.clone())
    }
}
