// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! Pipeline definition structures
//!
//! Defines the in-memory step type and the persisted pipeline document.
//! The two are kept apart on purpose: [`StepRecord`] lists every field that
//! may be written to disk, so editor-only state never leaks into a save.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::{StepgraphError, StepgraphResult};

/// Default notebook file extensions
pub const DEFAULT_NOTEBOOK_EXTENSIONS: &[&str] = &["ipynb"];

/// Arbitrary JSON object used for step parameters and metadata extras
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// 2D canvas position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both coordinates can be written as JSON numbers
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Position {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Position> for [f64; 2] {
    fn from(p: Position) -> Self {
        [p.x, p.y]
    }
}

impl std::str::FromStr for Position {
    type Err = String;

    /// Parse `X,Y`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("Expected X,Y but got '{}'", s))?;
        let x = x
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("Invalid x coordinate '{}': {}", x, e))?;
        let y = y
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("Invalid y coordinate '{}': {}", y, e))?;

        let position = Self { x, y };
        if !position.is_finite() {
            return Err(format!("Coordinates in '{}' must be finite numbers", s));
        }
        Ok(position)
    }
}

/// Kind of a step, derived from its backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Notebook files cannot be shared between steps
    Notebook,
    Script,
}

impl StepKind {
    /// Classify a file path against a list of notebook extensions
    pub fn from_path<S: AsRef<str>>(file_path: &str, notebook_extensions: &[S]) -> Self {
        let ext = Path::new(file_path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext {
            Some(ext)
                if notebook_extensions
                    .iter()
                    .any(|n| n.as_ref().trim_start_matches('.').eq_ignore_ascii_case(&ext)) =>
            {
                Self::Notebook
            }
            _ => Self::Script,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Notebook => "notebook",
            Self::Script => "script",
        }
    }
}

/// Persisted step metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepMetadata {
    #[serde(default)]
    pub position: Position,

    /// Any other metadata keys, kept verbatim
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl StepMetadata {
    /// Drop legacy editor keys (`_drag_count`, `_dragged`, ...) that older
    /// documents carry inside the metadata object
    pub fn strip_legacy_runtime_keys(&mut self) -> usize {
        let before = self.extra.len();
        self.extra.retain(|key, _| !key.starts_with('_'));
        before - self.extra.len()
    }
}

/// Editor state that lives only as long as the graph is loaded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepRuntime {
    /// Number of move events in the current drag gesture
    pub drag_count: u32,
    pub dragging: bool,
    pub selected: bool,
}

/// A pipeline step
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub(crate) uuid: String,
    pub title: String,
    pub file_path: String,
    pub(crate) incoming_connections: Vec<String>,
    pub parameters: JsonMap,
    pub environment: String,
    pub meta_data: StepMetadata,
    pub runtime: StepRuntime,
}

impl Step {
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Uuids of the steps feeding this one, in connection order
    pub fn incoming_connections(&self) -> &[String] {
        &self.incoming_connections
    }

    pub fn position(&self) -> Position {
        self.meta_data.position
    }

    pub fn kind<S: AsRef<str>>(&self, notebook_extensions: &[S]) -> StepKind {
        StepKind::from_path(&self.file_path, notebook_extensions)
    }

    /// Label used in messages: `title (uuid)`
    pub fn label(&self) -> String {
        if self.title.is_empty() {
            self.uuid.clone()
        } else {
            format!("{} ({})", self.title, self.uuid)
        }
    }

    pub(crate) fn from_record(uuid: String, record: StepRecord) -> Self {
        let mut meta_data = record.meta_data;
        meta_data.strip_legacy_runtime_keys();

        Self {
            uuid,
            title: record.title,
            file_path: record.file_path,
            incoming_connections: record.incoming_connections,
            parameters: record.parameters,
            environment: record.environment,
            meta_data,
            runtime: StepRuntime::default(),
        }
    }

    pub(crate) fn to_record(&self) -> StepRecord {
        let mut meta_data = self.meta_data.clone();
        meta_data.strip_legacy_runtime_keys();

        StepRecord {
            uuid: self.uuid.clone(),
            title: self.title.clone(),
            file_path: self.file_path.clone(),
            incoming_connections: self.incoming_connections.clone(),
            parameters: self.parameters.clone(),
            environment: self.environment.clone(),
            meta_data,
        }
    }
}

/// Caller-supplied defaults for a new step
#[derive(Debug, Clone, Default)]
pub struct StepDraft {
    /// Explicit uuid; a fresh v4 uuid is generated when `None`
    pub uuid: Option<String>,
    pub title: String,
    pub file_path: String,
    pub parameters: JsonMap,
    pub environment: String,
    pub position: Position,
}

impl StepDraft {
    pub fn new(title: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// The persisted form of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(default)]
    pub uuid: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub file_path: String,

    #[serde(default)]
    pub incoming_connections: Vec<String>,

    #[serde(default)]
    pub parameters: JsonMap,

    #[serde(default)]
    pub environment: String,

    #[serde(default)]
    pub meta_data: StepMetadata,
}

/// Pipeline document as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Pipeline-level settings, kept verbatim
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub settings: JsonMap,

    #[serde(default)]
    pub steps: BTreeMap<String, StepRecord>,
}

/// On-disk encoding of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick a format from the file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

impl GraphDocument {
    /// Parse a document from a JSON string
    pub fn from_json(json: &str) -> StepgraphResult<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Parse a document from a YAML string
    pub fn from_yaml(yaml: &str) -> StepgraphResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    pub fn to_json(&self) -> StepgraphResult<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    pub fn to_yaml(&self) -> StepgraphResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    pub fn parse(content: &str, format: DocumentFormat) -> StepgraphResult<Self> {
        match format {
            DocumentFormat::Json => Self::from_json(content),
            DocumentFormat::Yaml => Self::from_yaml(content),
        }
    }

    pub fn render(&self, format: DocumentFormat) -> StepgraphResult<String> {
        match format {
            DocumentFormat::Json => self.to_json(),
            DocumentFormat::Yaml => self.to_yaml(),
        }
    }

    /// Load a document, choosing the format from the extension
    pub async fn from_file(path: &Path) -> StepgraphResult<Self> {
        if !path.exists() {
            return Err(StepgraphError::DocumentNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            StepgraphError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            }
        })?;

        Self::parse(&content, DocumentFormat::from_path(path))
    }

    /// Write a document, choosing the format from the extension
    pub async fn to_file(&self, path: &Path) -> StepgraphResult<()> {
        let mut content = self.render(DocumentFormat::from_path(path))?;
        if !content.ends_with('\n') {
            content.push('\n');
        }

        tokio::fs::write(path, content)
            .await
            .map_err(|e| StepgraphError::FileWriteError {
                path: path.to_path_buf(),
                error: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_kind_from_extension() {
        assert_eq!(
            StepKind::from_path("analysis.ipynb", DEFAULT_NOTEBOOK_EXTENSIONS),
            StepKind::Notebook
        );
        assert_eq!(
            StepKind::from_path("nested/Report.IPYNB", DEFAULT_NOTEBOOK_EXTENSIONS),
            StepKind::Notebook
        );
        assert_eq!(
            StepKind::from_path("train.py", DEFAULT_NOTEBOOK_EXTENSIONS),
            StepKind::Script
        );
        assert_eq!(
            StepKind::from_path("", DEFAULT_NOTEBOOK_EXTENSIONS),
            StepKind::Script
        );
        assert_eq!(StepKind::from_path("page.Rmd", &[".rmd"]), StepKind::Notebook);
    }

    #[test]
    fn test_parse_document_with_defaults() {
        let doc = GraphDocument::from_json(
            r#"{
                "name": "etl",
                "steps": {
                    "a": { "uuid": "a", "title": "Load", "file_path": "load.py" }
                }
            }"#,
        )
        .unwrap();

        let step = &doc.steps["a"];
        assert_eq!(doc.name.as_deref(), Some("etl"));
        assert!(step.incoming_connections.is_empty());
        assert!(step.parameters.is_empty());
        assert_eq!(step.meta_data.position, Position::default());
    }

    #[test]
    fn test_position_serializes_as_pair() {
        let meta = StepMetadata {
            position: Position::new(10.0, -4.5),
            extra: JsonMap::new(),
        };

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json, serde_json::json!({ "position": [10.0, -4.5] }));
    }

    #[test]
    fn test_legacy_runtime_keys_are_dropped() {
        let record: StepRecord = serde_json::from_value(serde_json::json!({
            "uuid": "a",
            "title": "A",
            "file_path": "a.ipynb",
            "meta_data": {
                "position": [1, 2],
                "_drag_count": 3,
                "_dragged": true,
                "hidden": false
            }
        }))
        .unwrap();

        let step = Step::from_record("a".into(), record);
        assert_eq!(step.meta_data.extra.len(), 1);
        assert!(step.meta_data.extra.contains_key("hidden"));
        assert_eq!(step.runtime, StepRuntime::default());
    }

    #[test]
    fn test_position_from_str() {
        assert_eq!("3,4".parse::<Position>().unwrap(), Position::new(3.0, 4.0));
        assert_eq!(" -1.5 , 2 ".parse::<Position>().unwrap(), Position::new(-1.5, 2.0));
        assert!("3".parse::<Position>().is_err());
        assert!("x,4".parse::<Position>().is_err());
        assert!("NaN,0".parse::<Position>().is_err());
        assert!("1,inf".parse::<Position>().is_err());
    }

    #[test]
    fn test_yaml_document() {
        let doc = GraphDocument::from_yaml(
            "steps:\n  a:\n    uuid: a\n    title: A\n    file_path: a.py\n    incoming_connections: []\n",
        )
        .unwrap();
        assert_eq!(doc.steps.len(), 1);

        let yaml = doc.to_yaml().unwrap();
        assert!(yaml.contains("file_path: a.py"));
    }

    #[test]
    fn test_document_format_from_path() {
        assert_eq!(DocumentFormat::from_path(Path::new("p.yaml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("p.yml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("p.orchest")), DocumentFormat::Json);
    }
}
