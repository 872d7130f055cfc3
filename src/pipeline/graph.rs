// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! The pipeline step graph
//!
//! Connections are stored only as each step's `incoming_connections`.
//! Outgoing connections are derived on demand so the two directions can
//! never disagree.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};
use uuid::Uuid;

use super::definition::{
    GraphDocument, JsonMap, Position, Step, StepDraft, StepKind, StepMetadata, StepRuntime,
};
use super::validation::{GraphValidator, ValidationOptions, ValidationResult};
use crate::errors::{StepgraphError, StepgraphResult};

/// DFS colour of a step during cycle detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Grey,
    Black,
}

/// Directed graph of pipeline steps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineGraph {
    steps: BTreeMap<String, Step>,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a persisted document
    pub fn from_document(doc: GraphDocument) -> Self {
        let mut graph = Self::new();
        graph.from_serializable(doc);
        graph
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn step(&self, uuid: &str) -> Option<&Step> {
        self.steps.get(uuid)
    }

    /// Steps in uuid order
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.values()
    }

    pub fn uuids(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.steps.contains_key(uuid)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_kind<S: AsRef<str>>(&self, uuid: &str, notebook_extensions: &[S]) -> Option<StepKind> {
        self.step(uuid).map(|s| s.kind(notebook_extensions))
    }

    /// Whether `source` feeds `target` directly
    pub fn is_connected(&self, source: &str, target: &str) -> bool {
        self.step(target)
            .is_some_and(|t| t.incoming_connections.iter().any(|c| c == source))
    }

    /// Outgoing connections of every step, rebuilt from the incoming lists
    pub fn outgoing_map(&self) -> HashMap<&str, Vec<&str>> {
        self.build_outgoing(None)
    }

    /// Steps that `uuid` feeds, in uuid order of the targets
    pub fn outgoing_connections(&self, uuid: &str) -> Vec<&str> {
        self.steps
            .values()
            .filter(|s| s.incoming_connections.iter().any(|c| c == uuid))
            .map(|s| s.uuid.as_str())
            .collect()
    }

    /// Number of connections in the graph
    pub fn connection_count(&self) -> usize {
        self.steps.values().map(|s| s.incoming_connections.len()).sum()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Step lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new step built from `draft`
    pub fn add_step(&mut self, draft: StepDraft) -> StepgraphResult<&Step> {
        check_position(draft.position)?;

        let uuid = match draft.uuid {
            Some(uuid) if uuid.is_empty() => {
                return Err(StepgraphError::invalid_argument("Step uuid cannot be empty"));
            }
            Some(uuid) => uuid,
            None => Uuid::new_v4().to_string(),
        };

        if self.steps.contains_key(&uuid) {
            return Err(StepgraphError::DuplicateUuid { uuid });
        }

        debug!(uuid = %uuid, title = %draft.title, "adding step");

        let step = Step {
            uuid: uuid.clone(),
            title: draft.title,
            file_path: draft.file_path,
            incoming_connections: Vec::new(),
            parameters: draft.parameters,
            environment: draft.environment,
            meta_data: StepMetadata {
                position: draft.position,
                extra: JsonMap::new(),
            },
            runtime: StepRuntime::default(),
        };

        let step: &Step = self.steps.entry(uuid).or_insert(step);
        Ok(step)
    }

    /// Remove a step and every connection that references it.
    ///
    /// Deleting an unknown uuid is a no-op and returns `None`.
    pub fn delete_step(&mut self, uuid: &str) -> Option<Step> {
        let removed = self.steps.remove(uuid)?;

        for step in self.steps.values_mut() {
            step.incoming_connections.retain(|c| c != uuid);
        }

        debug!(uuid = %uuid, "deleted step");
        Some(removed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connections
    // ─────────────────────────────────────────────────────────────────────────

    /// Connect `source` to `target` so that `source` feeds `target`
    pub fn connect(&mut self, source: &str, target: &str) -> StepgraphResult<()> {
        if !self.contains(source) {
            return Err(StepgraphError::step_not_found(source));
        }
        if !self.contains(target) {
            return Err(StepgraphError::step_not_found(target));
        }
        if source == target {
            return Err(StepgraphError::SelfConnection {
                uuid: source.to_string(),
            });
        }
        if self.is_connected(source, target) {
            return Err(StepgraphError::DuplicateConnection {
                source_uuid: source.to_string(),
                target: target.to_string(),
            });
        }
        if let Some(path) = self.find_cycle() {
            debug!(source = %source, target = %target, "rejected connection, pipeline already cyclic");
            return Err(StepgraphError::ExistingCycle { path });
        }
        if let Some(path) = self.cycle_with_edge(Some((source, target))) {
            debug!(source = %source, target = %target, "rejected connection, cycle detected");
            return Err(StepgraphError::circular_dependency(source, target, path));
        }

        if let Some(step) = self.steps.get_mut(target) {
            step.incoming_connections.push(source.to_string());
        }

        debug!(source = %source, target = %target, "connected steps");
        Ok(())
    }

    /// Remove the `source` → `target` connection. Returns whether one existed.
    pub fn disconnect(&mut self, source: &str, target: &str) -> bool {
        let Some(step) = self.steps.get_mut(target) else {
            return false;
        };

        let before = step.incoming_connections.len();
        step.incoming_connections.retain(|c| c != source);
        let removed = step.incoming_connections.len() != before;

        if removed {
            debug!(source = %source, target = %target, "disconnected steps");
        }
        removed
    }

    /// Whether adding `source` → `target` would make the graph cyclic.
    ///
    /// The edge is only considered, never stored.
    pub fn would_create_cycle(&self, source: &str, target: &str) -> bool {
        source == target || self.cycle_with_edge(Some((source, target))).is_some()
    }

    /// First cycle in the graph as a closed uuid path, if any
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        self.cycle_with_edge(None)
    }

    pub fn is_acyclic(&self) -> bool {
        self.find_cycle().is_none()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Step mutators
    // ─────────────────────────────────────────────────────────────────────────

    pub fn rename_step(&mut self, uuid: &str, title: impl Into<String>) -> StepgraphResult<()> {
        let title = title.into();
        debug!(uuid = %uuid, title = %title, "renaming step");
        self.step_mut(uuid)?.title = title;
        Ok(())
    }

    pub fn move_step(&mut self, uuid: &str, position: Position) -> StepgraphResult<()> {
        check_position(position)?;
        let step = self.step_mut(uuid)?;
        step.meta_data.position = position;
        if step.runtime.dragging {
            step.runtime.drag_count += 1;
        }
        Ok(())
    }

    /// Replace the parameters of a step
    pub fn set_parameters(&mut self, uuid: &str, parameters: JsonMap) -> StepgraphResult<()> {
        debug!(uuid = %uuid, count = parameters.len(), "setting parameters");
        self.step_mut(uuid)?.parameters = parameters;
        Ok(())
    }

    pub fn set_file_path(&mut self, uuid: &str, file_path: impl Into<String>) -> StepgraphResult<()> {
        self.step_mut(uuid)?.file_path = file_path.into();
        Ok(())
    }

    pub fn set_environment(&mut self, uuid: &str, environment: impl Into<String>) -> StepgraphResult<()> {
        self.step_mut(uuid)?.environment = environment.into();
        Ok(())
    }

    /// Start a drag gesture on a step
    pub fn begin_drag(&mut self, uuid: &str) -> StepgraphResult<()> {
        let step = self.step_mut(uuid)?;
        step.runtime.dragging = true;
        step.runtime.drag_count = 0;
        Ok(())
    }

    /// End a drag gesture. Returns how many moves it contained.
    pub fn end_drag(&mut self, uuid: &str) -> StepgraphResult<u32> {
        let step = self.step_mut(uuid)?;
        let count = step.runtime.drag_count;
        step.runtime.dragging = false;
        step.runtime.drag_count = 0;
        Ok(count)
    }

    pub fn select(&mut self, uuid: &str) -> StepgraphResult<()> {
        self.step_mut(uuid)?.runtime.selected = true;
        Ok(())
    }

    pub fn deselect_all(&mut self) {
        for step in self.steps.values_mut() {
            step.runtime.selected = false;
        }
    }

    pub fn selected(&self) -> Vec<&str> {
        self.steps
            .values()
            .filter(|s| s.runtime.selected)
            .map(|s| s.uuid.as_str())
            .collect()
    }

    fn step_mut(&mut self, uuid: &str) -> StepgraphResult<&mut Step> {
        self.steps
            .get_mut(uuid)
            .ok_or_else(|| StepgraphError::step_not_found(uuid))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation & persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate with default options
    pub fn validate(&self) -> ValidationResult {
        GraphValidator::validate(self, &ValidationOptions::default())
    }

    pub fn validate_with(&self, options: &ValidationOptions) -> ValidationResult {
        GraphValidator::validate(self, options)
    }

    /// Snapshot of the persisted fields of every step
    pub fn to_serializable(&self) -> GraphDocument {
        GraphDocument {
            steps: self
                .steps
                .iter()
                .map(|(uuid, step)| (uuid.clone(), step.to_record()))
                .collect(),
            ..GraphDocument::default()
        }
    }

    /// Replace all steps with those of `doc`. Runtime state starts fresh and
    /// nothing is validated.
    #[allow(clippy::wrong_self_convention)]
    pub fn from_serializable(&mut self, doc: GraphDocument) {
        self.steps.clear();

        for (uuid, record) in doc.steps {
            if record.uuid != uuid {
                warn!(key = %uuid, record = %record.uuid, "step uuid does not match its key, using the key");
            }
            let step = Step::from_record(uuid.clone(), record);
            self.steps.insert(uuid, step);
        }

        debug!(steps = self.steps.len(), "loaded pipeline document");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cycle detection
    // ─────────────────────────────────────────────────────────────────────────

    /// Invert every incoming list, plus an optional extra edge
    fn build_outgoing<'a>(&'a self, extra: Option<(&'a str, &'a str)>) -> HashMap<&'a str, Vec<&'a str>> {
        let mut outgoing: HashMap<&str, Vec<&str>> = self
            .steps
            .keys()
            .map(|uuid| (uuid.as_str(), Vec::new()))
            .collect();

        for step in self.steps.values() {
            for source in &step.incoming_connections {
                if let Some(targets) = outgoing.get_mut(source.as_str()) {
                    targets.push(step.uuid.as_str());
                }
            }
        }

        if let Some((source, target)) = extra {
            if self.contains(target) {
                if let Some(targets) = outgoing.get_mut(source) {
                    targets.push(target);
                }
            }
        }

        outgoing
    }

    /// Three-colour iterative DFS over every step. Returns the first cycle
    /// found as a closed path.
    fn cycle_with_edge(&self, extra: Option<(&str, &str)>) -> Option<Vec<String>> {
        let outgoing = self.build_outgoing(extra);
        let mut marks: HashMap<&str, Mark> =
            self.steps.keys().map(|k| (k.as_str(), Mark::White)).collect();

        for root in self.steps.keys() {
            if marks[root.as_str()] != Mark::White {
                continue;
            }

            // (node, index of the next child to visit)
            let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
            marks.insert(root.as_str(), Mark::Grey);

            while let Some(top) = stack.last_mut() {
                let node = top.0;
                let children = &outgoing[node];
                if top.1 < children.len() {
                    let child = children[top.1];
                    top.1 += 1;

                    match marks[child] {
                        Mark::White => {
                            marks.insert(child, Mark::Grey);
                            stack.push((child, 0));
                        }
                        Mark::Grey => {
                            let start = stack
                                .iter()
                                .position(|(n, _)| *n == child)
                                .unwrap_or_default();
                            let mut path: Vec<String> =
                                stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                            path.push(child.to_string());
                            return Some(path);
                        }
                        Mark::Black => {}
                    }
                } else {
                    marks.insert(node, Mark::Black);
                    stack.pop();
                }
            }
        }

        None
    }
}

/// Positions are persisted as JSON numbers, which cannot hold NaN or infinity
fn check_position(position: Position) -> StepgraphResult<()> {
    if position.is_finite() {
        Ok(())
    } else {
        Err(StepgraphError::invalid_argument(format!(
            "Position ({}, {}) must be finite",
            position.x, position.y
        )))
    }
}
