// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepgraph contributors

//! DAG (Directed Acyclic Graph) view of a pipeline
//!
//! Mirrors a [`PipelineGraph`] into a petgraph graph for ordering,
//! reachability queries and diagram output.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::errors::StepgraphError;
use crate::pipeline::PipelineGraph;

/// Builder for step dependency DAGs
pub struct DagBuilder {
    graph: DiGraph<String, ()>,
    uuid_to_index: HashMap<String, NodeIndex>,
    titles: HashMap<String, String>,
}

impl DagBuilder {
    /// Create an empty DAG builder
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            uuid_to_index: HashMap::new(),
            titles: HashMap::new(),
        }
    }

    /// Build a DAG from a pipeline graph
    pub fn build(pipeline: &PipelineGraph) -> Result<Self, StepgraphError> {
        let mut builder = Self::new();

        // Add all steps as nodes
        for step in pipeline.steps() {
            let node = builder.graph.add_node(step.uuid().to_string());
            builder.uuid_to_index.insert(step.uuid().to_string(), node);
            builder
                .titles
                .insert(step.uuid().to_string(), step.title.clone());
        }

        // Add connection edges
        for step in pipeline.steps() {
            let step_node = builder.uuid_to_index[step.uuid()];

            for source in step.incoming_connections() {
                let source_node = builder
                    .uuid_to_index
                    .get(source)
                    .ok_or_else(|| StepgraphError::step_not_found(source))?;

                if !builder.graph.contains_edge(*source_node, step_node) {
                    builder.graph.add_edge(*source_node, step_node, ());
                }
            }
        }

        builder.validate_acyclic()?;

        Ok(builder)
    }

    fn validate_acyclic(&self) -> Result<(), StepgraphError> {
        self.topological_order().map(|_| ())
    }

    /// Find the steps on a cycle through `start`
    fn find_cycle_members(&self, start: NodeIndex) -> Vec<String> {
        use petgraph::visit::{depth_first_search, Control, DfsEvent};

        let mut path = vec![start];
        let mut found = Vec::new();

        depth_first_search(&self.graph, Some(start), |event| match event {
            DfsEvent::Discover(node, _) if node != start => {
                path.push(node);
                Control::<()>::Continue
            }
            DfsEvent::BackEdge(from, to) if to == start => {
                let end = path.iter().position(|n| *n == from).unwrap_or(path.len() - 1);
                found = path[..=end].to_vec();
                found.push(start);
                Control::Break(())
            }
            DfsEvent::Finish(node, _) => {
                if path.last() == Some(&node) && node != start {
                    path.pop();
                }
                Control::Continue
            }
            _ => Control::Continue,
        });

        if found.is_empty() {
            found = vec![start, start];
        }
        found.into_iter().map(|n| self.graph[n].clone()).collect()
    }

    /// Step uuids in an order where every step follows its inputs
    pub fn topological_order(&self) -> Result<Vec<String>, StepgraphError> {
        toposort(&self.graph, None)
            .map(|nodes| nodes.into_iter().map(|n| self.graph[n].clone()).collect())
            .map_err(|cycle| {
                let path = self.find_cycle_members(cycle.node_id());
                let node = self.graph[cycle.node_id()].clone();
                StepgraphError::circular_dependency(&node, &node, path)
            })
    }

    /// Steps that feed `uuid` directly
    pub fn dependencies(&self, uuid: &str) -> Option<Vec<String>> {
        self.neighbors(uuid, petgraph::Direction::Incoming)
    }

    /// Steps that `uuid` feeds directly
    pub fn dependents(&self, uuid: &str) -> Option<Vec<String>> {
        self.neighbors(uuid, petgraph::Direction::Outgoing)
    }

    fn neighbors(&self, uuid: &str, direction: petgraph::Direction) -> Option<Vec<String>> {
        let node = self.uuid_to_index.get(uuid)?;
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        deps.sort();
        Some(deps)
    }

    /// Check if step A depends (directly or transitively) on step B
    pub fn depends_on(&self, step_a: &str, step_b: &str) -> bool {
        let Some(node_a) = self.uuid_to_index.get(step_a) else {
            return false;
        };
        let Some(node_b) = self.uuid_to_index.get(step_b) else {
            return false;
        };

        petgraph::algo::has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    fn title<'a>(&'a self, uuid: &'a str) -> &'a str {
        match self.titles.get(uuid) {
            Some(title) if !title.is_empty() => title.as_str(),
            _ => uuid,
        }
    }

    fn sorted_edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(&str, &str)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(from, to)| (self.graph[from].as_str(), self.graph[to].as_str()))
            .collect();
        edges.sort();
        edges
    }

    fn sorted_uuids(&self) -> Vec<&str> {
        let mut uuids: Vec<&str> = self.uuid_to_index.keys().map(String::as_str).collect();
        uuids.sort();
        uuids
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for uuid in self.sorted_uuids() {
            out.push_str(&format!("    {}[\"{}\"]\n", mermaid_id(uuid), self.title(uuid)));
        }

        for (from, to) in self.sorted_edges() {
            out.push_str(&format!("    {} --> {}\n", mermaid_id(from), mermaid_id(to)));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=LR;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for uuid in self.sorted_uuids() {
            out.push_str(&format!(
                "    \"{}\" [label=\"{}\"];\n",
                uuid,
                self.title(uuid).replace('"', "\\\"")
            ));
        }

        if self.graph.edge_count() > 0 {
            out.push('\n');
        }
        for (from, to) in self.sorted_edges() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of execution order
    pub fn to_text(&self) -> Result<String, StepgraphError> {
        let order = self.topological_order()?;
        let mut out = String::new();

        for (i, uuid) in order.iter().enumerate() {
            let deps = self.dependencies(uuid).unwrap_or_default();

            out.push_str(&format!("{}. {} ({})", i + 1, self.title(uuid), uuid));

            if !deps.is_empty() {
                let names: Vec<&str> = deps.iter().map(|d| self.title(d)).collect();
                out.push_str(&format!(" [after: {}]", names.join(", ")));
            }

            out.push('\n');
        }

        Ok(out)
    }
}

impl Default for DagBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Mermaid node ids cannot contain dashes
fn mermaid_id(uuid: &str) -> String {
    format!("s_{}", uuid.replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{GraphDocument, StepDraft};

    fn make_test_graph(steps: Vec<(&str, Vec<&str>)>) -> PipelineGraph {
        let mut graph = PipelineGraph::new();
        for (uuid, _) in &steps {
            graph
                .add_step(StepDraft::new(uuid.to_uppercase(), format!("{}.py", uuid)).with_uuid(*uuid))
                .unwrap();
        }
        for (uuid, deps) in &steps {
            for dep in deps {
                graph.connect(dep, uuid).unwrap();
            }
        }
        graph
    }

    #[test]
    fn test_linear_dag() {
        let graph = make_test_graph(vec![("a", vec![]), ("b", vec!["a"]), ("c", vec!["b"])]);

        let dag = DagBuilder::build(&graph).unwrap();
        let order = dag.topological_order().unwrap();

        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_diamond_dag() {
        let graph = make_test_graph(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["a"]),
            ("d", vec!["b", "c"]),
        ]);

        let dag = DagBuilder::build(&graph).unwrap();
        let order = dag.topological_order().unwrap();

        assert_eq!(order[0], "a");
        assert_eq!(order[3], "d");
        assert_eq!(dag.dependencies("d").unwrap(), vec!["b", "c"]);
        assert_eq!(dag.dependents("a").unwrap(), vec!["b", "c"]);
    }

    #[test]
    fn test_cycle_in_loaded_document() {
        let doc = GraphDocument::from_json(
            r#"{ "steps": {
                "a": { "uuid": "a", "title": "A", "file_path": "a.py", "incoming_connections": ["b"] },
                "b": { "uuid": "b", "title": "B", "file_path": "b.py", "incoming_connections": ["a"] }
            } }"#,
        )
        .unwrap();

        let result = DagBuilder::build(&PipelineGraph::from_document(doc));
        match result {
            Err(StepgraphError::CircularDependency { path, .. }) => {
                assert_eq!(path.first(), path.last());
                assert!(path.len() >= 3);
            }
            _ => panic!("expected a cycle"),
        }
    }

    #[test]
    fn test_dangling_connection() {
        let doc = GraphDocument::from_json(
            r#"{ "steps": { "a": { "uuid": "a", "incoming_connections": ["ghost"] } } }"#,
        )
        .unwrap();

        let result = DagBuilder::build(&PipelineGraph::from_document(doc));
        assert!(matches!(result, Err(StepgraphError::StepNotFound { .. })));
    }

    #[test]
    fn test_depends_on_check() {
        let graph = make_test_graph(vec![("a", vec![]), ("b", vec!["a"]), ("c", vec!["b"])]);

        let dag = DagBuilder::build(&graph).unwrap();

        assert!(dag.depends_on("c", "a")); // transitive
        assert!(dag.depends_on("c", "b")); // direct
        assert!(!dag.depends_on("a", "c")); // reverse
        assert!(!dag.depends_on("a", "missing"));
    }

    #[test]
    fn test_mermaid_output() {
        let graph = make_test_graph(vec![("step-a", vec![]), ("step-b", vec!["step-a"])]);

        let dag = DagBuilder::build(&graph).unwrap();
        let mermaid = dag.to_mermaid();

        assert!(mermaid.contains("graph TD"));
        assert!(mermaid.contains("s_step_a[\"STEP-A\"]"));
        assert!(mermaid.contains("s_step_a --> s_step_b"));
    }

    #[test]
    fn test_dot_output() {
        let graph = make_test_graph(vec![("a", vec![]), ("b", vec!["a"]), ("lone", vec![])]);

        let dag = DagBuilder::build(&graph).unwrap();
        insta::assert_snapshot!(dag.to_dot(), @r###"
        digraph pipeline {
            rankdir=LR;
            node [shape=box, style=rounded];

            "a" [label="A"];
            "b" [label="B"];
            "lone" [label="LONE"];

            "a" -> "b";
        }
        "###);
    }

    #[test]
    fn test_text_output() {
        let graph = make_test_graph(vec![("a", vec![]), ("b", vec!["a"])]);

        let text = DagBuilder::build(&graph).unwrap().to_text().unwrap();
        assert_eq!(text, "1. A (a)\n2. B (b) [after: A]\n");
    }
}
