// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Sequence-flow graph of a scanned diagram
//!
//! Gives the terminal views a sensible element order (start events first,
//! then along the flow) and a Graphviz export with KPI-linked nodes marked.

use crate::diagram::{DiagramElement, KpiLink};
use crate::kpi::KpiTable;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Directed graph of flow nodes connected by sequence flows
pub struct ProcessFlow<'a> {
    /// The underlying directed graph; weights index into `nodes`
    graph: DiGraph<usize, String>,
    /// Map from element id to node index
    node_indices: HashMap<&'a str, NodeIndex>,
    /// Flow nodes in document order
    nodes: Vec<&'a DiagramElement>,
}

impl<'a> ProcessFlow<'a> {
    /// Build the graph from scanned elements.
    ///
    /// Sequence flows whose endpoints are not flow nodes are ignored.
    #[must_use]
    pub fn build(elements: &'a [DiagramElement]) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        let mut nodes = Vec::new();

        for element in elements.iter().filter(|e| !e.is_flow()) {
            if node_indices.contains_key(element.id.as_str()) {
                continue;
            }
            let idx = graph.add_node(nodes.len());
            node_indices.insert(element.id.as_str(), idx);
            nodes.push(element);
        }

        for flow in elements.iter().filter(|e| e.is_flow()) {
            if let (Some(from), Some(to)) = (
                flow.source_ref.as_deref().and_then(|s| node_indices.get(s)),
                flow.target_ref.as_deref().and_then(|t| node_indices.get(t)),
            ) {
                graph.add_edge(*from, *to, flow.id.clone());
            }
        }

        Self { graph, node_indices, nodes }
    }

    /// Get node count
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Ids of the nodes directly after `id`
    #[must_use]
    pub fn successors(&self, id: &str) -> Vec<&'a str> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Ids of the nodes directly before `id`
    #[must_use]
    pub fn predecessors(&self, id: &str) -> Vec<&'a str> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, dir: Direction) -> Vec<&'a str> {
        let Some(&idx) = self.node_indices.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<&'a str> = self
            .graph
            .neighbors_directed(idx, dir)
            .map(|n| self.nodes[self.graph[n]].id.as_str())
            .collect();
        // petgraph yields neighbours newest-edge first
        out.reverse();
        out
    }

    /// Flow nodes ordered breadth-first from the entry nodes.
    ///
    /// Entry nodes are those without incoming flows; nodes unreachable from
    /// any entry (e.g. inside a cycle) follow in document order.
    #[must_use]
    pub fn ordered(&self) -> Vec<&'a DiagramElement> {
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        let entries: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&n| self.graph.neighbors_directed(n, Direction::Incoming).next().is_none())
            .collect();

        for start in entries.into_iter().chain(self.graph.node_indices()) {
            if visited.contains(&start) {
                continue;
            }
            let mut bfs = Bfs::new(&self.graph, start);
            while let Some(n) = bfs.next(&self.graph) {
                if visited.insert(n) {
                    order.push(self.nodes[self.graph[n]]);
                }
            }
        }

        order
    }

    /// Export to DOT format for Graphviz, filling KPI-linked nodes
    #[must_use]
    pub fn to_dot(&self, table: Option<&KpiTable>) -> String {
        let mut dot = String::from("digraph process {\n");
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [shape=box, style=rounded];\n\n");

        for element in &self.nodes {
            let shape = match element.kind.as_str() {
                k if k.ends_with("Event") => "circle",
                k if k.ends_with("Gateway") => "diamond",
                _ => "box",
            };
            let mut label = escape_dot(element.label());
            let style = match KpiLink::resolve(element, table) {
                KpiLink::Matched(record) => {
                    if let Some(target) = record.target() {
                        label.push_str(&format!("\\ntarget: {}", escape_dot(target)));
                    }
                    ", style=\"rounded,filled\", fillcolor=\"#c8e6c9\""
                }
                KpiLink::Unmatched(_) => ", style=\"rounded,dashed\", color=\"#e65100\"",
                KpiLink::Untagged => "",
            };
            dot.push_str(&format!(
                "  \"{}\" [label=\"{}\", shape={}{}];\n",
                escape_dot(&element.id),
                label,
                shape,
                style
            ));
        }

        dot.push('\n');

        for edge in self.graph.edge_indices() {
            if let Some((from, to)) = self.graph.edge_endpoints(edge) {
                dot.push_str(&format!(
                    "  \"{}\" -> \"{}\";\n",
                    escape_dot(&self.nodes[self.graph[from]].id),
                    escape_dot(&self.nodes[self.graph[to]].id)
                ));
            }
        }

        dot.push_str("}\n");
        dot
    }
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
