//! Graph descriptions: what the renderer hands to the layout engine.
//!
//! Nodes are keyed by string id and carry ordered attribute lists. Adding a
//! node that already exists merges attributes; adding an edge creates any
//! missing endpoint. Subgraphs group existing nodes under layout
//! constraints such as `rank=same`.

use std::collections::HashMap;
use std::fmt::Write as _;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};

/// Ordered `key=value` attributes. Setting an existing key replaces it in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attrs(Vec<(String, String)>);

impl Attrs {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn merge(&mut self, other: Attrs) {
        for (k, v) in other.0 {
            self.set(&k, v);
        }
    }

    fn to_dot(&self) -> String {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(k, v)| format!("{}={}", k, quote(v)))
            .collect();
        parts.join(", ")
    }
}

#[derive(Clone, Debug)]
pub struct GraphNode {
    pub id: String,
    pub attrs: Attrs,
}

#[derive(Clone, Debug)]
pub struct GraphEdge {
    pub attrs: Attrs,
}

#[derive(Clone, Debug)]
pub struct Subgraph {
    pub name: String,
    pub members: Vec<String>,
    pub attrs: Attrs,
}

/// A directed, non-strict graph of string-keyed nodes.
#[derive(Clone, Debug, Default)]
pub struct GraphDescription {
    graph: StableDiGraph<GraphNode, GraphEdge>,
    index: HashMap<String, NodeIndex>,
    subgraphs: Vec<Subgraph>,
    attrs: Attrs,
}

impl GraphDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph-level attribute, e.g. `rankdir`.
    pub fn set_attr(&mut self, key: &str, value: impl ToString) {
        self.attrs.set(key, value);
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Add a node, or merge `attrs` into the existing node with this id.
    pub fn add_node(&mut self, id: &str, attrs: Attrs) -> NodeIndex {
        match self.index.get(id) {
            Some(&idx) => {
                self.graph[idx].attrs.merge(attrs);
                idx
            }
            None => {
                let idx = self.graph.add_node(GraphNode {
                    id: id.to_string(),
                    attrs,
                });
                self.index.insert(id.to_string(), idx);
                idx
            }
        }
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Add a directed edge; missing endpoints are created without attributes.
    pub fn add_edge(&mut self, from: &str, to: &str, attrs: Attrs) {
        let a = self.add_node(from, Attrs::new());
        let b = self.add_node(to, Attrs::new());
        self.graph.add_edge(a, b, GraphEdge { attrs });
    }

    /// First edge from `from` to `to`, if any.
    pub fn edge(&self, from: &str, to: &str) -> Option<&GraphEdge> {
        let a = *self.index.get(from)?;
        let b = *self.index.get(to)?;
        self.graph.find_edge(a, b).map(|e| &self.graph[e])
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Ids of the nodes `id` has edges to, in insertion order.
    pub fn successors(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        // petgraph walks outgoing edges newest first
        let mut out: Vec<&str> = self
            .graph
            .neighbors(idx)
            .map(|n| self.graph[n].id.as_str())
            .collect();
        out.reverse();
        out
    }

    /// Group existing nodes into a named subgraph.
    pub fn add_subgraph(&mut self, name: &str, members: &[&str], attrs: Attrs) -> &mut Subgraph {
        for m in members {
            self.add_node(m, Attrs::new());
        }
        self.subgraphs.push(Subgraph {
            name: name.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            attrs,
        });
        let last = self.subgraphs.len() - 1;
        &mut self.subgraphs[last]
    }

    pub fn subgraph(&self, name: &str) -> Option<&Subgraph> {
        self.subgraphs.iter().find(|s| s.name == name)
    }

    pub fn subgraphs(&self) -> &[Subgraph] {
        &self.subgraphs
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// Emit the description in the DOT language.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        out.push_str("digraph {\n");
        if !self.attrs.is_empty() {
            let _ = writeln!(out, "  graph [{}];", self.attrs.to_dot());
        }
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            if node.attrs.is_empty() {
                let _ = writeln!(out, "  {};", quote(&node.id));
            } else {
                let _ = writeln!(out, "  {} [{}];", quote(&node.id), node.attrs.to_dot());
            }
        }
        for sub in &self.subgraphs {
            let _ = writeln!(out, "  subgraph {} {{", quote(&sub.name));
            if !sub.attrs.is_empty() {
                let _ = writeln!(out, "    graph [{}];", sub.attrs.to_dot());
            }
            for m in &sub.members {
                let _ = writeln!(out, "    {};", quote(m));
            }
            out.push_str("  }\n");
        }
        for e in self.graph.edge_indices() {
            let Some((a, b)) = self.graph.edge_endpoints(e) else {
                continue;
            };
            let from = quote(&self.graph[a].id);
            let to = quote(&self.graph[b].id);
            let attrs = &self.graph[e].attrs;
            if attrs.is_empty() {
                let _ = writeln!(out, "  {} -> {};", from, to);
            } else {
                let _ = writeln!(out, "  {} -> {} [{}];", from, to, attrs.to_dot());
            }
        }
        out.push_str("}\n");
        out
    }
}

/// Quote a DOT identifier or attribute value.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
