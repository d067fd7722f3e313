//! Indexed in-memory property graph.
//!
//! Nodes and edges live in insertion-ordered slot vectors; point lookups,
//! per-kind enumeration and per-endpoint edge enumeration are all served by
//! hash indices over those slots. Overwrites reuse the original slot, so
//! iteration (and therefore every export) follows first-insertion order.

mod export;

pub use export::GraphSnapshot;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;
use crate::schema::{validate_edge, validate_node, Attributes, Edge, EdgeKey, EdgeKind, Node, NodeKind};

/// Node and edge counts, overall and per kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes_by_kind: BTreeMap<NodeKind, usize>,
    pub edges_by_kind: BTreeMap<EdgeKind, usize>,
}

/// Single-writer directed multigraph keyed by caller-assigned ids
#[derive(Debug, Default, Clone)]
pub struct GraphStore {
    nodes: Vec<Node>,
    node_slots: HashMap<String, usize>,
    nodes_by_kind: HashMap<NodeKind, BTreeSet<usize>>,
    edges: Vec<Edge>,
    edge_slots: HashMap<EdgeKey, usize>,
    edges_by_kind: HashMap<EdgeKind, Vec<usize>>,
    outgoing: HashMap<String, Vec<usize>>,
    incoming: HashMap<String, Vec<usize>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a node after checking its attributes against the
    /// kind contract.
    ///
    /// Overwriting with a different kind moves the id to the new kind index.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        id: &str,
        attributes: Attributes,
    ) -> Result<(), SchemaError> {
        let attributes = validate_node(kind, attributes)?.into_attributes();
        let node = Node::new(kind, id, attributes);

        match self.node_slots.get(id) {
            Some(&slot) => {
                let previous = self.nodes[slot].kind;
                if previous != kind {
                    log::debug!("Node {} replaced: {} -> {}", id, previous, kind);
                    if let Some(ids) = self.nodes_by_kind.get_mut(&previous) {
                        ids.remove(&slot);
                    }
                    self.nodes_by_kind.entry(kind).or_default().insert(slot);
                }
                self.nodes[slot] = node;
            }
            None => {
                let slot = self.nodes.len();
                self.nodes.push(node);
                self.node_slots.insert(id.to_string(), slot);
                self.nodes_by_kind.entry(kind).or_default().insert(slot);
            }
        }
        Ok(())
    }

    pub fn insert_node(&mut self, node: Node) -> Result<(), SchemaError> {
        let Node { id, kind, attributes } = node;
        self.add_node(kind, &id, attributes)
    }

    /// Insert or overwrite an edge keyed by its identity triple.
    ///
    /// Endpoints are not required to exist yet; dangling references are
    /// reported by validation, not rejected here.
    pub fn add_edge(
        &mut self,
        source_id: &str,
        target_id: &str,
        kind: EdgeKind,
        properties: Attributes,
    ) -> Result<(), SchemaError> {
        let properties = validate_edge(kind, properties)?.into_properties();
        let edge = Edge::new(source_id, target_id, kind, properties);
        let key = edge.key();

        match self.edge_slots.get(&key) {
            Some(&slot) => {
                self.edges[slot].properties = edge.properties;
            }
            None => {
                let slot = self.edges.len();
                self.outgoing.entry(edge.source_id.clone()).or_default().push(slot);
                self.incoming.entry(edge.target_id.clone()).or_default().push(slot);
                self.edges_by_kind.entry(kind).or_default().push(slot);
                self.edges.push(edge);
                self.edge_slots.insert(key, slot);
            }
        }
        Ok(())
    }

    pub fn insert_edge(&mut self, edge: Edge) -> Result<(), SchemaError> {
        let Edge { source_id, target_id, kind, properties } = edge;
        self.add_edge(&source_id, &target_id, kind, properties)
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.node_slots.get(id).map(|&slot| &self.nodes[slot])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_slots.contains_key(id)
    }

    pub fn get_edge(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edge_slots.get(key).map(|&slot| &self.edges[slot])
    }

    /// Edges matching every supplied filter.
    ///
    /// The most selective available index (source, then target, then kind)
    /// picks the candidate slots; no filters returns every edge.
    pub fn get_edges(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        kind: Option<EdgeKind>,
    ) -> Vec<&Edge> {
        let matches = |edge: &Edge| {
            from.map_or(true, |f| edge.source_id == f)
                && to.map_or(true, |t| edge.target_id == t)
                && kind.map_or(true, |k| edge.kind == k)
        };

        let slots = if let Some(from) = from {
            Some(slots_of(self.outgoing.get(from)))
        } else if let Some(to) = to {
            Some(slots_of(self.incoming.get(to)))
        } else {
            kind.map(|k| slots_of(self.edges_by_kind.get(&k)))
        };

        match slots {
            Some(slots) => slots
                .iter()
                .map(|&slot| &self.edges[slot])
                .filter(|edge| matches(*edge))
                .collect(),
            None => self.edges.iter().collect(),
        }
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> + '_ {
        self.nodes_by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .map(move |&slot| &self.nodes[slot])
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> + '_ {
        slots_of(self.edges_by_kind.get(&kind))
            .iter()
            .map(move |&slot| &self.edges[slot])
    }

    /// Nodes of `kind` whose attributes equal every filter value exactly.
    pub fn query(&self, kind: NodeKind, filters: &Attributes) -> Vec<&Node> {
        self.nodes_of_kind(kind)
            .filter(|node| {
                filters
                    .iter()
                    .all(|(key, expected)| node.attributes.get(key) == Some(expected))
            })
            .collect()
    }

    /// Convenience for a single exact-match filter.
    pub fn find_by(&self, kind: NodeKind, key: &str, value: Value) -> Vec<&Node> {
        let mut filters = Attributes::new();
        filters.insert(key.to_string(), value);
        self.query(kind, &filters)
    }

    /// Number of incident edges (in + out); self-loops count twice.
    pub fn degree(&self, id: &str) -> usize {
        slots_of(self.outgoing.get(id)).len() + slots_of(self.incoming.get(id)).len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            nodes_by_kind: self
                .nodes_by_kind
                .iter()
                .filter(|(_, ids)| !ids.is_empty())
                .map(|(kind, ids)| (*kind, ids.len()))
                .collect(),
            edges_by_kind: self
                .edges_by_kind
                .iter()
                .map(|(kind, slots)| (*kind, slots.len()))
                .collect(),
        }
    }
}

fn slots_of(slots: Option<&Vec<usize>>) -> &[usize] {
    slots.map(Vec::as_slice).unwrap_or(&[])
}
