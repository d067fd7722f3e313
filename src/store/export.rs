//! Read-only exporters over the store's iteration order.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{GraphStats, GraphStore};
use crate::error::Result;
use crate::schema::{Attributes, Edge, Node};

/// Serializable copy of the whole graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub stats: GraphStats,
}

impl GraphStore {
    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().to_vec(),
            stats: self.stats(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_snapshot())?)
    }

    /// One Cypher `MERGE` statement per node, then one per edge.
    pub fn to_statements(&self) -> String {
        let mut out = String::new();
        for node in self.nodes() {
            let _ = write!(
                out,
                "MERGE (n:{} {{id: {}}})",
                node.kind,
                literal(&Value::String(node.id.clone()))
            );
            if !node.attributes.is_empty() {
                let _ = write!(out, " SET n += {}", map_literal(&node.attributes));
            }
            out.push_str(";\n");
        }
        for edge in self.edges() {
            let _ = write!(
                out,
                "MATCH (a {{id: {}}}), (b {{id: {}}}) MERGE (a)-[r:{}]->(b)",
                literal(&Value::String(edge.source_id.clone())),
                literal(&Value::String(edge.target_id.clone())),
                edge.kind
            );
            if !edge.properties.is_empty() {
                let _ = write!(out, " SET r += {}", map_literal(&edge.properties));
            }
            out.push_str(";\n");
        }
        out
    }

    /// Mermaid flowchart; edges with a missing endpoint are left out.
    pub fn to_diagram(&self) -> String {
        let mut out = String::from("graph TD\n");
        for (slot, node) in self.nodes().enumerate() {
            let label = node
                .attribute_str("title")
                .or_else(|| node.attribute_str("name"))
                .unwrap_or(&node.id);
            let _ = writeln!(out, "    n{}[\"{} ({})\"]", slot, escape_label(label), node.kind);
        }
        for edge in self.edges() {
            let (Some(&from), Some(&to)) = (
                self.node_slots.get(&edge.source_id),
                self.node_slots.get(&edge.target_id),
            ) else {
                continue;
            };
            let _ = writeln!(out, "    n{} -->|{}| n{}", from, edge.kind, to);
        }
        out
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", parts.join(", "))
        }
        // Nested maps are flattened to their JSON text
        Value::Object(_) => literal(&Value::String(value.to_string())),
        other => other.to_string(),
    }
}

fn map_literal(map: &Attributes) -> String {
    let parts: Vec<String> = map
        .iter()
        .map(|(key, value)| format!("`{}`: {}", key, literal(value)))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

fn escape_label(label: &str) -> String {
    label.replace('"', "#quot;")
}
