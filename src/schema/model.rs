//! Node and edge records with typed constructors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{EdgeKind, NodeKind};

/// Ordered key-value payload for nodes (attributes) and edges (properties)
pub type Attributes = BTreeMap<String, Value>;

/// A vertex in the site graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Caller-assigned, stable identifier
    pub id: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Node {
    pub fn new(kind: NodeKind, id: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            id: id.into(),
            kind,
            attributes,
        }
    }

    pub fn page(id: impl Into<String>, url: &str, title: &str) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert("url".into(), json!(url));
        attributes.insert("title".into(), json!(title));
        Self::new(NodeKind::Page, id, attributes)
    }

    pub fn section(id: impl Into<String>, page_id: &str, order: u64) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert("page_id".into(), json!(page_id));
        attributes.insert("order".into(), json!(order));
        Self::new(NodeKind::Section, id, attributes)
    }

    pub fn content_item(id: impl Into<String>, content_type: &str) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert("content_type".into(), json!(content_type));
        Self::new(NodeKind::ContentItem, id, attributes)
    }

    /// Topic, Category or Persona node carrying a display name.
    pub fn named(kind: NodeKind, id: impl Into<String>, name: &str) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), json!(name));
        Self::new(kind, id, attributes)
    }

    pub fn entity(id: impl Into<String>, name: &str, entity_type: &str) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), json!(name));
        attributes.insert("entity_type".into(), json!(entity_type));
        Self::new(NodeKind::Entity, id, attributes)
    }

    /// Attach (or replace) one attribute
    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Identity of an edge for deduplication: (source, target, kind)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
}

impl std::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source_id, self.kind, self.target_id)
    }
}

/// A directed relationship between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
    #[serde(default)]
    pub properties: Attributes,
}

impl Edge {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        kind: EdgeKind,
        properties: Attributes,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
            properties,
        }
    }

    /// CONTAINS edge with full confidence, as emitted by the containment extractor.
    pub fn contains(parent: &str, child: &str, order: i64, required: bool) -> Self {
        let mut properties = Attributes::new();
        properties.insert("order".into(), json!(order));
        properties.insert("confidence".into(), json!(1.0));
        properties.insert("required".into(), json!(required));
        Self::new(parent, child, EdgeKind::Contains, properties)
    }

    /// LINKS_TO edge with its two required properties; optional ones are
    /// added through `properties`.
    pub fn links_to(source: &str, target: &str, link_type: &str, strength: f64) -> Self {
        let mut properties = Attributes::new();
        properties.insert("link_type".into(), json!(link_type));
        properties.insert("link_strength".into(), json!(strength));
        Self::new(source, target, EdgeKind::LinksTo, properties)
    }

    /// Edge carrying a single score property such as `relevance` or `confidence`.
    pub fn scored(source: &str, target: &str, kind: EdgeKind, field: &str, score: f64) -> Self {
        let mut properties = Attributes::new();
        properties.insert(field.into(), json!(score));
        Self::new(source, target, kind, properties)
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source_id: self.source_id.clone(),
            target_id: self.target_id.clone(),
            kind: self.kind,
        }
    }

    /// `order` property, when present and integral
    pub fn order(&self) -> Option<i64> {
        self.properties.get("order").and_then(Value::as_i64)
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{validate_edge, validate_node};

    #[test]
    fn test_typed_constructors_satisfy_contracts() {
        let nodes = vec![
            Node::page("p1", "https://example.com/", "Home"),
            Node::section("s1", "p1", 0),
            Node::content_item("c1", "paragraph"),
            Node::named(NodeKind::Topic, "topic:mba", "MBA"),
            Node::named(NodeKind::Category, "category:programmes", "Programmes"),
            Node::named(NodeKind::Persona, "persona:students", "Students"),
            Node::entity("entity:london", "London", "location"),
        ];
        for node in nodes {
            assert!(validate_node(node.kind, node.attributes.clone()).is_ok(), "{:?}", node);
        }

        let edges = vec![
            Edge::contains("p1", "s1", 0, true),
            Edge::links_to("p1", "p2", "navigation", 0.95),
            Edge::scored("p1", "topic:mba", EdgeKind::HasTopic, "relevance", 0.8),
            Edge::scored("p1", "entity:london", EdgeKind::Mentions, "confidence", 0.9),
        ];
        for edge in edges {
            assert!(validate_edge(edge.kind, edge.properties.clone()).is_ok(), "{:?}", edge);
        }
    }

    #[test]
    fn test_edge_key_ignores_properties() {
        let a = Edge::contains("p1", "s1", 0, true);
        let b = Edge::contains("p1", "s1", 5, false);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().to_string(), "p1 -[CONTAINS]-> s1");
    }

    #[test]
    fn test_order_accessor() {
        let edge = Edge::contains("p1", "s1", 3, false);
        assert_eq!(edge.order(), Some(3));
        let edge = Edge::new("p1", "q1", EdgeKind::LinksTo, Attributes::new());
        assert_eq!(edge.order(), None);
    }
}
