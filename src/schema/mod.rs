//! Schema registry: the fixed node and edge kinds plus their field contracts.
//!
//! Every record entering the graph store is checked against the contract of
//! its kind. Typed constructors on [`Node`] and [`Edge`] produce records that
//! satisfy their contract by construction.

mod contract;
mod model;

pub use contract::{
    edge_contract, node_contract, validate_edge, validate_node, FieldSpec, FieldType,
    ValidatedEdge, ValidatedNode,
};
pub use model::{Attributes, Edge, EdgeKey, Node};

use serde::{Deserialize, Serialize};

/// Classification of a vertex in the site graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// A web page; the root kind of the containment hierarchy
    Page,
    /// A structural region of a page (may nest)
    Section,
    /// A unit of content within a section
    ContentItem,
    Topic,
    Category,
    /// Audience segment a page targets
    Persona,
    /// Named entity mentioned by a page
    Entity,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Page,
        NodeKind::Section,
        NodeKind::ContentItem,
        NodeKind::Topic,
        NodeKind::Category,
        NodeKind::Persona,
        NodeKind::Entity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Page => "Page",
            NodeKind::Section => "Section",
            NodeKind::ContentItem => "ContentItem",
            NodeKind::Topic => "Topic",
            NodeKind::Category => "Category",
            NodeKind::Persona => "Persona",
            NodeKind::Entity => "Entity",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(|c: char| c == '_' || c == '-', "").as_str() {
            "page" => Ok(NodeKind::Page),
            "section" => Ok(NodeKind::Section),
            "contentitem" => Ok(NodeKind::ContentItem),
            "topic" => Ok(NodeKind::Topic),
            "category" => Ok(NodeKind::Category),
            "persona" => Ok(NodeKind::Persona),
            "entity" => Ok(NodeKind::Entity),
            _ => Err(format!("Unknown node kind: {}", s)),
        }
    }
}

/// Classification of a directed relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Ordered structural containment (Page→Section, Section→Section, Section→ContentItem)
    Contains,
    /// Hyperlink between two pages
    LinksTo,
    HasTopic,
    BelongsTo,
    Targets,
    Mentions,
    RelatedTo,
    SubtopicOf,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 8] = [
        EdgeKind::Contains,
        EdgeKind::LinksTo,
        EdgeKind::HasTopic,
        EdgeKind::BelongsTo,
        EdgeKind::Targets,
        EdgeKind::Mentions,
        EdgeKind::RelatedTo,
        EdgeKind::SubtopicOf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "CONTAINS",
            EdgeKind::LinksTo => "LINKS_TO",
            EdgeKind::HasTopic => "HAS_TOPIC",
            EdgeKind::BelongsTo => "BELONGS_TO",
            EdgeKind::Targets => "TARGETS",
            EdgeKind::Mentions => "MENTIONS",
            EdgeKind::RelatedTo => "RELATED_TO",
            EdgeKind::SubtopicOf => "SUBTOPIC_OF",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EdgeKind::ALL
            .iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown edge kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_roundtrip_display() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.to_string().parse::<NodeKind>().unwrap(), kind);
        }
        assert_eq!("content_item".parse::<NodeKind>().unwrap(), NodeKind::ContentItem);
        assert!("widget".parse::<NodeKind>().is_err());
    }

    #[test]
    fn test_edge_kind_parse() {
        assert_eq!("links_to".parse::<EdgeKind>().unwrap(), EdgeKind::LinksTo);
        assert_eq!("SUBTOPIC_OF".parse::<EdgeKind>().unwrap(), EdgeKind::SubtopicOf);
        assert!("FOLLOWS".parse::<EdgeKind>().is_err());
    }

    #[test]
    fn test_edge_kind_serde_matches_display() {
        let json = serde_json::to_string(&EdgeKind::HasTopic).unwrap();
        assert_eq!(json, "\"HAS_TOPIC\"");
        let json = serde_json::to_string(&NodeKind::ContentItem).unwrap();
        assert_eq!(json, "\"ContentItem\"");
    }
}
