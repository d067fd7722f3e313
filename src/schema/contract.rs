//! Static kind→contract table and record validation.

use serde_json::Value;

use super::{Attributes, EdgeKind, NodeKind};
use crate::error::{SchemaError, SchemaProblem};

/// Declared type of a contract field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    NonNegativeInteger,
    /// Float constrained to [0.0, 1.0] (confidence, relevance, strength)
    Score,
    Flag,
    TextList,
}

/// One declared field of a kind contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
}

const fn required(name: &'static str, field_type: FieldType) -> FieldSpec {
    FieldSpec { name, field_type, required: true }
}

const fn optional(name: &'static str, field_type: FieldType) -> FieldSpec {
    FieldSpec { name, field_type, required: false }
}

const PAGE: &[FieldSpec] = &[
    required("url", FieldType::Text),
    optional("title", FieldType::Text),
    optional("type", FieldType::Text),
];

const SECTION: &[FieldSpec] = &[
    required("page_id", FieldType::Text),
    optional("order", FieldType::NonNegativeInteger),
    optional("heading", FieldType::Text),
    optional("parent_id", FieldType::Text),
    optional("required", FieldType::Flag),
];

const CONTENT_ITEM: &[FieldSpec] = &[
    optional("content_type", FieldType::Text),
    optional("text", FieldType::Text),
    optional("section_ids", FieldType::TextList),
];

const NAMED: &[FieldSpec] = &[
    required("name", FieldType::Text),
    optional("relevance", FieldType::Score),
];

const ENTITY: &[FieldSpec] = &[
    required("name", FieldType::Text),
    optional("entity_type", FieldType::Text),
    optional("confidence", FieldType::Score),
];

const CONTAINS: &[FieldSpec] = &[
    required("order", FieldType::Integer),
    optional("confidence", FieldType::Score),
    optional("required", FieldType::Flag),
];

const LINKS_TO: &[FieldSpec] = &[
    required("link_type", FieldType::Text),
    required("link_strength", FieldType::Score),
    optional("anchor_text", FieldType::Text),
    optional("context", FieldType::Text),
    optional("position", FieldType::Text),
];

const RELEVANCE: &[FieldSpec] = &[optional("relevance", FieldType::Score)];
const CONFIDENCE: &[FieldSpec] = &[optional("confidence", FieldType::Score)];
const SIMILARITY: &[FieldSpec] = &[optional("similarity", FieldType::Score)];

/// Field contract for a node kind
pub fn node_contract(kind: NodeKind) -> &'static [FieldSpec] {
    match kind {
        NodeKind::Page => PAGE,
        NodeKind::Section => SECTION,
        NodeKind::ContentItem => CONTENT_ITEM,
        NodeKind::Topic | NodeKind::Category | NodeKind::Persona => NAMED,
        NodeKind::Entity => ENTITY,
    }
}

/// Field contract for an edge kind
pub fn edge_contract(kind: EdgeKind) -> &'static [FieldSpec] {
    match kind {
        EdgeKind::Contains => CONTAINS,
        EdgeKind::LinksTo => LINKS_TO,
        EdgeKind::HasTopic | EdgeKind::Targets => RELEVANCE,
        EdgeKind::Mentions | EdgeKind::BelongsTo => CONFIDENCE,
        EdgeKind::RelatedTo => SIMILARITY,
        EdgeKind::SubtopicOf => &[],
    }
}

/// Node attributes that passed their kind contract
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedNode {
    kind: NodeKind,
    attributes: Attributes,
}

impl ValidatedNode {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn into_attributes(self) -> Attributes {
        self.attributes
    }
}

/// Edge properties that passed their kind contract
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEdge {
    kind: EdgeKind,
    properties: Attributes,
}

impl ValidatedEdge {
    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    pub fn properties(&self) -> &Attributes {
        &self.properties
    }

    pub fn into_properties(self) -> Attributes {
        self.properties
    }
}

/// Check a node record against the contract for `kind`.
///
/// Undeclared fields pass through unchanged.
pub fn validate_node(kind: NodeKind, record: Attributes) -> Result<ValidatedNode, SchemaError> {
    check_fields(kind.as_str(), node_contract(kind), &record)?;
    Ok(ValidatedNode { kind, attributes: record })
}

/// Check an edge property record against the contract for `kind`.
pub fn validate_edge(kind: EdgeKind, record: Attributes) -> Result<ValidatedEdge, SchemaError> {
    check_fields(kind.as_str(), edge_contract(kind), &record)?;
    Ok(ValidatedEdge { kind, properties: record })
}

fn check_fields(kind: &str, contract: &[FieldSpec], record: &Attributes) -> Result<(), SchemaError> {
    for spec in contract {
        match record.get(spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    return Err(SchemaError::new(kind, SchemaProblem::MissingField, spec.name));
                }
            }
            Some(value) => {
                check_value(spec.field_type, value)
                    .map_err(|problem| SchemaError::new(kind, problem, spec.name))?;
            }
        }
    }
    Ok(())
}

fn check_value(field_type: FieldType, value: &Value) -> Result<(), SchemaProblem> {
    match field_type {
        FieldType::Text if value.is_string() => Ok(()),
        FieldType::Flag if value.is_boolean() => Ok(()),
        FieldType::Integer if value.is_i64() || value.is_u64() => Ok(()),
        FieldType::NonNegativeInteger if value.is_u64() => Ok(()),
        FieldType::NonNegativeInteger if value.is_i64() => Err(SchemaProblem::OutOfRange),
        FieldType::Score => match value.as_f64() {
            Some(score) if (0.0..=1.0).contains(&score) => Ok(()),
            Some(_) => Err(SchemaProblem::OutOfRange),
            None => Err(SchemaProblem::TypeMismatch),
        },
        FieldType::TextList => match value.as_array() {
            Some(items) if items.iter().all(Value::is_string) => Ok(()),
            _ => Err(SchemaProblem::TypeMismatch),
        },
        _ => Err(SchemaProblem::TypeMismatch),
    }
}
