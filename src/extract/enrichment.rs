//! Topic, persona, entity and category relationships from enrichment records.

use crate::error::{SchemaError, SchemaProblem};
use crate::records::EnrichmentRecord;
use crate::resolver::IdResolver;
use crate::schema::{validate_edge, Attributes, Edge, EdgeKind, Node, NodeKind};
use crate::store::GraphStore;

/// Intern the named nodes of one enrichment record into `store` and return
/// the edges tying them to the page.
///
/// Entries whose score fails the edge contract are logged and skipped
/// before their node is created; the rest of the record is still linked.
/// Nodes already present in the store are left untouched.
pub fn link_enrichment(
    store: &mut GraphStore,
    resolver: &mut IdResolver,
    record: &EnrichmentRecord,
) -> Vec<Edge> {
    let page_id = record.page_id.as_str();
    let mut edges = Vec::new();

    for topic in &record.topics {
        let Some(properties) = entry_score(EdgeKind::HasTopic, "relevance", topic.relevance, &topic.name) else {
            continue;
        };
        let Some(topic_id) = ensure_named(store, resolver, NodeKind::Topic, &topic.name, None) else {
            continue;
        };
        edges.push(Edge::new(page_id, topic_id.as_str(), EdgeKind::HasTopic, properties));

        if let Some(parent) = topic.parent.as_deref() {
            if let Some(parent_id) = ensure_named(store, resolver, NodeKind::Topic, parent, None) {
                if parent_id != topic_id {
                    edges.push(Edge::new(topic_id, parent_id, EdgeKind::SubtopicOf, Attributes::new()));
                }
            }
        }
    }

    for persona in &record.personas {
        let Some(properties) = entry_score(EdgeKind::Targets, "relevance", persona.relevance, &persona.name) else {
            continue;
        };
        if let Some(persona_id) = ensure_named(store, resolver, NodeKind::Persona, &persona.name, None) {
            edges.push(Edge::new(page_id, persona_id, EdgeKind::Targets, properties));
        }
    }

    for entity in &record.entities {
        let Some(properties) = entry_score(EdgeKind::Mentions, "confidence", entity.confidence, &entity.name) else {
            continue;
        };
        let entity_type = Some(entity.entity_type.as_str());
        if let Some(entity_id) = ensure_named(store, resolver, NodeKind::Entity, &entity.name, entity_type) {
            edges.push(Edge::new(page_id, entity_id, EdgeKind::Mentions, properties));
        }
    }

    if let Some(category) = record.category.as_deref() {
        if let Some(category_id) = ensure_named(store, resolver, NodeKind::Category, category, None) {
            edges.push(Edge::scored(page_id, &category_id, EdgeKind::BelongsTo, "confidence", 1.0));
        }
    }

    log::debug!("Enrichment for {}: {} edges", page_id, edges.len());
    edges
}

/// RELATED_TO edge from an externally computed similarity score
pub fn relate_pages(a: &str, b: &str, similarity: f64) -> Result<Edge, SchemaError> {
    let properties = score_properties(EdgeKind::RelatedTo, "similarity", similarity)?;
    Ok(Edge::new(a, b, EdgeKind::RelatedTo, properties))
}

/// Single-score property map checked against the contract of `kind`.
/// NaN and infinities are out of range.
fn score_properties(kind: EdgeKind, field: &str, score: f64) -> Result<Attributes, SchemaError> {
    if !score.is_finite() {
        return Err(SchemaError::new(kind.as_str(), SchemaProblem::OutOfRange, field));
    }
    let edge = Edge::scored("", "", kind, field, score);
    Ok(validate_edge(kind, edge.properties)?.into_properties())
}

fn entry_score(kind: EdgeKind, field: &str, score: f64, name: &str) -> Option<Attributes> {
    match score_properties(kind, field, score) {
        Ok(properties) => Some(properties),
        Err(e) => {
            log::warn!("Skipping enrichment entry {:?}: {}", name, e);
            None
        }
    }
}

fn ensure_named(
    store: &mut GraphStore,
    resolver: &mut IdResolver,
    kind: NodeKind,
    name: &str,
    entity_type: Option<&str>,
) -> Option<String> {
    let Some(interned) = resolver.intern(kind, name) else {
        log::warn!("Skipping {} with unusable name {:?}", kind, name);
        return None;
    };
    if store.contains_node(&interned.id) {
        return Some(interned.id);
    }

    let node = match entity_type {
        Some(entity_type) => Node::entity(interned.id.clone(), name.trim(), entity_type),
        None => Node::named(kind, interned.id.clone(), name.trim()),
    };
    if let Err(e) = store.insert_node(node) {
        log::warn!("Skipping {} {}: {}", kind, interned.id, e);
        return None;
    }
    Some(interned.id)
}
