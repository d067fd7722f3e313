//! Relationship Builder: runs every extractor over one batch of records and
//! merges the results into a deduplicated, kind-grouped edge set.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::task;

use crate::config::Config;
use crate::error::{GraphError, Result};
use crate::extract::{ContainmentExtractor, LinkExtractor};
use crate::records::{ContentItemRecord, PageRecord, SectionRecord};
use crate::resolver::IdResolver;
use crate::schema::{Attributes, Edge, EdgeKey, EdgeKind, NodeKind};
use crate::store::GraphStore;
use crate::validation::{ValidationReport, Validator};

/// Deduplicated edges from one build pass, in extraction order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelationshipSet {
    edges: Vec<Edge>,
}

impl RelationshipSet {
    pub fn new(edges: Vec<Edge>) -> Self {
        Self {
            edges: dedupe_edges(edges),
        }
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn into_edges(self) -> Vec<Edge> {
        self.edges
    }

    /// Add edges from another source (e.g. enrichment), keeping identity
    /// triples unique.
    pub fn extend<I: IntoIterator<Item = Edge>>(&mut self, edges: I) {
        let mut all = std::mem::take(&mut self.edges);
        all.extend(edges);
        self.edges = dedupe_edges(all);
    }

    pub fn by_kind(&self) -> BTreeMap<EdgeKind, Vec<&Edge>> {
        let mut grouped: BTreeMap<EdgeKind, Vec<&Edge>> = BTreeMap::new();
        for edge in &self.edges {
            grouped.entry(edge.kind).or_default().push(edge);
        }
        grouped
    }

    pub fn of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |edge| edge.kind == kind)
    }

    pub fn kind_counts(&self) -> BTreeMap<EdgeKind, usize> {
        let mut counts = BTreeMap::new();
        for edge in &self.edges {
            *counts.entry(edge.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// SHA-256 over the edges in identity order; equal sets give equal
    /// fingerprints regardless of extraction order.
    pub fn fingerprint(&self) -> String {
        let mut sorted: Vec<&Edge> = self.edges.iter().collect();
        sorted.sort_by_key(|edge| edge.key());

        let mut hasher = Sha256::new();
        for edge in sorted {
            hasher.update(edge.key().to_string().as_bytes());
            for (key, value) in &edge.properties {
                hasher.update(b"\x1f");
                hasher.update(key.as_bytes());
                hasher.update(b"=");
                hasher.update(value.to_string().as_bytes());
            }
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Collapse edges sharing an identity triple: the first occurrence keeps its
/// position, the last one's properties win.
pub fn dedupe_edges(edges: Vec<Edge>) -> Vec<Edge> {
    let mut slots: HashMap<EdgeKey, usize> = HashMap::new();
    let mut unique: Vec<Edge> = Vec::with_capacity(edges.len());

    for edge in edges {
        let key = edge.key();
        match slots.get(&key) {
            Some(&slot) => {
                log::debug!("Duplicate edge {} replaced", key);
                unique[slot].properties = edge.properties;
            }
            None => {
                slots.insert(key, unique.len());
                unique.push(edge);
            }
        }
    }
    unique
}

/// Outcome of loading records into a store as nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// Insert Page, Section and ContentItem nodes for one batch of records.
///
/// Records without an id or failing their node contract are logged and
/// counted as skipped.
pub fn ingest_nodes(
    store: &mut GraphStore,
    pages: &[PageRecord],
    sections: &[SectionRecord],
    items: &[ContentItemRecord],
) -> IngestSummary {
    let mut summary = IngestSummary::default();
    let mut record = |kind: NodeKind, id: Option<&str>, attributes: Attributes| {
        let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) else {
            log::warn!("Skipping {} record without id", kind);
            summary.skipped += 1;
            return;
        };
        match store.add_node(kind, id, attributes) {
            Ok(()) => summary.inserted += 1,
            Err(e) => {
                log::warn!("Skipping {} {}: {}", kind, id, e);
                summary.skipped += 1;
            }
        }
    };

    for page in pages {
        record(NodeKind::Page, Some(page.id.as_str()), page.to_node().attributes);
    }
    for section in sections {
        record(NodeKind::Section, section.id.as_deref(), section.to_attributes());
    }
    for item in items {
        record(NodeKind::ContentItem, item.id.as_deref(), item.to_attributes());
    }

    log::info!(
        "Ingested {} nodes ({} skipped)",
        summary.inserted,
        summary.skipped
    );
    summary
}

/// Write a built set into `store`. Returns the number of edges written;
/// edges failing their contract are logged and skipped.
pub fn populate_store(store: &mut GraphStore, set: &RelationshipSet) -> usize {
    let mut written = 0;
    for edge in set.edges() {
        match store.insert_edge(edge.clone()) {
            Ok(()) => written += 1,
            Err(e) => log::warn!("Skipping edge {}: {}", edge.key(), e),
        }
    }
    log::debug!("Wrote {} of {} edges to the store", written, set.len());
    written
}

/// Coordinates the containment and link extractors for one build pass
#[derive(Debug, Clone)]
pub struct RelationshipBuilder {
    containment: ContainmentExtractor,
    links: LinkExtractor,
    validator: Validator,
    last_built: Option<RelationshipSet>,
}

impl Default for RelationshipBuilder {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl RelationshipBuilder {
    pub fn new(config: &Config) -> Self {
        let validator = Validator::new(&config.validation);
        Self {
            containment: ContainmentExtractor::new(validator.clone()),
            links: LinkExtractor::new(config.links.clone(), config.graph.base_domain.clone()),
            validator,
            last_built: None,
        }
    }

    /// Derive every CONTAINS and LINKS_TO edge for the batch.
    ///
    /// Sections are grouped by page in first-seen order. Sections naming a
    /// parent section hang off that parent only; the rest hang off their
    /// page. A content item listing several sections gets an edge from each.
    pub fn build_all_relationships(
        &mut self,
        pages: &[PageRecord],
        sections: &[SectionRecord],
        items: &[ContentItemRecord],
    ) -> RelationshipSet {
        self.containment.clear();
        let mut edges = Vec::new();

        for (page_id, group) in group_by_first_seen(sections, |s| vec![s.page_id.as_str()]) {
            let (nested, top): (Vec<&SectionRecord>, Vec<&SectionRecord>) =
                group.into_iter().partition(|s| has_parent(s));
            edges.extend(self.containment.extract_page_sections(page_id, top));
            edges.extend(self.containment.extract_nested_sections(nested));
        }

        for item in items.iter().filter(|item| item.section_ids.is_empty()) {
            log::warn!("Content item {:?} lists no sections", item.id);
        }
        let by_section = group_by_first_seen(items, |item| {
            item.section_ids.iter().map(String::as_str).collect()
        });
        for (section_id, group) in by_section {
            edges.extend(self.containment.extract_section_content(section_id, group));
        }

        let resolver = IdResolver::from_pages(pages);
        edges.extend(self.links.build_link_graph_with(pages, &resolver));

        let set = RelationshipSet::new(edges);
        let counts: Vec<String> = set
            .kind_counts()
            .iter()
            .map(|(kind, count)| format!("{}={}", kind, count))
            .collect();
        log::info!(
            "Built {} relationships from {} pages, {} sections, {} content items [{}]",
            set.len(),
            pages.len(),
            sections.len(),
            items.len(),
            counts.join(", ")
        );

        self.last_built = Some(set.clone());
        set
    }

    /// Same pass as [`Self::build_all_relationships`], run on a blocking
    /// task. The builder is handed back alongside the set.
    pub async fn build_all_relationships_async(
        mut self,
        pages: Vec<PageRecord>,
        sections: Vec<SectionRecord>,
        items: Vec<ContentItemRecord>,
    ) -> Result<(Self, RelationshipSet)> {
        task::spawn_blocking(move || {
            let set = self.build_all_relationships(&pages, &sections, &items);
            (self, set)
        })
        .await
        .map_err(|e| GraphError::Task(e.to_string()))
    }

    /// Hierarchy checks over `edges`, then endpoint and orphan checks when a
    /// store is supplied.
    ///
    /// Without explicit edges the last built set is checked, or failing that
    /// the store's own edges.
    pub fn validate_relationships(
        &self,
        store: Option<&GraphStore>,
        edges: Option<&[Edge]>,
    ) -> ValidationReport {
        let edges: &[Edge] = match (edges, &self.last_built, store) {
            (Some(edges), _, _) => edges,
            (None, Some(set), _) => set.edges(),
            (None, None, Some(store)) => store.edges(),
            (None, None, None) => &[],
        };

        let mut report = self.containment.validate_hierarchy(edges);
        if let Some(store) = store {
            report.merge(self.validator.validate_references(edges, store));
        }
        log::info!(
            "Relationship validation: valid={} errors={} warnings={}",
            report.is_valid,
            report.errors,
            report.warnings
        );
        report
    }

    pub fn last_built(&self) -> Option<&RelationshipSet> {
        self.last_built.as_ref()
    }

    pub fn containment(&self) -> &ContainmentExtractor {
        &self.containment
    }

    pub fn links(&self) -> &LinkExtractor {
        &self.links
    }
}

fn has_parent(section: &SectionRecord) -> bool {
    section
        .parent_id
        .as_deref()
        .map_or(false, |parent| !parent.trim().is_empty())
}

/// Bucket records under each key they report, keeping first-seen key order.
fn group_by_first_seen<'a, T, F>(records: &'a [T], keys: F) -> Vec<(&'a str, Vec<&'a T>)>
where
    F: Fn(&'a T) -> Vec<&'a str>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&T>)> = Vec::new();
    for record in records {
        for key in keys(record) {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push((key, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(record);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::HyperlinkRecord;
    use crate::schema::Node;
    use crate::validation::IssueCode;
    use serde_json::json;

    fn scenario() -> (Vec<PageRecord>, Vec<SectionRecord>, Vec<ContentItemRecord>) {
        let pages = vec![
            PageRecord::new("P", "https://example.com/").with_link(
                HyperlinkRecord::new("/mba", "Our MBA Programme").at("navigation"),
            ),
            PageRecord::new("Q", "https://example.com/mba"),
        ];
        let sections = vec![SectionRecord::new("S1", "P", 0), SectionRecord::new("S2", "P", 1)];
        let items = vec![ContentItemRecord::new("C1", &["S1"])];
        (pages, sections, items)
    }

    #[test]
    fn test_end_to_end_scenario() {
        let (pages, sections, items) = scenario();
        let mut builder = RelationshipBuilder::default();
        let set = builder.build_all_relationships(&pages, &sections, &items);

        assert_eq!(set.len(), 4);
        let contains: Vec<(&str, &str, Option<i64>)> = set
            .of_kind(EdgeKind::Contains)
            .map(|e| (e.source_id.as_str(), e.target_id.as_str(), e.order()))
            .collect();
        assert_eq!(
            contains,
            vec![("P", "S1", Some(0)), ("P", "S2", Some(1)), ("S1", "C1", Some(0))]
        );

        let link = set.of_kind(EdgeKind::LinksTo).next().unwrap();
        assert_eq!((link.source_id.as_str(), link.target_id.as_str()), ("P", "Q"));
        assert_eq!(link.property_str("link_type"), Some("navigation"));
        assert_eq!(link.property_str("anchor_text"), Some("Our MBA Programme"));

        let mut store = GraphStore::new();
        let summary = ingest_nodes(&mut store, &pages, &sections, &items);
        assert_eq!(summary, IngestSummary { inserted: 5, skipped: 0 });

        let report = builder.validate_relationships(Some(&store), None);
        assert!(report.is_valid, "{:?}", report.issues);
        assert_eq!(report.errors, 0);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let (pages, sections, items) = scenario();
        let mut builder = RelationshipBuilder::default();
        let first = builder.build_all_relationships(&pages, &sections, &items);
        let second = builder.build_all_relationships(&pages, &sections, &items);
        assert_eq!(first, second);
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(builder.containment().children_of("P").len(), 2);
    }

    #[test]
    fn test_fingerprint_ignores_order_but_not_properties() {
        let a = Edge::contains("p", "s1", 0, false);
        let b = Edge::contains("p", "s2", 1, false);
        let forward = RelationshipSet::new(vec![a.clone(), b.clone()]);
        let reverse = RelationshipSet::new(vec![b, a]);
        assert_eq!(forward.fingerprint(), reverse.fingerprint());

        let changed = RelationshipSet::new(vec![
            Edge::contains("p", "s1", 0, true),
            Edge::contains("p", "s2", 1, false),
        ]);
        assert_ne!(forward.fingerprint(), changed.fingerprint());
    }

    #[test]
    fn test_dedupe_keeps_first_position_last_properties() {
        let edges = vec![
            Edge::contains("p", "a", 0, false),
            Edge::contains("p", "b", 1, false),
            Edge::contains("p", "a", 7, true),
        ];
        let unique = dedupe_edges(edges);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].target_id, "a");
        assert_eq!(unique[0].order(), Some(7));
        assert_eq!(unique[0].properties["required"], json!(true));
    }

    #[test]
    fn test_nested_sections_and_shared_content() {
        let pages = vec![PageRecord::new("P", "https://example.com/")];
        let sections = vec![
            SectionRecord::new("S1", "P", 0),
            SectionRecord::new("S1a", "P", 0).nested_in("S1"),
            SectionRecord::new("S2", "P", 1),
        ];
        let items = vec![ContentItemRecord::new("C1", &["S1a", "S2"])];

        let mut builder = RelationshipBuilder::default();
        let set = builder.build_all_relationships(&pages, &sections, &items);
        let pairs: Vec<(&str, &str)> = set
            .edges()
            .iter()
            .map(|e| (e.source_id.as_str(), e.target_id.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("P", "S1"), ("P", "S2"), ("S1", "S1a"), ("S1a", "C1"), ("S2", "C1")]
        );
        assert_eq!(builder.containment().hierarchy_stats().max_depth, 3);
    }

    #[test]
    fn test_unordered_nested_sections_alternating_parents() {
        let pages = vec![PageRecord::new("P", "https://example.com/")];
        let nested = |id: &str, parent: &str| SectionRecord {
            id: Some(id.into()),
            page_id: "P".into(),
            parent_id: Some(parent.into()),
            ..Default::default()
        };
        let sections = vec![
            SectionRecord::new("S1", "P", 0),
            SectionRecord::new("S2", "P", 1),
            nested("S1a", "S1"),
            nested("S2a", "S2"),
            nested("S1b", "S1"),
        ];

        let mut builder = RelationshipBuilder::default();
        let set = builder.build_all_relationships(&pages, &sections, &[]);
        let s1b = set.edges().iter().find(|e| e.target_id == "S1b").unwrap();
        assert_eq!(s1b.order(), Some(1));

        let report = builder.validate_relationships(None, None);
        assert_eq!(report.count(IssueCode::OrderGap), 0);
        assert_eq!(report.warnings, 0);
        assert!(report.is_valid);
    }

    #[test]
    fn test_validate_without_store_checks_hierarchy_only() {
        let builder = RelationshipBuilder::default();
        let edges = vec![
            Edge::contains("A", "B", 0, false),
            Edge::contains("B", "C", 0, false),
            Edge::contains("C", "A", 0, false),
        ];
        let report = builder.validate_relationships(None, Some(&edges));
        assert!(!report.is_valid);
        assert_eq!(report.count(IssueCode::ContainmentCycle), 1);
        assert_eq!(report.count(IssueCode::OrphanedSource), 0);
        assert_eq!(report.count(IssueCode::OrphanedTarget), 0);
    }

    #[test]
    fn test_validate_reports_dangling_endpoints() {
        let (pages, sections, items) = scenario();
        let mut builder = RelationshipBuilder::default();
        builder.build_all_relationships(&pages, &sections, &items);

        let mut store = GraphStore::new();
        ingest_nodes(&mut store, &pages, &sections, &[]);
        let report = builder.validate_relationships(Some(&store), None);
        assert!(!report.is_valid);
        assert_eq!(report.count(IssueCode::OrphanedTarget), 1);
    }

    #[test]
    fn test_validate_falls_back_to_store_edges() {
        let builder = RelationshipBuilder::default();
        let mut store = GraphStore::new();
        store.insert_node(Node::page("P", "https://example.com/", "Home")).unwrap();
        store.insert_edge(Edge::contains("P", "S9", 0, false)).unwrap();

        let report = builder.validate_relationships(Some(&store), None);
        assert_eq!(report.count(IssueCode::OrphanedTarget), 1);
    }

    #[test]
    fn test_populate_store_skips_malformed() {
        let mut props = Attributes::new();
        props.insert("anchor_text".into(), json!("Fees"));
        let set = RelationshipSet::new(vec![
            Edge::contains("P", "S1", 0, false),
            Edge::new("P", "Q", EdgeKind::LinksTo, props),
        ]);

        let mut store = GraphStore::new();
        assert_eq!(populate_store(&mut store, &set), 1);
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_ingest_skips_bad_records() {
        let mut store = GraphStore::new();
        let sections = vec![
            SectionRecord::new("S1", "P", -1),
            SectionRecord { id: None, page_id: "P".into(), ..Default::default() },
            SectionRecord::new("S2", "P", 0),
        ];
        let summary = ingest_nodes(&mut store, &[], &sections, &[]);
        assert_eq!(summary, IngestSummary { inserted: 1, skipped: 2 });
        assert!(store.contains_node("S2"));
    }

    #[test]
    fn test_set_grouping_and_extend() {
        let mut set = RelationshipSet::new(vec![
            Edge::contains("P", "S1", 0, false),
            Edge::scored("P", "topic:mba", EdgeKind::HasTopic, "relevance", 0.9),
        ]);
        set.extend(vec![Edge::scored("P", "topic:mba", EdgeKind::HasTopic, "relevance", 0.4)]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.by_kind()[&EdgeKind::HasTopic].len(), 1);
        assert_eq!(set.kind_counts()[&EdgeKind::Contains], 1);
        let topic = set.of_kind(EdgeKind::HasTopic).next().unwrap();
        assert_eq!(topic.property_f64("relevance"), Some(0.4));
    }

    #[tokio::test]
    async fn test_build_on_blocking_task() {
        let (pages, sections, items) = scenario();
        let builder = RelationshipBuilder::default();
        let (builder, set) = builder
            .build_all_relationships_async(pages, sections, items)
            .await
            .unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(builder.last_built(), Some(&set));
        assert_eq!(builder.links().inbound_links("Q"), ["P"]);
    }
}
