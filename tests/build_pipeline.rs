use serde_json::json;

use sitegraph::config::Config;
use sitegraph::extract::{link_enrichment, relate_pages};
use sitegraph::records::{ContentItemRecord, EnrichmentRecord, PageRecord, SectionRecord};
use sitegraph::validation::IssueCode;
use sitegraph::{ingest_nodes, populate_store, EdgeKind, GraphStore, IdResolver, NodeKind, RelationshipBuilder};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pages() -> Vec<PageRecord> {
    serde_json::from_value(json!([
        {
            "id": "home",
            "url": "https://www.example.ac.uk/",
            "title": "Example Business School",
            "type": "landing",
            "links": [
                {"href": "/programmes/mba", "text": "Our MBA Programme", "position": "navigation"},
                {"href": "https://partner.org/", "text": "Partner"},
                {"href": "/about", "text": "About us"}
            ]
        },
        {
            "id": "mba",
            "url": "https://www.example.ac.uk/programmes/mba/",
            "title": "MBA",
            "links": [
                {"href": "/", "text": "Home", "position": "header"},
                {"href": "/programmes/msc#entry", "text": "MSc Finance", "context": "see also the MSc [3]"}
            ]
        },
        {"id": "msc", "url": "https://www.example.ac.uk/programmes/msc", "title": "MSc Finance"}
    ]))
    .unwrap()
}

fn sections() -> Vec<SectionRecord> {
    serde_json::from_value(json!([
        {"id": "home-hero", "page_id": "home", "order": 0, "required": true},
        {"id": "home-intro", "page_id": "home", "order": 1},
        {"id": "mba-overview", "page_id": "mba", "order": 0, "heading": "Overview"},
        {"id": "mba-fees", "page_id": "mba", "order": 1, "heading": "Fees"},
        {"id": "mba-fees-table", "page_id": "mba", "order": 0, "parent_id": "mba-fees"},
        {"id": "msc-overview", "page_id": "msc", "order": 0}
    ]))
    .unwrap()
}

fn items() -> Vec<ContentItemRecord> {
    serde_json::from_value(json!([
        {"id": "c-hero", "section_ids": ["home-hero"], "content_type": "paragraph"},
        {"id": "c-fees", "section_ids": ["mba-fees-table"], "content_type": "table"},
        {"id": "c-accreditation", "section_ids": ["mba-overview", "msc-overview"]}
    ]))
    .unwrap()
}

fn enrichment() -> EnrichmentRecord {
    serde_json::from_value(json!({
        "page_id": "mba",
        "topics": [{"name": "MBA Programme", "relevance": 0.9, "parent": "Business Education"}],
        "personas": [{"name": "Career Changers", "relevance": 0.7}],
        "entities": [{"name": "London", "entity_type": "location", "confidence": 0.95}],
        "category": "Programmes"
    }))
    .unwrap()
}

#[test]
fn test_full_build_pipeline() {
    init_logging();
    let (pages, sections, items) = (pages(), sections(), items());

    let mut store = GraphStore::new();
    let summary = ingest_nodes(&mut store, &pages, &sections, &items);
    assert_eq!(summary.inserted, 12);
    assert_eq!(summary.skipped, 0);

    let mut builder = RelationshipBuilder::new(&Config::default());
    let mut set = builder.build_all_relationships(&pages, &sections, &items);
    assert_eq!(set.kind_counts()[&EdgeKind::Contains], 10);
    assert_eq!(set.kind_counts()[&EdgeKind::LinksTo], 3);

    let links: Vec<(&str, &str, &str)> = set
        .of_kind(EdgeKind::LinksTo)
        .map(|e| {
            (
                e.source_id.as_str(),
                e.target_id.as_str(),
                e.property_str("link_type").unwrap_or(""),
            )
        })
        .collect();
    assert_eq!(
        links,
        vec![
            ("home", "mba", "navigation"),
            ("mba", "home", "navigation"),
            ("mba", "msc", "citation"),
        ]
    );
    assert!(set
        .of_kind(EdgeKind::LinksTo)
        .all(|e| e.property_f64("link_strength").map_or(false, |s| (0.0..=1.0).contains(&s))));

    let mut resolver = IdResolver::from_pages(&pages);
    set.extend(link_enrichment(&mut store, &mut resolver, &enrichment()));
    set.extend(relate_pages("mba", "msc", 0.8));
    assert_eq!(set.len(), 19);
    assert_eq!(store.nodes_of_kind(NodeKind::Topic).count(), 2);

    assert_eq!(populate_store(&mut store, &set), 19);
    assert_eq!(store.node_count(), 17);
    assert_eq!(store.edge_count(), 19);

    let report = builder.validate_relationships(Some(&store), Some(set.edges()));
    assert!(report.is_valid, "{:?}", report.issues);
    assert_eq!(report.count(IssueCode::OrphanNode), 0);
    assert_eq!(report.warnings, 0);

    let snapshot: serde_json::Value = serde_json::from_str(&store.to_json().unwrap()).unwrap();
    assert_eq!(snapshot["nodes"].as_array().unwrap().len(), 17);
    assert_eq!(snapshot["stats"]["edges_by_kind"]["LINKS_TO"], json!(3));

    let statements = store.to_statements();
    assert!(statements.contains("MERGE (n:Page {id: 'home'})"));
    assert!(statements.contains("MERGE (a)-[r:SUBTOPIC_OF]->(b)"));
    assert!(store.to_diagram().starts_with("graph TD\n"));
}

#[test]
fn test_sequential_and_parallel_builds_agree() {
    init_logging();
    let (pages, sections, items) = (pages(), sections(), items());

    let mut parallel = RelationshipBuilder::new(&Config::default());
    let mut config = Config::default();
    config.links.parallel = false;
    let mut sequential = RelationshipBuilder::new(&config);

    let a = parallel.build_all_relationships(&pages, &sections, &items);
    let b = sequential.build_all_relationships(&pages, &sections, &items);
    assert_eq!(a, b);
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn test_broken_hierarchy_is_reported() {
    init_logging();
    let pages = vec![PageRecord::new("p", "https://example.com/")];
    let sections: Vec<SectionRecord> = serde_json::from_value(json!([
        {"id": "a", "page_id": "p", "order": 0, "parent_id": "b"},
        {"id": "b", "page_id": "p", "order": 0, "parent_id": "a"},
        {"id": "top", "page_id": "p", "order": 2},
        {"id": "top2", "page_id": "p", "order": 2}
    ]))
    .unwrap();

    let mut builder = RelationshipBuilder::default();
    builder.build_all_relationships(&pages, &sections, &[]);

    let mut store = GraphStore::new();
    ingest_nodes(&mut store, &pages, &sections, &[]);
    let report = builder.validate_relationships(Some(&store), None);

    assert!(!report.is_valid);
    assert_eq!(report.count(IssueCode::ContainmentCycle), 1);
    assert_eq!(report.count(IssueCode::DuplicateOrder), 1);
    assert_eq!(report.count(IssueCode::OrphanedSource), 0);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["is_valid"], json!(false));
}

#[tokio::test]
async fn test_async_build_matches_blocking_build() {
    init_logging();
    let (pages, sections, items) = (pages(), sections(), items());

    let mut blocking = RelationshipBuilder::default();
    let expected = blocking.build_all_relationships(&pages, &sections, &items);

    let (_, set) = RelationshipBuilder::default()
        .build_all_relationships_async(pages, sections, items)
        .await
        .unwrap();
    assert_eq!(set.fingerprint(), expected.fingerprint());
}
