//! Edge extraction from auxiliary records.
//!
//! - [`containment`]: ordered CONTAINS hierarchy (page → section → content)
//! - [`links`]: classified, scored LINKS_TO edges between pages
//! - [`enrichment`]: topic, persona, entity and category relationships

pub mod containment;
pub mod enrichment;
pub mod links;

pub use containment::{ContainmentExtractor, HierarchyStats};
pub use enrichment::{link_enrichment, relate_pages};
pub use links::{LinkExtractor, LinkStats, LinkType};
