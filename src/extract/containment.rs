//! CONTAINS edge extraction from section and content-item ordering metadata.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::records::{ContentItemRecord, SectionRecord};
use crate::schema::Edge;
use crate::validation::{ValidationReport, Validator};

/// Shape of the hierarchy registered so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HierarchyStats {
    pub parents: usize,
    pub children: usize,
    pub max_fan_out: usize,
    /// Longest root-to-leaf chain, in edges
    pub max_depth: usize,
}

/// Derives Page→Section, Section→Section and Section→ContentItem edges.
///
/// Extraction is a pure function of its inputs; the extractor only keeps a
/// registry of `parent → children` for statistics.
#[derive(Debug, Default, Clone)]
pub struct ContainmentExtractor {
    hierarchy: HashMap<String, Vec<String>>,
    validator: Validator,
}

impl ContainmentExtractor {
    pub fn new(validator: Validator) -> Self {
        Self {
            hierarchy: HashMap::new(),
            validator,
        }
    }

    /// One CONTAINS edge `page_id → section` per section record.
    ///
    /// Records without an id are skipped; a missing order falls back to the
    /// record's position in `sections`.
    pub fn extract_page_sections<'a, I>(&mut self, page_id: &str, sections: I) -> Vec<Edge>
    where
        I: IntoIterator<Item = &'a SectionRecord>,
    {
        let mut edges = Vec::new();
        for (position, section) in sections.into_iter().enumerate() {
            let Some(section_id) = usable_id(section.id.as_deref()) else {
                log::warn!("Skipping section of page {} without id (position {})", page_id, position);
                continue;
            };
            let order = section.order.unwrap_or(position as i64);
            edges.push(Edge::contains(page_id, section_id, order, section.required.unwrap_or(false)));
            self.register(page_id, section_id);
        }
        edges
    }

    /// One CONTAINS edge `section_id → item` per content item, ordered by the
    /// item's `order` or else its position in `items`.
    pub fn extract_section_content<'a, I>(&mut self, section_id: &str, items: I) -> Vec<Edge>
    where
        I: IntoIterator<Item = &'a ContentItemRecord>,
    {
        let mut edges = Vec::new();
        for (position, item) in items.into_iter().enumerate() {
            let Some(item_id) = usable_id(item.id.as_deref()) else {
                log::warn!(
                    "Skipping content item of section {} without id (position {})",
                    section_id,
                    position
                );
                continue;
            };
            let order = item.order.unwrap_or(position as i64);
            edges.push(Edge::contains(section_id, item_id, order, item.required.unwrap_or(false)));
            self.register(section_id, item_id);
        }
        edges
    }

    /// CONTAINS `parent_id → section` for every section that names a parent
    /// section; top-level sections are left to [`Self::extract_page_sections`].
    ///
    /// A missing order falls back to the section's position among the
    /// sections sharing its parent.
    pub fn extract_nested_sections<'a, I>(&mut self, sections: I) -> Vec<Edge>
    where
        I: IntoIterator<Item = &'a SectionRecord>,
    {
        let mut edges = Vec::new();
        let mut positions: HashMap<&str, i64> = HashMap::new();
        for section in sections {
            let Some(parent_id) = usable_id(section.parent_id.as_deref()) else {
                continue;
            };
            let position = positions.entry(parent_id).or_insert(0);
            let fallback = *position;
            *position += 1;
            let Some(section_id) = usable_id(section.id.as_deref()) else {
                log::warn!("Skipping nested section under {} without id", parent_id);
                continue;
            };
            let order = section.order.unwrap_or(fallback);
            edges.push(Edge::contains(parent_id, section_id, order, section.required.unwrap_or(false)));
            self.register(parent_id, section_id);
        }
        edges
    }

    /// Cycle and per-parent order checks over the CONTAINS edges in `edges`.
    pub fn validate_hierarchy(&self, edges: &[Edge]) -> ValidationReport {
        self.validator.validate_hierarchy(edges)
    }

    pub fn children_of(&self, parent_id: &str) -> &[String] {
        self.hierarchy.get(parent_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Forget everything registered by earlier extraction passes
    pub fn clear(&mut self) {
        self.hierarchy.clear();
    }

    pub fn hierarchy_stats(&self) -> HierarchyStats {
        let children: usize = self.hierarchy.values().map(Vec::len).sum();
        let max_fan_out = self.hierarchy.values().map(Vec::len).max().unwrap_or(0);

        let all_children: HashSet<&str> = self
            .hierarchy
            .values()
            .flatten()
            .map(String::as_str)
            .collect();

        // breadth-first from the roots; the visited set keeps cycles finite
        let mut queue: VecDeque<(&str, usize)> = self
            .hierarchy
            .keys()
            .map(String::as_str)
            .filter(|id| !all_children.contains(id))
            .map(|id| (id, 0))
            .collect();
        let mut visited: HashSet<&str> = queue.iter().map(|(id, _)| *id).collect();
        let mut max_depth = 0;

        while let Some((id, depth)) = queue.pop_front() {
            max_depth = max_depth.max(depth);
            for child in self.children_of(id) {
                if visited.insert(child.as_str()) {
                    queue.push_back((child.as_str(), depth + 1));
                }
            }
        }

        HierarchyStats {
            parents: self.hierarchy.len(),
            children,
            max_fan_out,
            max_depth,
        }
    }

    fn register(&mut self, parent_id: &str, child_id: &str) {
        let children = self.hierarchy.entry(parent_id.to_string()).or_default();
        if !children.iter().any(|c| c == child_id) {
            children.push(child_id.to_string());
        }
    }
}

fn usable_id(id: Option<&str>) -> Option<&str> {
    id.map(str::trim).filter(|id| !id.is_empty())
}
