//! Structural validation of an assembled edge set.
//!
//! One run performs every check (containment cycles, child order sequences,
//! referential integrity, orphan nodes) and accumulates all findings into a
//! single [`ValidationReport`]. No check short-circuits another, and the same
//! input always yields the same report.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::ValidationConfig;
use crate::schema::{Edge, EdgeKey, EdgeKind, NodeKind};
use crate::store::GraphStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// A node transitively contains itself
    ContainmentCycle,
    /// Two children of one parent share an order value
    DuplicateOrder,
    /// Sorted child orders skip one or more values
    OrderGap,
    /// CONTAINS edge without a non-negative integer order
    InvalidOrder,
    OrphanedSource,
    OrphanedTarget,
    /// Non-root node with no incident edges
    OrphanNode,
    Summary,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::ContainmentCycle => "containment_cycle",
            IssueCode::DuplicateOrder => "duplicate_order",
            IssueCode::OrderGap => "order_gap",
            IssueCode::InvalidOrder => "invalid_order",
            IssueCode::OrphanedSource => "orphaned_source",
            IssueCode::OrphanedTarget => "orphaned_target",
            IssueCode::OrphanNode => "orphan_node",
            IssueCode::Summary => "summary",
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding of a validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    /// Node the finding is about (cycle entry, parent, orphan)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgeKey>,
}

impl Issue {
    fn new(severity: Severity, code: IssueCode, message: String) -> Self {
        Self {
            severity,
            code,
            message,
            node_id: None,
            edge: None,
        }
    }

    fn on_node(mut self, node_id: &str) -> Self {
        self.node_id = Some(node_id.to_string());
        self
    }

    fn on_edge(mut self, edge: &Edge) -> Self {
        self.edge = Some(edge.key());
        self
    }
}

/// Outcome of a validation run; valid iff no errors were recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    pub issues: Vec<Issue>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: 0,
            warnings: 0,
            info: 0,
            issues: Vec::new(),
        }
    }

    pub fn push(&mut self, issue: Issue) {
        match issue.severity {
            Severity::Error => {
                self.errors += 1;
                self.is_valid = false;
            }
            Severity::Warning => self.warnings += 1,
            Severity::Info => self.info += 1,
        }
        self.issues.push(issue);
    }

    /// Append every finding of `other`
    pub fn merge(&mut self, other: ValidationReport) {
        for issue in other.issues {
            self.push(issue);
        }
    }

    pub fn issues_with(&self, code: IssueCode) -> impl Iterator<Item = &Issue> + '_ {
        self.issues.iter().filter(move |issue| issue.code == code)
    }

    pub fn count(&self, code: IssueCode) -> usize {
        self.issues_with(code).count()
    }

    pub fn by_severity(&self, severity: Severity) -> impl Iterator<Item = &Issue> + '_ {
        self.issues.iter().filter(move |issue| issue.severity == severity)
    }
}

/// Runs the structural checks with the configured strictness
#[derive(Debug, Clone)]
pub struct Validator {
    flag_orphans: bool,
    flag_order_gaps: bool,
    root_kind: NodeKind,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}

impl Validator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            flag_orphans: config.flag_orphans,
            flag_order_gaps: config.flag_order_gaps,
            root_kind: NodeKind::Page,
        }
    }

    /// Full run: hierarchy checks always, store-aware checks when a store is
    /// supplied.
    pub fn validate(&self, edges: &[Edge], store: Option<&GraphStore>) -> ValidationReport {
        let mut report = self.validate_hierarchy(edges);
        if let Some(store) = store {
            report.merge(self.validate_references(edges, store));
        }
        log::info!(
            "Validation finished: {} errors, {} warnings over {} edges",
            report.errors,
            report.warnings,
            edges.len()
        );
        report
    }

    /// Cycle and order checks over the CONTAINS edges in `edges`.
    pub fn validate_hierarchy(&self, edges: &[Edge]) -> ValidationReport {
        let mut report = ValidationReport::new();
        let contains: Vec<&Edge> = edges.iter().filter(|e| e.kind == EdgeKind::Contains).collect();

        check_cycles(&contains, &mut report);
        let parents = self.check_order(&contains, &mut report);

        report.push(Issue::new(
            Severity::Info,
            IssueCode::Summary,
            format!(
                "Checked {} containment edges across {} parents",
                contains.len(),
                parents
            ),
        ));
        report
    }

    /// Endpoint existence for every edge, plus orphan detection over the
    /// store's nodes.
    pub fn validate_references(&self, edges: &[Edge], store: &GraphStore) -> ValidationReport {
        let mut report = ValidationReport::new();

        for edge in edges {
            if !store.contains_node(&edge.source_id) {
                report.push(
                    Issue::new(
                        Severity::Error,
                        IssueCode::OrphanedSource,
                        format!("Edge {} has no source node {}", edge.key(), edge.source_id),
                    )
                    .on_node(&edge.source_id)
                    .on_edge(edge),
                );
            }
            if !store.contains_node(&edge.target_id) {
                report.push(
                    Issue::new(
                        Severity::Error,
                        IssueCode::OrphanedTarget,
                        format!("Edge {} has no target node {}", edge.key(), edge.target_id),
                    )
                    .on_node(&edge.target_id)
                    .on_edge(edge),
                );
            }
        }

        if self.flag_orphans {
            let incident: HashSet<&str> = edges
                .iter()
                .flat_map(|e| [e.source_id.as_str(), e.target_id.as_str()])
                .collect();
            for node in store.nodes() {
                if node.kind == self.root_kind
                    || incident.contains(node.id.as_str())
                    || store.degree(&node.id) > 0
                {
                    continue;
                }
                report.push(
                    Issue::new(
                        Severity::Warning,
                        IssueCode::OrphanNode,
                        format!("{} {} has no relationships", node.kind, node.id),
                    )
                    .on_node(&node.id),
                );
            }
        }

        report.push(Issue::new(
            Severity::Info,
            IssueCode::Summary,
            format!(
                "Checked {} edges against {} nodes",
                edges.len(),
                store.node_count()
            ),
        ));
        report
    }

    /// Per-parent order checks; returns the number of parents seen.
    fn check_order(&self, contains: &[&Edge], report: &mut ValidationReport) -> usize {
        // parent -> (child -> order), both in first-seen order; a repeated
        // (parent, child) pair is the same edge, so its last order wins
        let mut parents: Vec<(&str, Vec<(&str, &Edge)>)> = Vec::new();
        let mut parent_slots: HashMap<&str, usize> = HashMap::new();
        for &edge in contains {
            let slot = *parent_slots.entry(edge.source_id.as_str()).or_insert_with(|| {
                parents.push((edge.source_id.as_str(), Vec::new()));
                parents.len() - 1
            });
            let children = &mut parents[slot].1;
            match children.iter_mut().find(|(child, _)| *child == edge.target_id) {
                Some(existing) => existing.1 = edge,
                None => children.push((edge.target_id.as_str(), edge)),
            }
        }

        for (parent, children) in &parents {
            let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
            for (child, edge) in children {
                match edge.order() {
                    Some(order) if order >= 0 => *counts.entry(order).or_default() += 1,
                    _ => report.push(
                        Issue::new(
                            Severity::Error,
                            IssueCode::InvalidOrder,
                            format!(
                                "{} -> {} has no non-negative integer order",
                                parent, child
                            ),
                        )
                        .on_node(parent)
                        .on_edge(edge),
                    ),
                }
            }

            for (order, count) in &counts {
                if *count > 1 {
                    report.push(
                        Issue::new(
                            Severity::Error,
                            IssueCode::DuplicateOrder,
                            format!("{} has {} children with order {}", parent, count, order),
                        )
                        .on_node(parent),
                    );
                }
            }

            if self.flag_order_gaps {
                let orders: Vec<i64> = counts.keys().copied().collect();
                for pair in orders.windows(2) {
                    if pair[1] - pair[0] > 1 {
                        report.push(
                            Issue::new(
                                Severity::Warning,
                                IssueCode::OrderGap,
                                format!(
                                    "{} child order jumps from {} to {}",
                                    parent, pair[0], pair[1]
                                ),
                            )
                            .on_node(parent),
                        );
                    }
                }
            }
        }

        parents.len()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Iterative white/gray/black DFS; every node is expanded once and every
/// back edge (edge into a gray node) reports one cycle.
fn check_cycles(contains: &[&Edge], report: &mut ValidationReport) {
    let mut adjacency: HashMap<&str, Vec<&Edge>> = HashMap::new();
    let mut nodes: Vec<&str> = Vec::new();
    let mut color: HashMap<&str, Color> = HashMap::new();

    for &edge in contains {
        for id in [edge.source_id.as_str(), edge.target_id.as_str()] {
            if color.insert(id, Color::White).is_none() {
                nodes.push(id);
            }
        }
        adjacency.entry(edge.source_id.as_str()).or_default().push(edge);
    }

    for &start in &nodes {
        if color[start] != Color::White {
            continue;
        }

        // (node, index of next child to visit)
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
        color.insert(start, Color::Gray);

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            let children = adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]);

            if next >= children.len() {
                color.insert(node, Color::Black);
                stack.pop();
                continue;
            }
            top.1 += 1;

            let edge = children[next];
            let child = edge.target_id.as_str();
            match color[child] {
                Color::White => {
                    color.insert(child, Color::Gray);
                    stack.push((child, 0));
                }
                Color::Gray => {
                    let entry = stack.iter().position(|(id, _)| *id == child).unwrap_or(0);
                    let mut path: Vec<&str> = stack[entry..].iter().map(|(id, _)| *id).collect();
                    path.push(child);
                    report.push(
                        Issue::new(
                            Severity::Error,
                            IssueCode::ContainmentCycle,
                            format!("Containment cycle: {}", path.join(" -> ")),
                        )
                        .on_node(child)
                        .on_edge(edge),
                    );
                }
                Color::Black => {}
            }
        }
    }
}
