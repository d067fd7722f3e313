//! LINKS_TO extraction: resolve, filter, classify and score page hyperlinks.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::builder::dedupe_edges;
use crate::config::LinkConfig;
use crate::records::{HyperlinkRecord, PageRecord};
use crate::resolver::IdResolver;
use crate::schema::Edge;

/// Bracketed numerals, parenthetical years, "see also", "cf.", "et al."
static CITATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\[\d+\]",
        r"\((?:1[89]|20)\d{2}[a-z]?\)",
        r"(?i)\bsee also\b",
        r"(?i)\bcf\.",
        r"(?i)\bet al\.",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex pattern"))
    .collect()
});

static RELATED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(related|similar|you may also|further reading)\b")
        .expect("Invalid regex pattern")
});

const NAVIGATION_REGIONS: &[&str] = &["nav", "navigation", "header", "menu", "breadcrumb", "footer"];
const RELATED_REGIONS: &[&str] = &["related", "see-also", "sidebar-related"];

/// Relationship a hyperlink expresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Navigation,
    Reference,
    Citation,
    Related,
    Internal,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Navigation => "navigation",
            LinkType::Reference => "reference",
            LinkType::Citation => "citation",
            LinkType::Related => "related",
            LinkType::Internal => "internal",
        }
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of the last link graph build
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkStats {
    pub total: usize,
    pub by_type: BTreeMap<LinkType, usize>,
    pub pages_with_outbound: usize,
    pub pages_with_inbound: usize,
}

#[derive(Debug, Clone)]
pub struct LinkExtractor {
    config: LinkConfig,
    base_domain: Option<String>,
    outbound: HashMap<String, Vec<String>>,
    inbound: HashMap<String, Vec<String>>,
    by_type: BTreeMap<LinkType, usize>,
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new(LinkConfig::default(), None)
    }
}

impl LinkExtractor {
    pub fn new(config: LinkConfig, base_domain: Option<String>) -> Self {
        Self {
            config,
            base_domain: base_domain.map(|d| strip_www(&d.to_lowercase()).to_string()),
            outbound: HashMap::new(),
            inbound: HashMap::new(),
            by_type: BTreeMap::new(),
        }
    }

    /// LINKS_TO edges for one page, resolving targets against `all_pages`.
    pub fn extract_page_links(&self, page: &PageRecord, all_pages: &[PageRecord]) -> Vec<Edge> {
        let resolver = IdResolver::from_pages(all_pages);
        self.extract_with(page, &resolver)
    }

    /// LINKS_TO edges for one page against a prepared URL index.
    ///
    /// Links that leave the base domain, point back at the page itself or
    /// name no known page are dropped.
    pub fn extract_with(&self, page: &PageRecord, resolver: &IdResolver) -> Vec<Edge> {
        let base = match Url::parse(page.url.trim()) {
            Ok(base) => base,
            Err(e) => {
                log::warn!("Page {} has unparseable url {:?}: {}", page.id, page.url, e);
                return Vec::new();
            }
        };
        let Some(domain) = self
            .base_domain
            .clone()
            .or_else(|| base.host_str().map(|h| strip_www(h).to_string()))
        else {
            log::warn!("Page {} url has no host, skipping its links", page.id);
            return Vec::new();
        };

        let mut edges = Vec::new();
        for link in &page.links {
            let href = link.url.trim();
            if href.is_empty() {
                continue;
            }
            let resolved = match base.join(href) {
                Ok(url) => url,
                Err(e) => {
                    log::debug!("Unresolvable link {:?} on {}: {}", href, page.id, e);
                    continue;
                }
            };
            if !matches!(resolved.scheme(), "http" | "https") {
                continue;
            }
            if !resolved.host_str().map_or(false, |host| in_domain(host, &domain)) {
                log::debug!("External link {} on {} ignored", resolved, page.id);
                continue;
            }
            let Some(target_id) = resolver.resolve_url(resolved.as_str()) else {
                log::debug!("Link target {} from {} is not a known page", resolved, page.id);
                continue;
            };
            if target_id == page.id {
                continue;
            }

            let position = link
                .position
                .as_deref()
                .map(|p| p.trim().to_lowercase())
                .unwrap_or_else(|| "unknown".to_string());
            let link_type = self.classify_resolved(link, &resolved, link.context.as_deref());
            let strength = self.calculate_link_strength(link, &position);

            let mut edge = Edge::links_to(&page.id, target_id, link_type.as_str(), strength);
            let properties = &mut edge.properties;
            properties.insert("anchor_text".into(), json!(link.anchor_text()));
            properties.insert("position".into(), json!(position));
            properties.insert("context".into(), json!(link.context.as_deref().unwrap_or("")));
            edges.push(edge);
        }
        edges
    }

    /// Ordered rule cascade: region signals, then URL paths, then citation
    /// and related phrasing in the surrounding text; `internal` otherwise.
    ///
    /// Path rules see the href as written; use [`Self::classify_resolved`]
    /// once the link has been resolved against its page.
    pub fn classify_link_type(&self, link: &HyperlinkRecord, context: Option<&str>) -> LinkType {
        self.classify_path(link, &link_path(&link.url), context)
    }

    /// Classification with the path rules applied to `resolved`, so every
    /// spelling of one target URL gets the same type.
    pub fn classify_resolved(&self, link: &HyperlinkRecord, resolved: &Url, context: Option<&str>) -> LinkType {
        self.classify_path(link, &resolved.path().to_lowercase(), context)
    }

    fn classify_path(&self, link: &HyperlinkRecord, path: &str, context: Option<&str>) -> LinkType {
        let mut regions: Vec<String> = Vec::new();
        if let Some(position) = &link.position {
            regions.push(position.trim().to_lowercase());
        }
        if let Some(class) = &link.class {
            regions.extend(class.split_whitespace().map(str::to_lowercase));
        }
        if regions.iter().any(|r| {
            NAVIGATION_REGIONS.contains(&r.as_str())
                || r.contains("nav")
                || r.contains("menu")
                || r.contains("breadcrumb")
        }) {
            return LinkType::Navigation;
        }
        if regions.iter().any(|r| RELATED_REGIONS.contains(&r.as_str())) {
            return LinkType::Related;
        }

        if self.config.navigation_paths.iter().any(|p| path_matches(path, p)) {
            return LinkType::Navigation;
        }
        if path.ends_with(".pdf") || self.config.reference_paths.iter().any(|p| path_matches(path, p)) {
            return LinkType::Reference;
        }

        let text = format!("{} {}", context.unwrap_or(""), link.anchor_text());
        if CITATION_PATTERNS.iter().any(|re| re.is_match(&text)) {
            return LinkType::Citation;
        }
        if RELATED_PATTERN.is_match(&text) {
            return LinkType::Related;
        }

        LinkType::Internal
    }

    /// Strength in [0, 1]: 0.5 averaged with the position weight, then the
    /// anchor, context and heading boosts are added, then clamped.
    pub fn calculate_link_strength(&self, link: &HyperlinkRecord, position: &str) -> f64 {
        let weight = self
            .config
            .position_weights
            .get(&position.to_lowercase())
            .copied()
            .unwrap_or(self.config.default_position_weight);

        let mut strength = 0.5;
        strength = (strength + weight) / 2.0;

        let words = link.anchor_text().split_whitespace().count();
        if words >= 3 {
            strength += 0.1;
        }
        if words >= 5 {
            strength += 0.1;
        }
        if link.context.as_deref().map_or(false, |c| !c.trim().is_empty()) {
            strength += 0.05;
        }
        if link.in_heading || position.eq_ignore_ascii_case("heading") {
            strength += 0.15;
        }

        strength.clamp(0.0, 1.0)
    }

    /// Extract links for every page and rebuild the adjacency maps.
    pub fn build_link_graph(&mut self, pages: &[PageRecord]) -> Vec<Edge> {
        let resolver = IdResolver::from_pages(pages);
        self.build_link_graph_with(pages, &resolver)
    }

    pub fn build_link_graph_with(&mut self, pages: &[PageRecord], resolver: &IdResolver) -> Vec<Edge> {
        let per_page: Vec<Vec<Edge>> = if self.config.parallel {
            let this = &*self;
            pages.par_iter().map(|page| this.extract_with(page, resolver)).collect()
        } else {
            pages.iter().map(|page| self.extract_with(page, resolver)).collect()
        };
        // repeated anchors to one target collapse to a single edge
        let edges = dedupe_edges(per_page.into_iter().flatten().collect());

        self.outbound.clear();
        self.inbound.clear();
        self.by_type.clear();
        for edge in &edges {
            self.outbound.entry(edge.source_id.clone()).or_default().push(edge.target_id.clone());
            self.inbound.entry(edge.target_id.clone()).or_default().push(edge.source_id.clone());
            if let Some(link_type) = edge.property_str("link_type").and_then(parse_link_type) {
                *self.by_type.entry(link_type).or_default() += 1;
            }
        }

        log::info!("Link graph: {} links across {} pages", edges.len(), pages.len());
        edges
    }

    pub fn outbound_links(&self, page_id: &str) -> &[String] {
        self.outbound.get(page_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn inbound_links(&self, page_id: &str) -> &[String] {
        self.inbound.get(page_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn link_stats(&self) -> LinkStats {
        LinkStats {
            total: self.outbound.values().map(Vec::len).sum(),
            by_type: self.by_type.clone(),
            pages_with_outbound: self.outbound.len(),
            pages_with_inbound: self.inbound.len(),
        }
    }
}

fn parse_link_type(s: &str) -> Option<LinkType> {
    match s {
        "navigation" => Some(LinkType::Navigation),
        "reference" => Some(LinkType::Reference),
        "citation" => Some(LinkType::Citation),
        "related" => Some(LinkType::Related),
        "internal" => Some(LinkType::Internal),
        _ => None,
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

fn in_domain(host: &str, domain: &str) -> bool {
    let host = strip_www(host);
    host.eq_ignore_ascii_case(domain)
        || host
            .to_lowercase()
            .strip_suffix(domain)
            .map_or(false, |prefix| prefix.ends_with('.'))
}

/// Lowercased path of an absolute or relative href, without query or fragment
fn link_path(href: &str) -> String {
    let href = href.trim();
    let path = match Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href.split(|c: char| c == '?' || c == '#').next().unwrap_or("").to_string(),
    };
    path.to_lowercase()
}

fn path_matches(path: &str, pattern: &str) -> bool {
    let pattern = pattern.trim_end_matches('/');
    path == pattern
        || path
            .strip_prefix(pattern)
            .map_or(false, |rest| rest.starts_with('/'))
}
