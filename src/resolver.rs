//! Id resolution context for one graph build.
//!
//! Maps page URLs and (kind, name) pairs to stable node ids. A resolver is
//! created per build and passed to the components that need it, so repeated
//! or concurrent builds never share state.

use std::collections::HashMap;

use url::Url;

use crate::records::PageRecord;
use crate::schema::NodeKind;

/// Result of interning a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interned {
    pub id: String,
    /// True when this call allocated the id
    pub created: bool,
}

#[derive(Debug, Default, Clone)]
pub struct IdResolver {
    urls: HashMap<String, String>,
    names: HashMap<(NodeKind, String), String>,
}

impl IdResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver pre-loaded with the URL of every page
    pub fn from_pages(pages: &[PageRecord]) -> Self {
        let mut resolver = Self::new();
        for page in pages {
            resolver.register_page(&page.url, &page.id);
        }
        resolver
    }

    /// Map a page URL to its id. Later registrations of the same normalized
    /// URL replace earlier ones.
    pub fn register_page(&mut self, url: &str, page_id: &str) {
        let key = normalize_url(url);
        if let Some(previous) = self.urls.insert(key.clone(), page_id.to_string()) {
            if previous != page_id {
                log::warn!("URL {} re-registered: {} -> {}", key, previous, page_id);
            }
        }
    }

    pub fn resolve_url(&self, url: &str) -> Option<&str> {
        self.urls.get(&normalize_url(url)).map(String::as_str)
    }

    /// Stable id for a named Topic/Category/Persona/Entity, e.g.
    /// `topic:mba-programme`. Returns `None` for names with no usable
    /// characters.
    pub fn intern(&mut self, kind: NodeKind, name: &str) -> Option<Interned> {
        let slug = slugify(name);
        if slug.is_empty() {
            return None;
        }
        if let Some(id) = self.names.get(&(kind, slug.clone())) {
            return Some(Interned { id: id.clone(), created: false });
        }
        let id = format!("{}:{}", kind.as_str().to_lowercase(), slug);
        self.names.insert((kind, slug), id.clone());
        Some(Interned { id, created: true })
    }

    pub fn lookup(&self, kind: NodeKind, name: &str) -> Option<&str> {
        self.names.get(&(kind, slugify(name))).map(String::as_str)
    }

    pub fn url_count(&self) -> usize {
        self.urls.len()
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }
}

/// Canonical lookup key for a URL: fragment dropped, trailing slash trimmed
/// (except the root path). Unparseable input is only trimmed.
pub fn normalize_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(mut url) => {
            url.set_fragment(None);
            let path = url.path().to_string();
            if path.len() > 1 && path.ends_with('/') {
                url.set_path(path.trim_end_matches('/'));
            }
            url.to_string()
        }
        Err(_) => raw.trim().trim_end_matches('/').to_string(),
    }
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
