//! Plain input records produced by the page loader, section detector,
//! content extractor, link detector and enrichment collaborators.
//!
//! Every field that upstream tooling may omit is optional here; extractors
//! decide per record whether it is usable.

use serde::{Deserialize, Serialize};

use crate::schema::{Attributes, Node};

/// A crawled page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub page_type: Option<String>,
    /// Outgoing hyperlinks detected on the page
    #[serde(default)]
    pub links: Vec<HyperlinkRecord>,
}

impl PageRecord {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_link(mut self, link: HyperlinkRecord) -> Self {
        self.links.push(link);
        self
    }

    /// Page node carrying the record's url, title and type
    pub fn to_node(&self) -> Node {
        let mut node = Node::page(self.id.clone(), &self.url, self.title.as_deref().unwrap_or(""));
        if let Some(page_type) = &self.page_type {
            node = node.with_attribute("type", page_type.clone().into());
        }
        node
    }
}

/// A detected page section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub page_id: String,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub heading: Option<String>,
}

impl SectionRecord {
    pub fn new(id: impl Into<String>, page_id: impl Into<String>, order: i64) -> Self {
        Self {
            id: Some(id.into()),
            page_id: page_id.into(),
            order: Some(order),
            ..Default::default()
        }
    }

    pub fn nested_in(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Section node attributes (page, order, heading, parent)
    pub fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("page_id".into(), self.page_id.clone().into());
        if let Some(order) = self.order {
            attributes.insert("order".into(), order.into());
        }
        if let Some(heading) = &self.heading {
            attributes.insert("heading".into(), heading.clone().into());
        }
        if let Some(parent_id) = &self.parent_id {
            attributes.insert("parent_id".into(), parent_id.clone().into());
        }
        if let Some(required) = self.required {
            attributes.insert("required".into(), required.into());
        }
        attributes
    }
}

/// An extracted content item; may belong to several sections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentItemRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub section_ids: Vec<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl ContentItemRecord {
    pub fn new(id: impl Into<String>, section_ids: &[&str]) -> Self {
        Self {
            id: Some(id.into()),
            section_ids: section_ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// ContentItem node attributes; `content_type` defaults to `text`
    pub fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        let content_type = self.content_type.as_deref().unwrap_or("text");
        attributes.insert("content_type".into(), content_type.into());
        attributes.insert("section_ids".into(), self.section_ids.clone().into());
        if let Some(order) = self.order {
            attributes.insert("order".into(), order.into());
        }
        attributes
    }
}

/// A raw hyperlink as detected on a page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperlinkRecord {
    #[serde(alias = "href")]
    pub url: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Text surrounding the link
    #[serde(default)]
    pub context: Option<String>,
    /// Page region, e.g. `navigation`, `header`, `main`, `footer`
    #[serde(default)]
    pub position: Option<String>,
    /// CSS class attribute of the anchor or its container
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub in_heading: bool,
}

impl HyperlinkRecord {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn at(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn anchor_text(&self) -> &str {
        self.text.as_deref().unwrap_or("").trim()
    }
}

/// Scored name produced by topic/persona classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredName {
    pub name: String,
    #[serde(default = "default_score")]
    pub relevance: f64,
    /// Broader topic this one refines
    #[serde(default)]
    pub parent: Option<String>,
}

/// Named entity produced by NER
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMention {
    pub name: String,
    #[serde(default = "default_entity_type")]
    pub entity_type: String,
    #[serde(default = "default_score")]
    pub confidence: f64,
}

/// Enrichment output for one page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub page_id: String,
    #[serde(default)]
    pub topics: Vec<ScoredName>,
    #[serde(default)]
    pub personas: Vec<ScoredName>,
    #[serde(default)]
    pub entities: Vec<EntityMention>,
    #[serde(default)]
    pub category: Option<String>,
}

fn default_score() -> f64 {
    1.0
}

fn default_entity_type() -> String {
    "unknown".to_string()
}
