//! Document Model: a read-only tree of elements with attributes.
//!
//! The external provider renders the target page and emits this tree as
//! JSON (`{tag, attributes, children, text}` nodes). The scanner and
//! mapper only ever read it; nothing in the pipeline mutates a document.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A single element node in the document tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Element {
    /// Tag name, lowercase (e.g. "img", "input").
    pub tag: String,
    /// Attribute map. BTreeMap keeps iteration deterministic.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Child elements in document order.
    #[serde(default)]
    pub children: Vec<Element>,
    /// Direct text content of this element.
    #[serde(default)]
    pub text: String,
}

impl Element {
    /// Look up an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// True if the attribute exists with a non-empty value.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).map(|v| !v.trim().is_empty()).unwrap_or(false)
    }

    /// Class list, split on whitespace.
    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Preorder traversal of this element and all descendants.
    ///
    /// The order is fully determined by the tree shape, which keeps
    /// scanner output stable across repeated runs.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, out: &mut Vec<&'a Element>) {
        out.push(self);
        for child in &self.children {
            child.collect_descendants(out);
        }
    }

    /// All descendants (including self) with the given tag.
    pub fn find_all(&self, tag: &str) -> Vec<&Element> {
        self.descendants()
            .into_iter()
            .filter(|e| e.tag == tag)
            .collect()
    }

    /// Own text plus all descendant text, joined with single spaces.
    pub fn text_content(&self) -> String {
        let mut parts = Vec::new();
        for element in self.descendants() {
            let trimmed = element.text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
        parts.join(" ")
    }

    /// True if the id or class attribute contains any of the needles
    /// (case-insensitive).
    pub fn id_or_class_contains(&self, needles: &[&str]) -> bool {
        let haystack = format!(
            "{} {}",
            self.attr("id").unwrap_or(""),
            self.attr("class").unwrap_or("")
        )
        .to_lowercase();
        needles.iter().any(|n| haystack.contains(n))
    }
}

/// Deterministic path/selector pair identifying where in the document
/// an issue occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementLocator {
    /// `/`-joined `tag[index]` segments from the root; the 1-based index
    /// is omitted when the tag is unique among its siblings.
    pub path: String,
    /// `#id` if present, else `tag.classlist`, else the bare tag.
    pub selector: String,
}

/// Request context the document was fetched under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Full URL of the audited page.
    pub url: String,
    /// Protocol scheme used to fetch the page ("http", "https", ...).
    pub scheme: String,
}

impl RequestContext {
    /// Build a context from a URL, deriving the scheme from its prefix.
    pub fn from_url(url: &str) -> Self {
        let scheme = url
            .split_once("://")
            .map(|(s, _)| s.to_lowercase())
            .unwrap_or_else(|| "http".to_string());
        Self {
            url: url.to_string(),
            scheme,
        }
    }

    /// True when the page was served over an encrypted transport.
    pub fn is_encrypted(&self) -> bool {
        self.scheme == "https"
    }
}

/// A parsed page: the element tree the provider emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// Parse a document from provider JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let root: Element =
            serde_json::from_str(json).context("Failed to parse document tree JSON")?;
        Ok(Self { root })
    }

    /// Load a document from a provider-emitted JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read document file: {}", path.display()))?;
        Self::from_json(&content)
    }

    /// First element (preorder) matching the predicate.
    pub fn find_first<F>(&self, pred: F) -> Option<&Element>
    where
        F: Fn(&Element) -> bool,
    {
        self.root.descendants().into_iter().find(|e| pred(e))
    }

    /// Locate the first element (preorder) matching the predicate.
    ///
    /// Returns the whole-document locator when nothing matches.
    pub fn locate<F>(&self, pred: F) -> ElementLocator
    where
        F: Fn(&Element) -> bool,
    {
        let root_segment = path_segment(&self.root, None);
        locate_in(&self.root, &root_segment, &pred)
            .unwrap_or_else(|| self.whole_document_locator())
    }

    /// Locator pointing at the document root.
    pub fn whole_document_locator(&self) -> ElementLocator {
        ElementLocator {
            path: format!("/{}", path_segment(&self.root, None)),
            selector: selector_for(&self.root),
        }
    }
}

fn locate_in<F>(element: &Element, path_so_far: &str, pred: &F) -> Option<ElementLocator>
where
    F: Fn(&Element) -> bool,
{
    if pred(element) {
        return Some(ElementLocator {
            path: format!("/{}", path_so_far),
            selector: selector_for(element),
        });
    }

    // Track per-tag ordinals among siblings for the [index] segments.
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for child in &element.children {
        *seen.entry(child.tag.as_str()).or_insert(0) += 1;
    }

    let mut ordinal: BTreeMap<&str, usize> = BTreeMap::new();
    for child in &element.children {
        let count = *ordinal.entry(child.tag.as_str()).or_insert(0) + 1;
        ordinal.insert(child.tag.as_str(), count);

        let index = if seen[child.tag.as_str()] > 1 {
            Some(count)
        } else {
            None
        };
        let segment = format!("{}/{}", path_so_far, path_segment(child, index));
        if let Some(found) = locate_in(child, &segment, pred) {
            return Some(found);
        }
    }

    None
}

fn path_segment(element: &Element, index: Option<usize>) -> String {
    match index {
        Some(i) => format!("{}[{}]", element.tag, i),
        None => element.tag.clone(),
    }
}

fn selector_for(element: &Element) -> String {
    if let Some(id) = element.attr("id") {
        if !id.trim().is_empty() {
            return format!("#{}", id);
        }
    }
    let classes = element.classes();
    if !classes.is_empty() {
        return format!("{}.{}", element.tag, classes.join("."));
    }
    element.tag.clone()
}
