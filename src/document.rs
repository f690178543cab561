//! Source document loading and reference lookups
//!
//! Wraps the parsed COLLADA XML tree in an immutable context object and
//! provides the id/sid/semantic lookups every extractor resolves through.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use xmltree::{Element, XMLNode};

/// A reference inside the document that could not be resolved.
///
/// These are the fatal failure class: the document structurally lacks data
/// the pipeline requires.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("required element <{0}> not found")]
    MissingElement(String),

    #[error("missing attribute '{attr}' on <{tag}>")]
    MissingAttribute { tag: String, attr: String },

    #[error("element <{0}> has no text content")]
    MissingText(String),

    #[error("unresolved reference '{0}'")]
    UnresolvedReference(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

/// Parsed, namespace-normalized source document.
pub struct Document {
    root: Element,
}

impl Document {
    /// Load and normalize a document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open document: {:?}", path))?;
        let mut root = Element::parse(BufReader::new(file))
            .with_context(|| format!("Failed to parse document: {:?}", path))?;
        strip_namespaces(&mut root);
        Ok(Self { root })
    }

    /// Parse a document from an in-memory string.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut root = Element::parse(xml.as_bytes()).context("Failed to parse document")?;
        strip_namespaces(&mut root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Top-level library section (`library_geometries`, `library_effects`, ...).
    pub fn library(&self, name: &str) -> Option<&Element> {
        child(&self.root, name)
    }

    pub fn require_library(&self, name: &str) -> Result<&Element, ResolveError> {
        self.library(name)
            .ok_or_else(|| ResolveError::MissingElement(name.to_string()))
    }
}

/// Discard namespace qualifiers on every element so lookups use bare tag
/// names. Idempotent.
fn strip_namespaces(el: &mut Element) {
    el.prefix = None;
    el.namespace = None;
    el.namespaces = None;
    for node in &mut el.children {
        if let XMLNode::Element(child) = node {
            strip_namespaces(child);
        }
    }
}

/// First direct child element with the given tag.
pub fn child<'a>(el: &'a Element, name: &str) -> Option<&'a Element> {
    element_children(el).find(|c| c.name == name)
}

pub fn require_child<'a>(el: &'a Element, name: &str) -> Result<&'a Element, ResolveError> {
    child(el, name).ok_or_else(|| ResolveError::MissingElement(name.to_string()))
}

/// All direct child elements with the given tag, in document order.
pub fn children<'a>(el: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
    element_children(el).filter(move |c| c.name == name)
}

/// All direct child elements regardless of tag.
pub fn element_children(el: &Element) -> impl Iterator<Item = &Element> {
    el.children.iter().filter_map(|node| {
        if let XMLNode::Element(child) = node {
            Some(child)
        } else {
            None
        }
    })
}

/// Concatenated text content of an element's direct text nodes.
pub fn text(el: &Element) -> Option<String> {
    let mut out = String::new();
    for node in &el.children {
        if let XMLNode::Text(t) = node {
            out.push_str(t);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

pub fn require_text(el: &Element) -> Result<String, ResolveError> {
    text(el).ok_or_else(|| ResolveError::MissingText(el.name.clone()))
}

pub fn attr<'a>(el: &'a Element, name: &str) -> Option<&'a str> {
    el.attributes.get(name).map(String::as_str)
}

pub fn require_attr<'a>(el: &'a Element, name: &str) -> Result<&'a str, ResolveError> {
    attr(el, name).ok_or_else(|| ResolveError::MissingAttribute {
        tag: el.name.clone(),
        attr: name.to_string(),
    })
}

/// Depth-first search over descendants (self excluded).
pub fn find_descendant<'a>(
    el: &'a Element,
    pred: &dyn Fn(&Element) -> bool,
) -> Option<&'a Element> {
    for c in element_children(el) {
        if pred(c) {
            return Some(c);
        }
        if let Some(found) = find_descendant(c, pred) {
            return Some(found);
        }
    }
    None
}

pub fn descendant_by_tag<'a>(el: &'a Element, tag: &str) -> Option<&'a Element> {
    find_descendant(el, &|c| c.name == tag)
}

/// Descendant with a given tag carrying `attr="value"` (`.//tag[@attr="value"]`).
pub fn descendant_with_attr<'a>(
    el: &'a Element,
    tag: &str,
    name: &str,
    value: &str,
) -> Option<&'a Element> {
    find_descendant(el, &|c| c.name == tag && attr(c, name) == Some(value))
}

/// First child element matching any of the candidate tags, tested in order.
pub fn first_child_of<'a>(el: &'a Element, candidates: &[&str]) -> Option<&'a Element> {
    candidates.iter().find_map(|tag| child(el, tag))
}

/// First descendant element matching any of the candidate tags, tested in order.
pub fn first_descendant_of<'a>(el: &'a Element, candidates: &[&str]) -> Option<&'a Element> {
    candidates.iter().find_map(|tag| descendant_by_tag(el, tag))
}

/// `<input semantic="...">` descendant lookup.
pub fn input_with_semantic<'a>(el: &'a Element, semantic: &str) -> Option<&'a Element> {
    find_descendant(el, &|c| {
        c.name == "input" && attr(c, "semantic") == Some(semantic)
    })
}

/// Resolve a semantic-typed `input` under `scope` to its `<source>` element
/// under `search_root`.
pub fn resolve_input_source<'a>(
    scope: &Element,
    search_root: &'a Element,
    semantic: &str,
) -> Result<&'a Element, ResolveError> {
    let input = input_with_semantic(scope, semantic)
        .ok_or_else(|| ResolveError::MissingElement(format!("input[@semantic={}]", semantic)))?;
    let id = source_target(require_attr(input, "source")?);
    descendant_with_attr(search_root, "source", "id", id)
        .ok_or_else(|| ResolveError::UnresolvedReference(id.to_string()))
}

/// Strip the leading `#` from a url-style reference.
pub fn source_target(url: &str) -> &str {
    url.strip_prefix('#').unwrap_or(url)
}

/// Parse a whitespace-separated float list (newlines included).
pub fn parse_floats(text: &str) -> Result<Vec<f32>, ResolveError> {
    text.split_whitespace()
        .map(|tok| {
            tok.parse::<f32>()
                .map_err(|_| ResolveError::InvalidNumber(tok.to_string()))
        })
        .collect()
}

/// Parse a whitespace-separated unsigned index list.
pub fn parse_indices(text: &str) -> Result<Vec<usize>, ResolveError> {
    text.split_whitespace()
        .map(|tok| {
            tok.parse::<usize>()
                .map_err(|_| ResolveError::InvalidNumber(tok.to_string()))
        })
        .collect()
}

/// Split a flat float list into 16-float matrices, in document order.
/// Trailing values short of a full matrix are dropped.
pub fn chunk_matrices(values: &[f32]) -> Vec<[f32; 16]> {
    values
        .chunks_exact(16)
        .map(|chunk| {
            let mut m = [0.0f32; 16];
            m.copy_from_slice(chunk);
            m
        })
        .collect()
}
