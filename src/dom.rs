//! Thin wrappers around the HTML parser plus the measurement table that
//! stands in for browser geometry.
//!
//! The host page is a real mutable DOM tree (`kuchiki::NodeRef`); rects,
//! scroll positions and the viewport come from [`Metrics`], which the
//! embedding host measures (or a test constructs, or the CLI loads from
//! JSON). An element with no measured rect is treated as unmeasured, not
//! as invisible, so the engine stays usable on saved pages.

use std::cell::Cell;
use std::collections::HashMap;

use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink;
use serde::{Deserialize, Serialize};

use crate::util::normalize_spaces;

/// Attribute used to key elements that have no `id` of their own.
pub const KEY_ATTR: &str = "data-ih-key";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollInfo {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
    pub client_width: f64,
}

/// Geometry snapshot keyed by element key (see [`Page::element_key`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub viewport_width: f64,
    #[serde(default)]
    pub viewport_height: f64,
    #[serde(default)]
    pub rects: HashMap<String, Rect>,
    #[serde(default)]
    pub scroll: HashMap<String, ScrollInfo>,
}

/// A parsed host page plus its measurements.
pub struct Page {
    pub document: NodeRef,
    pub metrics: Metrics,
    key_counter: Cell<u64>,
}

impl Page {
    pub fn new(document: NodeRef, metrics: Metrics) -> Self {
        Self {
            document,
            metrics,
            key_counter: Cell::new(0),
        }
    }

    pub fn from_html(html: &str) -> Self {
        Self::new(parse_html(html), Metrics::default())
    }

    /// Stable identity for an element: its `id` when present, otherwise a
    /// generated key cached on the element so repeat lookups agree.
    pub fn element_key(&self, node: &NodeRef) -> String {
        if let Some(id) = attr(node, "id")
            && !id.is_empty()
        {
            return id;
        }
        if let Some(key) = attr(node, KEY_ATTR) {
            return key;
        }
        let n = self.key_counter.get() + 1;
        self.key_counter.set(n);
        let key = format!("ih-k{n}");
        set_attr(node, KEY_ATTR, &key);
        key
    }

    pub fn rect_of(&self, node: &NodeRef) -> Option<Rect> {
        self.metrics.rects.get(&self.element_key(node)).copied()
    }

    pub fn scroll_of(&self, node: &NodeRef) -> Option<ScrollInfo> {
        self.metrics.scroll.get(&self.element_key(node)).copied()
    }

    pub fn set_scroll_top(&mut self, node: &NodeRef, top: f64) {
        let key = self.element_key(node);
        let info = self.metrics.scroll.entry(key).or_default();
        info.scroll_top = top.max(0.0);
    }

    /// Content width of a container, best measurement available.
    pub fn client_width(&self, node: &NodeRef) -> f64 {
        if let Some(scroll) = self.scroll_of(node)
            && scroll.client_width > 0.0
        {
            return scroll.client_width;
        }
        if let Some(rect) = self.rect_of(node) {
            return rect.width;
        }
        self.metrics.viewport_width
    }

    /// Visibility in the browser sense: not hidden by inline style, and
    /// (when measured) occupying actual screen area.
    pub fn is_visible(&self, node: &NodeRef) -> bool {
        if style_property(node, "display").as_deref() == Some("none") {
            return false;
        }
        if style_property(node, "visibility").as_deref() == Some("hidden") {
            return false;
        }
        match self.rect_of(node) {
            Some(rect) => rect.width > 0.0 && rect.height > 0.0,
            None => true,
        }
    }
}

pub fn parse_html(html: &str) -> NodeRef {
    kuchiki::parse_html().one(html)
}

/// CSS select over a subtree; a selector that fails to parse yields no
/// matches, keeping discovery heuristics best-effort.
pub fn select(scope: &NodeRef, selector: &str) -> Vec<NodeRef> {
    match scope.select(selector) {
        Ok(matches) => matches.map(|m| m.as_node().clone()).collect(),
        Err(()) => Vec::new(),
    }
}

pub fn select_first(scope: &NodeRef, selector: &str) -> Option<NodeRef> {
    scope
        .select_first(selector)
        .ok()
        .map(|m| m.as_node().clone())
}

/// Creates a detached element from an HTML fragment. The fragment is
/// parsed as a full document and the first element under `<body>` is
/// lifted out, which avoids depending on the parser's internal name
/// types for element construction.
pub fn create_element(fragment: &str) -> NodeRef {
    let document = parse_html(&format!("<html><body>{fragment}</body></html>"));
    let body = select_first(&document, "body").expect("parser always yields a body");
    let node = body
        .children()
        .find(|child| child.as_element().is_some())
        .expect("fragment must contain one element");
    node.detach();
    node
}

/// Replaces an element's children with the parsed fragment.
pub fn set_inner_html(node: &NodeRef, html: &str) {
    for child in node.children().collect::<Vec<_>>() {
        child.detach();
    }
    let document = parse_html(&format!("<html><body>{html}</body></html>"));
    if let Some(body) = select_first(&document, "body") {
        for child in body.children().collect::<Vec<_>>() {
            child.detach();
            node.append(child);
        }
    }
}

/// Outer HTML of a node (inner HTML for a document node).
pub fn serialize_node(node: &NodeRef) -> String {
    let mut out = Vec::new();
    if node.serialize(&mut out).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Structural copy of an element, done by reserializing. Used to clone a
/// host button so its scoped style attributes carry over.
pub fn deep_clone(node: &NodeRef) -> NodeRef {
    create_element(&serialize_node(node))
}

pub fn strip_tags(html: &str) -> String {
    normalize_spaces(&parse_html(html).text_contents())
}

pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element().map(|el| el.name.local.to_string())
}

pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    let element = node.as_element()?;
    let attributes = element.attributes.borrow();
    attributes.get(name).map(str::to_string)
}

pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    if let Some(element) = node.as_element() {
        element
            .attributes
            .borrow_mut()
            .insert(name, value.to_string());
    }
}

pub fn remove_attr(node: &NodeRef, name: &str) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().remove(name);
    }
}

pub fn normalized_text(node: &NodeRef) -> String {
    normalize_spaces(&node.text_contents())
}

pub fn has_class(node: &NodeRef, class: &str) -> bool {
    attr(node, "class")
        .map(|classes| classes.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

pub fn add_class(node: &NodeRef, class: &str) {
    let classes = attr(node, "class").unwrap_or_default();
    if classes.split_whitespace().any(|c| c == class) {
        return;
    }
    let updated = if classes.is_empty() {
        class.to_string()
    } else {
        format!("{classes} {class}")
    };
    set_attr(node, "class", &updated);
}

pub fn remove_class(node: &NodeRef, class: &str) {
    let Some(classes) = attr(node, "class") else {
        return;
    };
    let updated = classes
        .split_whitespace()
        .filter(|c| *c != class)
        .collect::<Vec<_>>()
        .join(" ");
    set_attr(node, "class", &updated);
}

/// First inclusive ancestor matching the predicate (the `closest` idiom).
pub fn closest<F>(node: &NodeRef, predicate: F) -> Option<NodeRef>
where
    F: Fn(&NodeRef) -> bool,
{
    node.inclusive_ancestors()
        .filter(|n| n.as_element().is_some())
        .find(|n| predicate(n))
}

fn parse_style(node: &NodeRef) -> Vec<(String, String, bool)> {
    let Some(style) = attr(node, "style") else {
        return Vec::new();
    };
    style
        .split(';')
        .filter_map(|declaration| {
            let (prop, value) = declaration.split_once(':')?;
            let prop = prop.trim().to_string();
            let mut value = value.trim().to_string();
            let important = value.to_lowercase().ends_with("!important");
            if important {
                value = value[..value.len() - "!important".len()].trim().to_string();
            }
            if prop.is_empty() {
                return None;
            }
            Some((prop, value, important))
        })
        .collect()
}

fn write_style(node: &NodeRef, declarations: &[(String, String, bool)]) {
    if declarations.is_empty() {
        remove_attr(node, "style");
        return;
    }
    let style = declarations
        .iter()
        .map(|(prop, value, important)| {
            if *important {
                format!("{prop}: {value} !important")
            } else {
                format!("{prop}: {value}")
            }
        })
        .collect::<Vec<_>>()
        .join("; ");
    set_attr(node, "style", &style);
}

pub fn style_property(node: &NodeRef, prop: &str) -> Option<String> {
    parse_style(node)
        .into_iter()
        .find(|(p, _, _)| p.eq_ignore_ascii_case(prop))
        .map(|(_, value, _)| value)
}

/// Sets an inline style declaration, replacing any previous value for the
/// property. `important` mirrors the maximum-priority assignment the host
/// stylesheets cannot override.
pub fn set_style_property(node: &NodeRef, prop: &str, value: &str, important: bool) {
    let mut declarations = parse_style(node);
    declarations.retain(|(p, _, _)| !p.eq_ignore_ascii_case(prop));
    declarations.push((prop.to_string(), value.to_string(), important));
    write_style(node, &declarations);
}

pub fn remove_style_property(node: &NodeRef, prop: &str) {
    let mut declarations = parse_style(node);
    declarations.retain(|(p, _, _)| !p.eq_ignore_ascii_case(prop));
    write_style(node, &declarations);
}
