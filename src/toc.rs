//! Table-of-contents extraction and navigation for the judgment preview.
//!
//! Judgment bodies mark their structure two ways: a word-processor class
//! carrying an explicit level (`C05Titre2`), or one of a fixed set of
//! French structural phrases. Numbered point paragraphs never count.

use anyhow::{Context, Result};
use kuchiki::NodeRef;
use regex::Regex;
use serde::Serialize;

use crate::dom::{self, Page};
use crate::util::{escape_html, normalize_spaces, px};

pub const ANCHOR_CLASS: &str = "ih-toc-anchor";
pub const LINK_CLASS: &str = "ih-toc-link";
const TOC_ID_ATTR: &str = "data-ih-toc-id";

/// How far below the container top a heading lands, so it clears the
/// sticky preview header.
const MIN_SCROLL_OFFSET: f64 = 14.0;

#[derive(Debug, Clone, Serialize)]
pub struct TocItem {
    pub id: String,
    pub text: String,
    pub level: u32,
}

pub struct Heading {
    pub node: NodeRef,
    pub text: String,
    pub level: u32,
}

/// A scroll that should be re-applied once after the host settles.
pub struct ScrollTarget {
    pub container: NodeRef,
    pub heading: NodeRef,
    pub offset: f64,
}

pub struct HeadingDetector {
    class_level: Regex,
    class_level_bare: Regex,
    numbered_point: Regex,
    sur_prefix: Regex,
    structural: Vec<Regex>,
}

impl HeadingDetector {
    pub fn new() -> Result<Self> {
        let structural = [
            r"(?i)^Le cadre juridique$",
            r"(?i)^Les litiges au principal",
            r"(?i)^Sur les questions préjudicielles",
            r"(?i)^Sur la",
            r"(?i)^Sur le",
            r"(?i)^Sur\s+l[’']",
            r"(?i)^Par ces motifs",
            r"(?i)^Arrêt$",
            r"(?i)^Ordonnance$",
            r"(?i)^Signatures$",
        ]
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("compiling heading pattern {p}")))
        .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            class_level: Regex::new(r"\bC\d{2}Titre(\d+)\b")
                .context("compiling class level pattern")?,
            class_level_bare: Regex::new(r"\bTitre(\d+)\b")
                .context("compiling bare class level pattern")?,
            numbered_point: Regex::new(r"^\d+\b").context("compiling point pattern")?,
            sur_prefix: Regex::new(r"(?i)^Sur\s+").context("compiling sur pattern")?,
            structural,
        })
    }

    fn level_from_class(&self, node: &NodeRef) -> Option<u32> {
        let class = dom::attr(node, "class")?;
        let captures = self
            .class_level
            .captures(&class)
            .or_else(|| self.class_level_bare.captures(&class))?;
        captures.get(1)?.as_str().parse().ok()
    }

    pub fn find_heading_candidates(&self, root: &NodeRef) -> Vec<Heading> {
        let mut headings = Vec::new();
        for p in dom::select(root, "p") {
            let text = normalize_heading_text(&p.text_contents());
            if text.is_empty() || self.numbered_point.is_match(&text) {
                continue;
            }

            let class_level = self.level_from_class(&p);
            let structural = self.structural.iter().any(|re| re.is_match(&text));
            if class_level.is_none() && !structural {
                continue;
            }

            let level = class_level
                .unwrap_or_else(|| if self.sur_prefix.is_match(&text) { 2 } else { 1 });
            headings.push(Heading { node: p, text, level });
        }
        headings
    }

    /// Detects headings and gives each one an in-document anchor. Safe to
    /// call on every pass: existing anchors are reused, not duplicated.
    pub fn build_toc_items(&self, root: &NodeRef) -> Vec<TocItem> {
        self.find_heading_candidates(root)
            .into_iter()
            .enumerate()
            .map(|(idx, heading)| {
                let id = ensure_anchor(&heading.node, idx + 1);
                TocItem {
                    id,
                    text: heading.text,
                    level: heading.level,
                }
            })
            .collect()
    }
}

pub fn normalize_heading_text(s: &str) -> String {
    let text = normalize_spaces(s);
    let mut trimmed = text.trim_end();
    if let Some(stripped) = trimmed.strip_suffix(':') {
        trimmed = stripped.trim_end();
    }
    trimmed.to_string()
}

fn ensure_anchor(heading: &NodeRef, index: usize) -> String {
    if let Some(existing) = dom::select_first(heading, &format!("a.{ANCHOR_CLASS}")) {
        return dom::attr(&existing, "id").unwrap_or_else(|| format!("ih-toc-h-{index}"));
    }

    let id = format!("ih-toc-h-{index}");
    dom::set_attr(heading, TOC_ID_ATTR, &id);

    let anchor = dom::create_element(&format!(
        r##"<a class="{ANCHOR_CLASS}" id="{id}" href="#{id}" aria-hidden="true"></a>"##
    ));
    heading.prepend(anchor);
    id
}

/// Re-renders the TOC list into its panel container.
pub fn render_toc(container: &NodeRef, items: &[TocItem]) {
    for child in container.children().collect::<Vec<_>>() {
        child.detach();
    }

    if items.is_empty() {
        container.append(dom::create_element(
            r#"<div class="ih-muted">No headings detected.</div>"#,
        ));
        return;
    }

    for item in items {
        let link = dom::create_element(&format!(
            r##"<a href="#{id}" class="{LINK_CLASS}" {TOC_ID_ATTR}="{id}" style="padding-left: {pad}">{text}</a>"##,
            id = item.id,
            pad = px(8.0 + (item.level.saturating_sub(1)) as f64 * 14.0),
            text = escape_html(&item.text),
        ));
        container.append(link);
    }
}

/// Whether an element can actually scroll: overflow allows it and the
/// measured content overflows by more than rounding noise.
fn is_scrollable(page: &Page, node: &NodeRef) -> bool {
    let overflow = dom::style_property(node, "overflow-y")
        .or_else(|| dom::style_property(node, "overflow"))
        .unwrap_or_default()
        .to_lowercase();
    if !matches!(overflow.as_str(), "auto" | "scroll" | "overlay") {
        return false;
    }
    match page.scroll_of(node) {
        Some(info) => info.scroll_height > info.client_height + 2.0,
        None => false,
    }
}

pub fn scroll_container_for_preview(page: &Page, preview_root: &NodeRef) -> NodeRef {
    if is_scrollable(page, preview_root) {
        return preview_root.clone();
    }

    let candidates = [
        "#document-viewer-content.preview-content",
        "#document-viewer-content",
        r#"[data-testid="document-viewer-content"]"#,
        ".preview-content",
    ];
    for selector in candidates {
        if let Some(node) = dom::select_first(preview_root, selector)
            && is_scrollable(page, &node)
        {
            return node;
        }
    }
    preview_root.clone()
}

pub fn compute_scroll_top(
    page: &Page,
    container: &NodeRef,
    target: &NodeRef,
    offset: f64,
) -> Option<f64> {
    let container_rect = page.rect_of(container)?;
    let target_rect = page.rect_of(target)?;
    let current = page.scroll_of(container).map(|s| s.scroll_top).unwrap_or(0.0);
    let delta = target_rect.y - container_rect.y;
    Some((current + delta - offset).round().max(0.0))
}

fn header_offset(page: &Page, preview_root: &NodeRef) -> f64 {
    let header = dom::select_first(preview_root, ".preview-header")
        .or_else(|| dom::select_first(preview_root, ".information-panel-header"))
        .or_else(|| dom::select_first(preview_root, r#"[role="tablist"]"#));
    let header_height = header
        .and_then(|h| page.rect_of(&h))
        .map(|r| r.height.round())
        .unwrap_or(0.0);
    MIN_SCROLL_OFFSET.max(header_height + 8.0)
}

/// Scrolls the heading under the preview header, returning the target so
/// the caller can schedule one re-application after host reflows settle.
pub fn scroll_heading_into_view(
    page: &mut Page,
    preview_root: &NodeRef,
    heading: &NodeRef,
) -> Option<ScrollTarget> {
    let container = scroll_container_for_preview(page, preview_root);
    let offset = header_offset(page, preview_root);
    let top = compute_scroll_top(page, &container, heading, offset)?;
    page.set_scroll_top(&container, top);
    Some(ScrollTarget {
        container,
        heading: heading.clone(),
        offset,
    })
}

impl ScrollTarget {
    /// Recomputes against current measurements and applies again.
    pub fn reapply(&self, page: &mut Page) {
        if let Some(top) = compute_scroll_top(page, &self.container, &self.heading, self.offset) {
            page.set_scroll_top(&self.container, top);
        }
    }
}

/// Resolves a click on a TOC link to its heading paragraph: by anchor id
/// first, by exact heading text when the anchor was lost to a host
/// re-render.
pub fn resolve_toc_click(
    page: &mut Page,
    preview_root: &NodeRef,
    id: &str,
    link_text: &str,
) -> Option<ScrollTarget> {
    if let Some(anchor) = dom::select_first(preview_root, &format!("#{id}"))
        && let Some(heading) = anchor.parent()
    {
        return scroll_heading_into_view(page, preview_root, &heading);
    }

    let text = normalize_heading_text(link_text);
    if text.is_empty() {
        return None;
    }
    let heading = dom::select(preview_root, "p")
        .into_iter()
        .find(|p| normalize_heading_text(&p.text_contents()) == text)?;
    scroll_heading_into_view(page, preview_root, &heading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Rect, ScrollInfo};

    const PREVIEW: &str = r#"
        <div id="panel-document-preview">
          <p class="C19Centre">ARRÊT DE LA COUR (grande chambre)</p>
          <p class="C01PointnumeroteAltN">1 Par sa question, la juridiction…</p>
          <p class="C04Titre1"> Le cadre juridique :</p>
          <p class="C05Titre2">Le droit de l’Union</p>
          <p>Sur les questions préjudicielles</p>
          <p>Sur la première question</p>
          <p>Par ces motifs, la Cour (grande chambre) dit pour droit</p>
          <p>12 n’est pas un titre</p>
        </div>"#;

    fn detector() -> HeadingDetector {
        HeadingDetector::new().unwrap()
    }

    #[test]
    fn detects_class_and_phrase_headings_with_levels() {
        let page = Page::from_html(PREVIEW);
        let root = dom::select_first(&page.document, "#panel-document-preview").unwrap();
        let headings = detector().find_heading_candidates(&root);

        let got: Vec<(&str, u32)> = headings
            .iter()
            .map(|h| (h.text.as_str(), h.level))
            .collect();
        assert_eq!(
            got,
            vec![
                ("Le cadre juridique", 1),
                ("Le droit de l’Union", 2),
                ("Sur les questions préjudicielles", 2),
                ("Sur la première question", 2),
                ("Par ces motifs, la Cour (grande chambre) dit pour droit", 1),
            ]
        );
    }

    #[test]
    fn numbered_points_are_never_headings() {
        let page = Page::from_html("<div id='r'><p class='C04Titre1'>3 Le cadre juridique</p></div>");
        let root = dom::select_first(&page.document, "#r").unwrap();
        assert!(detector().find_heading_candidates(&root).is_empty());
    }

    #[test]
    fn heading_text_drops_trailing_colon() {
        assert_eq!(normalize_heading_text("  Le cadre juridique :  "), "Le cadre juridique");
        assert_eq!(normalize_heading_text("Sur la première question"), "Sur la première question");
    }

    #[test]
    fn anchors_are_inserted_once_and_reused() {
        let page = Page::from_html(PREVIEW);
        let root = dom::select_first(&page.document, "#panel-document-preview").unwrap();
        let det = detector();

        let first = det.build_toc_items(&root);
        let serialized_once = dom::serialize_node(&root);
        let second = det.build_toc_items(&root);
        let serialized_twice = dom::serialize_node(&root);

        assert_eq!(first.len(), 5);
        assert_eq!(first[0].id, "ih-toc-h-1");
        assert_eq!(
            first.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
            second.iter().map(|i| i.id.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(serialized_once, serialized_twice);
        assert_eq!(dom::select(&root, &format!("a.{ANCHOR_CLASS}")).len(), 5);
    }

    #[test]
    fn render_toc_indents_by_level_and_replaces_content() {
        let page = Page::from_html("<div id='toc'><span>stale</span></div>");
        let container = dom::select_first(&page.document, "#toc").unwrap();
        let items = vec![
            TocItem { id: "ih-toc-h-1".into(), text: "Le cadre juridique".into(), level: 1 },
            TocItem { id: "ih-toc-h-2".into(), text: "Sur la première question".into(), level: 2 },
        ];

        render_toc(&container, &items);

        let links = dom::select(&container, &format!("a.{LINK_CLASS}"));
        assert_eq!(links.len(), 2);
        assert!(dom::select_first(&container, "span").is_none());
        assert_eq!(
            dom::style_property(&links[0], "padding-left").as_deref(),
            Some("8px")
        );
        assert_eq!(
            dom::style_property(&links[1], "padding-left").as_deref(),
            Some("22px")
        );

        render_toc(&container, &[]);
        assert!(dom::select_first(&container, "div.ih-muted").is_some());
    }

    fn scrolling_page() -> Page {
        let mut page = Page::from_html(
            r#"<div id="panel-document-preview">
                 <div id="document-viewer-content" class="preview-content" style="overflow-y: auto">
                   <p class="C04Titre1">Le cadre juridique</p>
                 </div>
               </div>"#,
        );
        page.metrics.scroll.insert(
            "document-viewer-content".into(),
            ScrollInfo {
                scroll_top: 100.0,
                scroll_height: 5000.0,
                client_height: 700.0,
                client_width: 800.0,
            },
        );
        page.metrics.rects.insert(
            "document-viewer-content".into(),
            Rect { x: 0.0, y: 50.0, width: 800.0, height: 700.0 },
        );
        page
    }

    #[test]
    fn scroll_container_prefers_scrollable_viewer_over_root() {
        let page = scrolling_page();
        let root = dom::select_first(&page.document, "#panel-document-preview").unwrap();
        let container = scroll_container_for_preview(&page, &root);
        assert_eq!(dom::attr(&container, "id").as_deref(), Some("document-viewer-content"));
    }

    #[test]
    fn scroll_target_accounts_for_current_scroll_and_offset() {
        let mut page = scrolling_page();
        let root = dom::select_first(&page.document, "#panel-document-preview").unwrap();
        let heading = dom::select_first(&root, "p").unwrap();
        let key = page.element_key(&heading);
        page.metrics.rects.insert(
            key,
            Rect { x: 0.0, y: 450.0, width: 800.0, height: 20.0 },
        );

        let target = scroll_heading_into_view(&mut page, &root, &heading).unwrap();
        // 100 (current) + (450 - 50) (delta) - 14 (offset) = 486.
        let container = target.container.clone();
        assert_eq!(page.scroll_of(&container).unwrap().scroll_top, 486.0);

        // Host reflow moved the heading; the deferred re-application follows it.
        let key = page.element_key(&heading);
        page.metrics.rects.insert(
            key,
            Rect { x: 0.0, y: 250.0, width: 800.0, height: 20.0 },
        );
        target.reapply(&mut page);
        assert_eq!(page.scroll_of(&container).unwrap().scroll_top, 672.0);
    }

    #[test]
    fn toc_click_falls_back_to_heading_text() {
        let mut page = scrolling_page();
        let root = dom::select_first(&page.document, "#panel-document-preview").unwrap();
        let heading = dom::select_first(&root, "p").unwrap();
        let key = page.element_key(&heading);
        page.metrics.rects.insert(
            key,
            Rect { x: 0.0, y: 450.0, width: 800.0, height: 20.0 },
        );

        // No anchor with this id exists; resolution goes through the text.
        let target = resolve_toc_click(&mut page, &root, "ih-toc-h-9", "Le cadre juridique :");
        assert!(target.is_some());
        assert!(resolve_toc_click(&mut page, &root, "ih-toc-h-9", "Absent").is_none());
    }
}
