//! Docked three-pane layout inside the host's `#main-content` flex row.
//!
//! The host SPA re-renders its panes freely, so nothing is cached beyond
//! the session [`LayoutState`]: every pass re-discovers the panes, moves
//! the helper and splitters into place and re-applies widths when the
//! layout signature changed.

pub mod drag;
pub mod sizing;

use std::sync::LazyLock;

use kuchiki::NodeRef;
use regex::Regex;
use tracing::debug;

use crate::dom::{self, Page};
use crate::model::LayoutState;
use crate::util::px;

pub const PANEL_ID: &str = "infocuria-helper";
pub const SPLITTER_CLASS: &str = "ih-splitter";
pub const SPLITTER_1_ID: &str = "ih-splitter-1";
pub const SPLITTER_2_ID: &str = "ih-splitter-2";
pub const TOGGLES_ID: &str = "ih-layout-toggles";
pub const DOCKED_CLASS: &str = "ih-docked";
pub const FLOATING_CLASS: &str = "ih-floating";
pub const FIXED_RIGHT_CLASS: &str = "ih-fixed-right";
pub const HIDDEN_CLASS: &str = "ih-hidden";
pub const HAS_DOCKED_CLASS: &str = "ih-has-docked";

static HEADING_CASE_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Liste des affaires").expect("valid list heading pattern"));
static FILTER_TOGGLE_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)masquer\s+les\s+filtres|afficher\s+les\s+filtres")
        .expect("valid filter toggle pattern")
});
static HIDE_FILTERS_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)masquer\s+les\s+filtres").expect("valid hide filters pattern"));
static RETOUR_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bretour\b").expect("valid retour pattern"));
static FILTRES_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfiltres\b").expect("valid filtres pattern"));

#[derive(Clone)]
pub struct Panes {
    pub main_content: NodeRef,
    pub list: Option<NodeRef>,
    pub details: NodeRef,
}

type PaneStrategy = fn(&Page, &[NodeRef]) -> Option<NodeRef>;

/// Details-pane heuristics, strongest first.
const DETAILS_STRATEGIES: &[(&str, PaneStrategy)] = &[
    ("preview-sub-root", details_by_preview),
    ("information-panel", details_by_information_panel),
    ("region-landmark", details_by_region_label),
    ("aria-panneau", details_by_aria_label),
];

fn details_by_preview(_page: &Page, children: &[NodeRef]) -> Option<NodeRef> {
    children
        .iter()
        .find(|el| dom::select_first(el, "#panel-document-preview").is_some())
        .cloned()
}

fn details_by_information_panel(_page: &Page, children: &[NodeRef]) -> Option<NodeRef> {
    children
        .iter()
        .find(|el| dom::select_first(el, "#information-panel-container").is_some())
        .cloned()
}

fn details_by_region_label(_page: &Page, children: &[NodeRef]) -> Option<NodeRef> {
    children
        .iter()
        .find(|el| {
            dom::select_first(el, r#"[role="region"][aria-label]"#)
                .and_then(|region| dom::attr(&region, "aria-label"))
                .map(|label| {
                    let label = label.to_lowercase();
                    label.contains("panneau") && label.contains("latéral")
                })
                .unwrap_or(false)
        })
        .cloned()
}

fn details_by_aria_label(_page: &Page, children: &[NodeRef]) -> Option<NodeRef> {
    children
        .iter()
        .find(|el| {
            dom::attr(el, "aria-label")
                .map(|label| label.to_lowercase().contains("panneau"))
                .unwrap_or(false)
        })
        .cloned()
}

fn pick_details_pane(page: &Page, children: &[NodeRef]) -> Option<NodeRef> {
    for (name, strategy) in DETAILS_STRATEGIES {
        if let Some(pane) = strategy(page, children) {
            debug!(strategy = name, "details pane resolved");
            return Some(pane);
        }
    }
    None
}

fn pick_list_pane(page: &Page, children: &[NodeRef]) -> Option<NodeRef> {
    let by_heading = children.iter().find(|el| {
        dom::select(el, "h1,h2,h3,h4,h5")
            .iter()
            .any(|h| HEADING_CASE_LIST.is_match(&dom::normalized_text(h)))
    });
    if let Some(pane) = by_heading {
        debug!(strategy = "case-list-heading", "list pane resolved");
        return Some(pane.clone());
    }

    // Fall back to the leftmost measured child.
    let mut sorted: Vec<NodeRef> = children.to_vec();
    sorted.sort_by(|a, b| {
        let xa = page.rect_of(a).map(|r| r.x).unwrap_or(f64::MAX);
        let xb = page.rect_of(b).map(|r| r.x).unwrap_or(f64::MAX);
        xa.partial_cmp(&xb).unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.first().cloned()
}

/// Resolves the host flex container and its panes. Our own helper and
/// splitters never count as panes; hidden children are skipped for
/// details detection when a visible candidate exists.
pub fn find_layout_panes(page: &Page) -> Option<Panes> {
    let main_content = dom::select_first(&page.document, "#main-content")?;

    let children: Vec<NodeRef> = main_content
        .children()
        .filter(|c| c.as_element().is_some())
        .filter(|c| {
            dom::attr(c, "id").as_deref() != Some(PANEL_ID) && !dom::has_class(c, SPLITTER_CLASS)
        })
        .collect();
    if children.is_empty() {
        return None;
    }

    let visible: Vec<NodeRef> = children
        .iter()
        .filter(|c| page.is_visible(c))
        .cloned()
        .collect();
    if visible.is_empty() {
        return None;
    }

    let details = pick_details_pane(page, &visible).or_else(|| pick_details_pane(page, &children))?;
    let list_candidates: Vec<NodeRef> = children
        .iter()
        .filter(|c| **c != details)
        .cloned()
        .collect();
    let list = pick_list_pane(page, &list_candidates);

    Some(Panes { main_content, list, details })
}

/// Flex sizing the host stylesheets cannot override. `flex-shrink: 1`
/// lets panes give way when the viewport narrows; `min-width: 0` lets
/// flex items actually shrink.
pub fn set_flex_basis(el: &NodeRef, width: f64) {
    dom::set_style_property(el, "flex", &format!("0 1 {}", px(width)), true);
    dom::set_style_property(el, "max-width", &px(width), true);
    dom::set_style_property(el, "min-width", "0px", true);
}

pub fn set_panel_hidden(page: &Page, hidden: bool) {
    let Some(panel) = dom::select_first(&page.document, &format!("#{PANEL_ID}")) else {
        return;
    };
    if hidden {
        dom::add_class(&panel, HIDDEN_CLASS);
    } else {
        dom::remove_class(&panel, HIDDEN_CLASS);
    }
}

fn ensure_splitter(page: &Page, id: &str) -> NodeRef {
    if let Some(existing) = dom::select_first(&page.document, &format!("#{id}")) {
        return existing;
    }
    dom::create_element(&format!(
        r#"<div id="{id}" class="{SPLITTER_CLASS}" role="separator" aria-orientation="vertical" aria-label="Resize panels" title="Drag to resize panels"></div>"#
    ))
}

fn previous_element_sibling(node: &NodeRef) -> Option<NodeRef> {
    node.preceding_siblings()
        .find(|n| n.as_element().is_some())
}

fn place_before(node: &NodeRef, reference: &NodeRef) {
    if previous_element_sibling(reference).is_some_and(|prev| prev == *node) {
        return;
    }
    node.detach();
    reference.insert_before(node.clone());
}

fn set_plain_display(el: &NodeRef, hidden: bool) {
    if hidden {
        dom::set_style_property(el, "display", "none", false);
    } else {
        dom::remove_style_property(el, "display");
    }
}

pub fn find_filter_toggle_button(page: &Page) -> Option<NodeRef> {
    if let Some(btn) = dom::select_first(
        &page.document,
        "button.filter-tooltip-hide,button.filter-tooltip-show",
    ) {
        return Some(btn);
    }
    dom::select(&page.document, "button")
        .into_iter()
        .find(|b| FILTER_TOGGLE_TEXT.is_match(&dom::normalized_text(b)))
}

/// The host's "hide filters" control, as opposed to "show filters".
pub fn is_hide_filters_button(btn: &NodeRef) -> bool {
    dom::has_class(btn, "filter-tooltip-hide") || HIDE_FILTERS_TEXT.is_match(&dom::normalized_text(btn))
}

pub fn find_mobile_return_button(page: &Page) -> Option<NodeRef> {
    if let Some(btn) = dom::select_first(&page.document, "#close-information-button button") {
        return Some(btn);
    }
    dom::select(&page.document, "button")
        .into_iter()
        .find(|b| RETOUR_TEXT.is_match(&dom::normalized_text(b)))
}

pub fn find_any_filter_button(page: &Page) -> Option<NodeRef> {
    if let Some(btn) = find_filter_toggle_button(page) {
        return Some(btn);
    }
    dom::select(&page.document, "button").into_iter().find(|b| {
        dom::attr(b, "aria-label")
            .map(|l| l.to_lowercase().contains("filtres"))
            .unwrap_or(false)
            || FILTRES_TEXT.is_match(&dom::normalized_text(b))
    })
}

fn results_label(state: &LayoutState) -> &'static str {
    if state.hide_results {
        "Afficher les résultats"
    } else {
        "Masquer les résultats"
    }
}

fn helper_label(state: &LayoutState) -> &'static str {
    if state.hide_helper {
        "Afficher Better Infocuria"
    } else {
        "Masquer Better Infocuria"
    }
}

/// Rewrites a toggle's label and icon while keeping the cloned button's
/// internal structure (the host scopes its styles to that structure).
fn set_button_label(btn: &NodeRef, label: &str, icon_class: &str) {
    if let Some(icon) = dom::select_first(btn, ".icon-left i") {
        dom::set_attr(&icon, "class", icon_class);
    }
    let icon_left = dom::select_first(btn, ".icon-left");
    if let Some(icon_left) = &icon_left {
        icon_left.detach();
    }
    for child in btn.children().collect::<Vec<_>>() {
        child.detach();
    }
    if let Some(icon_left) = icon_left {
        btn.append(icon_left);
    }
    btn.append(NodeRef::new_text(format!(" {label} ")));
}

fn make_toggle_button(template: Option<&NodeRef>, id: &str, label: &str, icon_class: &str) -> NodeRef {
    let btn = match template {
        // Clone the host's button so its scoped style attributes carry over.
        Some(tpl) => {
            let b = dom::deep_clone(tpl);
            dom::set_attr(&b, "class", &format!("{} ih-layout-toggle", dom::attr(&b, "class").unwrap_or_default()));
            b
        }
        None => dom::create_element(&format!(
            r#"<button class="curia-button curia-button--md curia-button--tertiary ih-layout-toggle"><i class="icon-left"><i class="{icon_class}" aria-hidden="true" aria-label=""></i></i></button>"#
        )),
    };
    dom::set_attr(&btn, "type", "button");
    dom::set_attr(&btn, "id", id);
    dom::set_attr(&btn, "tabindex", "0");
    dom::set_attr(&btn, "aria-disabled", "false");
    set_button_label(&btn, label, icon_class);
    btn
}

fn update_toggle_labels(
    page: &Page,
    state: &LayoutState,
    wrap: &NodeRef,
    panes: Option<&Panes>,
    panel: Option<&NodeRef>,
) {
    let results = dom::select_first(wrap, "#ih-toggle-results");
    let helper = dom::select_first(wrap, "#ih-toggle-helper");
    let filters = dom::select_first(wrap, "#ih-toggle-filters");
    let scroll = dom::select_first(wrap, "#ih-scroll-to-doc");

    if let Some(btn) = &results {
        set_button_label(btn, results_label(state), "bi bi-list-ul");
        set_plain_display(btn, panes.and_then(|p| p.list.as_ref()).is_none());
    }
    if let Some(btn) = &helper {
        set_button_label(btn, helper_label(state), "bi bi-layout-sidebar-inset");
        set_plain_display(btn, panel.is_none());
    }
    if let Some(btn) = &filters {
        set_button_label(btn, "Filtres", "bi bi-funnel");
        set_plain_display(btn, find_any_filter_button(page).is_none());
    }
    if let Some(btn) = &scroll {
        set_button_label(btn, "Aller au document", "bi bi-arrow-down");
    }
}

/// Keeps the toggle group alive next to the host's filters toggle (or
/// the mobile Retour button), creating it on first sight. The group
/// never lands inside `#main-content`: that container only holds panes.
pub fn ensure_layout_toggles(
    page: &Page,
    state: &LayoutState,
    panes: Option<&Panes>,
    panel: Option<&NodeRef>,
) {
    let host_btn = find_filter_toggle_button(page);
    let return_btn = find_mobile_return_button(page);
    let Some(anchor) = host_btn.clone().or_else(|| return_btn.clone()) else {
        // No anchor yet: keep an existing group's labels fresh, nothing else.
        if let Some(wrap) = dom::select_first(&page.document, &format!("#{TOGGLES_ID}")) {
            update_toggle_labels(page, state, &wrap, panes, panel);
        }
        return;
    };

    let wrap = match dom::select_first(&page.document, &format!("#{TOGGLES_ID}")) {
        Some(wrap) => wrap,
        None => {
            let wrap = dom::create_element(&format!(
                r#"<div id="{TOGGLES_ID}" class="ih-layout-toggles"></div>"#
            ));
            let template = host_btn.as_ref().or(return_btn.as_ref());

            let filters = make_toggle_button(template, "ih-toggle-filters", "Filtres", "bi bi-funnel");
            let results =
                make_toggle_button(template, "ih-toggle-results", results_label(state), "bi bi-list-ul");
            let helper = make_toggle_button(
                template,
                "ih-toggle-helper",
                helper_label(state),
                "bi bi-layout-sidebar-inset",
            );
            let scroll =
                make_toggle_button(template, "ih-scroll-to-doc", "Aller au document", "bi bi-arrow-down");
            dom::set_attr(&scroll, "aria-label", "Aller au document");
            dom::set_attr(&scroll, "title", "Aller au document");

            wrap.append(filters);
            wrap.append(results);
            wrap.append(helper);
            wrap.append(scroll);

            // The mobile Retour button breaks the three-pane row; hide its
            // host when it replaced the filters toggle.
            if host_btn.is_none()
                && let Some(ret) = &return_btn
            {
                let host = dom::closest(ret, |el| {
                    dom::attr(el, "id").as_deref() == Some("close-information-button")
                        || dom::tag_name(el).as_deref() == Some("app-harmonia-button")
                })
                .unwrap_or_else(|| ret.clone());
                dom::set_style_property(&host, "display", "none", true);
            }

            anchor.insert_after(wrap.clone());
            wrap
        }
    };

    // Responsive re-renders can recreate the anchor elsewhere; follow it.
    if wrap.parent() != anchor.parent() {
        wrap.detach();
        anchor.insert_after(wrap.clone());
    }

    update_toggle_labels(page, state, &wrap, panes, panel);
}

/// Disables leftover overlay backdrops that are invisible but still
/// fixed, full-viewport and pointer-capturing. Scoped to pages where our
/// docked layout is active.
pub fn neutralize_lingering_backdrops(page: &Page) {
    let Some(html) = dom::select_first(&page.document, "html") else {
        return;
    };
    if !dom::has_class(&html, HAS_DOCKED_CLASS) {
        return;
    }

    let candidates: Vec<NodeRef> = page
        .document
        .descendants()
        .filter(|n| n.as_element().is_some())
        .filter(|n| {
            dom::has_class(n, "cdk-overlay-backdrop")
                || dom::has_class(n, "cdk-overlay-container")
                || dom::has_class(n, "cdk-overlay-pane")
                || dom::attr(n, "class")
                    .map(|c| c.to_lowercase().contains("backdrop"))
                    .unwrap_or(false)
        })
        .collect();

    for el in candidates {
        if dom::style_property(&el, "pointer-events").as_deref() == Some("none") {
            continue;
        }
        if dom::style_property(&el, "position").as_deref() != Some("fixed") {
            continue;
        }
        let opacity = dom::style_property(&el, "opacity")
            .and_then(|o| o.parse::<f64>().ok())
            .unwrap_or(1.0);
        let invisible = dom::style_property(&el, "visibility").as_deref() == Some("hidden")
            || dom::style_property(&el, "display").as_deref() == Some("none")
            || opacity < 0.05;
        if !invisible {
            continue;
        }
        let Some(rect) = page.rect_of(&el) else {
            continue;
        };
        let covers_screen = rect.width >= page.metrics.viewport_width - 2.0
            && rect.height >= page.metrics.viewport_height - 2.0;
        if !covers_screen {
            continue;
        }

        dom::set_style_property(&el, "pointer-events", "none", true);
        dom::set_style_property(&el, "display", "none", true);
    }
}

/// Re-pins the helper's top edge to the details tab bar / header.
pub fn sync_docked_top(page: &Page, panel: &NodeRef, details: Option<&NodeRef>) {
    let details = match details {
        Some(d) => d.clone(),
        None => match find_layout_panes(page) {
            Some(p) => p.details,
            None => return,
        },
    };

    let tablist = dom::select_first(&details, r#"[role="tablist"]"#);
    let header = tablist
        .as_ref()
        .and_then(|t| dom::closest(t, |el| dom::has_class(el, "information-panel-header")));
    let reference = header.or(tablist).unwrap_or(details);
    let Some(rect) = page.rect_of(&reference) else {
        return;
    };
    dom::set_style_property(panel, "--ih-docked-top", &px(rect.y.round().max(0.0)), false);
}

/// One full layout pass: discover panes, dock (or pin right when the
/// three-column layout is unavailable), place splitters and re-size when
/// the layout signature changed. Returns whether the panel is docked.
pub fn ensure_docked_layout(page: &mut Page, state: &mut LayoutState, panel: &NodeRef) -> bool {
    let Some(panes) = find_layout_panes(page) else {
        dom::remove_class(panel, DOCKED_CLASS);
        dom::remove_class(panel, FLOATING_CLASS);
        dom::add_class(panel, FIXED_RIGHT_CLASS);
        if let Some(body) = dom::select_first(&page.document, "body")
            && panel.parent().map_or(true, |p| p != body)
        {
            panel.detach();
            body.append(panel.clone());
        }
        set_plain_display(panel, state.hide_helper);
        ensure_layout_toggles(page, state, None, Some(panel));
        return false;
    };

    ensure_layout_toggles(page, state, Some(&panes), Some(panel));

    if let Some(list) = &panes.list {
        set_plain_display(list, state.hide_results);
    }
    set_plain_display(panel, state.hide_helper);

    // A pane the host hid via responsive CSS must not reserve width.
    let want_list = panes
        .list
        .as_ref()
        .map(|l| !state.hide_results && page.is_visible(l))
        .unwrap_or(false);
    let want_helper = !state.hide_helper;

    if panel.parent().map_or(true, |p| p != panes.main_content) {
        panel.detach();
        panes.main_content.append(panel.clone());
    }
    dom::add_class(panel, DOCKED_CLASS);
    dom::remove_class(panel, FLOATING_CLASS);
    dom::remove_class(panel, FIXED_RIGHT_CLASS);

    if let Some(html) = dom::select_first(&page.document, "html") {
        dom::add_class(&html, HAS_DOCKED_CLASS);
    }

    neutralize_lingering_backdrops(page);

    // Hold the container to a horizontal, non-wrapping row; narrow-mode
    // stacking makes splitter drags invisible.
    for (prop, value) in [
        ("display", "flex"),
        ("flex-direction", "row"),
        ("flex-wrap", "nowrap"),
        ("align-items", "stretch"),
    ] {
        dom::set_style_property(&panes.main_content, prop, value, true);
    }

    let splitter1 = ensure_splitter(page, SPLITTER_1_ID);
    let splitter2 = ensure_splitter(page, SPLITTER_2_ID);

    if want_list {
        dom::remove_style_property(&splitter1, "display");
        place_before(&splitter1, &panes.details);
    } else {
        set_plain_display(&splitter1, true);
    }
    if want_helper {
        dom::remove_style_property(&splitter2, "display");
        place_before(&splitter2, panel);
    } else {
        set_plain_display(&splitter2, true);
    }

    let splitter_width = page
        .rect_of(&splitter1)
        .map(|r| r.width.round())
        .filter(|w| *w > 0.0)
        .unwrap_or(sizing::DEFAULT_SPLITTER_WIDTH);
    let splitter_count = want_list as u32 + want_helper as u32;
    let container_width = page.client_width(&panes.main_content);
    let total = (container_width - splitter_width * splitter_count as f64).max(0.0);
    if total <= 0.0 {
        return true;
    }

    let list_sig = panes
        .list
        .as_ref()
        .map(|l| {
            format!(
                "{}:{}",
                dom::tag_name(l).unwrap_or_default().to_uppercase(),
                dom::attr(l, "class").unwrap_or_default()
            )
        })
        .unwrap_or_else(|| "NONE:".to_string());
    let layout_key = format!(
        "{list_sig}|{}:{}|{}|{}|{}",
        dom::tag_name(&panes.details).unwrap_or_default().to_uppercase(),
        dom::attr(&panes.details, "class").unwrap_or_default(),
        container_width.round(),
        if want_list { "L1" } else { "L0" },
        if want_helper { "H1" } else { "H0" },
    );

    let needs_sizing = !state.sized
        || state.layout_key != layout_key
        || (state.total_width - total).abs() > 2.0
        || state.force_min_list_once
        || state.force_min_helper_once;

    if needs_sizing {
        let mut seed_list = state.remembered_list.or_else(|| {
            panes
                .list
                .as_ref()
                .and_then(|l| page.rect_of(l))
                .map(|r| r.width)
        });
        let seed_details = state
            .remembered_details
            .or_else(|| page.rect_of(&panes.details).map(|r| r.width));
        let mut seed_helper = state
            .remembered_helper
            .or_else(|| page.rect_of(panel).map(|r| r.width));
        if state.hide_helper {
            seed_helper = None;
        }
        if state.hide_results || !want_list {
            seed_list = None;
        }

        let pin_list = state.force_min_list_once && want_list;
        let pin_helper = state.force_min_helper_once && want_helper;
        if pin_list || pin_helper {
            state.force_min_list_once = false;
            state.force_min_helper_once = false;
        }

        let widths = sizing::compute_widths(&sizing::SizingInput {
            total,
            want_list,
            want_helper,
            force_min_list: pin_list,
            force_min_helper: pin_helper,
            seed_list,
            seed_details,
            seed_helper,
        });

        if want_list
            && let Some(list) = &panes.list
        {
            set_flex_basis(list, widths.list);
        }
        set_flex_basis(&panes.details, widths.details);
        if want_helper {
            set_flex_basis(panel, widths.helper);
        }

        debug!(
            list = widths.list,
            details = widths.details,
            helper = widths.helper,
            total,
            "pane widths applied"
        );

        state.sized = true;
        state.layout_key = layout_key;
        state.total_width = total;
        if want_list {
            state.remembered_list = Some(widths.list);
        }
        state.remembered_details = Some(widths.details);
        if want_helper {
            state.remembered_helper = Some(widths.helper);
        }
    }

    sync_docked_top(page, panel, Some(&panes.details));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Rect;

    const HOST: &str = r#"
        <html><body>
          <div class="toolbar"><button class="filter-tooltip-hide"><i class="icon-left"><i class="bi bi-funnel"></i></i> Masquer les filtres </button></div>
          <div id="main-content">
            <div id="list-pane"><h3>Liste des affaires</h3></div>
            <div id="details-pane"><div id="panel-document-preview"></div></div>
          </div>
          <div id="infocuria-helper"></div>
        </body></html>"#;

    fn host_page() -> Page {
        let mut page = Page::from_html(HOST);
        page.metrics.viewport_width = 1280.0;
        page.metrics.viewport_height = 900.0;
        page.metrics.scroll.insert(
            "main-content".into(),
            crate::dom::ScrollInfo {
                client_width: 1224.0,
                client_height: 900.0,
                scroll_height: 900.0,
                scroll_top: 0.0,
            },
        );
        page.metrics.rects.insert(
            "list-pane".into(),
            Rect { x: 0.0, y: 0.0, width: 460.0, height: 900.0 },
        );
        page.metrics.rects.insert(
            "details-pane".into(),
            Rect { x: 472.0, y: 0.0, width: 752.0, height: 900.0 },
        );
        page
    }

    fn panel(page: &Page) -> NodeRef {
        dom::select_first(&page.document, "#infocuria-helper").unwrap()
    }

    #[test]
    fn discovery_finds_details_by_preview_and_list_by_heading() {
        let page = host_page();
        let panes = find_layout_panes(&page).unwrap();
        assert_eq!(dom::attr(&panes.details, "id").as_deref(), Some("details-pane"));
        assert_eq!(
            panes.list.as_ref().and_then(|l| dom::attr(l, "id")).as_deref(),
            Some("list-pane")
        );
    }

    #[test]
    fn discovery_falls_back_to_information_panel_and_leftmost() {
        let mut page = Page::from_html(
            r#"<div id="main-content">
                 <div id="a"></div>
                 <div id="b"><div id="information-panel-container"></div></div>
               </div>"#,
        );
        page.metrics.rects.insert("a".into(), Rect { x: 10.0, y: 0.0, width: 400.0, height: 600.0 });
        page.metrics.rects.insert("b".into(), Rect { x: 420.0, y: 0.0, width: 600.0, height: 600.0 });
        let panes = find_layout_panes(&page).unwrap();
        assert_eq!(dom::attr(&panes.details, "id").as_deref(), Some("b"));
        assert_eq!(panes.list.and_then(|l| dom::attr(&l, "id")).as_deref(), Some("a"));
    }

    #[test]
    fn discovery_recognizes_region_landmark_label() {
        let page = Page::from_html(
            r#"<div id="main-content">
                 <div id="side"><div role="region" aria-label="Panneau latéral du document"></div></div>
               </div>"#,
        );
        let panes = find_layout_panes(&page).unwrap();
        assert_eq!(dom::attr(&panes.details, "id").as_deref(), Some("side"));
        assert!(panes.list.is_none());
    }

    #[test]
    fn no_details_pane_means_undocked_fixed_right() {
        let mut page = Page::from_html(
            r#"<html><body><div id="main-content"><div id="only-list"><h3>Liste des affaires</h3></div></div>
               <div id="infocuria-helper"></div></body></html>"#,
        );
        let panel = panel(&page);
        let mut state = LayoutState::default();

        let docked = ensure_docked_layout(&mut page, &mut state, &panel);
        assert!(!docked);
        assert!(dom::has_class(&panel, FIXED_RIGHT_CLASS));
        assert!(!dom::has_class(&panel, DOCKED_CLASS));
        let body = dom::select_first(&page.document, "body").unwrap();
        assert_eq!(panel.parent().unwrap(), body);
    }

    #[test]
    fn docked_layout_moves_panel_and_places_splitters() {
        let mut page = host_page();
        let panel = panel(&page);
        let mut state = LayoutState::default();

        let docked = ensure_docked_layout(&mut page, &mut state, &panel);
        assert!(docked);
        assert!(dom::has_class(&panel, DOCKED_CLASS));

        let main = dom::select_first(&page.document, "#main-content").unwrap();
        assert_eq!(panel.parent().unwrap(), main);

        // splitter1 sits just before details, splitter2 just before the panel.
        let details = dom::select_first(&page.document, "#details-pane").unwrap();
        let s1 = dom::select_first(&page.document, &format!("#{SPLITTER_1_ID}")).unwrap();
        let s2 = dom::select_first(&page.document, &format!("#{SPLITTER_2_ID}")).unwrap();
        assert_eq!(previous_element_sibling(&details).unwrap(), s1);
        assert_eq!(previous_element_sibling(&panel).unwrap(), s2);

        // Widths applied, summing to 1224 - 2*12.
        let list = dom::select_first(&page.document, "#list-pane").unwrap();
        for pane in [&list, &details, &panel] {
            assert!(dom::style_property(pane, "flex").is_some());
        }
        let w = state.remembered_list.unwrap()
            + state.remembered_details.unwrap()
            + state.remembered_helper.unwrap();
        assert!((w - 1200.0).abs() < 0.001);
        assert!(state.sized);
    }

    #[test]
    fn repeat_passes_reuse_the_cached_layout_signature() {
        let mut page = host_page();
        let panel = panel(&page);
        let mut state = LayoutState::default();

        ensure_docked_layout(&mut page, &mut state, &panel);
        let key = state.layout_key.clone();
        let serialized = dom::serialize_node(&page.document);

        ensure_docked_layout(&mut page, &mut state, &panel);
        assert_eq!(state.layout_key, key);
        assert_eq!(dom::serialize_node(&page.document), serialized);

        // A container width change re-triggers sizing.
        page.metrics
            .scroll
            .get_mut("main-content")
            .unwrap()
            .client_width = 1600.0;
        ensure_docked_layout(&mut page, &mut state, &panel);
        assert_ne!(state.layout_key, key);
        let w = state.remembered_list.unwrap()
            + state.remembered_details.unwrap()
            + state.remembered_helper.unwrap();
        assert!((w - 1576.0).abs() < 0.001);
    }

    #[test]
    fn hiding_results_removes_splitter_and_reserved_width() {
        let mut page = host_page();
        let panel = panel(&page);
        let mut state = LayoutState {
            hide_results: true,
            ..LayoutState::default()
        };

        ensure_docked_layout(&mut page, &mut state, &panel);

        let list = dom::select_first(&page.document, "#list-pane").unwrap();
        assert_eq!(dom::style_property(&list, "display").as_deref(), Some("none"));
        // Splitter 1 is never placed between hidden list and details.
        assert!(dom::select_first(&page.document, &format!("#{SPLITTER_1_ID}")).is_none());
        assert!(dom::select_first(&page.document, &format!("#{SPLITTER_2_ID}")).is_some());

        // One splitter: details + helper share 1224 - 12.
        let w = state.remembered_details.unwrap() + state.remembered_helper.unwrap();
        assert!((w - 1212.0).abs() < 0.001);
        assert!(state.remembered_list.is_none());
    }

    #[test]
    fn toggles_are_cloned_from_the_host_filter_button() {
        let mut page = host_page();
        let panel = panel(&page);
        let mut state = LayoutState::default();
        ensure_docked_layout(&mut page, &mut state, &panel);

        let wrap = dom::select_first(&page.document, &format!("#{TOGGLES_ID}")).unwrap();
        let results = dom::select_first(&wrap, "#ih-toggle-results").unwrap();
        // Cloned host class plus our marker class survive.
        assert!(dom::has_class(&results, "filter-tooltip-hide"));
        assert!(dom::has_class(&results, "ih-layout-toggle"));
        assert_eq!(dom::normalized_text(&results), "Masquer les résultats");
        // Group sits next to the host button, outside #main-content.
        let host_btn = dom::select_first(&page.document, "button.filter-tooltip-hide").unwrap();
        assert_eq!(wrap.parent(), host_btn.parent());

        // Labels follow the hide state on the next pass.
        state.hide_results = true;
        ensure_docked_layout(&mut page, &mut state, &panel);
        let results = dom::select_first(&wrap, "#ih-toggle-results").unwrap();
        assert_eq!(dom::normalized_text(&results), "Afficher les résultats");
    }

    #[test]
    fn backdrop_neutralization_requires_fixed_invisible_fullscreen() {
        let mut page = host_page();
        let html = dom::select_first(&page.document, "html").unwrap();
        dom::add_class(&html, HAS_DOCKED_CLASS);
        let body = dom::select_first(&page.document, "body").unwrap();

        for (id, style) in [
            ("bd-target", "position: fixed; opacity: 0.01"),
            ("bd-visible", "position: fixed"),
            ("bd-static", "position: absolute; opacity: 0"),
        ] {
            body.append(dom::create_element(&format!(
                r#"<div id="{id}" class="cdk-overlay-backdrop" style="{style}"></div>"#
            )));
            page.metrics.rects.insert(
                id.into(),
                Rect { x: 0.0, y: 0.0, width: 1280.0, height: 900.0 },
            );
        }
        // Invisible and fixed but small: left alone.
        body.append(dom::create_element(
            r#"<div id="bd-small" class="modal-backdrop" style="position: fixed; display: none"></div>"#,
        ));
        page.metrics.rects.insert(
            "bd-small".into(),
            Rect { x: 0.0, y: 0.0, width: 300.0, height: 200.0 },
        );

        neutralize_lingering_backdrops(&page);

        let target = dom::select_first(&page.document, "#bd-target").unwrap();
        assert_eq!(dom::style_property(&target, "pointer-events").as_deref(), Some("none"));
        assert_eq!(dom::style_property(&target, "display").as_deref(), Some("none"));

        for id in ["bd-visible", "bd-static", "bd-small"] {
            let el = dom::select_first(&page.document, &format!("#{id}")).unwrap();
            assert_ne!(
                dom::style_property(&el, "pointer-events").as_deref(),
                Some("none"),
                "{id} should be untouched"
            );
        }
    }

    #[test]
    fn docked_top_follows_the_details_header() {
        let mut page = host_page();
        let details = dom::select_first(&page.document, "#details-pane").unwrap();
        details.append(dom::create_element(
            r#"<div class="information-panel-header" id="iph"><div role="tablist"></div></div>"#,
        ));
        page.metrics.rects.insert(
            "iph".into(),
            Rect { x: 472.0, y: 64.4, width: 752.0, height: 48.0 },
        );

        let panel = panel(&page);
        sync_docked_top(&page, &panel, Some(&details));
        assert_eq!(
            dom::style_property(&panel, "--ih-docked-top").as_deref(),
            Some("64px")
        );
    }
}
