//! The helper panel element, its actions, the toast and the update banner.

use std::sync::LazyLock;

use kuchiki::NodeRef;
use regex::Regex;

use crate::collab::{Clipboard, DownloadManager, Downloader, copy_to_clipboard};
use crate::dom::{self, Page};
use crate::layout::PANEL_ID;
use crate::model::{CopyPayload, DocumentCitation};
use crate::toc::{self, TocItem};
use crate::util::{build_pdf_filename, escape_html};

pub const TOAST_ID: &str = "ih-toast";
pub const TOAST_VISIBLE_CLASS: &str = "ih-toast-visible";
pub const BANNER_ID: &str = "ih-update-banner";

static LEADING_POINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\b").expect("valid point pattern"));

/// Creates the helper panel on first use and returns it afterwards.
pub fn ensure_panel(page: &Page) -> NodeRef {
    if let Some(panel) = dom::select_first(&page.document, &format!("#{PANEL_ID}")) {
        return panel;
    }

    let panel = dom::create_element(&format!(
        r#"<div id="{PANEL_ID}" class="ih-panel ih-docked">
      <div class="ih-header">
        <div class="ih-title">Better Infocuria</div>
      </div>
      <div class="ih-body">
        <div class="ih-section">
          <div class="ih-row">
            <button class="ih-btn" data-action="copy">Copy</button>
            <button class="ih-btn" data-action="download">Download</button>
          </div>
          <div class="ih-row">
            <div class="ih-citation" data-role="citation"></div>
          </div>
        </div>
        <div class="ih-section">
          <div class="ih-subtitle">Table of contents</div>
          <div class="ih-toc" data-role="toc"></div>
        </div>
      </div>
    </div>"#
    ));
    if let Some(body) = dom::select_first(&page.document, "body") {
        body.append(panel.clone());
    }
    panel
}

pub fn set_citation_html(panel: &NodeRef, html: &str) {
    if let Some(slot) = dom::select_first(panel, r#"[data-role="citation"]"#) {
        dom::set_inner_html(&slot, html);
    }
}

pub fn set_toc_items(panel: &NodeRef, items: &[TocItem]) {
    if let Some(slot) = dom::select_first(panel, r#"[data-role="toc"]"#) {
        toc::render_toc(&slot, items);
    }
}

fn leading_point_number(text: &str) -> Option<u32> {
    LEADING_POINT
        .captures(text)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

fn contains(root: &NodeRef, node: &NodeRef) -> bool {
    node.inclusive_ancestors().any(|a| a == *root)
}

/// Point number for a selection anchored at `anchor`: the leading
/// integer of the anchor itself, of a `dt` labelling the enclosing
/// `dd`, or of the closest paragraph.
pub fn point_number_for_selection(preview_root: &NodeRef, anchor: &NodeRef) -> Option<u32> {
    if !contains(preview_root, anchor) {
        return None;
    }

    if let Some(num) = leading_point_number(&anchor.text_contents()) {
        return Some(num);
    }

    if let Some(dd) = dom::closest(anchor, |el| dom::tag_name(el).as_deref() == Some("dd"))
        && contains(preview_root, &dd)
        && let Some(dt) = dd
            .preceding_siblings()
            .find(|n| n.as_element().is_some())
        && dom::tag_name(&dt).as_deref() == Some("dt")
        && let Some(num) = leading_point_number(&dt.text_contents())
    {
        return Some(num);
    }

    let p = dom::closest(anchor, |el| dom::tag_name(el).as_deref() == Some("p"))?;
    if !contains(preview_root, &p) {
        return None;
    }
    leading_point_number(&p.text_contents())
}

/// Quotation payload for the clipboard. With a selection the plain form
/// is `"<selection>" (<citation>, point N)`; without one it is the bare
/// citation with a trailing `, point ` left open for the writer.
pub fn build_copy_payload(
    citation: &DocumentCitation,
    selection_text: &str,
    point: Option<u32>,
) -> CopyPayload {
    let reference_text = citation.citation_text.trim();
    let selection = selection_text.trim();
    let point_text = point.map(|n| n.to_string());

    let plain = if selection.is_empty() {
        format!("{reference_text}, point ")
    } else {
        match &point_text {
            Some(p) => format!("\"{selection}\" ({reference_text}, point {p})"),
            None => format!("\"{selection}\" ({reference_text})"),
        }
    };

    let html = if selection.is_empty() {
        format!("{}, point ", citation.citation_html)
    } else {
        let escaped = escape_html(selection).replace('\n', "<br>");
        match &point_text {
            Some(p) => format!(
                "&ldquo;{escaped}&rdquo; ({}, point {})",
                citation.citation_html,
                escape_html(p)
            ),
            None => format!("&ldquo;{escaped}&rdquo; ({})", citation.citation_html),
        }
    };

    CopyPayload { plain, html }
}

/// Copy action; the returned message is always shown as a toast.
pub fn handle_copy(
    citation: Option<&DocumentCitation>,
    selection_text: &str,
    point: Option<u32>,
    clipboard: &mut dyn Clipboard,
) -> String {
    let Some(citation) = citation else {
        return "No document detected.".to_string();
    };
    let payload = build_copy_payload(citation, selection_text, point);
    match copy_to_clipboard(clipboard, &payload) {
        Ok(()) => "Copied.".to_string(),
        Err(_) => "Copy failed.".to_string(),
    }
}

/// Download action; failures surface only through the toast message.
pub fn handle_download<D: Downloader>(
    citation: Option<&DocumentCitation>,
    downloads: &mut DownloadManager<D>,
) -> String {
    let Some(citation) = citation else {
        return "No document detected.".to_string();
    };
    let Some(url) = citation.pdf_url.as_deref() else {
        return "No PDF link found.".to_string();
    };

    let name_source = if !citation.case_name.is_empty() {
        citation.case_name.as_str()
    } else if !citation.case_number.is_empty() {
        citation.case_number.as_str()
    } else {
        "Document"
    };
    let filename = build_pdf_filename(name_source, &citation.case_number);

    match downloads.request_download(url, Some(&filename)) {
        crate::model::DownloadResult::Started { .. } => "Download started.".to_string(),
        crate::model::DownloadResult::Failed { error } => format!("Download failed: {error}"),
    }
}

/// Shows the toast with a message; dismissal is a deferred task.
pub fn show_toast(page: &Page, message: &str) {
    let toast = match dom::select_first(&page.document, &format!("#{TOAST_ID}")) {
        Some(el) => el,
        None => {
            let el = dom::create_element(&format!(
                r#"<div id="{TOAST_ID}" class="ih-toast" aria-live="polite"></div>"#
            ));
            if let Some(body) = dom::select_first(&page.document, "body") {
                body.append(el.clone());
            }
            el
        }
    };
    for child in toast.children().collect::<Vec<_>>() {
        child.detach();
    }
    toast.append(NodeRef::new_text(message));
    dom::add_class(&toast, TOAST_VISIBLE_CLASS);
}

pub fn hide_toast(page: &Page) {
    if let Some(toast) = dom::select_first(&page.document, &format!("#{TOAST_ID}")) {
        dom::remove_class(&toast, TOAST_VISIBLE_CLASS);
    }
}

/// Shows the post-update banner, at most one at a time.
pub fn show_update_banner(page: &Page, version: &str) {
    if dom::select_first(&page.document, &format!("#{BANNER_ID}")).is_some() {
        return;
    }
    let Some(body) = dom::select_first(&page.document, "body") else {
        return;
    };

    let banner = dom::create_element(&format!(
        r#"<div id="{BANNER_ID}" class="ih-update-banner">
      <div class="ih-update-banner-left">
        <div class="ih-update-banner-text">Better Infocuria updated to v{version}.</div>
        <a class="ih-update-banner-link" href="https://github.com/rafjaf/Infocuria" target="_blank" rel="noopener noreferrer">See what changed</a>
      </div>
      <button class="ih-update-banner-close" type="button">Dismiss</button>
    </div>"#,
        version = escape_html(version)
    ));
    body.append(banner);
}

pub fn dismiss_update_banner(page: &Page) {
    if let Some(banner) = dom::select_first(&page.document, &format!("#{BANNER_ID}")) {
        banner.detach();
    }
}
