//! The update loop tying extraction, layout and decoration together.
//!
//! Hosts signal changes with [`Reconciler::invalidate`] (any number of
//! times; signals coalesce into one pending pass) and drive time with
//! [`Reconciler::tick`]. Deferred work (scroll re-application, toast
//! dismissal, follow-up layout passes) sits in a due-stamped task queue
//! instead of browser frames, so every ordering is reproducible.

use anyhow::Result;
use kuchiki::NodeRef;
use tracing::{debug, error};

use crate::citation::{self, CitationExtractor};
use crate::collab::{Clipboard, DownloadManager, Downloader, VersionStore};
use crate::dom::{self, Page};
use crate::highlight::Highlighter;
use crate::layout::{self, PANEL_ID};
use crate::model::{DocumentCitation, LayoutState};
use crate::panel;
use crate::toc::{self, HeadingDetector, ScrollTarget};
use crate::util::{normalize_spaces, sha256_hex};

const FRAME_MS: u64 = 16;
/// Our own DOM writes re-trigger the host's change notifications; edits
/// inside this window after decoration are ignored.
const SUPPRESS_MS: u64 = 50;
const TOAST_MS: u64 = 1_200;
const BANNER_MS: u64 = 8_000;
const SCROLL_REAPPLY_MS: u64 = 120;

enum DeferredTask {
    LayoutPass,
    ForceMinLayoutPass,
    ReapplyScroll(ScrollTarget),
    HideToast,
    RemoveUpdateBanner,
}

struct Scheduled {
    due_ms: u64,
    task: DeferredTask,
}

/// Signature of the displayed judgment: hash of the preview header and
/// first paragraph, both capped, so host re-renders of the same document
/// do not retrigger the expensive work.
pub fn preview_signature(preview_root: &NodeRef) -> String {
    let header = dom::select_first(preview_root, "h1,h2,h3")
        .map(|h| normalize_spaces(&h.text_contents()))
        .unwrap_or_default();
    let first_p = dom::select_first(preview_root, "p")
        .map(|p| normalize_spaces(&p.text_contents()))
        .unwrap_or_default();
    let header: String = header.chars().take(120).collect();
    let first_p: String = first_p.chars().take(120).collect();
    sha256_hex(&format!("{header}|{first_p}"))
}

pub struct Reconciler {
    extractor: CitationExtractor,
    headings: HeadingDetector,
    highlighter: Highlighter,
    pub layout: LayoutState,
    last_preview_sig: String,
    last_citation: Option<DocumentCitation>,
    scheduled: bool,
    suppress_until_ms: u64,
    tasks: Vec<Scheduled>,
}

impl Reconciler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            extractor: CitationExtractor::new()?,
            headings: HeadingDetector::new()?,
            highlighter: Highlighter::new(),
            layout: LayoutState::default(),
            last_preview_sig: String::new(),
            last_citation: None,
            scheduled: false,
            suppress_until_ms: 0,
            tasks: Vec::new(),
        })
    }

    /// The citation backing the panel, when a judgment is displayed.
    pub fn citation(&self) -> Option<&DocumentCitation> {
        self.last_citation.as_ref()
    }

    /// Requests a reconciliation pass. Any number of calls before the
    /// next tick collapse into one pass.
    pub fn invalidate(&mut self) {
        self.scheduled = true;
    }

    /// Runs due deferred tasks, then the pending pass if one was
    /// requested. Errors are logged and swallowed; one failing pass must
    /// not stop future updates.
    pub fn tick(&mut self, page: &mut Page, now_ms: u64) {
        let mut due = Vec::new();
        self.tasks.retain_mut(|entry| {
            if entry.due_ms <= now_ms {
                due.push(std::mem::replace(&mut entry.task, DeferredTask::HideToast));
                false
            } else {
                true
            }
        });
        for task in due {
            self.run_task(page, task);
        }

        if self.scheduled {
            self.scheduled = false;
            if let Err(err) = self.reconcile(page, now_ms) {
                error!(error = %err, "reconciliation pass failed");
            }
        }
    }

    fn schedule(&mut self, due_ms: u64, task: DeferredTask) {
        self.tasks.push(Scheduled { due_ms, task });
    }

    fn run_task(&mut self, page: &mut Page, task: DeferredTask) {
        match task {
            DeferredTask::LayoutPass => self.relayout(page),
            DeferredTask::ForceMinLayoutPass => {
                self.layout.force_min_list_once = true;
                self.layout.force_min_helper_once = true;
                self.relayout(page);
            }
            DeferredTask::ReapplyScroll(target) => target.reapply(page),
            DeferredTask::HideToast => panel::hide_toast(page),
            DeferredTask::RemoveUpdateBanner => panel::dismiss_update_banner(page),
        }
    }

    fn relayout(&mut self, page: &mut Page) {
        if let Some(panel) = dom::select_first(&page.document, &format!("#{PANEL_ID}")) {
            layout::ensure_docked_layout(page, &mut self.layout, &panel);
        }
    }

    fn forget_document(&mut self, page: &Page) {
        // Hide, never create, when nothing is displayed.
        if dom::select_first(&page.document, &format!("#{PANEL_ID}")).is_some() {
            layout::set_panel_hidden(page, true);
        }
        self.last_preview_sig.clear();
        self.last_citation = None;
    }

    fn reconcile(&mut self, page: &mut Page, now_ms: u64) -> Result<()> {
        if now_ms < self.suppress_until_ms {
            return Ok(());
        }

        let preview = citation::preview_root(page).filter(|root| page.is_visible(root));
        let Some(preview) = preview else {
            self.forget_document(page);
            return Ok(());
        };

        let probe = self.extractor.extract(page, &preview);
        if !probe.is_valid() {
            self.forget_document(page);
            return Ok(());
        }

        let panel = panel::ensure_panel(page);
        layout::set_panel_hidden(page, false);
        layout::ensure_docked_layout(page, &mut self.layout, &panel);

        let sig = preview_signature(&preview);
        if sig != self.last_preview_sig {
            debug!(case_number = %probe.case_number, "document changed, re-rendering");
            self.last_preview_sig = sig;

            panel::set_citation_html(&panel, &probe.citation_html);
            let items = self.headings.build_toc_items(&preview);
            panel::set_toc_items(&panel, &items);

            self.suppress_until_ms = now_ms + SUPPRESS_MS;
            self.highlighter.decorate(page, &preview);

            self.last_citation = Some(probe);
        }

        Ok(())
    }

    /// Shows a toast and schedules its dismissal.
    pub fn toast(&mut self, page: &Page, message: &str, now_ms: u64) {
        panel::show_toast(page, message);
        self.schedule(now_ms + TOAST_MS, DeferredTask::HideToast);
    }

    pub fn toggle_results(&mut self, page: &mut Page) {
        self.layout.hide_results = !self.layout.hide_results;
        self.relayout(page);
    }

    pub fn toggle_helper(&mut self, page: &mut Page) {
        self.layout.hide_helper = !self.layout.hide_helper;
        self.relayout(page);
    }

    /// "Aller au document": shrink list and helper to their minimums and
    /// give the judgment the rest. The host may need to collapse its
    /// filters drawer first, so the matching host control is returned
    /// for the embedder to activate, and two follow-up layout passes are
    /// scheduled to absorb the host's own resizing.
    pub fn jump_to_document(&mut self, page: &mut Page, now_ms: u64) -> Option<NodeRef> {
        let host_button =
            layout::find_filter_toggle_button(page).filter(layout::is_hide_filters_button);

        self.layout.force_min_list_once = true;
        self.layout.force_min_helper_once = true;
        self.relayout(page);

        self.schedule(now_ms + 2 * FRAME_MS, DeferredTask::LayoutPass);
        self.schedule(now_ms + 3 * FRAME_MS, DeferredTask::ForceMinLayoutPass);
        host_button
    }

    /// Click on a TOC link: scroll now, re-apply once the host settles.
    pub fn toc_click(
        &mut self,
        page: &mut Page,
        preview_root: &NodeRef,
        id: &str,
        link_text: &str,
        now_ms: u64,
    ) {
        if let Some(target) = toc::resolve_toc_click(page, preview_root, id, link_text) {
            self.schedule(now_ms + SCROLL_REAPPLY_MS, DeferredTask::ReapplyScroll(target));
        }
    }

    pub fn copy_action(
        &mut self,
        page: &Page,
        selection_text: &str,
        selection_anchor: Option<&NodeRef>,
        clipboard: &mut dyn Clipboard,
        now_ms: u64,
    ) {
        let point = citation::preview_root(page).and_then(|root| {
            selection_anchor.and_then(|anchor| panel::point_number_for_selection(&root, anchor))
        });
        let message = panel::handle_copy(self.citation(), selection_text, point, clipboard);
        self.toast(page, &message, now_ms);
    }

    pub fn download_action<D: Downloader>(
        &mut self,
        page: &Page,
        downloads: &mut DownloadManager<D>,
        now_ms: u64,
    ) {
        let message = panel::handle_download(self.citation(), downloads);
        self.toast(page, &message, now_ms);
    }

    /// Shows the staged post-update banner, if any, and schedules its
    /// auto-removal.
    pub fn show_staged_banner(
        &mut self,
        page: &Page,
        store: &mut dyn VersionStore,
        now_ms: u64,
    ) -> Result<()> {
        if let Some(banner) = store.take_update_banner()? {
            panel::show_update_banner(page, &banner.version);
            self.schedule(now_ms + BANNER_MS, DeferredTask::RemoveUpdateBanner);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::MemoryVersionStore;
    use crate::collab::doubles::RecordingClipboard;
    use crate::dom::{Rect, ScrollInfo};
    use crate::layout::sizing::{MIN_HELPER, MIN_LIST};

    const JUDGMENT: &str = r#"
        <html><body>
          <div class="toolbar"><button class="filter-tooltip-hide"><i class="icon-left"><i class="bi bi-funnel"></i></i> Masquer les filtres </button></div>
          <div id="main-content">
            <div id="list-pane"><h3>Liste des affaires</h3></div>
            <div id="details-pane">
              <div id="panel-document-preview">
                <h2>C-259/24 - Tenergie</h2>
                <p class="C19Centre">ARRÊT DE LA COUR (grande chambre)</p>
                <p>18 décembre 2025 (*)</p>
                <p class="C04Titre1">Le cadre juridique</p>
                <p>Dans l’affaire C‑259/24,</p>
                <p>En effet, voir EU:C:2021:153.</p>
              </div>
            </div>
          </div>
        </body></html>"#;

    fn judgment_page() -> Page {
        let mut page = Page::from_html(JUDGMENT);
        page.metrics.viewport_width = 1280.0;
        page.metrics.viewport_height = 900.0;
        page.metrics.scroll.insert(
            "main-content".into(),
            ScrollInfo {
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

    #[test]
    fn pass_builds_panel_citation_toc_and_highlights() {
        let mut page = judgment_page();
        let mut rec = Reconciler::new().unwrap();

        rec.invalidate();
        rec.invalidate(); // coalesces
        rec.tick(&mut page, 0);

        let panel = dom::select_first(&page.document, &format!("#{PANEL_ID}")).unwrap();
        assert!(dom::has_class(&panel, "ih-docked"));
        assert!(!dom::has_class(&panel, "ih-hidden"));

        let citation_slot = dom::select_first(&panel, r#"[data-role="citation"]"#).unwrap();
        assert!(dom::normalized_text(&citation_slot).contains("C-259/24"));
        assert_eq!(rec.citation().unwrap().court, "C.J.U.E. (gr. ch.), ");

        // TOC got one heading, the preview got decorated.
        assert_eq!(dom::select(&panel, "a.ih-toc-link").len(), 1);
        assert_eq!(dom::select(&page.document, "a.ih-ecli").len(), 1);
        assert_eq!(dom::select(&page.document, "span.ih-hl-yellow").len(), 1);
    }

    #[test]
    fn repeat_passes_with_same_signature_change_nothing() {
        let mut page = judgment_page();
        let mut rec = Reconciler::new().unwrap();
        rec.invalidate();
        rec.tick(&mut page, 0);
        let serialized = dom::serialize_node(&page.document);

        // Past the suppression window, same document.
        rec.invalidate();
        rec.tick(&mut page, 1_000);
        assert_eq!(dom::serialize_node(&page.document), serialized);
    }

    #[test]
    fn passes_inside_the_suppression_window_are_dropped() {
        let mut page = judgment_page();
        let mut rec = Reconciler::new().unwrap();
        rec.invalidate();
        rec.tick(&mut page, 0); // sets suppress_until to 50

        // Change the document; an echo of our own writes arrives early.
        let first_p = dom::select_first(&page.document, "#panel-document-preview p").unwrap();
        dom::set_inner_html(&first_p, "ORDONNANCE DE LA COUR");
        rec.invalidate();
        rec.tick(&mut page, 10);
        assert_eq!(rec.citation().unwrap().court, "C.J.U.E. (gr. ch.), ");

        // The same signal after the window is honoured.
        rec.invalidate();
        rec.tick(&mut page, 100);
        assert_eq!(rec.citation().unwrap().court, "C.J.U.E. (ord.), ");
    }

    #[test]
    fn panel_is_hidden_but_never_created_without_a_judgment() {
        let mut page = Page::from_html("<html><body><div id='main-content'></div></body></html>");
        let mut rec = Reconciler::new().unwrap();
        rec.invalidate();
        rec.tick(&mut page, 0);
        assert!(dom::select_first(&page.document, &format!("#{PANEL_ID}")).is_none());
    }

    #[test]
    fn losing_the_preview_hides_the_panel_and_clears_state() {
        let mut page = judgment_page();
        let mut rec = Reconciler::new().unwrap();
        rec.invalidate();
        rec.tick(&mut page, 0);
        assert!(rec.citation().is_some());

        let preview = dom::select_first(&page.document, "#panel-document-preview").unwrap();
        preview.detach();
        rec.invalidate();
        rec.tick(&mut page, 1_000);

        let panel = dom::select_first(&page.document, &format!("#{PANEL_ID}")).unwrap();
        assert!(dom::has_class(&panel, "ih-hidden"));
        assert!(rec.citation().is_none());
    }

    #[test]
    fn incomplete_citation_keeps_the_panel_hidden() {
        let mut page = judgment_page();
        // Remove the date line: case number alone is not a judgment.
        let date_p = dom::select(&page.document, "#panel-document-preview p")
            .into_iter()
            .find(|p| dom::normalized_text(p).starts_with("18 décembre"))
            .unwrap();
        date_p.detach();

        let mut rec = Reconciler::new().unwrap();
        rec.invalidate();
        rec.tick(&mut page, 0);
        assert!(dom::select_first(&page.document, &format!("#{PANEL_ID}")).is_none());
        assert!(rec.citation().is_none());
    }

    #[test]
    fn toast_is_dismissed_by_a_deferred_task() {
        let mut page = judgment_page();
        let mut rec = Reconciler::new().unwrap();
        rec.toast(&page, "Copied.", 0);

        let toast = dom::select_first(&page.document, "#ih-toast").unwrap();
        assert!(dom::has_class(&toast, panel::TOAST_VISIBLE_CLASS));

        rec.tick(&mut page, 1_000); // not due yet
        assert!(dom::has_class(&toast, panel::TOAST_VISIBLE_CLASS));
        rec.tick(&mut page, 1_300);
        assert!(!dom::has_class(&toast, panel::TOAST_VISIBLE_CLASS));
    }

    #[test]
    fn jump_to_document_pins_list_and_helper_to_minimums() {
        let mut page = judgment_page();
        let mut rec = Reconciler::new().unwrap();
        rec.invalidate();
        rec.tick(&mut page, 0);

        let host = rec.jump_to_document(&mut page, 1_000);
        assert!(host.is_some(), "hide-filters control should be found");

        // The scheduled follow-up passes re-pin after host reflows.
        rec.tick(&mut page, 1_000 + 3 * 16);
        assert_eq!(rec.layout.remembered_list, Some(MIN_LIST));
        assert_eq!(rec.layout.remembered_helper, Some(MIN_HELPER));
        assert!(!rec.layout.force_min_list_once);
    }

    #[test]
    fn copy_action_toasts_and_writes_the_clipboard() {
        let mut page = judgment_page();
        let mut rec = Reconciler::new().unwrap();
        rec.invalidate();
        rec.tick(&mut page, 0);

        let anchor = dom::select(&page.document, "#panel-document-preview p")
            .into_iter()
            .last()
            .unwrap();
        let mut clipboard = RecordingClipboard::default();
        rec.copy_action(&page, "En effet", Some(&anchor), &mut clipboard, 200);

        assert_eq!(clipboard.rich_writes.len(), 1);
        assert!(clipboard.rich_writes[0].plain.starts_with("\"En effet\""));
        let toast = dom::select_first(&page.document, "#ih-toast").unwrap();
        assert_eq!(dom::normalized_text(&toast), "Copied.");
    }

    #[test]
    fn staged_banner_is_shown_and_auto_removed() {
        let mut page = judgment_page();
        let mut rec = Reconciler::new().unwrap();
        let mut store = MemoryVersionStore::default();
        crate::collab::handle_updated(&mut store, "1.5.0", Some("1.4.0"), 0).unwrap();

        rec.show_staged_banner(&page, &mut store, 0).unwrap();
        assert!(dom::select_first(&page.document, &format!("#{}", panel::BANNER_ID)).is_some());

        // Consumed: a second page load shows nothing.
        rec.show_staged_banner(&page, &mut store, 1).unwrap();
        assert_eq!(dom::select(&page.document, &format!("#{}", panel::BANNER_ID)).len(), 1);

        rec.tick(&mut page, 9_000);
        assert!(dom::select_first(&page.document, &format!("#{}", panel::BANNER_ID)).is_none());
    }
}
