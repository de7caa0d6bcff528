use serde::{Deserialize, Serialize};

/// Judgment date parsed from the preview prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateInfo {
    pub day: u32,
    /// 1-indexed month.
    pub month: u32,
    pub year: i32,
    /// Original prose form minus any trailing footnote marker,
    /// e.g. "18 décembre 2025".
    pub formatted: String,
}

/// Structured citation scraped from the displayed judgment. Rebuilt from
/// scratch whenever the preview signature changes; never patched in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentCitation {
    /// Court label with chamber qualifier and trailing separator,
    /// e.g. "C.J.U.E. (gr. ch.), ".
    pub court: String,
    pub date: Option<DateInfo>,
    /// Normalized case reference, e.g. "C-259/24".
    pub case_number: String,
    /// Best-effort official party-name string; may be empty.
    pub case_name: String,
    pub ecli: Option<String>,
    /// Direct EUR-Lex PDF link, when the page exposes one.
    pub pdf_url: Option<String>,
    pub citation_html: String,
    pub citation_text: String,
}

impl DocumentCitation {
    /// A citation drives the panel only when both the case number and the
    /// date were found; anything less and the panel stays hidden.
    pub fn is_valid(&self) -> bool {
        !self.case_number.is_empty() && self.date.is_some()
    }
}

/// Pane widths applied to the docked row; always sums to the available
/// content width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaneWidths {
    pub list: f64,
    pub details: f64,
    pub helper: f64,
}

impl PaneWidths {
    pub fn total(&self) -> f64 {
        self.list + self.details + self.helper
    }
}

/// Session-only layout state. Deliberately never persisted: widths and
/// hide flags reset on every page load.
#[derive(Debug, Clone, Default)]
pub struct LayoutState {
    pub hide_results: bool,
    pub hide_helper: bool,
    pub remembered_list: Option<f64>,
    pub remembered_details: Option<f64>,
    pub remembered_helper: Option<f64>,
    /// One-shot flags consumed by the next sizing pass ("jump to document").
    pub force_min_list_once: bool,
    pub force_min_helper_once: bool,
    /// Cached sizing signature; sizing reruns only when it changes.
    pub sized: bool,
    pub layout_key: String,
    pub total_width: f64,
}

/// Which pane a splitter edge belongs to, for width bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneRole {
    List,
    Details,
    Helper,
}

impl LayoutState {
    pub fn remember_width(&mut self, role: PaneRole, width: f64) {
        match role {
            PaneRole::List => self.remembered_list = Some(width),
            PaneRole::Details => self.remembered_details = Some(width),
            PaneRole::Helper => self.remembered_helper = Some(width),
        }
    }
}

/// Clipboard payload: plain text plus an HTML rendition written in the
/// same operation when the clipboard supports rich writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyPayload {
    pub plain: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    pub suggested_filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ok")]
pub enum DownloadResult {
    #[serde(rename = "true")]
    Started { download_id: u64 },
    #[serde(rename = "false")]
    Failed { error: String },
}

/// Filename override answered to the downloads "determine final filename"
/// hook; `uniquify` asks the collaborator to de-conflict on collision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenameSuggestion {
    pub filename: String,
    pub uniquify: bool,
}

/// Transient update-banner record, consumed once after an extension update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerPayload {
    pub version: String,
    pub ts: i64,
}
