//! Citation extraction from a displayed judgment.
//!
//! Everything here is a pure function of the DOM snapshot: the preview
//! paragraphs carry the date, the case number and the procedural header,
//! the page chrome carries the ECLI button and the EUR-Lex PDF link, and
//! the case name comes from an ordered list of page heuristics.

use anyhow::{Context, Result};
use kuchiki::NodeRef;
use regex::Regex;
use tracing::debug;

use crate::dom::{self, Page};
use crate::model::{DateInfo, DocumentCitation};
use crate::util::{escape_html, normalize_spaces, parse_french_date_from_line};

/// Root of the judgment preview, when one is displayed.
pub fn preview_root(page: &Page) -> Option<NodeRef> {
    dom::select_first(&page.document, "#panel-document-preview")
}

/// Normalized text of every preview paragraph, in document order.
pub fn preview_paragraph_texts(root: &NodeRef) -> Vec<String> {
    dom::select(root, "p")
        .iter()
        .map(dom::normalized_text)
        .collect()
}

type NameStrategy = fn(&Page, &str, &[String]) -> Option<String>;

/// Case-name heuristics, strongest first. Each entry is independent so a
/// host markup change invalidates one strategy without touching the rest.
const NAME_STRATEGIES: &[(&str, NameStrategy)] = &[
    ("expanded-button-dash", name_from_expanded_button_dash),
    ("expanded-button-fields", name_from_expanded_button_fields),
    ("heading-dash", name_from_heading_dash),
    ("preview-procedure", name_from_procedure_marker),
    ("h2-dash", name_from_h2_dash),
];

pub struct CitationExtractor {
    case_number: Regex,
    header_line: Regex,
    ecli_page: Regex,
    ecli_hint: Regex,
}

impl CitationExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            case_number: Regex::new(r"[CFT][‑-]\d+/\d+\s?[A-Z]*")
                .context("compiling case number pattern")?,
            header_line: Regex::new(r"(?i)\b(arrêt|ordonnance)\b")
                .context("compiling header line pattern")?,
            ecli_page: Regex::new(r"ECLI:EU:[A-Z]:\d{4}:\d+")
                .context("compiling ECLI pattern")?,
            ecli_hint: Regex::new(r"(?i)ECLI:EU:").context("compiling ECLI hint pattern")?,
        })
    }

    /// Builds the full citation record from the preview subtree and the
    /// surrounding page. Missing pieces stay empty; the caller decides
    /// what an incomplete record means.
    pub fn extract(&self, page: &Page, root: &NodeRef) -> DocumentCitation {
        let texts = preview_paragraph_texts(root);

        let date = self.extract_date(&texts);
        let case_number = self.extract_case_number(&texts).unwrap_or_default();
        let header_line = self.extract_header_line(&texts).unwrap_or_default();
        let court = infer_court_prefix(&case_number, date.as_ref(), &header_line);
        let ecli = self.extract_ecli(page);
        let pdf_url = extract_celex_pdf_url(page);
        let case_name = extract_case_name(page, &case_number, &texts).unwrap_or_default();

        let citation_html = build_citation_html(
            &court,
            date.as_ref().map(|d| d.formatted.as_str()).unwrap_or(""),
            &case_name,
            &case_number,
            ecli.as_deref(),
        );
        let citation_text = dom::strip_tags(&citation_html);

        DocumentCitation {
            court,
            date,
            case_number,
            case_name,
            ecli,
            pdf_url,
            citation_html,
            citation_text,
        }
    }

    /// First parseable French date in the opening paragraphs. Ten is
    /// enough to clear the banner/header noise before the date line.
    fn extract_date(&self, texts: &[String]) -> Option<DateInfo> {
        texts
            .iter()
            .take(10)
            .find_map(|t| parse_french_date_from_line(t))
    }

    fn extract_case_number(&self, texts: &[String]) -> Option<String> {
        let joined = texts.join("\n");
        let m = self.case_number.find(&joined)?;
        Some(m.as_str().replace('\u{2011}', "-").trim().to_string())
    }

    fn extract_header_line(&self, texts: &[String]) -> Option<String> {
        texts
            .iter()
            .find(|t| self.header_line.is_match(t))
            .cloned()
    }

    /// The page renders the ECLI inside a toolbar button. Only the first
    /// button mentioning an ECLI is considered.
    fn extract_ecli(&self, page: &Page) -> Option<String> {
        let text = dom::select(&page.document, "button")
            .iter()
            .map(dom::normalized_text)
            .find(|t| self.ecli_hint.is_match(t))?;
        self.ecli_page.find(&text).map(|m| m.as_str().to_string())
    }
}

/// Court label from the case-number prefix, with the Lisbon-era rename:
/// the Court of Justice is cited "C.J.C.E" (sic, no final dot) up to and
/// including November 2009, "C.J.U.E." afterwards and when the date is
/// unknown. The chamber qualifier comes from the procedural header line.
pub fn infer_court_prefix(case_number: &str, date: Option<&DateInfo>, header_line: &str) -> String {
    match case_number.chars().next() {
        Some('C') => {
            let mut label = match date {
                Some(d) if d.year <= 2008 || (d.year == 2009 && d.month <= 11) => {
                    "C.J.C.E".to_string()
                }
                _ => "C.J.U.E.".to_string(),
            };
            let head = header_line.to_lowercase();
            if head.contains("grande chambre") {
                label.push_str(" (gr. ch.), ");
            } else if head.contains("plénière") || head.contains("pleniere") {
                label.push_str(" (plén.), ");
            } else if head.contains("ordonnance") {
                label.push_str(" (ord.), ");
            } else {
                label.push_str(", ");
            }
            label
        }
        Some('T') => "T.P.I.U.E., ".to_string(),
        Some('F') => "T.F.P.U.E., ".to_string(),
        _ => String::new(),
    }
}

/// Direct PDF link on EUR-Lex, identified by its CELEX path shape.
pub fn extract_celex_pdf_url(page: &Page) -> Option<String> {
    let anchor = dom::select_first(
        &page.document,
        r#"a[href*="eur-lex.europa.eu"][href*="/TXT/PDF/"][href*="CELEX:"]"#,
    )?;
    dom::attr(&anchor, "href")
}

fn extract_case_name(page: &Page, case_number: &str, texts: &[String]) -> Option<String> {
    for (name, strategy) in NAME_STRATEGIES {
        if let Some(found) = strategy(page, case_number, texts) {
            debug!(strategy = name, case_name = %found, "case name resolved");
            return Some(found);
        }
    }
    None
}

fn expanded_button_texts(page: &Page, case_number: &str) -> Vec<String> {
    if case_number.is_empty() {
        return Vec::new();
    }
    dom::select(
        &page.document,
        r#"button[aria-expanded="true"], button[expanded]"#,
    )
    .iter()
    .map(|b| dom::normalized_text(b).replace('\u{2011}', "-"))
    .filter(|t| !t.is_empty() && t.contains(case_number))
    .collect()
}

/// "C-259/24 - Tenergie" shaped accordion labels.
fn name_from_expanded_button_dash(page: &Page, case_number: &str, _texts: &[String]) -> Option<String> {
    let pattern = Regex::new(&format!(r"{}\s*-\s*(.+)$", regex::escape(case_number))).ok()?;
    expanded_button_texts(page, case_number)
        .iter()
        .find_map(|t| {
            pattern
                .captures(t)
                .and_then(|c| c.get(1))
                .map(|m| normalize_spaces(m.as_str()))
        })
}

/// "Name, dd/mm/yyyy, description, C-259/24" shaped accordion labels;
/// the third field is the case description.
fn name_from_expanded_button_fields(
    page: &Page,
    case_number: &str,
    _texts: &[String],
) -> Option<String> {
    let pattern = Regex::new(&format!(
        r"^([^,]+),\s*([0-9]{{2}}/\d{{2}}/\d{{4}}),\s*(.+?)\s*,\s*{}\b",
        regex::escape(case_number)
    ))
    .ok()?;
    expanded_button_texts(page, case_number)
        .iter()
        .find_map(|t| {
            pattern
                .captures(t)
                .and_then(|c| c.get(3))
                .map(|m| normalize_spaces(m.as_str()))
        })
}

fn name_from_heading_dash(page: &Page, case_number: &str, _texts: &[String]) -> Option<String> {
    if case_number.is_empty() {
        return None;
    }
    let pattern = Regex::new(&format!(r"{}\s*-\s*(.+)$", regex::escape(case_number))).ok()?;
    dom::select(&page.document, "h1,h2,h3,h4,h5")
        .iter()
        .map(dom::normalized_text)
        .find(|t| !t.is_empty() && t.contains(case_number) && t.contains('-'))
        .and_then(|t| {
            pattern
                .captures(&t)
                .and_then(|c| c.get(1))
                .map(|m| normalize_spaces(m.as_str()))
        })
}

/// First party named after the "dans la procédure" marker paragraph,
/// skipping a standalone "contre" line. Commas are stripped so the name
/// composes cleanly into a citation.
fn name_from_procedure_marker(_page: &Page, _case_number: &str, texts: &[String]) -> Option<String> {
    let marker = Regex::new(r"(?i)dans\s+l(?:a|es)\s+procédure(?:s)?").ok()?;
    let contre = Regex::new(r"(?i)^contre$").ok()?;
    let idx = texts.iter().position(|t| marker.is_match(t))?;
    let party = texts[idx + 1..]
        .iter()
        .find(|t| !t.is_empty() && !contre.is_match(t))?;
    Some(normalize_spaces(&party.replace(',', "")))
}

/// Trailing dash segment of the first h2, rejected when it still looks
/// like a case reference rather than a name.
fn name_from_h2_dash(page: &Page, _case_number: &str, _texts: &[String]) -> Option<String> {
    let h2 = dom::select_first(&page.document, "h2")?;
    let text = dom::normalized_text(&h2);
    let tail = Regex::new(r"-\s*(.+)$").ok()?;
    let reference = Regex::new(r"\b\d+/\d+\b").ok()?;
    let candidate = normalize_spaces(tail.captures(&text)?.get(1)?.as_str());
    if candidate.is_empty() || reference.is_match(&candidate) {
        return None;
    }
    Some(candidate)
}

/// Search URL for a case reference on the portal.
pub fn case_search_url(case_number: &str) -> String {
    format!(
        "https://infocuria.curia.europa.eu/tabs/affair?lang=FR&searchTerm=%22{}%22",
        urlencoding::encode(case_number)
    )
}

fn build_citation_html(
    court: &str,
    date: &str,
    case_name: &str,
    case_number: &str,
    ecli: Option<&str>,
) -> String {
    let name_part = if case_name.is_empty() {
        String::new()
    } else {
        format!("<i>{}</i>, ", escape_html(case_name))
    };
    let ecli_part = match ecli {
        Some(e) if !e.is_empty() => format!(", {}", escape_html(e)),
        _ => String::new(),
    };
    format!(
        "{}{}, {}<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>{}",
        escape_html(court),
        escape_html(date),
        name_part,
        case_search_url(case_number),
        escape_html(case_number),
        ecli_part
    )
}
