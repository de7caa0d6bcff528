use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::model::DateInfo;

/// French month names, 1-indexed by position. Infocuria renders judgment
/// dates in French regardless of the interface language.
pub const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

static TRAILING_FOOTNOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*(?:\*|\d+)\s*\)\s*$").expect("valid footnote regex"));

static DATE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\s+(\p{L}+)\s+(\d{4})").expect("valid date regex"));

static FILENAME_FORBIDDEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("valid filename regex"));

pub fn normalize_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops a trailing footnote marker like `(*)` or `(3)`:
/// "18 décembre 2025 (*)" -> "18 décembre 2025".
pub fn strip_trailing_footnote(s: &str) -> String {
    normalize_spaces(&TRAILING_FOOTNOTE.replace(s, ""))
}

/// Parses a judgment date line of the form "<day> <month-name> <year>".
/// Returns the cleaned line (footnote marker removed) as `formatted`.
pub fn parse_french_date_from_line(line: &str) -> Option<DateInfo> {
    let clean = strip_trailing_footnote(line);
    let captures = DATE_LINE.captures(&clean)?;

    let day: u32 = captures.get(1)?.as_str().parse().ok()?;
    let month_name = captures.get(2)?.as_str().to_lowercase();
    let year: i32 = captures.get(3)?.as_str().parse().ok()?;

    let month = MONTHS_FR.iter().position(|m| *m == month_name)? as u32 + 1;
    if day == 0 || year == 0 {
        return None;
    }

    Some(DateInfo {
        day,
        month,
        year,
        formatted: clean,
    })
}

pub fn sanitize_filename(name: &str) -> String {
    normalize_spaces(&FILENAME_FORBIDDEN.replace_all(name, "-"))
}

/// Builds the suggested PDF filename: "<name> <case-number>.pdf", slash-free,
/// capped at 180 characters for cross-platform safety.
pub fn build_pdf_filename(official_name: &str, case_number: &str) -> String {
    let rg = if case_number.is_empty() {
        "document".to_string()
    } else {
        case_number.to_string()
    };
    let rg_for_file = sanitize_filename(&rg.replace('\u{2011}', "-").replace('/', "-"));
    let rg_for_file = if rg_for_file.is_empty() {
        "document".to_string()
    } else {
        rg_for_file
    };

    let name_part = sanitize_filename(&normalize_spaces(official_name));
    let base = if name_part.is_empty() {
        rg_for_file
    } else {
        format!("{name_part} {rg_for_file}")
    };

    let trimmed = sanitize_filename(&base);
    let trimmed = trimmed.trim_end_matches('.');

    let with_ext = if trimmed.to_lowercase().ends_with(".pdf") {
        trimmed.to_string()
    } else {
        format!("{trimmed}.pdf")
    };

    if with_ext.len() > 180 {
        let mut cut = 180;
        while !with_ext.is_char_boundary(cut) {
            cut -= 1;
        }
        with_ext[..cut].trim_end().to_string()
    } else {
        with_ext
    }
}

pub fn clamp(n: f64, min: f64, max: f64) -> f64 {
    n.max(min).min(max)
}

/// Rounded CSS pixel value: 447.3 -> "447px".
pub fn px(n: f64) -> String {
    format!("{}px", n.round() as i64)
}

pub fn escape_html(s: &str) -> String {
    html_escape::encode_safe(s).to_string()
}

pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
