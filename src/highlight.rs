//! Discourse-marker highlighting and inline ECLI linking.
//!
//! Decoration rewrites text nodes only, leaving the host's own markup
//! (point-number anchors, footnote refs, bold/superscript runs) intact.
//! A paragraph gets at most one highlight span; every inline ECLI
//! occurrence becomes a link.

use std::collections::HashSet;
use std::sync::LazyLock;

use kuchiki::NodeRef;
use regex::Regex;

use crate::dom::{self, Page};
use crate::util::escape_html;

pub const YELLOW_CLASS: &str = "ih-hl-yellow";
pub const BLUE_CLASS: &str = "ih-hl-blue";
pub const ECLI_CLASS: &str = "ih-ecli";

/// Connectors of legal argument prose. Matched case-sensitively except
/// where noted, against the paragraph's full text.
static HIGHLIGHT_YELLOW: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"En particulier",
        r"Par ailleurs",
        r"En l’occurrence",
        r"Il s’ensuit",
        r"D'une part",
        r"D’autre part",
        r"^Or",
        r"De surcroît",
        r"Il résulte",
        r"À cet égard",
        r"Par conséquent",
        r"En conséquence",
        r"Tout d'abord",
        r"Ensuite",
        r"Dans ce contexte",
        r"(?i)enfin",
        r"À titre liminaire",
        r"Plus particulièrement",
        r"En outre",
        r"De plus",
        r"Partant",
        r"Ainsi,",
        r"En effet",
        r"Certes",
        r"Dès lors",
        r"Dans ces conditions",
        r"Au surplus",
        r"Cependant",
        r"Toutefois",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid yellow pattern"))
    .collect()
});

/// Enumeration ordinals ("en premier lieu", "premièrement", …).
static HIGHLIGHT_BLUE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)en [\wéè]+( et dernier)? +lieu",
        r"(?i)premièrement",
        r"(?i)deuxièmement",
        r"(?i)troisièmement",
        r"(?i)quatrièmement",
        r"(?i)cinquièmement",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid blue pattern"))
    .collect()
});

static ECLI_INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"EU:\w:\d{4}:\d+").expect("valid inline ECLI pattern"));

pub fn ecli_lookup_url(ecli_tail: &str) -> String {
    format!(
        "https://curia.europa.eu/juris/liste.jsf?critereEcli={}",
        urlencoding::encode(&format!("ECLI:{ecli_tail}"))
    )
}

/// Applies highlights and ECLI links. Each paragraph is processed once,
/// tracked by its stable element key, so repeat passes and host-inserted
/// paragraphs compose correctly.
pub struct Highlighter {
    processed: HashSet<String>,
}

impl Highlighter {
    pub fn new() -> Self {
        Self {
            processed: HashSet::new(),
        }
    }

    pub fn decorate(&mut self, page: &Page, root: &NodeRef) {
        for p in dom::select(root, "p") {
            let key = page.element_key(&p);
            if self.processed.contains(&key) {
                continue;
            }

            let text = p.text_contents();
            let has_ecli = ECLI_INLINE.is_match(&text);
            let blue = HIGHLIGHT_BLUE.iter().find(|re| re.is_match(&text));
            let yellow = HIGHLIGHT_YELLOW.iter().find(|re| re.is_match(&text));

            if blue.is_none() && yellow.is_none() && !has_ecli {
                self.processed.insert(key);
                continue;
            }

            // Blue outranks yellow when both match.
            let highlight = blue
                .map(|re| (re, BLUE_CLASS))
                .or_else(|| yellow.map(|re| (re, YELLOW_CLASS)));

            // Collect first: rewriting while iterating the subtree is unsound.
            let text_nodes: Vec<NodeRef> = p
                .descendants()
                .filter(|n| n.as_text().is_some())
                .collect();

            let mut highlight_used = false;
            for node in text_nodes {
                process_text_node(&node, highlight, &mut highlight_used);
            }

            self.processed.insert(key);
        }
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

/// True when the text node lives inside markup decoration must not touch:
/// the host's point-number and footnote anchors, or our own output.
fn in_preserved_context(node: &NodeRef) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    dom::closest(&parent, |el| match dom::tag_name(el).as_deref() {
        Some("a") => {
            if dom::has_class(el, ECLI_CLASS) {
                return true;
            }
            dom::attr(el, "name")
                .map(|name| {
                    let name = name.to_lowercase();
                    name.starts_with("point")
                        || name.starts_with("footnote")
                        || name.starts_with("footref")
                })
                .unwrap_or(false)
        }
        Some("span") => dom::has_class(el, BLUE_CLASS) || dom::has_class(el, YELLOW_CLASS),
        _ => false,
    })
    .is_some()
}

fn ecli_link(ecli_tail: &str) -> NodeRef {
    dom::create_element(&format!(
        r#"<a class="{ECLI_CLASS}" href="{href}" target="_blank" rel="noopener noreferrer">{text}</a>"#,
        href = ecli_lookup_url(ecli_tail),
        text = escape_html(ecli_tail),
    ))
}

fn highlight_span(class: &str, text: &str) -> NodeRef {
    dom::create_element(&format!(
        r#"<span class="{class}">{}</span>"#,
        escape_html(text)
    ))
}

/// Splits one text node on the earliest of the next ECLI occurrence and
/// the paragraph's single highlight pattern. ECLI wins ties.
fn process_text_node(
    node: &NodeRef,
    highlight: Option<(&Regex, &str)>,
    highlight_used: &mut bool,
) {
    let Some(text_cell) = node.as_text() else {
        return;
    };
    let text = text_cell.borrow().clone();
    if text.is_empty() || in_preserved_context(node) {
        return;
    }

    let mut pieces: Vec<NodeRef> = Vec::new();
    let mut remaining = text.as_str();
    let mut rewrote = false;

    while !remaining.is_empty() {
        let ecli = ECLI_INLINE.find(remaining);
        let hl = if *highlight_used {
            None
        } else {
            highlight.and_then(|(re, _)| re.find(remaining))
        };

        enum Hit {
            Ecli,
            Highlight,
        }
        let chosen = match (&ecli, &hl) {
            (Some(e), Some(h)) if e.start() <= h.start() => Some((Hit::Ecli, e.start(), e.end())),
            (_, Some(h)) => Some((Hit::Highlight, h.start(), h.end())),
            (Some(e), None) => Some((Hit::Ecli, e.start(), e.end())),
            (None, None) => None,
        };

        let Some((hit, start, end)) = chosen else {
            pieces.push(NodeRef::new_text(remaining));
            break;
        };

        rewrote = true;
        if start > 0 {
            pieces.push(NodeRef::new_text(&remaining[..start]));
        }
        match hit {
            Hit::Ecli => pieces.push(ecli_link(&remaining[start..end])),
            Hit::Highlight => {
                let (_, class) = highlight.expect("highlight hit implies a pattern");
                pieces.push(highlight_span(class, &remaining[start..end]));
                *highlight_used = true;
            }
        }
        remaining = &remaining[end..];
    }

    if rewrote {
        for piece in pieces {
            node.insert_before(piece);
        }
        node.detach();
    }
}
