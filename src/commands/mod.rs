use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::dom::{self, Metrics, Page};

pub mod annotate;
pub mod inspect;
pub mod layout;
pub mod toc;

/// Loads a saved page plus an optional geometry snapshot.
pub fn load_page(html_path: &Path, metrics_path: Option<&Path>) -> Result<Page> {
    let html = fs::read_to_string(html_path)
        .with_context(|| format!("failed to read {}", html_path.display()))?;

    let metrics = match metrics_path {
        Some(path) => {
            let raw =
                fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_slice::<Metrics>(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => Metrics::default(),
    };

    Ok(Page::new(dom::parse_html(&html), metrics))
}
