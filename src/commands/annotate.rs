use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::AnnotateArgs;
use crate::dom;
use crate::highlight::{BLUE_CLASS, ECLI_CLASS, YELLOW_CLASS};
use crate::reconcile::Reconciler;

/// Runs one full reconciliation pass over a saved page and emits the
/// annotated document: helper panel, citation, outline, highlights and
/// ECLI links, exactly as they would render in the live layout.
pub fn run(args: AnnotateArgs) -> Result<()> {
    let mut page = super::load_page(&args.html, args.metrics.as_deref())?;

    let mut reconciler = Reconciler::new()?;
    reconciler.invalidate();
    reconciler.tick(&mut page, 0);

    match reconciler.citation() {
        Some(citation) => info!(case_number = %citation.case_number, "judgment detected"),
        None => info!("no judgment detected"),
    }

    let highlights = dom::select(
        &page.document,
        &format!("span.{YELLOW_CLASS},span.{BLUE_CLASS}"),
    )
    .len();
    let ecli_links = dom::select(&page.document, &format!("a.{ECLI_CLASS}")).len();
    info!(highlights, ecli_links, "decoration applied");

    let html = dom::serialize_node(&page.document);
    match &args.output {
        Some(path) => {
            fs::write(path, &html)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote annotated page");
        }
        None => {
            let mut output = io::BufWriter::new(io::stdout().lock());
            output.write_all(html.as_bytes())?;
            writeln!(output)?;
            output.flush()?;
        }
    }

    Ok(())
}
