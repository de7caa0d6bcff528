use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::citation;
use crate::cli::TocArgs;
use crate::toc::HeadingDetector;

pub fn run(args: TocArgs) -> Result<()> {
    let page = super::load_page(&args.html, None)?;
    info!(path = %args.html.display(), "extracting document outline");

    let detector = HeadingDetector::new()?;
    let items = citation::preview_root(&page)
        .map(|root| detector.build_toc_items(&root))
        .unwrap_or_default();

    let mut output = io::BufWriter::new(io::stdout().lock());

    if args.json {
        serde_json::to_writer_pretty(&mut output, &items)
            .context("failed to serialize outline output")?;
        writeln!(output)?;
        output.flush()?;
        return Ok(());
    }

    writeln!(output, "Headings: {}", items.len())?;
    for item in &items {
        let indent = (item.level.saturating_sub(1) as usize) * 2;
        writeln!(output, "{:indent$}- {} [{}]", "", item.text, item.id)?;
    }
    output.flush()?;

    Ok(())
}
