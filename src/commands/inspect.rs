use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::citation::{self, CitationExtractor};
use crate::cli::InspectArgs;
use crate::model::DocumentCitation;
use crate::util::build_pdf_filename;

#[derive(Serialize)]
struct InspectReport {
    detected: bool,
    valid: bool,
    pdf_filename: Option<String>,
    citation: Option<DocumentCitation>,
}

pub fn run(args: InspectArgs) -> Result<()> {
    let page = super::load_page(&args.html, args.metrics.as_deref())?;
    info!(path = %args.html.display(), "inspecting saved page");

    let extractor = CitationExtractor::new()?;
    let citation = citation::preview_root(&page)
        .filter(|root| page.is_visible(root))
        .map(|root| extractor.extract(&page, &root));

    let mut output = io::BufWriter::new(io::stdout().lock());

    if args.json {
        let report = InspectReport {
            detected: citation.is_some(),
            valid: citation.as_ref().is_some_and(DocumentCitation::is_valid),
            pdf_filename: citation
                .as_ref()
                .map(|c| build_pdf_filename(&c.case_name, &c.case_number)),
            citation,
        };
        serde_json::to_writer_pretty(&mut output, &report)
            .context("failed to serialize inspection output")?;
        writeln!(output)?;
        output.flush()?;
        return Ok(());
    }

    let Some(citation) = citation else {
        writeln!(output, "No judgment preview detected.")?;
        output.flush()?;
        return Ok(());
    };

    let dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };

    writeln!(output, "Citation: {}", citation.citation_text)?;
    writeln!(output, "Court: {}", dash(citation.court.trim_end_matches([',', ' '])))?;
    writeln!(
        output,
        "Date: {}",
        dash(&citation.date.as_ref().map(|d| d.formatted.clone()).unwrap_or_default())
    )?;
    writeln!(output, "Case number: {}", dash(&citation.case_number))?;
    writeln!(output, "Case name: {}", dash(&citation.case_name))?;
    writeln!(output, "ECLI: {}", dash(citation.ecli.as_deref().unwrap_or_default()))?;
    writeln!(output, "PDF: {}", dash(citation.pdf_url.as_deref().unwrap_or_default()))?;
    writeln!(
        output,
        "Filename: {}",
        build_pdf_filename(&citation.case_name, &citation.case_number)
    )?;
    writeln!(output, "Valid: {}", citation.is_valid())?;
    output.flush()?;

    Ok(())
}
