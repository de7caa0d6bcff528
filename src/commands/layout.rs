use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::LayoutArgs;
use crate::layout::sizing::{self, SizingInput};

pub fn run(args: LayoutArgs) -> Result<()> {
    let want_list = !args.hide_results;
    let want_helper = !args.hide_helper;
    let splitter_count = want_list as u32 + want_helper as u32;
    let total = args.container_width - args.splitter_width * splitter_count as f64;
    if total <= 0.0 {
        bail!(
            "container width {} leaves no room for panes",
            args.container_width
        );
    }

    let (seed_list, seed_details, seed_helper) = match args.remembered.as_slice() {
        [] => (None, None, None),
        [list, details, helper] => (Some(*list), Some(*details), Some(*helper)),
        other => bail!(
            "--remembered takes three comma-separated widths (list,details,helper), got {}",
            other.len()
        ),
    };

    let widths = sizing::compute_widths(&SizingInput {
        total,
        want_list,
        want_helper,
        force_min_list: args.force_min && want_list,
        force_min_helper: args.force_min && want_helper,
        seed_list,
        seed_details,
        seed_helper,
    });

    info!(
        total,
        list = widths.list,
        details = widths.details,
        helper = widths.helper,
        "pane widths computed"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &widths)
            .context("failed to serialize layout output")?;
        writeln!(output)?;
    } else {
        writeln!(output, "total: {total}")?;
        writeln!(output, "list: {}", widths.list)?;
        writeln!(output, "details: {}", widths.details)?;
        writeln!(output, "helper: {}", widths.helper)?;
    }
    output.flush()?;

    Ok(())
}
