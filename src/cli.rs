use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "infocuria",
    version,
    about = "Citation, outline and layout tooling for saved Infocuria judgment pages"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inspect(InspectArgs),
    Toc(TocArgs),
    Annotate(AnnotateArgs),
    Layout(LayoutArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Saved page to inspect.
    #[arg(long)]
    pub html: PathBuf,

    /// Geometry snapshot (viewport, rects, scroll) as JSON.
    #[arg(long)]
    pub metrics: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TocArgs {
    #[arg(long)]
    pub html: PathBuf,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AnnotateArgs {
    #[arg(long)]
    pub html: PathBuf,

    #[arg(long)]
    pub metrics: Option<PathBuf>,

    /// Destination for the annotated page; stdout when omitted.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct LayoutArgs {
    /// Width of the host flex container in CSS pixels.
    #[arg(long)]
    pub container_width: f64,

    #[arg(long, default_value_t = 12.0)]
    pub splitter_width: f64,

    #[arg(long, default_value_t = false)]
    pub hide_results: bool,

    #[arg(long, default_value_t = false)]
    pub hide_helper: bool,

    /// Pin list and helper to their minimum widths ("go to document").
    #[arg(long, default_value_t = false)]
    pub force_min: bool,

    /// Previous pane widths as `list,details,helper`.
    #[arg(long, value_delimiter = ',')]
    pub remembered: Vec<f64>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
