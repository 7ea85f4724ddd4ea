//! Quickview CLI - renders specialization heat maps from recorded event streams

#![deny(warnings)]

use anyhow::{Context, Result};
use clap::Parser;
use globset::Glob;
use indicatif::ProgressBar;
use quickview_core::{
    render_document, AggregationTable, EventSource, FrozenTable, JsonlEvents, PaletteConfig,
    SourceFile,
};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quickview")]
#[command(
    about = "Render a color-coded view of how well a program's instructions specialized"
)]
#[command(version = env!("QUICKVIEW_VERSION"))]
struct Cli {
    /// Recorded event stream, one JSON event per line
    events: PathBuf,

    /// Source files to annotate, named as they appear in the event stream
    #[arg(value_name = "FILE")]
    files: Vec<String>,

    /// Use a red-blue color scheme
    #[arg(short, long)]
    blue: bool,

    /// Use a dark color scheme
    #[arg(short, long)]
    dark: bool,

    /// File to write the HTML report to
    #[arg(short, long, default_value = "quickview.html")]
    output: PathBuf,

    /// Glob pattern selecting event-stream files to annotate
    #[arg(short, long)]
    targets: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let palette = PaletteConfig {
        alternate_hue: cli.blue,
        dark: cli.dark,
    };

    let table = AggregationTable::new();
    let stream = File::open(&cli.events)
        .with_context(|| format!("failed to open event stream: {}", cli.events.display()))?;
    JsonlEvents::new(BufReader::new(stream))
        .replay(&table)
        .with_context(|| format!("failed to replay event stream: {}", cli.events.display()))?;
    let frozen = table.freeze();

    let paths = select_targets(&frozen, &cli.files, cli.targets.as_deref())?;
    if paths.is_empty() {
        anyhow::bail!("no source files selected; name files explicitly or pass --targets");
    }

    let sources = read_sources(&paths);
    let document = render_document(&frozen, &sources, palette);
    if !document.is_quickened() {
        eprintln!(
            "quickview: no quickened code found in the selected files! Try running the \
             target longer, or use --targets to analyze different source files."
        );
    }

    if let Some(parent) = cli.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create output directory: {}", parent.display())
            })?;
        }
    }
    std::fs::write(&cli.output, &document.html)
        .with_context(|| format!("failed to write report: {}", cli.output.display()))?;
    eprintln!("quickview: wrote {}", cli.output.display());
    Ok(())
}

/// Files to annotate: explicit arguments, plus event-stream files matching
/// the --targets glob. With neither, every file in the stream is selected.
fn select_targets(
    frozen: &FrozenTable,
    files: &[String],
    targets: Option<&str>,
) -> Result<Vec<String>> {
    // BTreeSet gives deduplication and a deterministic render order
    let mut selected: BTreeSet<String> = files.iter().cloned().collect();
    match targets {
        Some(pattern) => {
            let matcher = Glob::new(pattern)
                .with_context(|| format!("invalid targets pattern: {}", pattern))?
                .compile_matcher();
            for file in frozen.files() {
                if matcher.is_match(file) {
                    selected.insert(file.to_string());
                }
            }
        }
        None if selected.is_empty() => {
            selected.extend(frozen.files().map(str::to_string));
        }
        None => {}
    }
    Ok(selected.into_iter().collect())
}

/// Read each selected file's text; unreadable files degrade to placeholder
/// sections rather than failing the run.
fn read_sources(paths: &[String]) -> Vec<SourceFile> {
    let bar = ProgressBar::new(paths.len() as u64);
    let sources = paths
        .iter()
        .map(|path| {
            bar.inc(1);
            match std::fs::read_to_string(path) {
                Ok(text) => SourceFile::new(path.clone(), text),
                Err(e) => {
                    eprintln!("warning: failed to read {}: {}", path, e);
                    SourceFile::unavailable(path.clone())
                }
            }
        })
        .collect();
    bar.finish_and_clear();
    sources
}
