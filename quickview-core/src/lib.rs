//! Quickview core library - aggregates interpreter specialization events and
//! renders per-file, color-coded source heat maps

#![deny(warnings)]

// Global invariants enforced in this crate:
// - The aggregation table is the only shared mutable state; freeze() is the
//   single barrier between recording and rendering
// - Per-file spans partition the text exactly, with conserved counts
// - Failure narrows to the smallest affected unit: one event or one file
// - Identical frozen input yields byte-for-byte identical documents

pub mod color;
pub mod events;
pub mod html;
pub mod ingest;
pub mod location;
pub mod merge;
pub mod report;

pub use color::{PaletteConfig, Rgb};
pub use events::{EventSource, JsonlEvents, TraceEvent};
pub use ingest::{AggregationTable, FrozenTable};
pub use location::{Counts, Outcome, SourceLocation};
pub use report::{Document, FileReport, FileSpans, RenderedSpan, SourceFile};

use rayon::prelude::*;

/// Render the complete document for a frozen run.
///
/// File pipelines are independent, so they run in parallel; assembly order
/// is the input order, keeping the output deterministic. Files with missing
/// text degrade to a placeholder section and never fail the run.
pub fn render_document(
    table: &FrozenTable,
    files: &[SourceFile],
    palette: PaletteConfig,
) -> Document {
    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|file| render_file(table, file, palette))
        .collect();
    for report in &reports {
        if matches!(report.spans, FileSpans::Unavailable) {
            eprintln!(
                "warning: missing source text for {}: rendering a placeholder",
                report.path
            );
        }
    }
    let dropped = table.dropped_events()
        + reports.iter().map(|r| r.dropped_events).sum::<u64>()
        + table.unattributed_events(reports.iter().map(|r| r.path.as_str()));
    let html = html::render_html_document(&reports, palette, dropped);
    Document {
        html,
        files: reports,
    }
}

/// Freeze the table and render in one step.
///
/// Call once per analysis run, after the event source has quiesced. For
/// repeated rendering of one run, freeze explicitly and call
/// [`render_document`].
pub fn finalize(table: AggregationTable, files: &[SourceFile], palette: PaletteConfig) -> Document {
    render_document(&table.freeze(), files, palette)
}

/// One file's pipeline: merge its entries, color the spans, slice the text
fn render_file(table: &FrozenTable, file: &SourceFile, palette: PaletteConfig) -> FileReport {
    let Some(text) = file.text.as_deref() else {
        return FileReport {
            path: file.path.clone(),
            spans: FileSpans::Unavailable,
            dropped_events: 0,
        };
    };
    let merged = merge::merge_file(table.entries_for(&file.path), text);
    let spans = merged
        .spans
        .iter()
        .map(|span| RenderedSpan {
            start: span.start,
            end: span.end,
            counts: span.counts,
            color: color::span_color(span.counts, palette),
            text: text[span.start..span.end].to_string(),
        })
        .collect();
    FileReport {
        path: file.path.clone(),
        spans: FileSpans::Rendered(spans),
        dropped_events: merged.dropped_events,
    }
}
