//! Interval merging - overlay raw location ranges into a disjoint partition
//!
//! Global invariants enforced:
//! - Output spans partition [0, text length) exactly
//! - For every offset, span counts equal the sum of all raw ranges covering it
//! - The line-split pass subdivides geometry only, never counts

use crate::location::{Counts, LineTable, SourceLocation};
use std::collections::BTreeMap;

/// Maximal sub-range of one file's text with constant aggregated counts
///
/// Offsets are byte offsets into the file's text, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatedSpan {
    pub start: usize,
    pub end: usize,
    pub counts: Counts,
}

/// Partition of one file plus the events dropped while building it
pub struct MergedFile {
    pub spans: Vec<AggregatedSpan>,
    /// Events whose location did not fit the file's actual text
    pub dropped_events: u64,
}

/// Overlay all aggregation entries for one file into a disjoint partition.
///
/// Entries whose positions fall outside the text are dropped and their event
/// totals counted. An empty entry list yields a single untouched span over
/// the whole text; an empty text yields an empty partition.
pub fn merge_file(entries: &[(SourceLocation, Counts)], text: &str) -> MergedFile {
    let table = LineTable::new(text);
    let mut dropped_events = 0u64;

    // Signed count deltas keyed by boundary offset: counts open at a range's
    // start and close at its end. Accumulating per offset before sweeping
    // applies outer opens and inner closes together, so the running total is
    // well-defined at every boundary and no zero-width span is emitted.
    let mut boundaries: BTreeMap<usize, (i64, i64)> = BTreeMap::new();
    for (location, counts) in entries {
        let start = table.offset(location.start_line, location.start_col);
        let end = table.offset(location.end_line, location.end_col);
        let (Some(start), Some(end)) = (start, end) else {
            dropped_events += counts.total();
            continue;
        };
        if start >= end {
            dropped_events += counts.total();
            continue;
        }
        let open = boundaries.entry(start).or_default();
        open.0 += counts.specialized as i64;
        open.1 += counts.adaptive as i64;
        let close = boundaries.entry(end).or_default();
        close.0 -= counts.specialized as i64;
        close.1 -= counts.adaptive as i64;
    }

    // Sweep left to right, emitting a span whenever the running pair changes
    let mut spans = Vec::new();
    let mut cursor = 0usize;
    let mut running = (0i64, 0i64);
    for (&offset, &(specialized, adaptive)) in &boundaries {
        if (specialized, adaptive) == (0, 0) {
            // Abutting ranges with equal counts cancel out; not a boundary
            continue;
        }
        if offset > cursor {
            spans.push(span_from_running(cursor, offset, running));
            cursor = offset;
        }
        running.0 += specialized;
        running.1 += adaptive;
    }
    if cursor < text.len() {
        spans.push(span_from_running(cursor, text.len(), running));
    }

    MergedFile {
        spans: split_at_line_starts(spans, &table),
        dropped_events,
    }
}

fn span_from_running(start: usize, end: usize, running: (i64, i64)) -> AggregatedSpan {
    debug_assert!(running.0 >= 0 && running.1 >= 0, "unbalanced sweep deltas");
    AggregatedSpan {
        start,
        end,
        counts: Counts {
            specialized: running.0 as u64,
            adaptive: running.1 as u64,
        },
    }
}

/// Split any span crossing a physical line boundary.
///
/// A rendered span may not straddle lines; counts are left untouched.
fn split_at_line_starts(spans: Vec<AggregatedSpan>, table: &LineTable<'_>) -> Vec<AggregatedSpan> {
    let line_starts = table.line_starts();
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        let mut start = span.start;
        let first_inside = line_starts.partition_point(|&offset| offset <= span.start);
        for &offset in &line_starts[first_inside..] {
            if offset >= span.end {
                break;
            }
            out.push(AggregatedSpan {
                start,
                end: offset,
                counts: span.counts,
            });
            start = offset;
        }
        out.push(AggregatedSpan {
            start,
            end: span.end,
            counts: span.counts,
        });
    }
    out
}
