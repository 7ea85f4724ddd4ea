//! Event sources - the seam between instrumentation backends and ingestion

use crate::ingest::AggregationTable;
use crate::location::{Outcome, SourceLocation};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// One serialized outcome observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub file: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub outcome: Outcome,
}

impl TraceEvent {
    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            file: self.file.clone(),
            start_line: self.start_line,
            start_col: self.start_col,
            end_line: self.end_line,
            end_col: self.end_col,
        }
    }
}

/// Anything that can emit (location, outcome) pairs into the table.
///
/// Instrumentation backends are interchangeable behind this trait; the core
/// never assumes where events come from.
pub trait EventSource {
    fn replay(&mut self, table: &AggregationTable) -> Result<()>;
}

/// Replay backend for a recorded trace: one JSON event per line.
///
/// Blank lines are skipped. A malformed line aborts the replay with its
/// line number; malformed *locations* inside well-formed events are the
/// table's concern and are dropped there.
pub struct JsonlEvents<R> {
    reader: R,
}

impl<R: BufRead> JsonlEvents<R> {
    pub fn new(reader: R) -> Self {
        JsonlEvents { reader }
    }
}

impl<R: BufRead> EventSource for JsonlEvents<R> {
    fn replay(&mut self, table: &AggregationTable) -> Result<()> {
        for (number, line) in (&mut self.reader).lines().enumerate() {
            let line = line.with_context(|| {
                format!("failed to read event stream at line {}", number + 1)
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let event: TraceEvent = serde_json::from_str(trimmed)
                .with_context(|| format!("malformed event at line {}", number + 1))?;
            table.record(event.location(), event.outcome);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Counts;
    use std::io::Cursor;

    #[test]
    fn test_replay_jsonl() {
        let stream = concat!(
            r#"{"file":"a.py","start_line":1,"start_col":1,"end_line":1,"end_col":6,"outcome":"specialized"}"#,
            "\n\n",
            r#"{"file":"a.py","start_line":1,"start_col":1,"end_line":1,"end_col":6,"outcome":"adaptive"}"#,
            "\n",
        );
        let table = AggregationTable::new();
        JsonlEvents::new(Cursor::new(stream))
            .replay(&table)
            .expect("replay succeeds");
        let frozen = table.freeze();
        let entries = frozen.entries_for("a.py");
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].1,
            Counts {
                specialized: 1,
                adaptive: 1
            }
        );
    }

    #[test]
    fn test_malformed_line_reports_its_number() {
        let stream = concat!(
            r#"{"file":"a.py","start_line":1,"start_col":1,"end_line":1,"end_col":6,"outcome":"specialized"}"#,
            "\n",
            "not json\n",
        );
        let table = AggregationTable::new();
        let err = JsonlEvents::new(Cursor::new(stream))
            .replay(&table)
            .expect_err("replay fails");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_event_round_trips_through_serde() {
        let event = TraceEvent {
            file: "a.py".to_string(),
            start_line: 3,
            start_col: 5,
            end_line: 3,
            end_col: 9,
            outcome: Outcome::Adaptive,
        };
        let json = serde_json::to_string(&event).expect("serializes");
        assert!(json.contains(r#""outcome":"adaptive""#));
        let back: TraceEvent = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back, event);
    }
}
