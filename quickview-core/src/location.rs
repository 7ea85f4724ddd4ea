//! Source locations, outcome counts, and line/column-to-offset conversion

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Exact source-text span one instruction is attributed to
///
/// Lines and columns are 1-indexed; columns are character offsets within the
/// line. The end position is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Path of the file the span belongs to, as reported by the event source
    pub file: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceLocation {
    pub fn new(file: &str, start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        SourceLocation {
            file: file.to_string(),
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Start position as a (line, column) pair
    pub fn start(&self) -> (u32, u32) {
        (self.start_line, self.start_col)
    }

    /// End position as a (line, column) pair (exclusive)
    pub fn end(&self) -> (u32, u32) {
        (self.end_line, self.end_col)
    }

    /// Check whether the location can be rejected without the file's text.
    ///
    /// Positions are 1-indexed, so a zero line or column is malformed, as is
    /// a start that does not precede its end.
    pub fn is_degenerate(&self) -> bool {
        self.start_line == 0
            || self.start_col == 0
            || self.end_line == 0
            || self.end_col == 0
            || self.start() >= self.end()
    }
}

/// Specialization outcome of one observed instruction execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The instruction ran in a specialized form
    Specialized,
    /// The instruction ran in its slower adaptive form
    Adaptive,
}

/// Cumulative outcome counters for one location or span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub specialized: u64,
    pub adaptive: u64,
}

impl Counts {
    pub fn total(&self) -> u64 {
        self.specialized + self.adaptive
    }

    /// A span no recorded event covers
    pub fn is_untouched(&self) -> bool {
        self.total() == 0
    }

    /// Fraction of outcomes that were specialized, in `[0, 1]`.
    ///
    /// Must not be called on an untouched span.
    pub fn hit_rate(&self) -> f64 {
        debug_assert!(self.total() > 0, "hit rate of an untouched span");
        self.specialized as f64 / self.total() as f64
    }
}

impl Add for Counts {
    type Output = Counts;

    fn add(self, other: Counts) -> Counts {
        Counts {
            specialized: self.specialized + other.specialized,
            adaptive: self.adaptive + other.adaptive,
        }
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, other: Counts) {
        *self = *self + other;
    }
}

/// Line-start offset table for one file's text
///
/// Converts 1-indexed (line, column) character positions to byte offsets.
/// Built once per file and reused for every location in it.
pub struct LineTable<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineTable<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        LineTable { text, line_starts }
    }

    /// Byte offsets at which each physical line begins, in ascending order
    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    /// Convert a 1-indexed (line, column) position to a byte offset.
    ///
    /// The column may point one past the last character of its line, so that
    /// exclusive end positions can close at line end. Returns `None` for any
    /// position outside the text.
    pub fn offset(&self, line: u32, col: u32) -> Option<usize> {
        if line == 0 || col == 0 {
            return None;
        }
        let index = (line - 1) as usize;
        let start = *self.line_starts.get(index)?;
        let end = self
            .line_starts
            .get(index + 1)
            .copied()
            .unwrap_or(self.text.len());
        let line_text = &self.text[start..end];
        let chars_before = (col - 1) as usize;
        if chars_before == 0 {
            return Some(start);
        }
        // Offset of column c is the end of the line's first c-1 characters
        let (last_start, last) = line_text.char_indices().nth(chars_before - 1)?;
        Some(start + last_start + last.len_utf8())
    }
}
