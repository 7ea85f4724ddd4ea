//! Rendered document model
//!
//! Global invariants enforced:
//! - Concatenating the text of a file's rendered spans reconstructs the
//!   original source byte-for-byte
//! - Identical frozen input yields byte-for-byte identical documents

use crate::color::Rgb;
use crate::location::Counts;

/// A source file requested for annotation
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    /// `None` when the text could not be read back after the run
    pub text: Option<String>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        SourceFile {
            path: path.into(),
            text: Some(text.into()),
        }
    }

    /// A file whose text went missing between execution and finalize
    pub fn unavailable(path: impl Into<String>) -> Self {
        SourceFile {
            path: path.into(),
            text: None,
        }
    }
}

/// An aggregated span with its assigned color and literal text slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSpan {
    pub start: usize,
    pub end: usize,
    pub counts: Counts,
    pub color: Rgb,
    pub text: String,
}

/// Annotation result for one requested file
#[derive(Debug, Clone)]
pub enum FileSpans {
    Rendered(Vec<RenderedSpan>),
    /// Source text was missing at finalize time
    Unavailable,
}

/// One file's section of the document
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: String,
    pub spans: FileSpans,
    /// Events for this file whose locations did not fit its text
    pub dropped_events: u64,
}

impl FileReport {
    /// Whether any span of this file saw specialization activity
    pub fn is_quickened(&self) -> bool {
        match &self.spans {
            FileSpans::Rendered(spans) => spans.iter().any(|s| !s.counts.is_untouched()),
            FileSpans::Unavailable => false,
        }
    }

    /// Concatenate the spans' text slices back into the original source
    pub fn reconstructed_text(&self) -> Option<String> {
        match &self.spans {
            FileSpans::Rendered(spans) => {
                Some(spans.iter().map(|s| s.text.as_str()).collect::<String>())
            }
            FileSpans::Unavailable => None,
        }
    }
}

/// The complete rendered output of one analysis run
#[derive(Debug, Clone)]
pub struct Document {
    pub html: String,
    pub files: Vec<FileReport>,
}

impl Document {
    /// Whether any rendered file saw specialization activity
    pub fn is_quickened(&self) -> bool {
        self.files.iter().any(FileReport::is_quickened)
    }
}
