pub mod kind;

use ariadne::Report;
use std::ops::Range;
use symbra_error::ErrorKind;

/// A general tokenizing / tree-building error.
#[derive(Debug)]
pub struct Error {
    /// The regions of the prepared source that this error originated from.
    pub spans: Vec<Range<usize>>,

    /// The kind of error that occurred.
    pub kind: Box<dyn ErrorKind>,
}

impl Error {
    /// Creates a new error with the given spans and kind.
    pub fn new(spans: Vec<Range<usize>>, kind: impl ErrorKind + 'static) -> Self {
        Self { spans, kind: Box::new(kind) }
    }

    /// The 1-based source column of the first span.
    pub fn column(&self) -> usize {
        self.spans.first().map_or(1, |span| span.start + 1)
    }

    /// Build a report from this error kind.
    pub fn build_report(&self) -> Report<'static, (&'static str, Range<usize>)> {
        self.kind.build_report("input", &self.spans)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (column {})", self.kind.message(), self.column())
    }
}
