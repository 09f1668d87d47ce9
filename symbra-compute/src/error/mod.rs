pub mod kind;

use ariadne::Report;
use std::ops::Range;
use symbra_error::ErrorKind;

/// A general evaluation / kernel error.
///
/// Errors raised while evaluating an operator tree carry the spans of the tokens involved;
/// errors raised by direct kernel calls have no source location and carry no spans.
#[derive(Debug)]
pub struct Error {
    /// The regions of the source expression that this error originated from, if any.
    pub spans: Vec<Range<usize>>,

    /// The kind of error that occurred.
    pub kind: Box<dyn ErrorKind>,
}

impl Error {
    /// Creates a new error with the given spans and kind.
    pub fn new(spans: Vec<Range<usize>>, kind: impl ErrorKind + 'static) -> Self {
        Self { spans, kind: Box::new(kind) }
    }

    /// Creates an error with no source location.
    pub fn bare(kind: impl ErrorKind + 'static) -> Self {
        Self { spans: Vec::new(), kind: Box::new(kind) }
    }

    /// Attaches spans to a bare error, leaving spanned errors untouched.
    pub fn with_spans(mut self, spans: Vec<Range<usize>>) -> Self {
        if self.spans.is_empty() {
            self.spans = spans;
        }
        self
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
        write!(f, "{}", self.kind.message())
    }
}

impl From<symbra_parser::Error> for Error {
    fn from(err: symbra_parser::Error) -> Self {
        Self { spans: err.spans, kind: err.kind }
    }
}
