//! Contains the common [`ErrorKind`] trait used by all tokenizing and evaluation errors to
//! display user-facing error messages.
//!
//! Each error kind describes itself through [`ErrorKind::message`], [`ErrorKind::labels`], and
//! [`ErrorKind::help`]; the default [`ErrorKind::build_report`] implementation assembles those
//! pieces into an [`ariadne`] report that highlights the offending spans in the source
//! expression.

use ariadne::{Color, Label, Report, ReportKind};
use std::{fmt::Debug, ops::Range};

/// The color to use to highlight expressions.
pub const EXPR: Color = Color::Rgb(52, 235, 152);

/// The color to use to highlight operators and brackets.
pub const OP: Color = Color::Rgb(235, 189, 52);

/// Represents any kind of error that can occur during some operation.
pub trait ErrorKind: Debug + Send + Sync {
    /// The top-level message describing the error.
    fn message(&self) -> String;

    /// One label per span, attached in order. If fewer labels than spans are returned, the last
    /// label is reused for the remaining spans.
    fn labels(&self) -> Vec<String>;

    /// An optional help message with a suggested fix.
    fn help(&self) -> Option<String> {
        None
    }

    /// Builds the report for this error.
    fn build_report<'a>(
        &self,
        src_id: &'a str,
        spans: &[Range<usize>],
    ) -> Report<'a, (&'a str, Range<usize>)> {
        let start = spans.first().map_or(0, |span| span.start);
        let mut builder = Report::build(ReportKind::Error, src_id, start)
            .with_message(self.message());

        let labels = self.labels();
        for (i, span) in spans.iter().enumerate() {
            let text = labels
                .get(i)
                .or_else(|| labels.last())
                .cloned()
                .unwrap_or_default();
            builder = builder.with_label(
                Label::new((src_id, span.clone()))
                    .with_message(text)
                    .with_order(i as i32),
            );
        }

        if let Some(help) = self.help() {
            builder = builder.with_help(help);
        }

        builder.finish()
    }
}
