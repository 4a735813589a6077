use std::fmt::Display;

use tracing_error::{ExtractSpanTrace, SpanTrace};

/// An error paired with the span trace active when it was raised.
#[derive(Debug)]
pub struct SpannedErr<T> {
    pub err: T,
    pub span_trace: SpanTrace,
}

impl<T> SpannedErr<T> {
    pub fn new(err: T) -> Self {
        SpannedErr {
            err,
            span_trace: SpanTrace::capture(),
        }
    }
}

pub trait SpannedExt<T, E> {
    fn with_span_trace(self) -> Result<T, SpannedErr<E>>;
}

impl<T, E> SpannedExt<T, E> for Result<T, E> {
    fn with_span_trace(self) -> Result<T, SpannedErr<E>> {
        self.map_err(SpannedErr::new)
    }
}

impl<E> ExtractSpanTrace for SpannedErr<E> {
    fn span_trace(&self) -> Option<&SpanTrace> {
        Some(&self.span_trace)
    }
}

impl<T: Display> Display for SpannedErr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.err, f)
    }
}

impl<U: std::error::Error> std::error::Error for SpannedErr<U> {}

/// Prints the colourised span trace of `err` to stderr, if it carries one.
pub fn print_span_trace(err: &impl ExtractSpanTrace) {
    match err.span_trace() {
        Some(span_trace) => eprintln!("\n{}\n", color_spantrace::colorize(span_trace)),
        None => eprintln!("\nNo span trace available.\n"),
    }
}
