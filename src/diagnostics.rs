//! Diagnostics sinks that receive every applied correction.
//!
//! A [`Reporter`] is told about each correction in the order the rules queued
//! it, across all passes of a `reformat` call.

use std::io::Write;

/// Where a correction applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFragment {
    /// 1-based line of the reported node.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
    /// Length of the reported node's text in characters.
    pub length: usize,
    /// Full text of the line containing the node.
    pub excerpt: String,
}

/// One reported correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub file_name: String,
    pub message: String,
    pub fragment: CodeFragment,
}

/// Receiver of formatting corrections.
pub trait Reporter {
    fn report(&mut self, file_name: &str, message: &str, fragment: &CodeFragment);
}

/// Routes corrections into the `tracing` log. This is the default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, file_name: &str, message: &str, fragment: &CodeFragment) {
        tracing::info!(
            file = file_name,
            line = fragment.line,
            column = fragment.column,
            "{message}"
        );
    }
}

/// Prints `file:line:column: message` followed by the offending line.
#[derive(Debug)]
pub struct WriterReporter<W: Write> {
    writer: W,
}

impl<W: Write> WriterReporter<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Reporter for WriterReporter<W> {
    fn report(&mut self, file_name: &str, message: &str, fragment: &CodeFragment) {
        let written = writeln!(
            self.writer,
            "{}:{}:{}: {}\n    {}",
            file_name, fragment.line, fragment.column, message, fragment.excerpt
        );
        if let Err(e) = written {
            tracing::warn!("failed to write correction report: {e}");
        }
    }
}

/// Keeps every correction in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingReporter {
    corrections: Vec<Correction>,
}

impl CollectingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn corrections(&self) -> &[Correction] {
        &self.corrections
    }

    #[must_use]
    pub fn into_corrections(self) -> Vec<Correction> {
        self.corrections
    }
}

impl Reporter for CollectingReporter {
    fn report(&mut self, file_name: &str, message: &str, fragment: &CodeFragment) {
        self.corrections.push(Correction {
            file_name: file_name.to_owned(),
            message: message.to_owned(),
            fragment: fragment.clone(),
        });
    }
}
