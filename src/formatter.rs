//! Formatting engine: runs the rule set over a file until it converges.
//!
//! Every outer iteration is one *pass*: each rule walks the whole tree,
//! collects pending actions, and applies them once its walk is done. A rule
//! may then ask for a *rescan* (another pass over the same, edited tree) or a
//! *full reparse* (serialize, parse again, start over on fresh offsets). The
//! loop stops when nobody asks for more, or after `max_iterations` passes.
//!
//! # Example
//!
//! ```rust
//! use refmt::formatter::{FormatOptions, format_source};
//!
//! let source = "class A {\n    void f() {\n        foo() ;\n    }\n}\n";
//! let formatted = format_source("A.java", source, &FormatOptions::default()).unwrap();
//! assert!(formatted.contains("foo();"));
//! ```

use crate::context::PassContext;
use crate::diagnostics::{Reporter, TracingReporter};
use crate::error::Result;
use crate::language::SupportedLanguage;
use crate::parser::GrammarAdapter;
use crate::rule::Rule;
use crate::rules::default_rules;

/// Output mode for the formatter
///
/// Determines how the formatted code should be handled after processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Print formatted code to stdout
    Stdout,
    /// Write formatted code back to source files
    Write,
    /// Check if formatting would change the code (used for CI/validation)
    Check,
}

/// Configuration options for the formatter
///
/// # Example
///
/// ```rust
/// use refmt::formatter::{FormatOptions, Mode};
///
/// let opts = FormatOptions {
///     max_line_length: 100,
///     mode: Mode::Check,
///     ..FormatOptions::default()
/// };
/// assert_eq!(opts.indent_width, 4);
/// ```
#[derive(Clone, Debug)]
pub struct FormatOptions {
    /// Longest line, in characters, the line breaker leaves alone
    pub max_line_length: usize,
    /// Longest string literal, quotes included, before it is cut
    pub max_string_length: usize,
    /// Number of spaces per indentation level
    pub indent_width: usize,
    /// Parameter lists longer than this go one parameter per line
    pub max_parameters: usize,
    /// Hard cap on passes per file
    pub max_iterations: usize,
    /// How to handle the formatted output
    pub mode: Mode,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            max_line_length: 120,
            max_string_length: 80,
            indent_width: 4,
            max_parameters: 4,
            max_iterations: 50,
            mode: Mode::Stdout,
        }
    }
}

/// Line separator used in returned text.
pub const LINE_SEPARATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Canonical line breaks and no tabs.
#[must_use]
pub fn normalize(content: &str) -> String {
    content
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\t', "    ")
}

/// Runs one rule over the whole tree held by `ctx`.
pub(crate) fn run_rule(ctx: &mut PassContext<'_>, rule: &mut dyn Rule) -> Result<()> {
    rule.before_visit(ctx);
    let root = ctx.tree().root();
    for node in ctx.tree().preorder(root) {
        rule.visit(ctx, node);
    }
    rule.after_visit(ctx)
}

/// Reformats files with a fixed grammar adapter and options.
///
/// The adapter owns tree-sitter parsers, so a formatter belongs to one
/// thread at a time; batch callers create one per worker.
pub struct CodeFormatter {
    grammar: GrammarAdapter,
    options: FormatOptions,
}

impl CodeFormatter {
    pub fn new(options: FormatOptions) -> Result<Self> {
        Ok(Self {
            grammar: GrammarAdapter::init()?,
            options,
        })
    }

    #[must_use]
    pub const fn options(&self) -> &FormatOptions {
        &self.options
    }

    /// Reformats `content` with `rules`, sending every correction to
    /// `reporter`.
    ///
    /// Files whose extension selects no grammar come back unchanged. A file
    /// that does not parse is an error; so is a rule leaving the tree in an
    /// inconsistent state. Running out of iterations is not: the text as it
    /// stands is returned.
    pub fn reformat(
        &mut self,
        file_name: &str,
        content: &str,
        rules: &mut [Box<dyn Rule>],
        reporter: &mut dyn Reporter,
    ) -> Result<String> {
        let Some(language) = SupportedLanguage::from_path(file_name) else {
            tracing::debug!(file = file_name, "no grammar for file, leaving it untouched");
            return Ok(content.to_owned());
        };

        let source = normalize(content);
        let mut tree = self.grammar.parse(language, &source)?;
        let mut scan = 1;
        let mut edited_since_parse = false;
        let mut converged = false;

        for iteration in 1..=self.options.max_iterations {
            let mut ctx = PassContext::new(file_name, tree, language, iteration, scan, reporter);
            for rule in rules.iter_mut() {
                if ctx.corrections() > 0 {
                    ctx.notify_text_change();
                }
                tracing::trace!(rule = rule.name(), iteration, scan, "running rule");
                run_rule(&mut ctx, rule.as_mut())?;
            }
            let corrections = ctx.corrections();
            let rescan = ctx.rescan_requested();
            let reparse = ctx.full_reparse_requested();
            tree = ctx.into_tree();
            edited_since_parse |= corrections > 0;
            tracing::debug!(
                file = file_name,
                iteration,
                scan,
                corrections,
                rescan,
                reparse,
                "pass finished"
            );

            if rescan {
                scan += 1;
            } else if reparse || edited_since_parse {
                // Edits made in place are only trusted once the grammar has
                // seen the resulting text.
                let text = tree.text(tree.root());
                tree = self.grammar.parse(language, &text)?;
                scan = 1;
                edited_since_parse = false;
            } else {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::warn!(
                file = file_name,
                max_iterations = self.options.max_iterations,
                "formatting did not converge, keeping the last result"
            );
        }

        let text = tree.text(tree.root());
        Ok(if LINE_SEPARATOR == "\n" {
            text
        } else {
            text.replace('\n', LINE_SEPARATOR)
        })
    }

    /// [`reformat`](Self::reformat) with the default rule set.
    pub fn reformat_with_defaults(
        &mut self,
        file_name: &str,
        content: &str,
        reporter: &mut dyn Reporter,
    ) -> Result<String> {
        let mut rules = default_rules(&self.options);
        self.reformat(file_name, content, &mut rules, reporter)
    }

    /// Like [`reformat_with_defaults`](Self::reformat_with_defaults) but
    /// falls back to `content` when formatting fails.
    pub fn reformat_or_original(
        &mut self,
        file_name: &str,
        content: &str,
        reporter: &mut dyn Reporter,
    ) -> String {
        match self.reformat_with_defaults(file_name, content, reporter) {
            Ok(formatted) => formatted,
            Err(e) => {
                tracing::warn!(file = file_name, "keeping original text: {e}");
                content.to_owned()
            }
        }
    }
}

/// Formats one file with the default rules, logging corrections through
/// `tracing`.
pub fn format_source(file_name: &str, content: &str, options: &FormatOptions) -> Result<String> {
    let mut formatter = CodeFormatter::new(options.clone())?;
    formatter.reformat_with_defaults(file_name, content, &mut TracingReporter)
}
