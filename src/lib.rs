//! # refmt - Syntax-Tree Java Reformatter
//!
//! refmt rewrites Java source through a mutable concrete syntax tree instead
//! of re-printing an AST. The text is parsed with
//! [tree-sitter](https://tree-sitter.github.io/tree-sitter/) and the
//! `tree-sitter-java` grammar, converted into an arena tree where whitespace
//! and comments are ordinary nodes, and then edited in place by a set of
//! rules until the output stops changing.
//!
//! Two rules ship with the crate:
//!
//! - [`rules::LineBreaker`] keeps lines within a width limit, cuts long
//!   comments and string literals, and moves trailing comments above the
//!   statement they belong to;
//! - [`rules::WhitespaceRule`] fixes spacing between punctuation tokens.
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```rust
//! use refmt::diagnostics::CollectingReporter;
//! use refmt::formatter::{CodeFormatter, FormatOptions};
//!
//! let mut formatter = CodeFormatter::new(FormatOptions::default()).unwrap();
//! let mut reporter = CollectingReporter::new();
//! let formatted = formatter
//!     .reformat_with_defaults("Main.java", "class Main { int[] a = {1,2} ; }", &mut reporter)
//!     .unwrap();
//! assert_eq!(formatted, "class Main { int[] a = {1, 2}; }");
//! assert_eq!(reporter.corrections().len(), 2);
//! ```
//!
//! ### As a CLI Tool
//!
//! See the binary's `fmt` and `debug` subcommands.
//!
//! ## Modules
//!
//! - [`tree`] - Arena syntax tree and its edit operations
//! - [`parser`] - Tree-sitter integration and tree conversion
//! - [`formatter`] - Convergence loop and public API
//! - [`rules`] - Built-in formatting rules

pub mod context;
pub mod debug;
pub mod diagnostics;
pub mod error;
pub mod formatter;
pub mod kind;
pub mod language;
pub mod parser;
pub mod rule;
pub mod rules;
pub mod tree;

pub use error::{FormatError, Result, TreeError};
pub use formatter::{CodeFormatter, FormatOptions, Mode, format_source};
pub use language::SupportedLanguage;
