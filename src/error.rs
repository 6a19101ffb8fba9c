//! Error types for parsing, tree edits and formatting passes.

use thiserror::Error;

use crate::language::SupportedLanguage;
use crate::tree::NodeId;

/// Errors raised by structural edits on a [`SyntaxTree`](crate::tree::SyntaxTree).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The node is not attached to the tree any more.
    #[error("node {0} is detached from the tree")]
    Detached(NodeId),

    /// The anchor is not a child of the given parent.
    #[error("node {child} is not a child of node {parent}")]
    NotAChild {
        /// The expected parent.
        parent: NodeId,
        /// The node that was expected to be one of its children.
        child: NodeId,
    },

    /// The node being inserted already has a parent.
    #[error("node {0} is already attached")]
    AlreadyAttached(NodeId),

    /// Children can only be added to composite nodes.
    #[error("node {0} is a token and cannot have children")]
    NotComposite(NodeId),

    /// Inserting the node would make it its own ancestor.
    #[error("inserting node {0} would create a cycle")]
    WouldCycle(NodeId),
}

/// Errors from a `reformat` call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FormatError {
    /// The grammar could not be loaded into the parser.
    #[error("failed to initialise parser for {language}: {message}")]
    ParserInit {
        /// The language that failed to initialise.
        language: SupportedLanguage,
        /// Description of the failure.
        message: String,
    },

    /// The source could not be turned into a tree.
    #[error("failed to parse {language}: {message}")]
    Parse {
        /// The language that failed to parse.
        language: SupportedLanguage,
        /// Description of the failure.
        message: String,
    },

    /// A pending action found the tree in an inconsistent state.
    #[error("inconsistent tree during pass: {0}")]
    Tree(#[from] TreeError),
}

impl FormatError {
    /// Creates a parser initialisation error.
    #[must_use]
    pub fn parser_init(language: SupportedLanguage, message: impl Into<String>) -> Self {
        Self::ParserInit {
            language,
            message: message.into(),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(language: SupportedLanguage, message: impl Into<String>) -> Self {
        Self::Parse {
            language,
            message: message.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = FormatError> = std::result::Result<T, E>;
