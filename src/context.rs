//! Per-pass state shared by the rules.

use once_cell::unsync::OnceCell;

use crate::diagnostics::{CodeFragment, Reporter};
use crate::language::SupportedLanguage;
use crate::tree::{NodeId, SyntaxTree};

/// 1-based line and character column of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// Line starts of the tree text, used to turn offsets into locations.
#[derive(Debug)]
struct LineIndex {
    text: String,
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: String) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset).max(1) - 1
    }

    fn line_text(&self, line: usize) -> &str {
        let start = self.starts[line];
        let end = self
            .starts
            .get(line + 1)
            .map_or(self.text.len(), |&next| next - 1);
        &self.text[start..end]
    }

    fn locate(&self, offset: usize) -> Location {
        let line = self.line_of(offset);
        let start = self.starts[line];
        let column = self
            .text
            .get(start..offset)
            .map_or(0, |prefix| prefix.chars().count());
        Location {
            line: line + 1,
            column: column + 1,
        }
    }
}

/// State of one rule-set execution over one tree snapshot.
///
/// A context owns the tree for the duration of the pass. Rules read it through
/// [`tree`](Self::tree) while visiting and edit it through
/// [`tree_mut`](Self::tree_mut) only from `after_visit`.
pub struct PassContext<'r> {
    file_name: &'r str,
    tree: SyntaxTree,
    language: SupportedLanguage,
    iteration: usize,
    scan: usize,
    corrections: usize,
    full_reparse: bool,
    rescan: bool,
    text_changed: bool,
    reporter: &'r mut dyn Reporter,
    lines: OnceCell<LineIndex>,
}

impl<'r> PassContext<'r> {
    /// `iteration` counts outer passes from 1; `scan` counts traversals of
    /// this particular tree, starting at 1 right after a parse.
    pub fn new(
        file_name: &'r str,
        tree: SyntaxTree,
        language: SupportedLanguage,
        iteration: usize,
        scan: usize,
        reporter: &'r mut dyn Reporter,
    ) -> Self {
        Self {
            file_name,
            tree,
            language,
            iteration,
            scan,
            corrections: 0,
            full_reparse: false,
            rescan: false,
            text_changed: false,
            reporter,
            lines: OnceCell::new(),
        }
    }

    #[must_use]
    pub const fn file_name(&self) -> &str {
        self.file_name
    }

    #[must_use]
    pub const fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut SyntaxTree {
        &mut self.tree
    }

    #[must_use]
    pub fn into_tree(self) -> SyntaxTree {
        self.tree
    }

    #[must_use]
    pub const fn language(&self) -> SupportedLanguage {
        self.language
    }

    #[must_use]
    pub const fn iteration(&self) -> usize {
        self.iteration
    }

    /// How many times the current tree has been traversed, this pass included.
    #[must_use]
    pub const fn scan(&self) -> usize {
        self.scan
    }

    /// Corrections reported so far in this pass.
    #[must_use]
    pub const fn corrections(&self) -> usize {
        self.corrections
    }

    /// Ask for another pass over a freshly parsed tree.
    pub fn request_full_reparse(&mut self) {
        self.full_reparse = true;
    }

    /// Ask for another traversal of the same tree, without reparsing.
    pub fn request_rescan(&mut self) {
        self.rescan = true;
    }

    #[must_use]
    pub const fn full_reparse_requested(&self) -> bool {
        self.full_reparse
    }

    #[must_use]
    pub const fn rescan_requested(&self) -> bool {
        self.rescan
    }

    /// Drops offset-derived caches after the tree text changed.
    pub fn notify_text_change(&mut self) {
        self.text_changed = true;
        self.lines.take();
    }

    #[must_use]
    pub const fn text_changed(&self) -> bool {
        self.text_changed
    }

    fn lines(&self) -> &LineIndex {
        self.lines
            .get_or_init(|| LineIndex::new(self.tree.text(self.tree.root())))
    }

    #[must_use]
    pub fn location(&self, node: NodeId) -> Location {
        self.lines().locate(self.tree.offset(node))
    }

    #[must_use]
    pub fn fragment(&self, node: NodeId) -> CodeFragment {
        let lines = self.lines();
        let location = lines.locate(self.tree.offset(node));
        CodeFragment {
            line: location.line,
            column: location.column,
            length: self.tree.char_len(node),
            excerpt: lines.line_text(location.line - 1).to_owned(),
        }
    }

    /// Sends one correction about `node` to the diagnostics sink.
    pub fn report(&mut self, message: &str, node: NodeId) {
        let fragment = self.fragment(node);
        tracing::trace!(
            line = fragment.line,
            column = fragment.column,
            "correction: {message}"
        );
        self.reporter.report(self.file_name, message, &fragment);
        self.corrections += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingReporter;
    use crate::kind::SyntaxKind;

    fn two_line_tree() -> (SyntaxTree, NodeId) {
        let mut tree = SyntaxTree::new(SyntaxKind::Program, "program");
        let root = tree.root();
        let mut last = root;
        for (kind, text) in [
            (SyntaxKind::Identifier, "alpha"),
            (SyntaxKind::Whitespace, "\n  "),
            (SyntaxKind::Identifier, "héllo"),
            (SyntaxKind::Semicolon, ";"),
        ] {
            last = tree.new_token(kind, text);
            tree.append_child(root, last).unwrap();
        }
        (tree, last)
    }

    #[test]
    fn locations_are_one_based_character_columns() {
        let (tree, semicolon) = two_line_tree();
        let mut reporter = CollectingReporter::new();
        let ctx = PassContext::new(
            "A.java",
            tree,
            SupportedLanguage::Java,
            1,
            1,
            &mut reporter,
        );
        assert_eq!(ctx.location(semicolon), Location { line: 2, column: 8 });
        let first = ctx.tree().first_child(ctx.tree().root()).unwrap();
        assert_eq!(ctx.location(first), Location { line: 1, column: 1 });
    }

    #[test]
    fn report_counts_and_forwards_fragment() {
        let (tree, semicolon) = two_line_tree();
        let mut reporter = CollectingReporter::new();
        {
            let mut ctx = PassContext::new(
                "A.java",
                tree,
                SupportedLanguage::Java,
                1,
                1,
                &mut reporter,
            );
            ctx.report("Remove something", semicolon);
            assert_eq!(ctx.corrections(), 1);
        }
        let correction = &reporter.corrections()[0];
        assert_eq!(correction.file_name, "A.java");
        assert_eq!(correction.fragment.excerpt, "  héllo;");
        assert_eq!(correction.fragment.length, 1);
    }

    #[test]
    fn text_change_rebuilds_line_index() {
        let (tree, semicolon) = two_line_tree();
        let mut reporter = CollectingReporter::new();
        let mut ctx = PassContext::new(
            "A.java",
            tree,
            SupportedLanguage::Java,
            1,
            1,
            &mut reporter,
        );
        assert_eq!(ctx.location(semicolon).line, 2);

        let root = ctx.tree().root();
        let first = ctx.tree().first_child(root).unwrap();
        let extra = ctx.tree_mut().new_token(SyntaxKind::Whitespace, "\n");
        ctx.tree_mut().insert_before(root, extra, Some(first)).unwrap();
        ctx.notify_text_change();

        assert!(ctx.text_changed());
        assert_eq!(ctx.location(semicolon), Location { line: 3, column: 8 });
    }
}
