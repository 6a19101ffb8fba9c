//! Token adjacency rule: adds a space after punctuation that must not touch
//! the following token, and removes the space in front of semicolons.

use crate::context::PassContext;
use crate::error::{Result, TreeError};
use crate::kind::SyntaxKind;
use crate::rule::{PendingAction, Rule};
use crate::tree::{NodeId, SyntaxTree};

use SyntaxKind::{
    Comma, Dot, LBrace, LBracket, LParen, LiteralExpression, RBrace, RBracket, RParen, Semicolon,
    ThrowsClause,
};

/// Kinds that must be followed by a space, each with the followers that may
/// touch it directly.
const ADJACENCY: &[(SyntaxKind, &[SyntaxKind])] = &[
    (LBrace, &[LBrace, RBrace, LParen, LiteralExpression]),
    (RBrace, &[Semicolon, RParen, Comma, RBrace]),
    (
        RParen,
        &[Semicolon, RBrace, Comma, LParen, RParen, LBracket, RBracket, Dot, ThrowsClause],
    ),
    (ThrowsClause, &[Semicolon, LBrace]),
    (Semicolon, &[Semicolon, RParen]),
    (Comma, &[]),
];

fn allowed_followers(kind: SyntaxKind) -> Option<&'static [SyntaxKind]> {
    ADJACENCY
        .iter()
        .find(|(key, _)| *key == kind)
        .map(|(_, allowed)| *allowed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpaceAction {
    Insert { parent: NodeId, before: NodeId },
    RemoveBeforeSemicolon { whitespace: NodeId },
}

impl PendingAction for SpaceAction {
    fn describe(&self, tree: &SyntaxTree) -> (String, NodeId) {
        match *self {
            Self::Insert { before, .. } => {
                let first = tree.leftmost_path(before).last().unwrap_or(before);
                (format!("Add a space before `{}`", tree.text(first)), before)
            }
            Self::RemoveBeforeSemicolon { whitespace } => {
                ("Remove the space before `;`".to_owned(), whitespace)
            }
        }
    }

    fn apply(&self, ctx: &mut PassContext<'_>) -> Result<(), TreeError> {
        let tree = ctx.tree_mut();
        match *self {
            Self::Insert { parent, before } => {
                let space = tree.new_token(SyntaxKind::Whitespace, " ");
                tree.insert_before(parent, space, Some(before))
            }
            Self::RemoveBeforeSemicolon { whitespace } => tree.remove(whitespace),
        }
    }
}

/// Enforces the adjacency table and semicolon hugging.
#[derive(Debug, Default)]
pub struct WhitespaceRule {
    actions: Vec<SpaceAction>,
}

impl WhitespaceRule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Finds the node that should be preceded by a space because it directly
/// follows `node`, and the parent to insert the space into.
fn missing_space(
    tree: &SyntaxTree,
    node: NodeId,
    allowed: &[SyntaxKind],
) -> Option<(NodeId, NodeId)> {
    let mut now = node;
    while tree.next_sibling(now).is_none() {
        now = tree.parent(now)?;
    }
    let next = tree.next_sibling(now)?;
    let next_kind = tree.kind(next);
    if matches!(
        next_kind,
        SyntaxKind::Whitespace | SyntaxKind::FieldAccess | SyntaxKind::QualifiedName
    ) {
        return None;
    }
    if tree
        .leftmost_path(next)
        .any(|n| allowed.contains(&tree.kind(n)))
    {
        return None;
    }
    Some((tree.parent(now)?, next))
}

fn space_before_semicolon(tree: &SyntaxTree, semicolon: NodeId) -> Option<NodeId> {
    let prev = tree.prev_sibling(semicolon)?;
    if tree.kind(prev) != SyntaxKind::Whitespace {
        return None;
    }
    // A trailing comment may be bound inside the statement before it, so
    // look at the last leaf rather than the sibling itself.
    let keep = tree
        .prev_sibling(prev)
        .and_then(|before| tree.rightmost_path(before).last())
        .is_some_and(|leaf| {
            matches!(
                tree.kind(leaf),
                SyntaxKind::LineComment | SyntaxKind::Semicolon | SyntaxKind::LParen
            )
        });
    (!keep).then_some(prev)
}

impl Rule for WhitespaceRule {
    fn name(&self) -> &'static str {
        "whitespace"
    }

    fn before_visit(&mut self, _ctx: &mut PassContext<'_>) {
        self.actions.clear();
    }

    fn visit(&mut self, ctx: &PassContext<'_>, node: NodeId) {
        let tree = ctx.tree();
        let kind = tree.kind(node);
        if let Some(allowed) = allowed_followers(kind) {
            if let Some((parent, before)) = missing_space(tree, node, allowed) {
                self.actions.push(SpaceAction::Insert { parent, before });
            }
        }
        if kind == SyntaxKind::Semicolon {
            if let Some(whitespace) = space_before_semicolon(tree, node) {
                self.actions
                    .push(SpaceAction::RemoveBeforeSemicolon { whitespace });
            }
        }
    }

    fn after_visit(&mut self, ctx: &mut PassContext<'_>) -> Result<()> {
        for action in &self.actions {
            action.report(ctx);
        }
        for action in &self.actions {
            if let Err(e) = action.apply(ctx) {
                ctx.notify_text_change();
                action.report(ctx);
                return Err(e.into());
            }
        }
        if !self.actions.is_empty() {
            tracing::debug!(actions = self.actions.len(), "whitespace fixed");
            ctx.request_full_reparse();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingReporter;
    use crate::error::FormatError;
    use crate::rules::test_support::{parse, run_once};

    #[test]
    fn space_before_semicolon_is_removed() {
        let (text, corrections) =
            run_once("class A { void f() { foo() ; int x = 1 ; } }", WhitespaceRule::new());
        assert_eq!(text, "class A { void f() { foo(); int x = 1; } }");
        assert_eq!(corrections.len(), 2);
        assert!(corrections[0].message.contains("Remove"));
    }

    #[test]
    fn comma_gets_a_space() {
        let (text, _) = run_once("class A { int[] a = {1,2}; }", WhitespaceRule::new());
        assert_eq!(text, "class A { int[] a = {1, 2}; }");
    }

    #[test]
    fn closing_brace_is_separated_from_else() {
        let (text, corrections) = run_once(
            "class A { void f() { if (x) {}else {} } }",
            WhitespaceRule::new(),
        );
        assert_eq!(text, "class A { void f() { if (x) {} else {} } }");
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].message, "Add a space before `else`");
    }

    #[test]
    fn allowed_adjacent_braces_stay_unspaced() {
        let source = "class A { int[][] g = {{}, {}}; int[] h = {(1), 2}; }";
        let (text, corrections) = run_once(source, WhitespaceRule::new());
        assert_eq!(text, source);
        assert!(corrections.is_empty());
    }

    #[test]
    fn closing_paren_is_separated_from_body() {
        let (text, _) = run_once("class A { void f(){ } }", WhitespaceRule::new());
        assert_eq!(text, "class A { void f() { } }");
    }

    #[test]
    fn for_header_semicolons_are_left_alone() {
        let source = "class A { void f() { for (;;) {} } }";
        let (text, corrections) = run_once(source, WhitespaceRule::new());
        assert_eq!(text, source);
        assert!(corrections.is_empty());
    }

    #[test]
    fn semicolon_after_line_comment_keeps_its_line_break() {
        let source = "class A {\n    void f() {\n        foo() // note\n        ;\n    }\n}\n";
        let (text, _) = run_once(source, WhitespaceRule::new());
        assert_eq!(text, source);
    }

    #[test]
    fn empty_statement_after_bound_comment_stays_on_its_line() {
        let source = "class A {\n    int x = 1; // note\n    ;\n}\n";
        let (text, corrections) = run_once(source, WhitespaceRule::new());
        assert_eq!(text, source);
        assert!(corrections.is_empty());
    }

    #[test]
    fn stray_semicolon_after_statement_is_kept_apart() {
        let source = "class A { void f() { foo(); ; } }";
        let (text, _) = run_once(source, WhitespaceRule::new());
        assert_eq!(text, source);
    }

    #[test]
    fn detached_target_aborts_the_pass() {
        let tree = parse("class A { int x = 1 ; }");
        let whitespace = tree
            .preorder(tree.root())
            .find(|&n| {
                tree.kind(n) == SyntaxKind::Whitespace
                    && tree
                        .next_sibling(n)
                        .is_some_and(|s| tree.kind(s) == SyntaxKind::Semicolon)
            })
            .unwrap();

        let mut reporter = CollectingReporter::new();
        let mut ctx = PassContext::new(
            "A.java",
            tree,
            crate::language::SupportedLanguage::Java,
            1,
            1,
            &mut reporter,
        );
        let mut rule = WhitespaceRule::new();
        rule.actions = vec![
            SpaceAction::RemoveBeforeSemicolon { whitespace },
            SpaceAction::RemoveBeforeSemicolon { whitespace },
        ];
        let err = rule.after_visit(&mut ctx).unwrap_err();
        assert!(matches!(err, FormatError::Tree(TreeError::Detached(_))));
        assert!(ctx.text_changed());
        assert_eq!(ctx.corrections(), 3);
    }
}
