//! Line-length rule.
//!
//! Lines longer than the configured limit are broken at a few well-known
//! places: parameter lists, boolean conditions of `if` statements, ternary
//! operators and member-access dots. Trailing comments move above their
//! statement, and comments or string literals that stay too long are cut in
//! two, recursively, until every piece fits.
//!
//! Dots are handled one traversal late. The first scan of a tree only notes
//! that a dot could be broken and asks for a rescan; the second scan sees
//! the lines as the other breaks left them and decides dot by dot.

use crate::context::PassContext;
use crate::error::{Result, TreeError};
use crate::formatter::FormatOptions;
use crate::kind::SyntaxKind;
use crate::rule::{PendingAction, Rule};
use crate::tree::{NodeId, SyntaxTree};

/// One physical line of the tree text.
#[derive(Debug, Clone)]
struct Line {
    start: usize,
    end: usize,
    exceeds: bool,
}

/// Physical lines of one tree snapshot.
#[derive(Debug, Default)]
struct LineTable {
    text: String,
    lines: Vec<Line>,
}

impl LineTable {
    fn build(text: String, max_line_length: usize) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        for segment in text.split('\n') {
            let end = start + segment.len();
            lines.push(Line {
                start,
                end,
                exceeds: segment.chars().count() > max_line_length,
            });
            start = end + 1;
        }
        Self { text, lines }
    }

    fn line_at(&self, offset: usize) -> Option<&Line> {
        let index = self
            .lines
            .partition_point(|line| line.start <= offset)
            .checked_sub(1)?;
        self.lines.get(index)
    }

    fn exceeds_at(&self, offset: usize) -> bool {
        self.line_at(offset).is_some_and(|line| line.exceeds)
    }

    fn line_text(&self, line: &Line) -> &str {
        self.text.get(line.start..line.end).unwrap_or_default()
    }

    /// Leading whitespace of the line containing `offset`.
    fn indent_at(&self, offset: usize) -> String {
        self.line_at(offset)
            .map(|line| {
                self.line_text(line)
                    .chars()
                    .take_while(|c| *c == ' ' || *c == '\t')
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Text of the line containing `offset` up to it.
    fn prefix_at(&self, offset: usize) -> &str {
        self.line_at(offset)
            .and_then(|line| self.text.get(line.start..offset))
            .unwrap_or_default()
    }
}

/// Where a line break goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakAt {
    Replace(NodeId),
    InsertBefore { parent: NodeId, anchor: NodeId },
}

#[derive(Debug, Clone)]
enum LineBreakAction {
    Break {
        at: BreakAt,
        anchor: NodeId,
        text: String,
    },
    MoveCommentToStart {
        comment: NodeId,
        owner: NodeId,
        text: String,
    },
    CutComment {
        comment: NodeId,
        indent: String,
        limit: usize,
    },
    CutString {
        literal: NodeId,
        token: NodeId,
        separator: String,
        limit: usize,
    },
}

impl PendingAction for LineBreakAction {
    fn describe(&self, tree: &SyntaxTree) -> (String, NodeId) {
        match self {
            Self::Break { anchor, .. } => ("Add a line break.".to_owned(), *anchor),
            Self::MoveCommentToStart { comment, .. } => {
                ("Move comment to the start.".to_owned(), *comment)
            }
            Self::CutComment { comment, .. } => (
                format!("Cut the too long comment: {}.", tree.text(*comment)),
                *comment,
            ),
            Self::CutString { token, .. } => (
                format!("Cut the too long String literal: {}.", tree.text(*token)),
                *token,
            ),
        }
    }

    fn apply(&self, ctx: &mut PassContext<'_>) -> Result<(), TreeError> {
        match self {
            Self::Break { at, text, .. } => apply_break(ctx.tree_mut(), *at, text),
            Self::MoveCommentToStart {
                comment,
                owner,
                text,
            } => move_comment(ctx.tree_mut(), *comment, *owner, text),
            Self::CutComment {
                comment,
                indent,
                limit,
            } => {
                if cut_comment(ctx.tree_mut(), *comment, indent, *limit)? {
                    ctx.notify_text_change();
                }
                Ok(())
            }
            Self::CutString {
                literal,
                token,
                separator,
                limit,
            } => {
                cut_string(ctx.tree_mut(), *literal, *token, separator, *limit)?;
                ctx.notify_text_change();
                Ok(())
            }
        }
    }
}

fn apply_break(tree: &mut SyntaxTree, at: BreakAt, text: &str) -> Result<(), TreeError> {
    let line_break = tree.new_token(SyntaxKind::Whitespace, text);
    match at {
        BreakAt::Replace(whitespace) => tree.replace(whitespace, line_break),
        BreakAt::InsertBefore { parent, anchor } => {
            tree.insert_before(parent, line_break, Some(anchor))
        }
    }
}

fn move_comment(
    tree: &mut SyntaxTree,
    comment: NodeId,
    owner: NodeId,
    text: &str,
) -> Result<(), TreeError> {
    if let Some(before) = tree.prev_sibling(comment) {
        if tree.kind(before) == SyntaxKind::Whitespace {
            tree.remove(before)?;
        }
    }
    tree.remove(comment)?;
    let first = tree.first_child(owner);
    tree.insert_before(owner, comment, first)?;
    let line_break = tree.new_token(SyntaxKind::Whitespace, text);
    tree.insert_before(owner, line_break, first)
}

/// Splits a comment into pieces that each fit with `separator_len` more
/// characters in front of them. Every piece keeps the `//` marker.
fn split_comment(text: &str, limit: usize, separator_len: usize, out: &mut Vec<String>) {
    let chars = text.chars().count();
    // Below six characters the re-marked tail would not shrink.
    if chars < 6 || chars + separator_len < limit {
        out.push(text.to_owned());
        return;
    }
    let mid = text
        .char_indices()
        .nth(chars / 2)
        .map_or(text.len(), |(i, _)| i);
    let (head, tail) = text.split_at(mid);
    split_comment(head, limit, separator_len, out);
    let tail = if tail.starts_with("//") {
        tail.to_owned()
    } else {
        format!("//{tail}")
    };
    split_comment(&tail, limit, separator_len, out);
}

/// Returns whether the comment was actually cut.
fn cut_comment(
    tree: &mut SyntaxTree,
    comment: NodeId,
    fallback_indent: &str,
    limit: usize,
) -> Result<bool, TreeError> {
    let parent = tree.parent(comment).ok_or(TreeError::Detached(comment))?;
    let indent = tree
        .prev_sibling(comment)
        .filter(|&prev| tree.kind(prev) == SyntaxKind::Whitespace)
        .and_then(|prev| {
            let text = tree.token_text(prev)?;
            text.rfind('\n').map(|i| text[i + 1..].to_owned())
        })
        .unwrap_or_else(|| fallback_indent.to_owned());
    let text = tree.text(comment);
    if text.chars().count() + indent.chars().count() < limit {
        return Ok(false);
    }

    let separator = format!("\n{indent}");
    let mut pieces = Vec::new();
    split_comment(&text, limit, separator.chars().count(), &mut pieces);
    for (i, piece) in pieces.into_iter().enumerate() {
        if i > 0 {
            let line_break = tree.new_token(SyntaxKind::Whitespace, separator.as_str());
            tree.insert_before(parent, line_break, Some(comment))?;
        }
        let part = tree.new_token_of(SyntaxKind::LineComment, "line_comment", piece);
        tree.insert_before(parent, part, Some(comment))?;
    }
    tree.remove(comment)?;
    Ok(true)
}

/// Splits string literal content into units that must stay together:
/// single characters and whole escape sequences.
fn string_atoms(content: &str) -> Vec<&str> {
    let mut atoms = Vec::new();
    let mut chars = content.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some((_, 'u')) => {
                    while chars.next_if(|&(_, c)| c == 'u').is_some() {}
                    for _ in 0..4 {
                        if chars.next_if(|&(_, c)| c.is_ascii_hexdigit()).is_none() {
                            break;
                        }
                    }
                }
                Some((_, digit @ '0'..='7')) => {
                    let more = if digit <= '3' { 2 } else { 1 };
                    for _ in 0..more {
                        if chars.next_if(|&(_, c)| matches!(c, '0'..='7')).is_none() {
                            break;
                        }
                    }
                }
                _ => {}
            }
        }
        let end = chars.peek().map_or(content.len(), |&(i, _)| i);
        atoms.push(&content[start..end]);
    }
    atoms
}

/// Halves `atoms` until every quoted piece is at most `limit` characters.
fn split_string(atoms: &[&str], limit: usize, out: &mut Vec<String>) {
    let quoted: usize = atoms.iter().map(|a| a.chars().count()).sum::<usize>() + 2;
    if atoms.len() < 2 || quoted <= limit {
        out.push(format!("\"{}\"", atoms.concat()));
        return;
    }
    let (head, tail) = atoms.split_at(atoms.len() / 2);
    split_string(head, limit, out);
    split_string(tail, limit, out);
}

fn cut_string(
    tree: &mut SyntaxTree,
    literal: NodeId,
    token: NodeId,
    separator: &str,
    limit: usize,
) -> Result<(), TreeError> {
    let parent = tree.parent(literal).ok_or(TreeError::Detached(literal))?;
    let text = tree.text(token);
    let content = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(&text);
    let mut pieces = Vec::new();
    split_string(&string_atoms(content), limit, &mut pieces);

    let mut nodes = Vec::new();
    for (i, piece) in pieces.into_iter().enumerate() {
        if i > 0 {
            nodes.push(tree.new_token(SyntaxKind::Whitespace, " "));
            nodes.push(tree.new_token_of(SyntaxKind::Plus, "+", "+"));
            nodes.push(tree.new_token(SyntaxKind::Whitespace, separator));
        }
        let wrapper = tree.new_node_of(SyntaxKind::LiteralExpression, "literal");
        let part = tree.new_token_of(SyntaxKind::StringLiteral, "string_literal", piece);
        tree.append_child(wrapper, part)?;
        nodes.push(wrapper);
    }

    let joins_concatenation = tree.kind(parent) == SyntaxKind::BinaryExpression
        && tree
            .children(parent)
            .iter()
            .any(|&c| tree.kind(c) == SyntaxKind::Plus);
    if joins_concatenation {
        for node in nodes {
            tree.insert_before(parent, node, Some(literal))?;
        }
        tree.remove(literal)
    } else {
        let binary = tree.new_node_of(SyntaxKind::BinaryExpression, "binary_expression");
        for node in nodes {
            tree.append_child(binary, node)?;
        }
        tree.replace(literal, binary)
    }
}

/// Keeps lines within `max_line_length`.
#[derive(Debug)]
pub struct LineBreaker {
    max_line_length: usize,
    max_string_length: usize,
    max_parameters: usize,
    indent_unit: String,
    lines: LineTable,
    actions: Vec<LineBreakAction>,
    deferred_dot: bool,
}

impl LineBreaker {
    #[must_use]
    pub fn new(options: &FormatOptions) -> Self {
        Self {
            max_line_length: options.max_line_length,
            max_string_length: options.max_string_length,
            max_parameters: options.max_parameters,
            indent_unit: " ".repeat(options.indent_width),
            lines: LineTable::default(),
            actions: Vec::new(),
            deferred_dot: false,
        }
    }

    fn continuation(&self, offset: usize, levels: usize) -> String {
        format!(
            "\n{}{}",
            self.lines.indent_at(offset),
            self.indent_unit.repeat(levels)
        )
    }

    /// Queues a break in front of `target` unless an equal one is there
    /// already.
    fn push_break(&mut self, tree: &SyntaxTree, target: NodeId, text: String) {
        let at = if tree.kind(target) == SyntaxKind::Whitespace {
            BreakAt::Replace(target)
        } else if let Some(prev) = tree
            .prev_sibling(target)
            .filter(|&p| tree.kind(p) == SyntaxKind::Whitespace)
        {
            BreakAt::Replace(prev)
        } else if let Some(parent) = tree.parent(target) {
            BreakAt::InsertBefore {
                parent,
                anchor: target,
            }
        } else {
            return;
        };
        if let BreakAt::Replace(whitespace) = at {
            if tree.token_text(whitespace) == Some(text.as_str()) {
                return;
            }
        }
        let queued = self
            .actions
            .iter()
            .any(|a| matches!(a, LineBreakAction::Break { at: other, .. } if *other == at));
        if !queued {
            self.actions.push(LineBreakAction::Break {
                at,
                anchor: target,
                text,
            });
        }
    }

    fn parameter_list(&mut self, tree: &SyntaxTree, list: NodeId) {
        let children = tree.children(list);
        let parameters = children
            .iter()
            .filter(|&&c| tree.kind(c) == SyntaxKind::Parameter)
            .count();
        let offset = tree.offset(list);
        if parameters == 0
            || (parameters <= self.max_parameters && !self.lines.exceeds_at(offset))
        {
            return;
        }
        let inner = self.continuation(offset, 1);
        let outer = self.continuation(offset, 0);
        let mut targets = Vec::new();
        for (i, &child) in children.iter().enumerate() {
            match tree.kind(child) {
                SyntaxKind::LParen | SyntaxKind::Comma => {
                    if let Some(&next) = children.get(i + 1) {
                        targets.push((next, inner.clone()));
                    }
                }
                SyntaxKind::RParen => targets.push((child, outer.clone())),
                _ => {}
            }
        }
        for (target, text) in targets {
            self.push_break(tree, target, text);
        }
    }

    fn line_comment(&mut self, tree: &SyntaxTree, comment: NodeId) {
        let offset = tree.offset(comment);
        if !self.lines.exceeds_at(offset) {
            return;
        }
        let indent = self.lines.indent_at(offset);
        let owner = tree.parent(comment).filter(|&p| {
            matches!(
                tree.kind(p),
                SyntaxKind::Field | SyntaxKind::LocalDeclaration | SyntaxKind::ExpressionStatement
            )
        });
        let mut comment_indent = indent.clone();
        match owner {
            Some(owner) if tree.first_child(owner) != Some(comment) => {
                let owner_offset = tree.offset(owner);
                comment_indent = self.lines.indent_at(owner_offset);
                self.actions.push(LineBreakAction::MoveCommentToStart {
                    comment,
                    owner,
                    text: format!("\n{comment_indent}"),
                });
            }
            Some(_) => {}
            None => {
                let starts_line = self.lines.prefix_at(offset).trim().is_empty();
                if !starts_line {
                    self.push_break(tree, comment, format!("\n{indent}"));
                }
            }
        }
        let length = tree.char_len(comment);
        if length + comment_indent.chars().count() >= self.max_line_length {
            self.actions.push(LineBreakAction::CutComment {
                comment,
                indent: comment_indent,
                limit: self.max_line_length,
            });
        }
    }

    fn if_condition(&mut self, tree: &SyntaxTree, statement: NodeId) {
        let offset = tree.offset(statement);
        if !self.lines.exceeds_at(offset) {
            return;
        }
        let condition = tree
            .child_of_kind(statement, SyntaxKind::ParenthesizedExpression)
            .and_then(|paren| tree.child_of_kind(paren, SyntaxKind::BinaryExpression))
            .or_else(|| tree.child_of_kind(statement, SyntaxKind::BinaryExpression));
        let Some(condition) = condition else {
            return;
        };
        let text = self.continuation(offset, 2);
        for operator in [
            SyntaxKind::OrOr,
            SyntaxKind::AndAnd,
            SyntaxKind::BitOr,
            SyntaxKind::BitAnd,
        ] {
            if let Some(target) = tree.child_of_kind(condition, operator) {
                self.push_break(tree, target, text.clone());
            }
        }
    }

    fn ternary_operator(&mut self, tree: &SyntaxTree, operator: NodeId, ternary: NodeId) {
        let offset = tree.offset(operator);
        if self.lines.exceeds_at(offset) {
            // Indent from where the expression starts, which its own breaks
            // never move.
            let text = self.continuation(tree.offset(ternary), 2);
            self.push_break(tree, operator, text);
        }
    }

    fn dot(&mut self, ctx: &PassContext<'_>, dot: NodeId) {
        let tree = ctx.tree();
        let offset = tree.offset(dot);
        if !self.lines.exceeds_at(offset) {
            return;
        }
        if ctx.scan() < 2 {
            self.deferred_dot = true;
            return;
        }
        let prefix = self.lines.prefix_at(offset);
        // A dot that already starts its line stays put, however long the
        // segment: breaking it again would only push it deeper.
        if prefix.trim().is_empty() {
            return;
        }
        let column = prefix.chars().count();
        let mut projected = column;
        let mut next = tree.next_sibling(dot);
        if let Some(name) = next.filter(|&n| tree.kind(n) == SyntaxKind::Identifier) {
            projected += tree.char_len(name);
            next = tree.next_sibling(name);
        }
        if let Some(args) = next.filter(|&n| tree.kind(n) == SyntaxKind::ArgumentList) {
            projected += tree.char_len(args);
        }
        if !prefix.contains('.') && projected < self.max_line_length {
            return;
        }
        let text = self.continuation(offset, 2);
        self.push_break(tree, dot, text);
    }

    fn string_literal(&mut self, tree: &SyntaxTree, token: NodeId) {
        let Some(text) = tree.token_text(token) else {
            return;
        };
        if text.starts_with("\"\"\"") || text.chars().count() <= self.max_string_length {
            return;
        }
        let Some(literal) = tree
            .parent(token)
            .filter(|&p| tree.kind(p) == SyntaxKind::LiteralExpression)
        else {
            return;
        };
        let is_receiver = tree.parent(literal).is_some_and(|p| {
            matches!(
                tree.kind(p),
                SyntaxKind::MethodInvocation | SyntaxKind::FieldAccess
            ) && tree.first_child(p) == Some(literal)
        });
        if is_receiver {
            return;
        }
        let separator = self.continuation(tree.offset(token), 1);
        self.actions.push(LineBreakAction::CutString {
            literal,
            token,
            separator,
            limit: self.max_string_length,
        });
    }
}

impl Rule for LineBreaker {
    fn name(&self) -> &'static str {
        "line-breaker"
    }

    fn before_visit(&mut self, ctx: &mut PassContext<'_>) {
        self.actions.clear();
        self.deferred_dot = false;
        let tree = ctx.tree();
        self.lines = LineTable::build(tree.text(tree.root()), self.max_line_length);
    }

    fn visit(&mut self, ctx: &PassContext<'_>, node: NodeId) {
        let tree = ctx.tree();
        match tree.kind(node) {
            SyntaxKind::ParameterList => self.parameter_list(tree, node),
            SyntaxKind::LineComment => self.line_comment(tree, node),
            SyntaxKind::IfStatement => self.if_condition(tree, node),
            SyntaxKind::Question | SyntaxKind::Colon => {
                if let Some(ternary) = tree
                    .parent(node)
                    .filter(|&p| tree.kind(p) == SyntaxKind::TernaryExpression)
                {
                    self.ternary_operator(tree, node, ternary);
                }
            }
            SyntaxKind::Dot
                if tree.parent(node).is_some_and(|p| {
                    matches!(
                        tree.kind(p),
                        SyntaxKind::MethodInvocation | SyntaxKind::FieldAccess
                    )
                }) =>
            {
                self.dot(ctx, node);
            }
            SyntaxKind::StringLiteral => self.string_literal(tree, node),
            _ => {}
        }
    }

    fn after_visit(&mut self, ctx: &mut PassContext<'_>) -> Result<()> {
        for action in &self.actions {
            action.report(ctx);
        }
        for action in &self.actions {
            action.apply(ctx)?;
        }
        if !self.actions.is_empty() {
            ctx.notify_text_change();
        }
        if ctx.scan() == 1 && (ctx.corrections() > 0 || self.deferred_dot) {
            ctx.request_rescan();
        } else if !self.actions.is_empty() {
            ctx.request_full_reparse();
        }
        tracing::debug!(
            actions = self.actions.len(),
            deferred_dot = self.deferred_dot,
            "line breaker pass done"
        );
        Ok(())
    }
}
