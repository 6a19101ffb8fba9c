//! Grammar adapter: parses source text with tree-sitter and converts the
//! result into a [`SyntaxTree`].
//!
//! The conversion is lossless. Every byte between two grammar nodes becomes a
//! whitespace token, so the text of the converted tree is exactly the parsed
//! source. A few shapes are normalised on the way so that the rules can match
//! on them directly:
//!
//! - string, character and comment nodes are single tokens;
//! - literal tokens are wrapped in a `LiteralExpression`;
//! - `a || b || c` is one `BinaryExpression` with two operator children;
//! - a line comment trailing a field, local declaration or expression
//!   statement on the same line becomes the last child of that statement.
//!
//! # Example
//!
//! ```rust
//! use refmt::language::SupportedLanguage;
//! use refmt::parser::GrammarAdapter;
//!
//! let mut grammar = GrammarAdapter::init().unwrap();
//! let tree = grammar
//!     .parse(SupportedLanguage::Java, "class A { int x; }")
//!     .unwrap();
//! assert_eq!(tree.text(tree.root()), "class A { int x; }");
//! ```

use once_cell::sync::Lazy;
use tree_sitter::{Language, Node, Parser};

use crate::error::{FormatError, Result, TreeError};
use crate::kind::SyntaxKind;
use crate::language::SupportedLanguage;
use crate::tree::{NodeId, SyntaxTree};

/// The Java grammar, loaded once per process.
pub static JAVA_LANGUAGE: Lazy<Language> = Lazy::new(|| tree_sitter_java::LANGUAGE.into());

/// Grammar nodes kept as one token even when the grammar gives them children.
const ATOMIC_KINDS: &[&str] = &[
    "string_literal",
    "text_block",
    "character_literal",
    "line_comment",
    "block_comment",
];

const LITERAL_KINDS: &[&str] = &[
    "string_literal",
    "text_block",
    "character_literal",
    "decimal_integer_literal",
    "hex_integer_literal",
    "octal_integer_literal",
    "binary_integer_literal",
    "decimal_floating_point_literal",
    "hex_floating_point_literal",
    "true",
    "false",
    "null_literal",
];

/// Owns one tree-sitter parser per supported language.
///
/// Parsers are not shareable between threads; create one adapter per thread
/// and hand it to the formatter.
pub struct GrammarAdapter {
    java: Parser,
}

impl GrammarAdapter {
    /// Creates the parsers and loads their grammars.
    pub fn init() -> Result<Self> {
        let mut java = Parser::new();
        java.set_language(&JAVA_LANGUAGE)
            .map_err(|e| FormatError::parser_init(SupportedLanguage::Java, e.to_string()))?;
        tracing::debug!("grammar adapter initialised");
        Ok(Self { java })
    }

    /// Parses `source` into a fresh tree.
    ///
    /// Fails if the grammar reports any syntax error; the formatter does not
    /// touch files it cannot parse cleanly.
    pub fn parse(&mut self, language: SupportedLanguage, source: &str) -> Result<SyntaxTree> {
        let parser = match language {
            SupportedLanguage::Java => &mut self.java,
        };
        let parsed = parser
            .parse(source, None)
            .ok_or_else(|| FormatError::parse(language, "parser produced no tree"))?;
        let root = parsed.root_node();
        if root.has_error() {
            let line = first_error(root).map_or(1, |n| n.start_position().row + 1);
            return Err(FormatError::parse(
                language,
                format!("syntax error at line {line}"),
            ));
        }
        let tree = TreeBuilder::new(source, root.kind()).build(root)?;
        Ok(tree)
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .filter(|child| child.has_error())
        .find_map(first_error);
    found
}

fn composite_kind(grammar_kind: &str) -> SyntaxKind {
    match grammar_kind {
        "program" => SyntaxKind::Program,
        "formal_parameters" => SyntaxKind::ParameterList,
        "argument_list" => SyntaxKind::ArgumentList,
        "formal_parameter" | "spread_parameter" | "receiver_parameter" => SyntaxKind::Parameter,
        "field_declaration" | "constant_declaration" => SyntaxKind::Field,
        "local_variable_declaration" => SyntaxKind::LocalDeclaration,
        "expression_statement" => SyntaxKind::ExpressionStatement,
        "if_statement" => SyntaxKind::IfStatement,
        "parenthesized_expression" => SyntaxKind::ParenthesizedExpression,
        "binary_expression" => SyntaxKind::BinaryExpression,
        "ternary_expression" => SyntaxKind::TernaryExpression,
        "method_invocation" => SyntaxKind::MethodInvocation,
        "field_access" => SyntaxKind::FieldAccess,
        "scoped_identifier" => SyntaxKind::QualifiedName,
        "throws" => SyntaxKind::ThrowsClause,
        "block" => SyntaxKind::Block,
        _ => SyntaxKind::Node,
    }
}

fn token_kind(grammar_kind: &str) -> SyntaxKind {
    match grammar_kind {
        "line_comment" => SyntaxKind::LineComment,
        "block_comment" => SyntaxKind::BlockComment,
        "identifier" | "type_identifier" => SyntaxKind::Identifier,
        "string_literal" | "text_block" => SyntaxKind::StringLiteral,
        other => SyntaxKind::from_token_text(other),
    }
}

fn binary_operator(node: Node<'_>) -> Option<&'static str> {
    (node.kind() == "binary_expression")
        .then(|| node.child_by_field_name("operator"))
        .flatten()
        .map(|op| op.kind())
}

/// Statements that take ownership of a comment trailing them on their line.
fn binds_trailing_comment(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::Field | SyntaxKind::LocalDeclaration | SyntaxKind::ExpressionStatement
    )
}

struct TreeBuilder<'s> {
    source: &'s str,
    tree: SyntaxTree,
}

impl<'s> TreeBuilder<'s> {
    fn new(source: &'s str, root_kind: &'static str) -> Self {
        Self {
            source,
            tree: SyntaxTree::new(SyntaxKind::Program, root_kind),
        }
    }

    fn build(mut self, root: Node<'_>) -> Result<SyntaxTree, TreeError> {
        let id = self.tree.root();
        let end = self.source.len();
        self.fill_children(id, root, 0, end)?;
        Ok(self.tree)
    }

    fn slice(&self, start: usize, end: usize) -> &'s str {
        self.source.get(start..end).unwrap_or_default()
    }

    fn push_gap(&mut self, parent: NodeId, start: usize, end: usize) -> Result<(), TreeError> {
        let text = self.slice(start, end);
        let kind = if text.chars().all(char::is_whitespace) {
            SyntaxKind::Whitespace
        } else {
            SyntaxKind::Token
        };
        let gap = self.tree.new_token(kind, text);
        self.tree.append_child(parent, gap)
    }

    fn fill_children(
        &mut self,
        parent: NodeId,
        node: Node<'_>,
        start: usize,
        end: usize,
    ) -> Result<(), TreeError> {
        let mut position = start;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.start_byte() > position {
                self.push_gap(parent, position, child.start_byte())?;
            }
            let id = self.build_node(child)?;
            self.tree.append_child(parent, id)?;
            position = position.max(child.end_byte());
        }
        if end > position {
            self.push_gap(parent, position, end)?;
        }
        Ok(())
    }

    fn build_node(&mut self, node: Node<'_>) -> Result<NodeId, TreeError> {
        let grammar_kind = node.kind();
        if node.child_count() == 0 || ATOMIC_KINDS.contains(&grammar_kind) {
            let text = self.slice(node.start_byte(), node.end_byte());
            let token = self
                .tree
                .new_token_of(token_kind(grammar_kind), grammar_kind, text);
            if LITERAL_KINDS.contains(&grammar_kind) {
                let literal = self
                    .tree
                    .new_node_of(SyntaxKind::LiteralExpression, "literal");
                self.tree.append_child(literal, token)?;
                return Ok(literal);
            }
            return Ok(token);
        }

        let id = self
            .tree
            .new_node_of(composite_kind(grammar_kind), grammar_kind);
        self.fill_children(id, node, node.start_byte(), node.end_byte())?;

        let left = node.child_by_field_name("left");
        if let (Some(op), Some(left_op)) = (binary_operator(node), left.and_then(binary_operator))
        {
            if op == left_op {
                self.flatten_first_child(id)?;
            }
        }
        self.bind_trailing_comments(id)?;
        Ok(id)
    }

    /// Splices the children of `id`'s first child into `id` in its place.
    fn flatten_first_child(&mut self, id: NodeId) -> Result<(), TreeError> {
        let Some(inner) = self.tree.first_child(id) else {
            return Ok(());
        };
        let children = self.tree.children(inner).to_vec();
        self.tree.remove(inner)?;
        let anchor = self.tree.first_child(id);
        for child in children {
            self.tree.remove(child)?;
            self.tree.insert_before(id, child, anchor)?;
        }
        Ok(())
    }

    fn bind_trailing_comments(&mut self, id: NodeId) -> Result<(), TreeError> {
        let mut index = 0;
        while index < self.tree.children(id).len() {
            let children = self.tree.children(id);
            let child = children[index];
            if self.tree.kind(child) != SyntaxKind::LineComment || index == 0 {
                index += 1;
                continue;
            }
            let before = children[index - 1];
            let same_line_space = self.tree.kind(before) == SyntaxKind::Whitespace
                && !self.tree.text(before).contains('\n');
            let owner_index = if same_line_space { index.checked_sub(2) } else { Some(index - 1) };
            let owner = owner_index
                .map(|i| children[i])
                .filter(|&owner| binds_trailing_comment(self.tree.kind(owner)));
            let Some(owner) = owner else {
                index += 1;
                continue;
            };
            if same_line_space {
                self.tree.remove(before)?;
                self.tree.append_child(owner, before)?;
            }
            self.tree.remove(child)?;
            self.tree.append_child(owner, child)?;
            index = owner_index.map_or(index, |i| i + 1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SyntaxTree {
        GrammarAdapter::init()
            .unwrap()
            .parse(SupportedLanguage::Java, source)
            .unwrap()
    }

    fn find(tree: &SyntaxTree, kind: SyntaxKind) -> NodeId {
        tree.preorder(tree.root())
            .find(|&n| tree.kind(n) == kind)
            .unwrap()
    }

    #[test]
    fn conversion_is_lossless() {
        let source = "package a.b;\n\n/** doc */\npublic class A {\n    int x = 1; // one\n\n    void f() {\n        g(\"s\", 'c');\n    }\n}\n";
        let tree = parse(source);
        assert_eq!(tree.text(tree.root()), source);
    }

    #[test]
    fn whitespace_between_tokens_becomes_nodes() {
        let tree = parse("class A {  }");
        let body = tree
            .preorder(tree.root())
            .find(|&n| tree.grammar_kind(n) == "class_body")
            .unwrap();
        let kinds: Vec<_> = tree.children(body).iter().map(|&c| tree.kind(c)).collect();
        assert_eq!(
            kinds,
            [SyntaxKind::LBrace, SyntaxKind::Whitespace, SyntaxKind::RBrace]
        );
    }

    #[test]
    fn string_literals_are_wrapped_single_tokens() {
        let tree = parse("class A { String s = \"a\\tb\"; }");
        let literal = find(&tree, SyntaxKind::StringLiteral);
        assert!(tree.is_token(literal));
        assert_eq!(tree.text(literal), "\"a\\tb\"");
        let parent = tree.parent(literal).unwrap();
        assert_eq!(tree.kind(parent), SyntaxKind::LiteralExpression);
    }

    #[test]
    fn same_operator_chains_are_flattened() {
        let tree = parse("class A { boolean b = x || y || z; }");
        let binary = find(&tree, SyntaxKind::BinaryExpression);
        let operators = tree
            .children(binary)
            .iter()
            .filter(|&&c| tree.kind(c) == SyntaxKind::OrOr)
            .count();
        assert_eq!(operators, 2);
        assert_eq!(tree.text(binary), "x || y || z");
    }

    #[test]
    fn mixed_operators_stay_nested() {
        let tree = parse("class A { boolean b = x || y && z; }");
        let binary = find(&tree, SyntaxKind::BinaryExpression);
        let kinds: Vec<_> = tree
            .children(binary)
            .iter()
            .map(|&c| tree.kind(c))
            .filter(|k| !k.is_trivia())
            .collect();
        assert_eq!(
            kinds,
            [
                SyntaxKind::Identifier,
                SyntaxKind::OrOr,
                SyntaxKind::BinaryExpression
            ]
        );
    }

    #[test]
    fn trailing_comment_joins_the_field() {
        let tree = parse("class A {\n    int x = 1; // note\n    int y;\n}\n");
        let comment = find(&tree, SyntaxKind::LineComment);
        let field = tree.parent(comment).unwrap();
        assert_eq!(tree.kind(field), SyntaxKind::Field);
        assert_eq!(tree.text(field), "int x = 1; // note");
        assert_eq!(tree.text(tree.root()), "class A {\n    int x = 1; // note\n    int y;\n}\n");
    }

    #[test]
    fn own_line_comment_stays_in_the_body() {
        let tree = parse("class A {\n    int x = 1;\n    // note\n}\n");
        let comment = find(&tree, SyntaxKind::LineComment);
        let parent = tree.parent(comment).unwrap();
        assert_eq!(tree.grammar_kind(parent), "class_body");
    }

    #[test]
    fn syntax_errors_fail_the_parse() {
        let mut grammar = GrammarAdapter::init().unwrap();
        let err = grammar
            .parse(SupportedLanguage::Java, "class A { void f( }")
            .unwrap_err();
        assert!(matches!(err, FormatError::Parse { .. }));
    }
}
