//! Node kinds shared by the tree model, the grammar adapter and the rules.

/// Kind tag of a tree node.
///
/// Token kinds label leaves; composite kinds label interior nodes. The
/// grammar adapter maps every grammar-specific kind onto this table, so the
/// rules never look at grammar kind names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    // Trivia
    Whitespace,
    LineComment,
    BlockComment,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Question,
    Colon,

    // Operators
    OrOr,
    AndAnd,
    BitOr,
    BitAnd,
    Plus,

    // Other leaves
    Identifier,
    StringLiteral,
    /// Any leaf without a dedicated kind (keywords, other operators, ...).
    Token,

    // Composites
    Program,
    ParameterList,
    ArgumentList,
    Parameter,
    Field,
    LocalDeclaration,
    ExpressionStatement,
    IfStatement,
    ParenthesizedExpression,
    BinaryExpression,
    TernaryExpression,
    MethodInvocation,
    FieldAccess,
    QualifiedName,
    LiteralExpression,
    ThrowsClause,
    Block,
    /// Any composite without a dedicated kind.
    Node,
}

impl SyntaxKind {
    /// Whitespace or comment.
    #[must_use]
    pub const fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::LineComment | Self::BlockComment)
    }

    /// Maps the text of a punctuation or operator leaf onto its kind.
    #[must_use]
    pub fn from_token_text(text: &str) -> Self {
        match text {
            "(" => Self::LParen,
            ")" => Self::RParen,
            "{" => Self::LBrace,
            "}" => Self::RBrace,
            "[" => Self::LBracket,
            "]" => Self::RBracket,
            ";" => Self::Semicolon,
            "," => Self::Comma,
            "." => Self::Dot,
            "?" => Self::Question,
            ":" => Self::Colon,
            "||" => Self::OrOr,
            "&&" => Self::AndAnd,
            "|" => Self::BitOr,
            "&" => Self::BitAnd,
            "+" => Self::Plus,
            _ => Self::Token,
        }
    }

    /// Name used for nodes synthesized by the rules, and in tree dumps.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Whitespace => "WHITE_SPACE",
            Self::LineComment => "LINE_COMMENT",
            Self::BlockComment => "BLOCK_COMMENT",
            Self::LParen => "LPAREN",
            Self::RParen => "RPAREN",
            Self::LBrace => "LBRACE",
            Self::RBrace => "RBRACE",
            Self::LBracket => "LBRACKET",
            Self::RBracket => "RBRACKET",
            Self::Semicolon => "SEMICOLON",
            Self::Comma => "COMMA",
            Self::Dot => "DOT",
            Self::Question => "QUEST",
            Self::Colon => "COLON",
            Self::OrOr => "OROR",
            Self::AndAnd => "ANDAND",
            Self::BitOr => "OR",
            Self::BitAnd => "AND",
            Self::Plus => "PLUS",
            Self::Identifier => "IDENTIFIER",
            Self::StringLiteral => "STRING_LITERAL",
            Self::Token => "TOKEN",
            Self::Program => "PROGRAM",
            Self::ParameterList => "PARAMETER_LIST",
            Self::ArgumentList => "ARGUMENT_LIST",
            Self::Parameter => "PARAMETER",
            Self::Field => "FIELD",
            Self::LocalDeclaration => "LOCAL_DECLARATION",
            Self::ExpressionStatement => "EXPRESSION_STATEMENT",
            Self::IfStatement => "IF_STATEMENT",
            Self::ParenthesizedExpression => "PARENTHESIZED_EXPRESSION",
            Self::BinaryExpression => "BINARY_EXPRESSION",
            Self::TernaryExpression => "TERNARY_EXPRESSION",
            Self::MethodInvocation => "METHOD_INVOCATION",
            Self::FieldAccess => "FIELD_ACCESS",
            Self::QualifiedName => "QUALIFIED_NAME",
            Self::LiteralExpression => "LITERAL_EXPRESSION",
            Self::ThrowsClause => "THROWS_CLAUSE",
            Self::Block => "BLOCK",
            Self::Node => "NODE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_text_maps_to_kinds() {
        assert_eq!(SyntaxKind::from_token_text("("), SyntaxKind::LParen);
        assert_eq!(SyntaxKind::from_token_text("||"), SyntaxKind::OrOr);
        assert_eq!(SyntaxKind::from_token_text("return"), SyntaxKind::Token);
    }

    #[test]
    fn trivia_kinds() {
        assert!(SyntaxKind::Whitespace.is_trivia());
        assert!(SyntaxKind::LineComment.is_trivia());
        assert!(!SyntaxKind::Semicolon.is_trivia());
    }
}
