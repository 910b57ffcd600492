#![forbid(unsafe_code)]

use veridoc_ast::{CmpOp, Span};

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// Comparison operator (`==` lexes as `=`).
    Cmp(CmpOp),

    /// `^` or `&&`
    And,
    /// `|` or `||`
    Or,
    /// `->`
    Arrow,
    /// `!`
    Bang,

    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,

    /// Possibly dotted: `numpy.take`.
    Ident(String),
    /// Literal text as written, sign and decimals included.
    Number(String),
    /// Quoted with `'` or `"`; quotes stripped.
    Quoted(String),

    Eof,
}
