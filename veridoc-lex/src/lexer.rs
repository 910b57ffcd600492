#![forbid(unsafe_code)]

use logos::Logos;
use miette::Diagnostic;
use thiserror::Error;
use veridoc_ast::{span_between, CmpOp, Span};

use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Diagnostic)]
#[error("lex error: {message}")]
#[diagnostic(code(veridoc::lex))]
pub struct LexError {
    pub message: String,
    #[label]
    pub span: Span,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    #[token("->")]
    Arrow,

    #[token("&&")]
    AndAnd,
    #[token("^")]
    Caret,
    #[token("||")]
    OrOr,
    #[token("|")]
    Pipe,

    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,

    #[token("!")]
    Bang,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,

    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice().to_string())]
    Number(String),

    // Logic notation quotes values with either quote style; no escapes.
    #[regex(r"'[^']*'", |lex| strip_quotes(lex.slice()))]
    #[regex(r#""[^"]*""#, |lex| strip_quotes(lex.slice()))]
    Quoted(String),

    // Dotted identifiers name call-derived values (`numpy.take`).
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*", |lex| lex.slice().to_string())]
    Ident(String),
}

fn strip_quotes(s: &str) -> String {
    s[1..s.len().saturating_sub(1)].to_string()
}

pub struct Lexer<'a> {
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src }
    }

    pub fn lex(&self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut lex = RawToken::lexer(self.src);

        while let Some(raw) = lex.next() {
            let range = lex.span();
            let span = span_between(range.start, range.end);

            let kind = match raw {
                Ok(RawToken::Arrow) => TokenKind::Arrow,
                Ok(RawToken::AndAnd) | Ok(RawToken::Caret) => TokenKind::And,
                Ok(RawToken::OrOr) | Ok(RawToken::Pipe) => TokenKind::Or,

                Ok(RawToken::EqEq) | Ok(RawToken::Eq) => TokenKind::Cmp(CmpOp::Eq),
                Ok(RawToken::Ne) => TokenKind::Cmp(CmpOp::Ne),
                Ok(RawToken::Le) => TokenKind::Cmp(CmpOp::Le),
                Ok(RawToken::Ge) => TokenKind::Cmp(CmpOp::Ge),
                Ok(RawToken::Lt) => TokenKind::Cmp(CmpOp::Lt),
                Ok(RawToken::Gt) => TokenKind::Cmp(CmpOp::Gt),

                Ok(RawToken::Bang) => TokenKind::Bang,
                Ok(RawToken::LParen) => TokenKind::LParen,
                Ok(RawToken::RParen) => TokenKind::RParen,
                Ok(RawToken::LBracket) => TokenKind::LBracket,
                Ok(RawToken::RBracket) => TokenKind::RBracket,
                Ok(RawToken::Comma) => TokenKind::Comma,

                Ok(RawToken::Number(s)) => TokenKind::Number(s),
                Ok(RawToken::Quoted(s)) => TokenKind::Quoted(s),
                Ok(RawToken::Ident(s)) => TokenKind::Ident(s),

                Err(_) => {
                    return Err(LexError {
                        message: "unexpected character".to_string(),
                        span,
                    });
                }
            };

            tokens.push(Token { kind, span });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: span_between(self.src.len(), self.src.len()),
        });

        Ok(tokens)
    }
}
