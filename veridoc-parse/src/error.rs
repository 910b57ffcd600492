#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;
use veridoc_ast::Span;
use veridoc_lex::LexError;

/// A constraint or path string failed to compile. Callers skip the input;
/// they never abort the run over this.
#[derive(Debug, Error, Diagnostic)]
#[error("parse failure: {message}")]
#[diagnostic(code(veridoc::parse))]
pub struct ParseFailure {
    pub message: String,
    #[label]
    pub span: Span,
}

impl From<LexError> for ParseFailure {
    fn from(e: LexError) -> Self {
        Self {
            message: e.message,
            span: e.span,
        }
    }
}
