#![forbid(unsafe_code)]

use veridoc_ast::{span_between, CmpOp, Formula, Skeleton, Span, Tetrad, TetradValue};
use veridoc_lex::{Token, TokenKind};

use crate::error::ParseFailure;

/// Result of compiling one logic-notation string: the atomic predicates in
/// source order, the formula shape over their indices, and the instantiated
/// formula.
#[derive(Clone, Debug, PartialEq)]
pub struct Compiled {
    pub tetrads: Vec<Tetrad>,
    pub skeleton: Skeleton,
    pub formula: Formula,
}

impl Compiled {
    pub fn variables(&self) -> Vec<&str> {
        self.tetrads.iter().map(|t| t.var.as_str()).collect()
    }

    /// Re-instantiate the same shape over a substituted tetrad list.
    pub fn with_tetrads(&self, tetrads: Vec<Tetrad>) -> Option<Compiled> {
        let formula = self.skeleton.instantiate(&tetrads)?;
        Some(Compiled {
            tetrads,
            skeleton: self.skeleton.clone(),
            formula,
        })
    }
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    src: &'a str,
    idx: usize,
    tetrads: Vec<Tetrad>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], src: &'a str) -> Self {
        Self {
            tokens,
            src,
            idx: 0,
            tetrads: Vec::new(),
        }
    }

    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.idx)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.idx)
            .map(|t| t.span)
            .unwrap_or_else(|| span_between(self.src.len(), self.src.len()))
    }

    fn advance(&mut self) -> Token {
        let tok = self
            .tokens
            .get(self.idx)
            .cloned()
            .unwrap_or(Token {
                kind: TokenKind::Eof,
                span: span_between(self.src.len(), self.src.len()),
            });
        if self.idx < self.tokens.len() {
            self.idx += 1;
        }
        tok
    }

    fn fail(&self, message: impl Into<String>) -> ParseFailure {
        ParseFailure {
            message: message.into(),
            span: self.peek_span(),
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), ParseFailure> {
        if self.peek() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.fail(format!("expected {what}")))
        }
    }

    pub fn expect_eof(&self) -> Result<(), ParseFailure> {
        if matches!(self.peek(), TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.fail("unexpected trailing input"))
        }
    }

    pub fn into_tetrads(self) -> Vec<Tetrad> {
        self.tetrads
    }

    /// `expr := unary ( ('^' | '|' | '->') expr )?`
    ///
    /// Connectives share one precedence level and associate to the right,
    /// matching the evaluation order of the skeleton grammar. `->` flattens
    /// to AND: the check asks for realizability, not validity, and the
    /// NORMAL/ERROR voting asymmetry depends on exactly this reading.
    pub fn parse_expr(&mut self) -> Result<Skeleton, ParseFailure> {
        let lhs = self.parse_unary()?;
        match self.peek() {
            TokenKind::And | TokenKind::Arrow => {
                self.advance();
                let rhs = self.parse_expr()?;
                Ok(Skeleton::And(Box::new(lhs), Box::new(rhs)))
            }
            TokenKind::Or => {
                self.advance();
                let rhs = self.parse_expr()?;
                Ok(Skeleton::Or(Box::new(lhs), Box::new(rhs)))
            }
            _ => Ok(lhs),
        }
    }

    /// `unary := '[' expr ']' | '!' '(' expr ')' | '(' expr ')' | predicate`
    fn parse_unary(&mut self) -> Result<Skeleton, ParseFailure> {
        match self.peek() {
            TokenKind::LBracket => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RBracket, "closing ']'")?;
                Ok(Skeleton::Not(Box::new(inner)))
            }
            TokenKind::Bang => {
                self.advance();
                self.expect(&TokenKind::LParen, "'(' after '!'")?;
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "closing ')'")?;
                Ok(Skeleton::Not(Box::new(inner)))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "closing ')'")?;
                Ok(inner)
            }
            TokenKind::Ident(_) | TokenKind::Number(_) => self.parse_predicate(),
            TokenKind::Eof => Err(self.fail("unexpected end of input")),
            _ => Err(self.fail("expected predicate or group")),
        }
    }

    /// `predicate := identifier OP value | number OP identifier`
    ///
    /// The literal-first form canonicalizes to variable-first by swapping
    /// sides and flipping the operator; the tetrad is marked `reversed`.
    fn parse_predicate(&mut self) -> Result<Skeleton, ParseFailure> {
        let lhs = self.advance();
        let op = match self.peek() {
            TokenKind::Cmp(op) => {
                let op = *op;
                self.advance();
                op
            }
            _ => return Err(self.fail("expected comparison operator")),
        };

        let tetrad = match lhs.kind {
            TokenKind::Ident(var) => {
                let value = self.parse_value()?;
                Tetrad::new(var, op, value)
            }
            TokenKind::Number(num) => match self.advance().kind {
                TokenKind::Ident(var) => Tetrad {
                    var,
                    op: op.flip(),
                    value: TetradValue::Num(num),
                    reversed: true,
                },
                _ => return Err(self.fail("literal comparison needs a variable side")),
            },
            _ => return Err(self.fail("expected identifier or number")),
        };

        let idx = self.tetrads.len();
        self.tetrads.push(tetrad);
        Ok(Skeleton::Leaf(idx))
    }

    /// `value := number | quoted | identifier callsuffix?`
    ///
    /// Bare `None`/`True`/`False` normalize to string values, as do bare
    /// identifiers (`x = y` reads `y` as a string constant). A call suffix
    /// captures the source text of the whole call expression as a
    /// call-derived "virtual" value.
    fn parse_value(&mut self) -> Result<TetradValue, ParseFailure> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Number(n) => Ok(TetradValue::Num(n)),
            TokenKind::Quoted(s) => Ok(TetradValue::Str(s)),
            TokenKind::Ident(name) => {
                if matches!(self.peek(), TokenKind::LParen) {
                    let end = self.consume_balanced_call()?;
                    let start: usize = tok.span.offset();
                    Ok(TetradValue::Str(self.src[start..end].to_string()))
                } else {
                    Ok(TetradValue::Str(name))
                }
            }
            _ => Err(ParseFailure {
                message: "expected literal, identifier or call expression".to_string(),
                span: tok.span,
            }),
        }
    }

    /// Consume a balanced `( ... )` token run and return the byte offset just
    /// past the closing parenthesis.
    fn consume_balanced_call(&mut self) -> Result<usize, ParseFailure> {
        let mut depth = 0usize;
        loop {
            let tok = self.advance();
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(tok.span.offset() + tok.span.len());
                    }
                }
                TokenKind::Eof => {
                    return Err(ParseFailure {
                        message: "unterminated call expression".to_string(),
                        span: tok.span,
                    });
                }
                _ => {}
            }
        }
    }
}

/// Compile one logic-notation string into tetrads, skeleton and formula.
///
/// Fails with [`ParseFailure`] on malformed input; callers must skip the
/// input, not abort.
pub fn compile(text: &str) -> Result<Compiled, ParseFailure> {
    let tokens = veridoc_lex::Lexer::new(text).lex()?;
    let mut parser = Parser::new(&tokens, text);
    let skeleton = parser.parse_expr()?;
    parser.expect_eof()?;
    let tetrads = parser.into_tetrads();
    let formula = skeleton
        .instantiate(&tetrads)
        .ok_or_else(|| ParseFailure {
            message: "internal: placeholder out of range".to_string(),
            span: span_between(0, text.len()),
        })?;
    Ok(Compiled {
        tetrads,
        skeleton,
        formula,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_single_predicate_short_circuits() {
        let c = compile("n_clusters = 'None'").unwrap();
        assert_eq!(c.tetrads.len(), 1);
        assert_eq!(c.skeleton, Skeleton::Leaf(0));
        assert!(matches!(c.formula, Formula::Pred(_)));
        assert_eq!(c.tetrads[0].var, "n_clusters");
        assert_eq!(c.tetrads[0].value, TetradValue::Str("None".into()));
    }

    #[test]
    fn compile_conjunction_builds_and() {
        let c = compile("(n_clusters = 'None') ^ (distance_threshold != 'None')").unwrap();
        assert_eq!(c.tetrads.len(), 2);
        assert_eq!(c.skeleton.render(), "({0}^{1})");
    }

    #[test]
    fn implication_flattens_to_and() {
        let a = compile("(a = 'None') -> (b = 'None')").unwrap();
        let b = compile("(a = 'None') ^ (b = 'None')").unwrap();
        assert_eq!(a.skeleton, b.skeleton);
        assert_eq!(a.formula, b.formula);
    }

    #[test]
    fn double_connectives_rewrite() {
        let a = compile("(a = 1) && (b = 2) || (c = 3)").unwrap();
        assert_eq!(a.skeleton.render(), "({0}^({1}|{2}))");
    }

    #[test]
    fn bang_group_and_bracket_both_negate() {
        let a = compile("!(a = 'None')").unwrap();
        let b = compile("[a = 'None']").unwrap();
        assert_eq!(a.skeleton, b.skeleton);
        assert!(matches!(a.formula, Formula::Not(_)));
    }

    #[test]
    fn reversed_comparison_canonicalizes() {
        let a = compile("10 < x").unwrap();
        let b = compile("x > 10").unwrap();
        assert_eq!(a.tetrads[0].var, "x");
        assert_eq!(a.tetrads[0].op, CmpOp::Gt);
        assert_eq!(a.tetrads[0].value, TetradValue::Num("10".into()));
        assert!(a.tetrads[0].reversed);
        assert_eq!(a.formula, b.formula);
    }

    #[test]
    fn bare_reserved_literal_is_string_value() {
        let a = compile("x = None").unwrap();
        let b = compile("x = 'None'").unwrap();
        assert_eq!(a.tetrads, b.tetrads);
    }

    #[test]
    fn call_derived_value_captures_source_text() {
        let c = compile("idx = numpy.take(indices, axis)").unwrap();
        assert_eq!(
            c.tetrads[0].value,
            TetradValue::Str("numpy.take(indices, axis)".into())
        );
        assert!(c.tetrads[0].has_call_value());
    }

    #[test]
    fn identifier_value_reads_as_string() {
        let c = compile("kernel = linear").unwrap();
        assert_eq!(c.tetrads[0].value, TetradValue::Str("linear".into()));
    }

    #[test]
    fn unbalanced_bracket_is_a_parse_failure() {
        assert!(compile("(a = 1 ^ (b = 2)").is_err());
        assert!(compile("[a = 1").is_err());
    }

    #[test]
    fn dangling_operator_is_a_parse_failure() {
        assert!(compile("a = ").is_err());
        assert!(compile("(a = 1) ^").is_err());
        assert!(compile("").is_err());
    }

    #[test]
    fn trailing_junk_is_a_parse_failure() {
        assert!(compile("(a = 1) (b = 2)").is_err());
    }

    #[test]
    fn rendered_formula_recompiles_identically() {
        let c = compile("((a = 'None') ^ [(b < 3) | (c >= 1.5)]) -> (d != 'auto')").unwrap();
        let again = compile(&c.formula.render()).unwrap();
        assert_eq!(again.formula, c.formula);
    }
}
