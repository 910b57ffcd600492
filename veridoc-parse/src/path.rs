#![forbid(unsafe_code)]

use veridoc_ast::{AbnormalKind, Path, Terminal, Tetrad};

use crate::error::ParseFailure;
use crate::parser::compile;

/// Delete unmatched parentheses in a single stack-based scan. Executor
/// output is not guaranteed well-bracketed: a leftover `(` or a stray `)`
/// would otherwise poison the whole line.
pub fn repair_parens(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut keep = vec![true; chars.len()];
    let mut stack: Vec<usize> = Vec::new();

    for (i, c) in chars.iter().enumerate() {
        match c {
            '(' => stack.push(i),
            ')' => {
                if stack.pop().is_none() {
                    keep[i] = false;
                }
            }
            _ => {}
        }
    }
    for i in stack {
        keep[i] = false;
    }

    chars
        .iter()
        .zip(keep)
        .filter_map(|(c, k)| k.then_some(*c))
        .collect()
}

fn terminal_kind(tail: &str) -> AbnormalKind {
    let lower = tail.to_lowercase();
    if lower.contains("assert") {
        AbnormalKind::Assertion
    } else if lower.contains("warn") {
        AbnormalKind::Warning
    } else {
        AbnormalKind::Error
    }
}

/// Top-level `( ... )` groups of the tagged tail, nested parens included.
fn parenthesized_clauses(tail: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in tail.char_indices() {
        match c {
            '(' => {
                if depth == 0 {
                    start = i + 1;
                }
                depth += 1;
            }
            ')' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        out.push(tail[start..i].to_string());
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn is_bare_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Resolve one tagged-tail clause into error-causing guard tetrads: a
/// predicate-shaped clause compiles directly; a bare variable name selects
/// the matching tetrads out of the main guard.
fn resolve_error_clause(clause: &str, guard: &[Tetrad]) -> Vec<Tetrad> {
    if let Ok(compiled) = compile(clause) {
        return compiled.tetrads;
    }
    let name = clause.trim();
    if is_bare_identifier(name) {
        return guard.iter().filter(|t| t.var == name).cloned().collect();
    }
    Vec::new()
}

/// Compile one newline-delimited path string of shape
/// `(guard)^(guard)...->terminal`.
///
/// Reuses the constraint grammar, with two path-specific rules: the segment
/// after the final `->` is inspected for an error/assertion/warning tag whose
/// parenthesized clauses become the error-causing guard (excluded from the
/// feasibility formula), and unmatched parentheses are repaired up front.
pub fn compile_path(line: &str) -> Result<Path, ParseFailure> {
    let repaired = repair_parens(line.trim());

    let (head, tail) = match repaired.rfind("->") {
        Some(pos) => (repaired[..pos].to_string(), repaired[pos + 2..].to_string()),
        None => (repaired.clone(), String::new()),
    };

    if tail.contains("_END") {
        let guard = compile(&head)?;
        let kind = terminal_kind(&tail);
        let mut error_guard = Vec::new();
        for clause in parenthesized_clauses(&tail) {
            error_guard.extend(resolve_error_clause(&clause, &guard.tetrads));
        }
        return Ok(Path {
            tetrads: guard.tetrads,
            skeleton: guard.skeleton,
            formula: guard.formula,
            terminal: Terminal::Abnormal {
                kind,
                guard: error_guard,
            },
            source: line.trim().to_string(),
        });
    }

    // Return-value echo: when it is predicate-shaped it rejoins the guard as
    // one more conjunct, otherwise only the guard compiles.
    let echo = tail.trim().trim_matches(['\'', '"']).to_string();
    let compiled = if !tail.trim().is_empty() && compile(tail.trim()).is_ok() {
        compile(&format!("{head} ^ {}", tail.trim()))?
    } else {
        compile(&head)?
    };

    Ok(Path {
        tetrads: compiled.tetrads,
        skeleton: compiled.skeleton,
        formula: compiled.formula,
        terminal: Terminal::Normal(echo),
        source: line.trim().to_string(),
    })
}
