#![forbid(unsafe_code)]

//! Fixed vocabularies driving the fuzzy branch and the pre-filter.
//!
//! A fuzzword marks a constraint whose consequent is qualitative rather than
//! a crisp comparison ("ignored", "has no effect"); unsolvable words mark
//! descriptions the engine never reasons about at all.

/// The documented parameter takes effect under the stated condition.
pub const EXISTENCE_FUZZWORDS: &[&str] = &[
    "significant",
    "effective",
    "takes effect",
    "considered",
    "used",
];

/// The documented parameter is inert under the stated condition.
pub const NONEXISTENCE_FUZZWORDS: &[&str] = &[
    "ignored",
    "has no effect",
    "no effect",
    "not used",
    "unused",
    "irrelevant",
];

/// Value vocabulary outside the comparison theory: constraints mentioning
/// these are skipped up front.
pub const UNSOLVABLE_WORDS: &[&str] = &[
    "callable",
    "array-like",
    "sparse matrix",
    "estimator",
    "dtype",
    "deprecated",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FuzzKind {
    Existence,
    Nonexistence,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Word-boundary occurrences of `term` in `text`, case-insensitive.
fn find_term(text_lower: &str, term: &str) -> Vec<usize> {
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(rel) = text_lower[from..].find(term) {
        let start = from + rel;
        let end = start + term.len();
        let before_ok = start == 0
            || !is_ident_char(text_lower[..start].chars().next_back().unwrap_or(' '));
        let after_ok = end == text_lower.len()
            || !is_ident_char(text_lower[end..].chars().next().unwrap_or(' '));
        if before_ok && after_ok {
            out.push(start);
        }
        from = end;
    }
    out
}

fn contains_term(text: &str, term: &str) -> bool {
    !find_term(&text.to_lowercase(), &term.to_lowercase()).is_empty()
}

pub fn has_unsolvable_words(text: &str) -> bool {
    UNSOLVABLE_WORDS.iter().any(|w| contains_term(text, w))
}

/// Nonexistence is checked first: its phrases embed existence words
/// ("not used" contains "used").
pub fn fuzz_kind(text: &str) -> Option<FuzzKind> {
    if NONEXISTENCE_FUZZWORDS.iter().any(|w| contains_term(text, w)) {
        Some(FuzzKind::Nonexistence)
    } else if EXISTENCE_FUZZWORDS.iter().any(|w| contains_term(text, w)) {
        Some(FuzzKind::Existence)
    } else {
        None
    }
}

fn last_ident_before(text: &str, idx: usize) -> Option<String> {
    text[..idx]
        .rsplit(|c: char| !is_ident_char(c))
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// The variables a fuzzy consequent talks about: for each fuzzword match,
/// the nearest identifier to its left. Longer phrases claim their span
/// first so "no effect" does not re-match inside "has no effect".
///
/// Offsets come from the lowercased text, so the identifier scan runs on
/// that same string: lowercasing can change byte lengths ('İ' lowers to
/// two characters) and original-text offsets would not line up.
pub fn fuzzword_vars(text: &str, kind: FuzzKind) -> Vec<String> {
    let words = match kind {
        FuzzKind::Existence => EXISTENCE_FUZZWORDS,
        FuzzKind::Nonexistence => NONEXISTENCE_FUZZWORDS,
    };
    let lower = text.to_lowercase();

    let mut terms: Vec<&str> = words.to_vec();
    terms.sort_by_key(|t| std::cmp::Reverse(t.len()));

    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut vars: Vec<String> = Vec::new();
    for term in terms {
        for start in find_term(&lower, term) {
            let end = start + term.len();
            if claimed.iter().any(|(s, e)| start < *e && end > *s) {
                continue;
            }
            claimed.push((start, end));
            if let Some(var) = last_ident_before(&lower, start) {
                if !vars.contains(&var) {
                    vars.push(var);
                }
            }
        }
    }
    vars
}

/// Word-boundary presence of a variable name in a path line,
/// case-insensitive to match the extraction above.
pub fn word_present(haystack: &str, word: &str) -> bool {
    !find_term(&haystack.to_lowercase(), &word.to_lowercase()).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_and_bare_fuzzwords_are_detected() {
        assert_eq!(
            fuzz_kind("(gamma = 'ignored')"),
            Some(FuzzKind::Nonexistence)
        );
        assert_eq!(
            fuzz_kind("(gamma has no effect)"),
            Some(FuzzKind::Nonexistence)
        );
        assert_eq!(fuzz_kind("(gamma = 'significant')"), Some(FuzzKind::Existence));
        assert_eq!(fuzz_kind("(gamma = 'scale')"), None);
    }

    #[test]
    fn nonexistence_wins_over_embedded_existence_words() {
        assert_eq!(fuzz_kind("(x = 'not used')"), Some(FuzzKind::Nonexistence));
        assert_eq!(fuzz_kind("(x = 'unused')"), Some(FuzzKind::Nonexistence));
        assert_eq!(fuzz_kind("(x = 'used')"), Some(FuzzKind::Existence));
    }

    #[test]
    fn fuzzword_vars_take_the_nearest_left_identifier() {
        assert_eq!(
            fuzzword_vars("(gamma = 'ignored')", FuzzKind::Nonexistence),
            vec!["gamma"]
        );
        assert_eq!(
            fuzzword_vars("(gamma has no effect)", FuzzKind::Nonexistence),
            vec!["gamma"]
        );
        assert_eq!(
            fuzzword_vars(
                "(gamma = 'ignored') ^ (coef0 = 'ignored')",
                FuzzKind::Nonexistence
            ),
            vec!["gamma", "coef0"]
        );
    }

    #[test]
    fn longer_phrases_claim_their_span_first() {
        // "has no effect" must not also yield a match for "no effect"
        // whose nearest-left identifier would be "has".
        assert_eq!(
            fuzzword_vars("(alpha has no effect)", FuzzKind::Nonexistence),
            vec!["alpha"]
        );
    }

    #[test]
    fn length_changing_lowercase_does_not_split_characters() {
        // 'İ' lowers to two characters, so lowered offsets drift from the
        // original text; the scan must stay on one string.
        let vars = fuzzword_vars("İİİİİİİİ ignoredé", FuzzKind::Nonexistence);
        assert_eq!(vars.len(), 1);

        assert_eq!(
            fuzzword_vars("(GAMMA = 'ignored')", FuzzKind::Nonexistence),
            vec!["gamma"]
        );
    }

    #[test]
    fn unsolvable_words_respect_boundaries() {
        assert!(has_unsolvable_words("(metric = 'callable')"));
        assert!(!has_unsolvable_words("(metric = 'recallable_x')"));
    }

    #[test]
    fn word_present_respects_boundaries() {
        assert!(word_present("(gamma > 0)->'r'", "gamma"));
        assert!(!word_present("(gamma_scale > 0)->'r'", "gamma"));
        assert!(word_present("(Gamma > 0)->'r'", "gamma"));
    }
}
