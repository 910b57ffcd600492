#![forbid(unsafe_code)]

use veridoc_ast::{CmpOp, Skeleton, Tetrad};

/// Fixed-size batch parameter: its name is stable across documentation and
/// code, so it never needs alignment.
pub const BATCH_SIZE_NAME: &str = "batch_size";

/// Discount applied to tetrads synthesized from a reversed comparison.
pub const REVERSED_DISCOUNT: f64 = 0.85;

const NAME_WEIGHT: f64 = 0.25;
const OP_WEIGHT: f64 = 0.50;
const VALUE_WEIGHT: f64 = 0.25;

/// 5-dim operator embedding:
/// {is-ordering, is-equality-or-inclusive-bound, less-direction,
///  greater-direction, is-negated}.
///
/// `<` partially matches `<=`, while `=`/`!=` stay near-orthogonal to the
/// ordering operators.
fn op_features(op: CmpOp) -> [f64; 5] {
    match op {
        CmpOp::Lt => [1.0, 0.0, 0.0, 1.0, 0.0],
        CmpOp::Gt => [1.0, 0.0, 1.0, 0.0, 0.0],
        CmpOp::Le => [1.0, 1.0, 0.0, 1.0, 0.0],
        CmpOp::Ge => [1.0, 1.0, 1.0, 0.0, 0.0],
        CmpOp::Eq => [0.0, 1.0, 0.0, 0.0, 0.0],
        CmpOp::Ne => [0.0, 1.0, 0.0, 0.0, 1.0],
    }
}

pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let subst = prev[j] + usize::from(ca != cb);
            cur[j + 1] = subst.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Normalized edit-distance similarity: `1 - edits / maxlen`, `0.0` when
/// both strings are empty.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Cosine similarity of the operator embeddings.
pub fn op_similarity(a: CmpOp, b: CmpOp) -> f64 {
    let va = op_features(a);
    let vb = op_features(b);
    let dot: f64 = va.iter().zip(vb.iter()).map(|(x, y)| x * y).sum();
    let na: f64 = va.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb: f64 = vb.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

/// How well two tetrads correspond despite naming drift, in [0, 1].
pub fn similarity(a: &Tetrad, b: &Tetrad) -> f64 {
    NAME_WEIGHT * name_similarity(&a.var, &b.var)
        + OP_WEIGHT * op_similarity(a.op, b.op)
        + VALUE_WEIGHT * name_similarity(a.value.text(), b.value.text())
}

/// Constraint tetrads with path variable names substituted in, plus the
/// per-tetrad confidence that drove each substitution.
#[derive(Clone, Debug, PartialEq)]
pub struct Aligned {
    pub tetrads: Vec<Tetrad>,
    pub scores: Vec<f64>,
}

/// Tetrads that need no alignment regardless of name drift: purely numeric
/// comparisons, the distinguished batch-size parameter, and call-derived
/// virtual values.
fn is_unambiguous(tetrad: &Tetrad) -> bool {
    tetrad.value.is_numeric() || tetrad.var == BATCH_SIZE_NAME || tetrad.has_call_value()
}

/// Reconcile constraint tetrads against the union of a function's path
/// tetrads. Each constraint tetrad scores against every pool tetrad and
/// keeps the maximum (ties: first seen); the winning pool variable name is
/// substituted into the constraint tetrad.
pub fn align(constraint_tetrads: &[Tetrad], pool: &[Tetrad]) -> Aligned {
    let mut tetrads = Vec::with_capacity(constraint_tetrads.len());
    let mut scores = Vec::with_capacity(constraint_tetrads.len());

    for tetrad in constraint_tetrads {
        if is_unambiguous(tetrad) {
            tetrads.push(tetrad.clone());
            scores.push(1.0);
            continue;
        }

        let mut best: Option<&Tetrad> = None;
        let mut best_score = 0.0f64;
        for candidate in pool {
            let s = similarity(tetrad, candidate);
            if s > best_score {
                best_score = s;
                best = Some(candidate);
            }
        }

        let mut aligned = tetrad.clone();
        if let Some(winner) = best {
            aligned.var = winner.var.clone();
        }
        tetrads.push(aligned);
        scores.push(best_score);
    }

    Aligned { tetrads, scores }
}

/// Aggregate per-tetrad scores through the formula shape: AND takes the
/// minimum, OR the maximum, NOT complements, and reversed-comparison leaves
/// are discounted.
pub fn total_similarity(skeleton: &Skeleton, tetrads: &[Tetrad], scores: &[f64]) -> f64 {
    match skeleton {
        Skeleton::Leaf(i) => {
            let score = scores.get(*i).copied().unwrap_or(0.0);
            let reversed = tetrads.get(*i).map(|t| t.reversed).unwrap_or(false);
            if reversed {
                score * REVERSED_DISCOUNT
            } else {
                score
            }
        }
        Skeleton::Not(inner) => 1.0 - total_similarity(inner, tetrads, scores),
        Skeleton::And(a, b) => {
            total_similarity(a, tetrads, scores).min(total_similarity(b, tetrads, scores))
        }
        Skeleton::Or(a, b) => {
            total_similarity(a, tetrads, scores).max(total_similarity(b, tetrads, scores))
        }
    }
}
