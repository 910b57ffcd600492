#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::fmt;

use miette::SourceSpan;

pub type Span = SourceSpan;

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

/// Comparison operator of an atomic predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    /// Mirror operator for a swapped comparison: `10 < x` becomes `x > 10`.
    pub fn flip(self) -> Self {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Ge => CmpOp::Le,
            other => other,
        }
    }

    /// Logical complement: `!(a < b)` is `a >= b`.
    pub fn negate(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Ge => CmpOp::Lt,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
        }
    }

    pub fn is_ordering(self) -> bool {
        matches!(self, CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge)
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The single populated value slot of a tetrad.
///
/// `Num` keeps the literal text as written; the solver parses it, the
/// similarity engine compares it as text.
#[derive(Clone, Debug, PartialEq)]
pub enum TetradValue {
    Str(String),
    Num(String),
}

impl TetradValue {
    pub fn text(&self) -> &str {
        match self {
            TetradValue::Str(s) | TetradValue::Num(s) => s,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, TetradValue::Num(_))
    }

    pub fn numeric(&self) -> Option<f64> {
        match self {
            TetradValue::Num(s) => s.parse::<f64>().ok(),
            TetradValue::Str(_) => None,
        }
    }
}

/// Atomic comparison predicate: variable, operator, one value.
#[derive(Clone, Debug, PartialEq)]
pub struct Tetrad {
    pub var: String,
    pub op: CmpOp,
    pub value: TetradValue,
    /// True when the source had the literal on the left and the comparison
    /// was canonicalized by swapping sides and flipping the operator.
    pub reversed: bool,
}

impl Tetrad {
    pub fn new(var: impl Into<String>, op: CmpOp, value: TetradValue) -> Self {
        Self {
            var: var.into(),
            op,
            value,
            reversed: false,
        }
    }

    /// A value like `numpy.take(indices, axis)`: documentation sometimes
    /// compares a parameter against a call-derived "virtual" value.
    pub fn has_call_value(&self) -> bool {
        matches!(&self.value, TetradValue::Str(s) if s.contains('('))
    }

    pub fn render(&self) -> String {
        match &self.value {
            TetradValue::Str(s) => format!("{} {} '{}'", self.var, self.op, s),
            TetradValue::Num(n) => format!("{} {} {}", self.var, self.op, n),
        }
    }
}

/// Formula shape with indexed predicate placeholders.
///
/// A compiled constraint keeps its tetrads and its skeleton separately so the
/// verification engine can substitute aligned variable names into the tetrads
/// and re-instantiate the same shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Skeleton {
    Leaf(usize),
    Not(Box<Skeleton>),
    And(Box<Skeleton>, Box<Skeleton>),
    Or(Box<Skeleton>, Box<Skeleton>),
}

impl Skeleton {
    /// Rendered placeholder form: `({0}^[{1}])`.
    pub fn render(&self) -> String {
        match self {
            Skeleton::Leaf(i) => format!("{{{i}}}"),
            Skeleton::Not(inner) => format!("[{}]", inner.render()),
            Skeleton::And(a, b) => format!("({}^{})", a.render(), b.render()),
            Skeleton::Or(a, b) => format!("({}|{})", a.render(), b.render()),
        }
    }

    pub fn leaf_indices(&self) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<usize>) {
        match self {
            Skeleton::Leaf(i) => out.push(*i),
            Skeleton::Not(inner) => inner.collect_leaves(out),
            Skeleton::And(a, b) | Skeleton::Or(a, b) => {
                a.collect_leaves(out);
                b.collect_leaves(out);
            }
        }
    }

    /// Zip the shape with a tetrad list. `None` when a placeholder index is
    /// out of range.
    pub fn instantiate(&self, tetrads: &[Tetrad]) -> Option<Formula> {
        match self {
            Skeleton::Leaf(i) => tetrads.get(*i).cloned().map(Formula::Pred),
            Skeleton::Not(inner) => Some(Formula::Not(Box::new(inner.instantiate(tetrads)?))),
            Skeleton::And(a, b) => Some(Formula::And(
                Box::new(a.instantiate(tetrads)?),
                Box::new(b.instantiate(tetrads)?),
            )),
            Skeleton::Or(a, b) => Some(Formula::Or(
                Box::new(a.instantiate(tetrads)?),
                Box::new(b.instantiate(tetrads)?),
            )),
        }
    }
}

/// Boolean combinator formula over tetrads.
#[derive(Clone, Debug, PartialEq)]
pub enum Formula {
    Pred(Tetrad),
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
}

impl Formula {
    pub fn and(a: Formula, b: Formula) -> Formula {
        Formula::And(Box::new(a), Box::new(b))
    }

    pub fn or(a: Formula, b: Formula) -> Formula {
        Formula::Or(Box::new(a), Box::new(b))
    }

    pub fn not(inner: Formula) -> Formula {
        Formula::Not(Box::new(inner))
    }

    /// Conjunction of a non-empty tetrad list.
    pub fn conjunction(tetrads: &[Tetrad]) -> Option<Formula> {
        let mut iter = tetrads.iter().cloned().map(Formula::Pred);
        let first = iter.next()?;
        Some(iter.fold(first, Formula::and))
    }

    pub fn variables(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Formula::Pred(t) => {
                out.insert(t.var.as_str());
            }
            Formula::Not(inner) => inner.collect_variables(out),
            Formula::And(a, b) | Formula::Or(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
        }
    }

    /// Source-notation rendering; compiles back to an equivalent formula.
    pub fn render(&self) -> String {
        match self {
            Formula::Pred(t) => format!("({})", t.render()),
            Formula::Not(inner) => format!("[{}]", inner.render()),
            Formula::And(a, b) => format!("({} ^ {})", a.render(), b.render()),
            Formula::Or(a, b) => format!("({} | {})", a.render(), b.render()),
        }
    }
}

/// How an execution path ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbnormalKind {
    Error,
    Assertion,
    Warning,
}

impl fmt::Display for AbnormalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AbnormalKind::Error => "error",
            AbnormalKind::Assertion => "assertion",
            AbnormalKind::Warning => "warning",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Terminal {
    /// Literal return-value echo after the final arrow.
    Normal(String),
    /// Error/assertion/warning ending with the guard tetrads that caused it.
    Abnormal {
        kind: AbnormalKind,
        guard: Vec<Tetrad>,
    },
}

impl Terminal {
    pub fn is_abnormal(&self) -> bool {
        matches!(self, Terminal::Abnormal { .. })
    }
}

/// One control-flow route through a normalized function: a conjunctive guard
/// plus a terminal tag. Produced once per function by the external symbolic
/// executor; re-parsed on each use, never cached.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub tetrads: Vec<Tetrad>,
    pub skeleton: Skeleton,
    pub formula: Formula,
    pub terminal: Terminal,
    pub source: String,
}

impl Path {
    pub fn variables(&self) -> BTreeSet<&str> {
        self.tetrads.iter().map(|t| t.var.as_str()).collect()
    }
}

/// Per (function, constraint) outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    BadConstraint,
    BadConstraintWithError,
    BadConstraintWithFuzzy,
}

impl Verdict {
    pub fn is_violation(self) -> bool {
        !matches!(self, Verdict::Ok)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Ok => "OK",
            Verdict::BadConstraint => "BAD CONSTRAINT",
            Verdict::BadConstraintWithError => "BAD CONSTRAINT (error path)",
            Verdict::BadConstraintWithFuzzy => "BAD CONSTRAINT (fuzzy)",
        };
        f.write_str(s)
    }
}
