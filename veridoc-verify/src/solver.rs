#![forbid(unsafe_code)]

use std::collections::HashMap;

use miette::Diagnostic;
use thiserror::Error;
use veridoc_ast::{CmpOp, Formula, Tetrad, TetradValue};

#[derive(Debug, Error, Diagnostic)]
pub enum SolveError {
    #[error("malformed numeric literal '{0}'")]
    #[diagnostic(code(veridoc::solve))]
    BadNumber(String),
}

/// One satisfiability query. Each call works on a fresh solver state: no
/// assertion leakage between checks, no shared context.
pub trait SatBackend {
    fn is_sat(&self, formula: &Formula) -> Result<bool, SolveError>;
}

/// Built-in decision procedure for the tetrad fragment.
///
/// Tetrad formulas live in a two-sorted theory: string facets admit only
/// equality and disequality against constants, numeric facets form a dense
/// unbounded linear order with constants and variable-variable ordering
/// (a string-valued ordering comparison reads its value as a second
/// variable, matching the SMT encoding). DNF expansion plus a per-
/// conjunction consistency check is complete here.
pub struct DenseOrderBackend;

impl SatBackend for DenseOrderBackend {
    fn is_sat(&self, formula: &Formula) -> Result<bool, SolveError> {
        for conjunct in dnf(formula, false) {
            if conjunction_consistent(&conjunct)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn cross(a: Vec<Vec<Tetrad>>, b: Vec<Vec<Tetrad>>) -> Vec<Vec<Tetrad>> {
    let mut out = Vec::with_capacity(a.len() * b.len());
    for x in &a {
        for y in &b {
            let mut row = x.clone();
            row.extend(y.iter().cloned());
            out.push(row);
        }
    }
    out
}

/// Disjunctive normal form with negation pushed onto operators.
fn dnf(formula: &Formula, negated: bool) -> Vec<Vec<Tetrad>> {
    match formula {
        Formula::Pred(t) => {
            let mut t = t.clone();
            if negated {
                t.op = t.op.negate();
            }
            vec![vec![t]]
        }
        Formula::Not(inner) => dnf(inner, !negated),
        Formula::And(a, b) if !negated => cross(dnf(a, false), dnf(b, false)),
        Formula::And(a, b) => {
            let mut out = dnf(a, true);
            out.extend(dnf(b, true));
            out
        }
        Formula::Or(a, b) if !negated => {
            let mut out = dnf(a, false);
            out.extend(dnf(b, false));
            out
        }
        Formula::Or(a, b) => cross(dnf(a, true), dnf(b, true)),
    }
}

enum NumAtom {
    VarConst(String, CmpOp, f64),
    VarVar(String, CmpOp, String),
}

enum Atom {
    Num(NumAtom),
    Str { var: String, eq: bool, value: String },
}

/// Sort split mirroring the SMT encoding: `True`/`False` encode as the
/// numeric facet being nonzero/zero; generic string values compare on the
/// string facet for equality and as a second numeric variable for ordering.
fn classify(t: &Tetrad) -> Result<Atom, SolveError> {
    match &t.value {
        TetradValue::Num(text) => {
            let v: f64 = text
                .parse()
                .map_err(|_| SolveError::BadNumber(text.clone()))?;
            Ok(Atom::Num(NumAtom::VarConst(t.var.clone(), t.op, v)))
        }
        TetradValue::Str(s) if s == "True" || s == "False" => {
            if matches!(t.op, CmpOp::Eq | CmpOp::Ne) {
                let wants_nonzero = (s == "True") == (t.op == CmpOp::Eq);
                let op = if wants_nonzero { CmpOp::Ne } else { CmpOp::Eq };
                Ok(Atom::Num(NumAtom::VarConst(t.var.clone(), op, 0.0)))
            } else {
                Ok(Atom::Num(NumAtom::VarVar(t.var.clone(), t.op, s.clone())))
            }
        }
        TetradValue::Str(s) => {
            if t.op.is_ordering() {
                Ok(Atom::Num(NumAtom::VarVar(t.var.clone(), t.op, s.clone())))
            } else {
                Ok(Atom::Str {
                    var: t.var.clone(),
                    eq: t.op == CmpOp::Eq,
                    value: s.clone(),
                })
            }
        }
    }
}

fn conjunction_consistent(atoms: &[Tetrad]) -> Result<bool, SolveError> {
    let mut num_atoms: Vec<NumAtom> = Vec::new();
    let mut str_eq: HashMap<String, Vec<(bool, String)>> = HashMap::new();

    for tetrad in atoms {
        match classify(tetrad)? {
            Atom::Num(num) => num_atoms.push(num),
            Atom::Str { var, eq, value } => {
                str_eq.entry(var).or_default().push((eq, value));
            }
        }
    }

    // String facets: at most one required value, never a required value that
    // is also excluded. The string domain is unbounded, so disequalities
    // alone are always satisfiable.
    for constraints in str_eq.values() {
        let mut required: Option<&String> = None;
        for (is_eq, value) in constraints {
            if *is_eq {
                match required {
                    None => required = Some(value),
                    Some(prev) if prev == value => {}
                    Some(_) => return Ok(false),
                }
            }
        }
        if let Some(req) = required {
            if constraints.iter().any(|(is_eq, v)| !is_eq && v == req) {
                return Ok(false);
            }
        }
    }

    Ok(numeric_consistent(&num_atoms))
}

/// Order-graph consistency for the numeric facets.
///
/// Nodes are variables and constants; `<`/`<=` constraints become directed
/// edges with a strictness flag, equalities become edges both ways, and the
/// known total order of the constants is added as strict edges. Over a dense
/// unbounded order the conjunction is unsatisfiable exactly when the
/// transitive closure yields a strict cycle or forces a disequal pair into
/// the same equivalence class.
fn numeric_consistent(atoms: &[NumAtom]) -> bool {
    let mut vars: HashMap<&str, usize> = HashMap::new();
    let mut consts: Vec<f64> = Vec::new();
    let mut edges: Vec<(usize, usize, bool)> = Vec::new();
    let mut diseqs: Vec<(usize, usize)> = Vec::new();

    // Node ids: variables first, constants after. Two passes so constant
    // ids stay stable while variables are still being discovered.
    for atom in atoms {
        match atom {
            NumAtom::VarConst(v, _, _) => {
                let next = vars.len();
                vars.entry(v.as_str()).or_insert(next);
            }
            NumAtom::VarVar(v, _, w) => {
                let next = vars.len();
                vars.entry(v.as_str()).or_insert(next);
                let next = vars.len();
                vars.entry(w.as_str()).or_insert(next);
            }
        }
    }
    let var_count = vars.len();
    let mut const_id = |consts: &mut Vec<f64>, value: f64| -> usize {
        match consts.iter().position(|c| *c == value) {
            Some(i) => var_count + i,
            None => {
                consts.push(value);
                var_count + consts.len() - 1
            }
        }
    };

    for atom in atoms {
        let (u, op, v) = match atom {
            NumAtom::VarConst(var, op, value) => {
                (vars[var.as_str()], *op, const_id(&mut consts, *value))
            }
            NumAtom::VarVar(a, op, b) => (vars[a.as_str()], *op, vars[b.as_str()]),
        };
        match op {
            CmpOp::Eq => {
                edges.push((u, v, false));
                edges.push((v, u, false));
            }
            CmpOp::Ne => diseqs.push((u, v)),
            CmpOp::Lt => edges.push((u, v, true)),
            CmpOp::Le => edges.push((u, v, false)),
            CmpOp::Gt => edges.push((v, u, true)),
            CmpOp::Ge => edges.push((v, u, false)),
        }
    }

    // Known order among the constants.
    let mut sorted: Vec<usize> = (0..consts.len()).collect();
    sorted.sort_by(|a, b| consts[*a].partial_cmp(&consts[*b]).unwrap_or(std::cmp::Ordering::Equal));
    for pair in sorted.windows(2) {
        edges.push((var_count + pair[0], var_count + pair[1], true));
    }

    let n = var_count + consts.len();
    let mut reach = vec![vec![false; n]; n];
    let mut strict = vec![vec![false; n]; n];
    for i in 0..n {
        reach[i][i] = true;
    }
    for (u, v, s) in edges {
        reach[u][v] = true;
        if s {
            strict[u][v] = true;
        }
    }

    for k in 0..n {
        for i in 0..n {
            if !reach[i][k] {
                continue;
            }
            for j in 0..n {
                if reach[k][j] {
                    reach[i][j] = true;
                    if strict[i][k] || strict[k][j] {
                        strict[i][j] = true;
                    }
                }
            }
        }
    }

    for i in 0..n {
        if strict[i][i] {
            return false;
        }
    }
    for (u, v) in diseqs {
        if reach[u][v] && reach[v][u] {
            return false;
        }
    }
    true
}

#[cfg(feature = "z3")]
pub mod z3_backend {
    //! Z3-backed satisfiability, enabled with `--features veridoc-verify/z3`.
    //!
    //! A fresh `Context` and `Solver` per query keeps checks independent.
    //! String values are interned to integer codes: the fragment only ever
    //! compares string facets for equality, so the encoding is exact.

    use std::collections::HashMap;

    use veridoc_ast::{CmpOp, Formula, Tetrad, TetradValue};
    use z3::{
        ast::{Ast, Bool, Real},
        Config, Context, SatResult, Solver,
    };

    use super::{SatBackend, SolveError};

    pub struct Z3Backend;

    impl SatBackend for Z3Backend {
        fn is_sat(&self, formula: &Formula) -> Result<bool, SolveError> {
            let cfg = Config::new();
            let ctx = Context::new(&cfg);
            let solver = Solver::new(&ctx);
            let mut interner = Interner::default();
            solver.assert(&to_bool(&ctx, formula, &mut interner)?);
            Ok(matches!(solver.check(), SatResult::Sat))
        }
    }

    #[derive(Default)]
    struct Interner {
        codes: HashMap<String, i32>,
    }

    impl Interner {
        fn code(&mut self, s: &str) -> i32 {
            let next = self.codes.len() as i32;
            *self.codes.entry(s.to_string()).or_insert(next)
        }
    }

    fn to_bool<'c>(
        ctx: &'c Context,
        formula: &Formula,
        interner: &mut Interner,
    ) -> Result<Bool<'c>, SolveError> {
        match formula {
            Formula::Pred(t) => atom(ctx, t, interner),
            Formula::Not(inner) => Ok(to_bool(ctx, inner, interner)?.not()),
            Formula::And(a, b) => {
                let a = to_bool(ctx, a, interner)?;
                let b = to_bool(ctx, b, interner)?;
                Ok(Bool::and(ctx, &[&a, &b]))
            }
            Formula::Or(a, b) => {
                let a = to_bool(ctx, a, interner)?;
                let b = to_bool(ctx, b, interner)?;
                Ok(Bool::or(ctx, &[&a, &b]))
            }
        }
    }

    fn real_lit<'c>(ctx: &'c Context, text: &str) -> Result<Real<'c>, SolveError> {
        let (int_part, frac_part) = match text.split_once('.') {
            Some((i, f)) => (i, f),
            None => (text, ""),
        };
        let digits = format!("{int_part}{frac_part}");
        let num: i32 = digits
            .parse()
            .map_err(|_| SolveError::BadNumber(text.to_string()))?;
        let den = 10_i32
            .checked_pow(frac_part.len() as u32)
            .ok_or_else(|| SolveError::BadNumber(text.to_string()))?;
        Ok(Real::from_real(ctx, num, den))
    }

    fn cmp<'c>(op: CmpOp, lhs: &Real<'c>, rhs: &Real<'c>) -> Bool<'c> {
        match op {
            CmpOp::Eq => lhs._eq(rhs),
            CmpOp::Ne => lhs._eq(rhs).not(),
            CmpOp::Lt => lhs.lt(rhs),
            CmpOp::Le => lhs.le(rhs),
            CmpOp::Gt => lhs.gt(rhs),
            CmpOp::Ge => lhs.ge(rhs),
        }
    }

    fn atom<'c>(
        ctx: &'c Context,
        t: &Tetrad,
        interner: &mut Interner,
    ) -> Result<Bool<'c>, SolveError> {
        let var = Real::new_const(ctx, t.var.as_str());
        match &t.value {
            TetradValue::Num(text) => {
                let value = real_lit(ctx, text)?;
                Ok(cmp(t.op, &var, &value))
            }
            TetradValue::Str(s) if s == "True" || s == "False" => {
                let zero = Real::from_real(ctx, 0, 1);
                let wants_nonzero = (s == "True") == (t.op == CmpOp::Eq);
                if wants_nonzero {
                    Ok(var._eq(&zero).not())
                } else {
                    Ok(var._eq(&zero))
                }
            }
            TetradValue::Str(s) => {
                if t.op.is_ordering() {
                    // Ordering against a named value reads it as a second
                    // variable.
                    let other = Real::new_const(ctx, s.as_str());
                    Ok(cmp(t.op, &var, &other))
                } else {
                    let facet = Real::new_const(ctx, format!("{}$str", t.var));
                    let code = Real::from_real(ctx, interner.code(s), 1);
                    Ok(cmp(t.op, &facet, &code))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veridoc_parse::compile;

    fn sat(text: &str) -> bool {
        DenseOrderBackend
            .is_sat(&compile(text).unwrap().formula)
            .unwrap()
    }

    #[test]
    fn contradictory_string_equalities_are_unsat() {
        assert!(!sat("(kernel = 'linear') ^ (kernel = 'rbf')"));
        assert!(sat("(kernel = 'linear') ^ (gamma = 'rbf')"));
    }

    #[test]
    fn string_equality_with_matching_disequality_is_unsat() {
        assert!(!sat("(kernel = 'linear') ^ (kernel != 'linear')"));
        assert!(sat("(kernel = 'linear') ^ (kernel != 'rbf')"));
    }

    #[test]
    fn disequalities_alone_are_sat() {
        assert!(sat("(kernel != 'linear') ^ (kernel != 'rbf')"));
    }

    #[test]
    fn numeric_bounds_respect_density() {
        assert!(!sat("(x < 5) ^ (x > 10)"));
        // Dense order: something lives strictly between 4 and 5.
        assert!(sat("(x > 4) ^ (x < 5)"));
        assert!(!sat("(x > 4) ^ (x < 4)"));
        assert!(sat("(x >= 4) ^ (x <= 4)"));
    }

    #[test]
    fn pinned_value_with_disequality_is_unsat() {
        assert!(!sat("(x = 3) ^ (x != 3)"));
        assert!(!sat("(x >= 3) ^ (x <= 3) ^ (x != 3)"));
        assert!(sat("(x >= 3) ^ (x <= 4) ^ (x != 3)"));
    }

    #[test]
    fn variable_ordering_cycles_are_unsat() {
        assert!(!sat("(x < y) ^ (y < x)"));
        assert!(sat("(x <= y) ^ (y <= x)"));
        assert!(!sat("(x < y) ^ (y < z) ^ (z < x)"));
        assert!(sat("(x < y) ^ (y < z)"));
    }

    #[test]
    fn ordering_mixes_constants_and_variables() {
        assert!(!sat("(x < y) ^ (y < 3) ^ (x > 5)"));
        assert!(sat("(x < y) ^ (y < 3) ^ (x > 2)"));
    }

    #[test]
    fn boolean_values_use_the_numeric_facet() {
        assert!(!sat("(flag = 'True') ^ (flag = 'False')"));
        assert!(!sat("(flag = 'True') ^ (flag != 'True')"));
        assert!(sat("(flag = 'True') ^ (flag != 'False')"));
    }

    #[test]
    fn negation_and_disjunction_expand_through_dnf() {
        assert!(sat("[(x < 5)] ^ (x > 3)"));
        assert!(!sat("[(x < 5) | (x > 3)]"));
        assert!(sat("(x = 1) | (x = 2)"));
        assert!(!sat("[(x = 1)] ^ (x = 1)"));
    }

    #[test]
    fn reversed_literal_comparison_solves_identically() {
        assert!(!sat("(10 < x) ^ (x < 9)"));
        assert!(sat("(10 < x) ^ (x < 11)"));
    }

    #[test]
    fn string_and_numeric_facets_are_independent() {
        // The SMT encoding keeps x's string facet and numeric facet apart.
        assert!(sat("(x = 'auto') ^ (x < 5)"));
    }
}
