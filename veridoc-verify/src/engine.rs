#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use tracing::{debug, warn};
use veridoc_align::{align, total_similarity};
use veridoc_ast::{Formula, Path, Terminal, Verdict};
use veridoc_parse::{compile, compile_path, ParseFailure};

use crate::solver::{SatBackend, SolveError};
use crate::vocab;

/// Similarity scores strictly inside this band are flagged for review,
/// not discarded.
const REVIEW_BAND: (f64, f64) = (0.85, 1.0);

#[derive(Clone, Copy, Debug)]
pub struct VerifyConfig {
    /// Halt a unit's run at the first violation (triage default); the
    /// exhaustive alternative collects every verdict.
    pub fail_fast: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self { fail_fast: true }
    }
}

/// Everything the engine needs for one documented function: its identity,
/// its ordered constraint list, and the raw path lines from the symbolic
/// executor.
#[derive(Clone, Debug)]
pub struct UnitInputs {
    pub library: String,
    pub class: Option<String>,
    pub function: String,
    pub constraints: Vec<String>,
    pub path_lines: Vec<String>,
    /// Display name of the path file, echoed in violation reports.
    pub path_source: String,
}

/// Per (function, constraint) verdict.
#[derive(Clone, Debug)]
pub struct Finding {
    pub library: String,
    pub class: Option<String>,
    pub function: String,
    pub constraint: String,
    pub path_source: String,
    pub verdict: Verdict,
}

#[derive(Clone, Debug, Default)]
pub struct UnitReport {
    pub findings: Vec<Finding>,
    /// End-of-function summary of constraints that failed to compile.
    pub invalid_constraints: Vec<String>,
    pub checked: usize,
    pub skipped: usize,
}

impl UnitReport {
    pub fn violations(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.verdict.is_violation())
    }
}

enum CheckError {
    Parse(ParseFailure),
    Solve(SolveError),
}

impl From<ParseFailure> for CheckError {
    fn from(e: ParseFailure) -> Self {
        CheckError::Parse(e)
    }
}

impl From<SolveError> for CheckError {
    fn from(e: SolveError) -> Self {
        CheckError::Solve(e)
    }
}

const STRUCTURAL_SYMBOLS: [char; 8] = [' ', '.', '(', ')', '[', ']', '{', '}'];

fn has_structural_symbols(name: &str) -> bool {
    name.contains(STRUCTURAL_SYMBOLS)
}

pub struct Engine<B: SatBackend> {
    backend: B,
    config: VerifyConfig,
}

impl<B: SatBackend> Engine<B> {
    pub fn new(backend: B, config: VerifyConfig) -> Self {
        Self { backend, config }
    }

    /// Check every constraint of one function against its enumerated paths.
    pub fn check_unit(&self, unit: &UnitInputs) -> Result<UnitReport, SolveError> {
        let mut report = UnitReport::default();

        if unit.constraints.is_empty() {
            warn!(function = %unit.function, "constraint list empty");
            return Ok(report);
        }

        for (idx, text) in unit.constraints.iter().enumerate() {
            if vocab::has_unsolvable_words(text) {
                debug!(constraint = %text, "skipping constraint with unsolvable vocabulary");
                report.skipped += 1;
                continue;
            }

            let verdict = match self.check_constraint(text, &unit.path_lines) {
                Ok(Some(v)) => v,
                Ok(None) => {
                    report.skipped += 1;
                    continue;
                }
                Err(CheckError::Parse(e)) => {
                    debug!(constraint = %text, error = %e, "constraint failed to compile");
                    report.invalid_constraints.push(format!("{}. {text}", idx + 1));
                    continue;
                }
                Err(CheckError::Solve(e)) => return Err(e),
            };

            report.checked += 1;
            let is_violation = verdict.is_violation();
            report.findings.push(Finding {
                library: unit.library.clone(),
                class: unit.class.clone(),
                function: unit.function.clone(),
                constraint: text.clone(),
                path_source: unit.path_source.clone(),
                verdict,
            });
            if is_violation && self.config.fail_fast {
                break;
            }
        }

        if !report.invalid_constraints.is_empty() {
            warn!(
                function = %unit.function,
                "invalid constraints:\n{}",
                report.invalid_constraints.join("\n")
            );
        }
        Ok(report)
    }

    fn check_constraint(
        &self,
        text: &str,
        path_lines: &[String],
    ) -> Result<Option<Verdict>, CheckError> {
        // The fuzzy branch is decided on the consequent alone: a qualitative
        // consequent usually does not compile as a predicate.
        if let Some((antecedent, consequent)) = text.split_once("->") {
            if let Some(kind) = vocab::fuzz_kind(consequent) {
                return self.check_fuzzy(text, antecedent, consequent, kind, path_lines);
            }
        }
        self.check_crisp(text, path_lines)
    }

    /// Crisp branch: align the constraint onto the path vocabulary, then let
    /// every in-scope path vote on realizability.
    fn check_crisp(
        &self,
        text: &str,
        path_lines: &[String],
    ) -> Result<Option<Verdict>, CheckError> {
        let compiled = compile(text)?;

        if compiled.tetrads.len() < 2 {
            debug!(constraint = %text, "skipping constraint with no relational content");
            return Ok(None);
        }
        if compiled
            .tetrads
            .iter()
            .any(|t| has_structural_symbols(&t.var))
        {
            debug!(constraint = %text, "skipping constraint with structural symbols in names");
            return Ok(None);
        }

        let (paths, unparseable) = compile_paths(path_lines);

        let pool: Vec<_> = paths.iter().flat_map(|p| p.tetrads.clone()).collect();
        let aligned = align(&compiled.tetrads, &pool);
        let score = total_similarity(&compiled.skeleton, &aligned.tetrads, &aligned.scores);
        if score > REVIEW_BAND.0 && score < REVIEW_BAND.1 {
            warn!(constraint = %text, similarity = score, "ambiguous alignment similarity");
        }

        let constraint = compiled
            .with_tetrads(aligned.tetrads)
            .ok_or_else(|| internal_failure(text))?;
        let cons_vars: BTreeSet<&str> = constraint.variables().into_iter().collect();

        // A path that failed to compile cannot contradict the constraint;
        // it votes in favor rather than produce a spurious violation.
        let mut votes: Vec<bool> = vec![true; unparseable];

        for path in &paths {
            if !cons_vars.is_subset(&path.variables()) {
                votes.push(false);
                continue;
            }
            match &path.terminal {
                Terminal::Abnormal { guard, .. } => {
                    if let Some(error_guard) = Formula::conjunction(guard) {
                        let coincides = self
                            .backend
                            .is_sat(&Formula::and(constraint.formula.clone(), error_guard))?;
                        if coincides {
                            // The documented-valid scenario reaches the error
                            // trigger itself.
                            return Ok(Some(Verdict::BadConstraintWithError));
                        }
                    }
                    let compatible = self.backend.is_sat(&Formula::and(
                        constraint.formula.clone(),
                        path.formula.clone(),
                    ))?;
                    votes.push(!compatible);
                }
                Terminal::Normal(_) => {
                    let realizable = self.backend.is_sat(&Formula::and(
                        constraint.formula.clone(),
                        path.formula.clone(),
                    ))?;
                    votes.push(realizable);
                }
            }
        }

        if votes.is_empty() {
            debug!(constraint = %text, "no paths to check against");
            return Ok(Some(Verdict::Ok));
        }
        Ok(Some(if votes.iter().any(|v| *v) {
            Verdict::Ok
        } else {
            Verdict::BadConstraint
        }))
    }

    /// Fuzzy branch: the consequent names variables that must (or must not)
    /// take part in some path; corroboration is lexical, the antecedent
    /// still has to be realizable on a normal path.
    fn check_fuzzy(
        &self,
        text: &str,
        antecedent: &str,
        consequent: &str,
        kind: vocab::FuzzKind,
        path_lines: &[String],
    ) -> Result<Option<Verdict>, CheckError> {
        let vars = vocab::fuzzword_vars(consequent, kind);
        if vars.is_empty() {
            debug!(constraint = %text, "fuzzy consequent names no variables");
            return Ok(None);
        }

        let compiled = compile(antecedent.trim())?;
        if compiled
            .tetrads
            .iter()
            .any(|t| has_structural_symbols(&t.var))
        {
            debug!(constraint = %text, "skipping constraint with structural symbols in names");
            return Ok(None);
        }
        let ante_vars: BTreeSet<&str> = compiled.variables().into_iter().collect();

        let (paths, unparseable) = compile_paths(path_lines);
        let mut supported = unparseable > 0;

        for path in &paths {
            let corroborated = match kind {
                vocab::FuzzKind::Existence => {
                    vars.iter().all(|v| vocab::word_present(&path.source, v))
                }
                vocab::FuzzKind::Nonexistence => {
                    !vars.iter().any(|v| vocab::word_present(&path.source, v))
                }
            };
            if !corroborated || path.terminal.is_abnormal() {
                continue;
            }
            if !ante_vars.is_subset(&path.variables()) {
                continue;
            }
            if self.backend.is_sat(&Formula::and(
                compiled.formula.clone(),
                path.formula.clone(),
            ))? {
                supported = true;
                break;
            }
        }

        Ok(Some(if supported {
            Verdict::Ok
        } else {
            Verdict::BadConstraintWithFuzzy
        }))
    }
}

fn compile_paths(path_lines: &[String]) -> (Vec<Path>, usize) {
    let mut paths = Vec::with_capacity(path_lines.len());
    let mut unparseable = 0usize;
    for line in path_lines {
        if line.trim().is_empty() {
            continue;
        }
        match compile_path(line) {
            Ok(p) => paths.push(p),
            Err(e) => {
                debug!(path = %line, error = %e, "path failed to compile");
                unparseable += 1;
            }
        }
    }
    (paths, unparseable)
}

fn internal_failure(text: &str) -> CheckError {
    CheckError::Parse(ParseFailure {
        message: "internal: skeleton no longer matches tetrad list".to_string(),
        span: veridoc_ast::span_between(0, text.len()),
    })
}
