//! End-to-end verification runs over documentation-style constraints and
//! symbolic-execution path lines.

use veridoc_ast::Verdict;
use veridoc_verify::{DenseOrderBackend, Engine, UnitInputs, VerifyConfig};

fn engine() -> Engine<DenseOrderBackend> {
    Engine::new(DenseOrderBackend, VerifyConfig::default())
}

fn unit(constraints: &[&str], paths: &[&str]) -> UnitInputs {
    UnitInputs {
        library: "sklearn".into(),
        class: Some("AgglomerativeClustering".into()),
        function: "fit".into(),
        constraints: constraints.iter().map(|s| s.to_string()).collect(),
        path_lines: paths.iter().map(|s| s.to_string()).collect(),
        path_source: "fit_path.txt".into(),
    }
}

#[test]
fn documented_combination_no_path_realizes() {
    let report = engine()
        .check_unit(&unit(
            &["(n_clusters = 'None') ^ (distance_threshold != 'None')"],
            &[
                "(n_clusters != 'None')^(distance_threshold != 'None')->'labels'",
                "(n_clusters != 'None')^(distance_threshold = 'None')->'labels'",
            ],
        ))
        .unwrap();
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].verdict, Verdict::BadConstraint);
    assert!(report.violations().count() == 1);
}

#[test]
fn documented_implication_matches_a_guard() {
    let report = engine()
        .check_unit(&unit(
            &["(affinity = 'precomputed') -> (n_neighbors = 'None')"],
            &[
                "(affinity = 'precomputed')^(n_neighbors = 'None')->'graph'",
                "(affinity = 'rbf')^(n_neighbors != 'None')->'graph'",
            ],
        ))
        .unwrap();
    assert_eq!(report.findings[0].verdict, Verdict::Ok);
}

#[test]
fn documented_combination_triggers_the_error_path() {
    let report = engine()
        .check_unit(&unit(
            &["(kernel = 'linear') ^ (degree = 3)"],
            &["(kernel = 'linear')^(degree = 3)->(kernel = 'linear')_error_END"],
        ))
        .unwrap();
    assert_eq!(report.findings[0].verdict, Verdict::BadConstraintWithError);
}

#[test]
fn assertion_and_warning_endings_also_count_as_abnormal() {
    // An error path incompatible with the constraint supports it instead.
    let report = engine()
        .check_unit(&unit(
            &["(n_jobs != 'None') ^ (verbose = 'True')"],
            &[
                "(n_jobs = 'None')^(verbose = 'True')->(n_jobs = 'None')_assert_END",
                "(n_jobs != 'None')^(verbose = 'True')->'model'",
            ],
        ))
        .unwrap();
    assert_eq!(report.findings[0].verdict, Verdict::Ok);
}

#[test]
fn inert_parameter_claim_corroborated_by_its_absence() {
    let report = engine()
        .check_unit(&unit(
            &["(affinity = 'nearest_neighbors') -> (gamma has no effect)"],
            &[
                "(affinity = 'nearest_neighbors')->'labels'",
                "(affinity = 'rbf')^(gamma > 0)->'labels'",
            ],
        ))
        .unwrap();
    assert_eq!(report.findings[0].verdict, Verdict::Ok);
}

#[test]
fn inert_parameter_claim_contradicted_when_every_path_binds_it() {
    let report = engine()
        .check_unit(&unit(
            &["(affinity = 'nearest_neighbors') -> (gamma has no effect)"],
            &["(affinity = 'nearest_neighbors')^(gamma > 0)->'labels'"],
        ))
        .unwrap();
    assert_eq!(report.findings[0].verdict, Verdict::BadConstraintWithFuzzy);
}

#[test]
fn drifted_parameter_name_is_reconciled_before_voting() {
    let report = engine()
        .check_unit(&unit(
            &["(n_components = 'None') ^ (whiten = 'True')"],
            &["(ncomp = 'None')^(whiten != 'False')->'model'"],
        ))
        .unwrap();
    assert_eq!(report.findings[0].verdict, Verdict::Ok);
}

#[test]
fn numeric_ranges_are_decided_not_text_matched() {
    let report = engine()
        .check_unit(&unit(
            &[
                "(tol > 0.5) ^ (tol < 0.1)",
                "(n_estimators > 10) ^ (n_estimators < 100)",
            ],
            &["(tol > 0)^(n_estimators > 50)->'model'"],
        ))
        .unwrap();
    // Fail-fast halts at the empty 0.5..0.1 range.
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].verdict, Verdict::BadConstraint);

    let exhaustive = Engine::new(DenseOrderBackend, VerifyConfig { fail_fast: false });
    let report = exhaustive
        .check_unit(&unit(
            &[
                "(tol > 0.5) ^ (tol < 0.1)",
                "(n_estimators > 10) ^ (n_estimators < 100)",
            ],
            &["(tol > 0)^(n_estimators > 50)->'model'"],
        ))
        .unwrap();
    assert_eq!(report.findings.len(), 2);
    assert_eq!(report.findings[0].verdict, Verdict::BadConstraint);
    assert_eq!(report.findings[1].verdict, Verdict::Ok);
}

#[test]
fn literal_first_comparisons_are_understood() {
    let report = engine()
        .check_unit(&unit(
            &["(10 < max_iter) ^ (max_iter <= 1000)"],
            &["(max_iter > 100)->'model'"],
        ))
        .unwrap();
    assert_eq!(report.findings[0].verdict, Verdict::Ok);
}

#[test]
fn symbolic_bound_values_are_related_variables() {
    let report = engine()
        .check_unit(&unit(
            &["(min_samples <= 'n_samples') ^ (min_samples >= 1)"],
            &["(min_samples <= 'n_samples')^(min_samples >= 1)->'core'"],
        ))
        .unwrap();
    assert_eq!(report.findings[0].verdict, Verdict::Ok);
}

#[test]
fn malformed_path_lines_never_produce_violations() {
    let report = engine()
        .check_unit(&unit(
            &["(alpha = 'None') ^ (beta != 'None')"],
            &["((alpha = ->"],
        ))
        .unwrap();
    assert_eq!(report.findings[0].verdict, Verdict::Ok);
}

#[test]
fn skips_and_invalids_are_accounted_for() {
    let report = engine()
        .check_unit(&unit(
            &[
                "(metric = 'callable') ^ (n_jobs != 'None')",
                "(alpha = ) ^ (beta = 'None')",
                "(alpha = 'None') ^ (beta = 'None')",
            ],
            &["(alpha = 'None')^(beta = 'None')->'r'"],
        ))
        .unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.invalid_constraints.len(), 1);
    assert_eq!(report.checked, 1);
    assert_eq!(report.findings[0].verdict, Verdict::Ok);
}
