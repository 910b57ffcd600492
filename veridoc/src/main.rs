#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;
use veridoc_verify::{DenseOrderBackend, Engine, VerifyConfig};

mod input;
mod report;
mod scanner;

#[derive(Parser, Debug)]
#[command(
    name = "veridoc",
    version,
    about = "Checks documented parameter constraints against symbolic execution paths"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Check every documented constraint of a project
    Check {
        /// Project directory: one subdirectory per documented function
        path: PathBuf,

        /// Keep checking a function after its first violation
        #[arg(long, default_value_t = false)]
        exhaustive: bool,

        /// Write a machine-readable report (JSON) to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VERIDOC_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Check {
            path,
            exhaustive,
            report,
        } => check(&path, exhaustive, report.as_deref()),
    }
}

fn check(project: &Path, exhaustive: bool, report_out: Option<&Path>) -> miette::Result<()> {
    let units = scanner::scan_project(project)?;
    if units.is_empty() {
        return Err(miette::miette!(
            "no constraint/path files found under {}",
            project.display()
        ));
    }

    let fail_fast = !exhaustive;
    let engine = Engine::new(DenseOrderBackend, VerifyConfig { fail_fast });

    let mut run = report::RunReport::new(project);
    run_units(&engine, &units, fail_fast, &mut run)?;

    if let Some(out) = report_out {
        run.write_json(out)?;
        println!("wrote {}", out.display());
    }

    println!("{}", run.summary_line());
    if !run.violations.is_empty() {
        return Err(miette::miette!(
            "{} constraint violation(s) found",
            run.violations.len()
        ));
    }
    Ok(())
}

/// Fail-fast ends the whole run at the first violating unit; remaining
/// units are never checked. Exhaustive mode visits every unit.
fn run_units<B: veridoc_verify::SatBackend>(
    engine: &Engine<B>,
    units: &[veridoc_verify::UnitInputs],
    fail_fast: bool,
    run: &mut report::RunReport,
) -> miette::Result<()> {
    for unit in units {
        println!("===== {} =====", report::unit_label(unit));
        let unit_report = engine.check_unit(unit).into_diagnostic()?;
        report::print_violations(&unit_report);
        let stop = fail_fast && unit_report.violations().next().is_some();
        run.absorb(&unit_report);
        if stop {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use veridoc_verify::UnitInputs;

    fn unit(function: &str, constraint: &str, path: &str) -> UnitInputs {
        UnitInputs {
            library: "libx".into(),
            class: None,
            function: function.into(),
            constraints: vec![constraint.into()],
            path_lines: vec![path.into()],
            path_source: format!("{function}_path.txt"),
        }
    }

    #[test]
    fn first_violating_unit_ends_a_fail_fast_run() {
        let units = [
            unit(
                "bad",
                "(a = 'None') ^ (b != 'None')",
                "(a != 'None')^(b != 'None')->'r'",
            ),
            unit(
                "never_reached",
                "(a = 'None') ^ (b = 'None')",
                "(a = 'None')^(b = 'None')->'r'",
            ),
        ];

        let engine = Engine::new(DenseOrderBackend, VerifyConfig { fail_fast: true });
        let mut run = report::RunReport::new(Path::new("p"));
        run_units(&engine, &units, true, &mut run).unwrap();
        assert_eq!(run.units, 1);
        assert_eq!(run.violations.len(), 1);

        let engine = Engine::new(DenseOrderBackend, VerifyConfig { fail_fast: false });
        let mut run = report::RunReport::new(Path::new("p"));
        run_units(&engine, &units, false, &mut run).unwrap();
        assert_eq!(run.units, 2);
        assert_eq!(run.checked, 2);
        assert_eq!(run.violations.len(), 1);
    }
}
