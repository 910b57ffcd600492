#![forbid(unsafe_code)]

use std::fs;
use std::path::Path;

use miette::IntoDiagnostic;
use serde::Serialize;
use veridoc_verify::{Finding, UnitInputs, UnitReport};

#[derive(Debug, Serialize)]
pub struct ViolationRecord {
    pub library: String,
    pub class: Option<String>,
    pub function: String,
    pub constraint: String,
    pub path_file: String,
    pub verdict: String,
}

impl From<&Finding> for ViolationRecord {
    fn from(f: &Finding) -> Self {
        Self {
            library: f.library.clone(),
            class: f.class.clone(),
            function: f.function.clone(),
            constraint: f.constraint.clone(),
            path_file: f.path_source.clone(),
            verdict: f.verdict.to_string(),
        }
    }
}

/// Whole-run totals plus every violation, serializable as JSON.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub project: String,
    pub units: usize,
    pub checked: usize,
    pub skipped: usize,
    pub invalid_constraints: usize,
    pub violations: Vec<ViolationRecord>,
}

impl RunReport {
    pub fn new(project: &Path) -> Self {
        Self {
            project: project.display().to_string(),
            units: 0,
            checked: 0,
            skipped: 0,
            invalid_constraints: 0,
            violations: Vec::new(),
        }
    }

    pub fn absorb(&mut self, unit: &UnitReport) {
        self.units += 1;
        self.checked += unit.checked;
        self.skipped += unit.skipped;
        self.invalid_constraints += unit.invalid_constraints.len();
        self.violations.extend(unit.violations().map(ViolationRecord::from));
    }

    pub fn write_json(&self, out: &Path) -> miette::Result<()> {
        let json = serde_json::to_string_pretty(self).into_diagnostic()?;
        fs::write(out, json).into_diagnostic()?;
        Ok(())
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{} unit(s), {} constraint(s) checked, {} skipped, {} invalid, {} violation(s)",
            self.units,
            self.checked,
            self.skipped,
            self.invalid_constraints,
            self.violations.len()
        )
    }
}

pub fn unit_label(unit: &UnitInputs) -> String {
    match &unit.class {
        Some(class) => format!("{}/{}/{}", unit.library, class, unit.function),
        None => format!("{}/{}", unit.library, unit.function),
    }
}

/// Human-readable violation blocks for one unit.
pub fn print_violations(unit: &UnitReport) {
    for f in unit.violations() {
        print!("{}", violation_block(f));
    }
}

fn violation_block(f: &Finding) -> String {
    let mut out = String::new();
    out.push_str(&format!("[ {} ]\n", f.verdict));
    out.push_str(&format!("  library:    {}\n", f.library));
    if let Some(class) = &f.class {
        out.push_str(&format!("  class:      {class}\n"));
    }
    out.push_str(&format!("  function:   {}\n", f.function));
    out.push_str(&format!("  constraint: {}\n", f.constraint));
    out.push_str(&format!("  paths:      {}\n", f.path_source));
    out
}
