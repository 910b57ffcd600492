#![forbid(unsafe_code)]

//! Project layout discovery.
//!
//! One directory per documented unit:
//!
//! ```text
//! <project>/<func>/<func>_constraints.txt
//! <project>/<func>/<func>_path.txt                       # free function
//! <project>/<class>/memberfunc/<m>/<m>_path.txt          # methods
//! ```
//!
//! A class directory carries one constraint file shared by all of its
//! member functions.

use std::fs;
use std::path::{Path, PathBuf};

use miette::IntoDiagnostic;
use tracing::error;
use veridoc_verify::UnitInputs;

use crate::input::extract_constraints;

pub fn scan_project(project: &Path) -> miette::Result<Vec<UnitInputs>> {
    let library = project
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("project")
        .to_string();

    let mut units = Vec::new();
    for folder in sorted_dirs(project)? {
        let Some(name) = dir_name(&folder) else {
            continue;
        };

        let constraint_file = folder.join(format!("{name}_constraints.txt"));
        let constraints = match read_optional(&constraint_file) {
            Ok(text) => extract_constraints(&text),
            Err(e) => {
                error!(file = %constraint_file.display(), error = %e, "failed to read constraint file");
                continue;
            }
        };

        let member_root = folder.join("memberfunc");
        if member_root.is_dir() {
            for member in sorted_dirs(&member_root)? {
                let Some(func) = dir_name(&member) else {
                    continue;
                };
                let path_file = member.join(format!("{func}_path.txt"));
                if let Some(unit) =
                    load_unit(&library, Some(&name), &func, &constraints, &path_file)
                {
                    units.push(unit);
                }
            }
        } else {
            let path_file = folder.join(format!("{name}_path.txt"));
            if let Some(unit) = load_unit(&library, None, &name, &constraints, &path_file) {
                units.push(unit);
            }
        }
    }
    Ok(units)
}

/// A unit whose path file cannot be read is reported and dropped; the rest
/// of the project still gets checked.
fn load_unit(
    library: &str,
    class: Option<&str>,
    function: &str,
    constraints: &[String],
    path_file: &Path,
) -> Option<UnitInputs> {
    let text = match fs::read_to_string(path_file) {
        Ok(t) => t,
        Err(e) => {
            error!(file = %path_file.display(), error = %e, "failed to read path file");
            return None;
        }
    };
    let path_lines = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    Some(UnitInputs {
        library: library.to_string(),
        class: class.map(str::to_string),
        function: function.to_string(),
        constraints: constraints.to_vec(),
        path_lines,
        path_source: path_file.display().to_string(),
    })
}

fn read_optional(path: &Path) -> std::io::Result<String> {
    if path.exists() {
        fs::read_to_string(path)
    } else {
        Ok(String::new())
    }
}

fn sorted_dirs(dir: &Path) -> miette::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).into_diagnostic()? {
        let entry = entry.into_diagnostic()?;
        if entry.path().is_dir() {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}
