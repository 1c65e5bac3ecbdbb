//! Sort command implementation.

use crate::output::{self, FileReport};
use crate::path;
use kmsort_canonical::{canonicalize_batch, BatchError, BatchMode, PolicyRegistry};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Failure to process a single file.
#[derive(Error, Debug)]
pub enum SortError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: BatchError,
    },
}

pub fn run(
    registry: &PolicyRegistry,
    root: PathBuf,
    out_dir: PathBuf,
    keep_going: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let inputs = path::collect_inputs(&root)?;
    let mode = if keep_going {
        BatchMode::BestEffort
    } else {
        BatchMode::FailFast
    };

    let mut reports = Vec::with_capacity(inputs.len());
    for input in inputs {
        match sort_file(registry, &input, &out_dir, mode) {
            Ok(report) => reports.push(report),
            Err(e) if keep_going => {
                warn!(input = %input.display(), error = %e, "skipping file");
                reports.push(FileReport {
                    input,
                    output: None,
                    documents: 0,
                    errors: vec![e.to_string()],
                });
            }
            Err(e) => return Err(e.into()),
        }
    }

    if json {
        println!("{}", output::format_json(&reports));
    } else {
        output::print_table_header();
        for report in &reports {
            println!("{}", output::format_table_row(report));
            for error in &report.errors {
                eprintln!("  {}: {}", report.input.display(), error);
            }
        }
    }

    Ok(())
}

/// Canonicalizes one file into its mirrored location below `out_dir`.
pub fn sort_file(
    registry: &PolicyRegistry,
    input: &Path,
    out_dir: &Path,
    mode: BatchMode,
) -> Result<FileReport, SortError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| SortError::Io { path, source }
    };

    let text = std::fs::read_to_string(input).map_err(io_error(input))?;
    let batch = canonicalize_batch(registry, &text, mode).map_err(|source| SortError::Document {
        path: input.to_path_buf(),
        source,
    })?;

    let target = path::mirrored_path(out_dir, input);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    std::fs::write(&target, batch.text.as_bytes()).map_err(io_error(target.as_path()))?;

    info!(
        input = %input.display(),
        output = %target.display(),
        documents = batch.documents,
        failures = batch.failures.len(),
        "sorted file"
    );

    Ok(FileReport {
        input: input.to_path_buf(),
        output: Some(target),
        documents: batch.documents,
        errors: batch.failures.iter().map(ToString::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sort_file_writes_mirrored_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("svc.yaml");
        std::fs::write(&input, "kind: Service\napiVersion: v1\nspec: {type: ClusterIP}\n").unwrap();
        let out_dir = temp_dir.path().join("out");

        let registry = PolicyRegistry::builtin();
        let report = sort_file(&registry, &input, &out_dir, BatchMode::FailFast).unwrap();

        let target = report.output.unwrap();
        assert!(target.starts_with(&out_dir));
        assert!(target.ends_with("svc.yaml"));
        assert_eq!(
            std::fs::read_to_string(target).unwrap(),
            "apiVersion: v1\nkind: Service\nmetadata: {}\nspec: {}\n"
        );
    }

    #[test]
    fn sort_file_names_the_failing_file() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("bad.yaml");
        std::fs::write(&input, "kind: A\n---\nkind: [\n").unwrap();

        let registry = PolicyRegistry::builtin();
        let err = sort_file(&registry, &input, temp_dir.path(), BatchMode::FailFast).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bad.yaml"));
        assert!(message.contains("document 1"));
    }

    #[test]
    fn best_effort_reports_every_failure() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("mixed.yaml");
        std::fs::write(&input, "- a\n---\nkind: A\n---\n- b\n").unwrap();

        let registry = PolicyRegistry::builtin();
        let report =
            sort_file(&registry, &input, &temp_dir.path().join("out"), BatchMode::BestEffort)
                .unwrap();
        assert_eq!(report.documents, 3);
        assert_eq!(report.errors.len(), 2);
    }
}
