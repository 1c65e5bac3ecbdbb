//! Output formatting utilities.

use serde::Serialize;
use std::path::PathBuf;

/// Outcome of processing one input file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub documents: usize,
    pub errors: Vec<String>,
}

/// Formats the reports as JSON.
pub fn format_json(reports: &[FileReport]) -> String {
    serde_json::to_string_pretty(reports).unwrap_or_else(|_| "[]".to_string())
}

/// Formats a report as a simple table row.
pub fn format_table_row(report: &FileReport) -> String {
    let status = if report.errors.is_empty() { "ok" } else { "failed" };
    let output = report
        .output
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{:<8} {:>5} {:<40} {}",
        status,
        report.documents,
        truncate(&report.input.display().to_string(), 40),
        output
    )
}

/// Prints table header.
#[allow(clippy::print_literal)]
pub fn print_table_header() {
    println!("{:<8} {:>5} {:<40} {}", "STATUS", "DOCS", "INPUT", "OUTPUT");
    println!("{}", "-".repeat(80));
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
