//! Plain-text rendering of analysis reports for the `check` command.

use std::fmt::Write;
use std::path::Path;

use sentinel_analysis::FileReport;
use sentinel_core::Severity;

/// Number of error-severity violations across all reports.
pub fn count_errors(reports: &[FileReport]) -> usize {
    reports
        .iter()
        .flat_map(|r| &r.violations)
        .filter(|v| v.severity == Severity::Error)
        .count()
}

/// One line per violation, paths relative to `root`, then a summary line.
pub fn render_text(reports: &[FileReport], root: &Path) -> String {
    let mut out = String::new();
    let mut total = 0usize;
    let mut files = 0usize;
    for report in reports {
        if report.violations.is_empty() {
            continue;
        }
        files += 1;
        let rel = report.file.strip_prefix(root).unwrap_or(&report.file);
        for v in &report.violations {
            total += 1;
            let _ = writeln!(
                out,
                "{}:{}:{}: {} [{}] {}",
                rel.display(),
                v.line,
                v.column,
                v.severity,
                v.guard,
                v.message
            );
            if let Some(suggestion) = &v.suggestion {
                let _ = writeln!(out, "    help: {suggestion}");
            }
        }
    }
    let _ = writeln!(
        out,
        "{total} violation(s) in {files} file(s), {} error(s), {} file(s) checked",
        count_errors(reports),
        reports.len()
    );
    out
}
