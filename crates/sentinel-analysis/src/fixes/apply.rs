//! Resolving a stored violation against the current file and applying its fix.

use std::io::Write;
use std::path::{Path, PathBuf};

use sentinel_core::errors::FixError;
use sentinel_core::{FixDescriptor, Violation};

use super::edits::apply_edits;
use crate::guards::Guard;
use crate::tree::{SourceTree, TreeBuilder};

/// Result of a successful `apply_fix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOutcome {
    pub path: PathBuf,
    pub fingerprint: String,
    /// False when the fix had no edits left to make.
    pub written: bool,
}

/// Re-parse the violation's file, re-run its guard and return the fresh fix
/// for the same fingerprint.
pub fn resolve_fix(
    builder: &TreeBuilder,
    guard: &dyn Guard,
    violation: &Violation,
) -> Result<(SourceTree, FixDescriptor), FixError> {
    let path = violation.file.as_path();
    let tree = builder.build(path).map_err(|source| FixError::Reparse {
        path: path.to_path_buf(),
        source,
    })?;
    let fresh = guard.check(&tree, path).map_err(|source| FixError::Guard {
        path: path.to_path_buf(),
        source,
    })?;
    let current = fresh
        .into_iter()
        .find(|v| v.fingerprint == violation.fingerprint)
        .ok_or_else(|| FixError::Stale {
            path: path.to_path_buf(),
            fingerprint: violation.fingerprint.clone(),
        })?;
    let fix = current.quick_fix.ok_or_else(|| FixError::NoQuickFix {
        violation_id: violation.id.clone(),
    })?;
    Ok((tree, fix))
}

/// Resolve, apply and atomically write the fix for `violation`. The edited
/// text must still parse.
pub fn apply_fix(
    builder: &TreeBuilder,
    guard: &dyn Guard,
    violation: &Violation,
) -> Result<FixOutcome, FixError> {
    let (tree, fix) = resolve_fix(builder, guard, violation)?;
    let path = violation.file.clone();
    let outcome = FixOutcome {
        path: path.clone(),
        fingerprint: violation.fingerprint.clone(),
        written: false,
    };
    if fix.is_noop() {
        tracing::debug!(file = %path.display(), fingerprint = %violation.fingerprint, "fix already applied");
        return Ok(outcome);
    }

    let updated = apply_edits(tree.source(), &fix.edits)?;
    drop(tree);
    builder
        .build_from_source(&path, updated.as_str())
        .map_err(|source| FixError::BrokenResult {
            path: path.clone(),
            source,
        })?;
    write_atomic(&path, &updated)?;

    tracing::info!(
        file = %path.display(),
        guard = guard.name(),
        edits = fix.edits.len(),
        "quick-fix applied"
    );
    Ok(FixOutcome {
        written: true,
        ..outcome
    })
}

/// Write to a temp file in the same directory and rename it over `path`.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), FixError> {
    let write_err = |source: std::io::Error| FixError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    if let Ok(meta) = std::fs::metadata(path) {
        // Keep the original mode; a failure here leaves the temp file's default.
        let _ = std::fs::set_permissions(tmp.path(), meta.permissions());
    }
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
