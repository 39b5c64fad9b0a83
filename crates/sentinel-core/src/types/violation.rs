//! The shared finding record produced by guards.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Finding category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Security,
    Performance,
    Quality,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Security => write!(f, "security"),
            Self::Performance => write!(f, "performance"),
            Self::Quality => write!(f, "quality"),
        }
    }
}

/// Severity levels for violations, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A byte-range replacement against the text seen at detection time.
/// `start == end` is a pure insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl TextEdit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            replacement: text.into(),
        }
    }

    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: text.into(),
        }
    }
}

/// Serializable quick-fix. Edits are only ever applied after the owning
/// violation has been re-located on a fresh parse of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixDescriptor {
    pub description: String,
    pub edits: SmallVec<[TextEdit; 2]>,
}

impl FixDescriptor {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            edits: SmallVec::new(),
        }
    }

    pub fn with_edit(mut self, edit: TextEdit) -> Self {
        self.edits.push(edit);
        self
    }

    /// A fix whose edits are empty leaves the file untouched.
    pub fn is_noop(&self) -> bool {
        self.edits.is_empty()
    }
}

/// A single finding. `id` is fresh per report; `fingerprint` is the
/// structural key that survives re-analysis of unchanged structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: String,
    pub guard: String,
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    pub file: PathBuf,
    /// 1-based line.
    pub line: u32,
    /// 1-based byte column.
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_fix: Option<FixDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub fingerprint: String,
}

impl Violation {
    pub fn new(
        guard: &str,
        category: Category,
        severity: Severity,
        message: impl Into<String>,
        file: &Path,
        (line, column): (u32, u32),
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            guard: guard.to_string(),
            category,
            severity,
            message: message.into(),
            file: file.to_path_buf(),
            line,
            column,
            quick_fix: None,
            suggestion: None,
            fingerprint: fingerprint.into(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_fix(mut self, fix: FixDescriptor) -> Self {
        self.quick_fix = Some(fix);
        self
    }

    /// Identity of the finding ignoring the per-run id.
    pub fn same_finding(&self, other: &Violation) -> bool {
        self.fingerprint == other.fingerprint
            && self.guard == other.guard
            && self.file == other.file
            && self.line == other.line
            && self.column == other.column
            && self.severity == other.severity
            && self.message == other.message
    }
}
