//! Error code and wire string tests.

use std::path::PathBuf;

use sentinel_core::errors::*;

#[test]
fn test_wire_string_prefixes_code() {
    let err = FixError::UnknownViolation {
        violation_id: "abc".into(),
    };
    assert_eq!(err.wire_string(), "[FIX_UNKNOWN_VIOLATION] Unknown violation: abc");
}

#[test]
fn test_reparse_reports_underlying_parse_code() {
    let err = FixError::Reparse {
        path: PathBuf::from("a.ts"),
        source: ParseError::Syntax {
            path: PathBuf::from("a.ts"),
            line: 1,
            column: 5,
            count: 1,
        },
    };
    assert_eq!(err.error_code(), "PARSE_ERROR");
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_unsupported_extension_has_own_code() {
    let err = ParseError::UnsupportedExtension {
        path: PathBuf::from("style.css"),
    };
    assert_eq!(err.error_code(), "UNSUPPORTED_LANGUAGE");
}

#[test]
fn test_guard_and_config_codes() {
    let failed = GuardError::Failed {
        guard: "rate-limit".into(),
        message: "boom".into(),
    };
    let panicked = GuardError::Panicked {
        guard: "rate-limit".into(),
        message: "boom".into(),
    };
    assert_eq!(failed.error_code(), "GUARD_FAILED");
    assert_eq!(panicked.error_code(), "GUARD_PANICKED");

    let config = ConfigError::ValidationFailed {
        field: "debounce_ms".into(),
        message: "must be between 1 and 60000".into(),
    };
    assert_eq!(config.error_code(), "CONFIG_ERROR");
}

/// Engine errors keep the code of the subsystem error they wrap.
#[test]
fn test_engine_error_delegates_codes() {
    let fix = FixError::Stale {
        path: PathBuf::from("a.ts"),
        fingerprint: "tenant-isolation:orders:select:0".into(),
    };
    let message = fix.to_string();
    let stale = EngineError::from(fix);
    assert_eq!(stale.error_code(), "FIX_STALE");
    assert_eq!(stale.to_string(), message);

    let unknown = EngineError::UnknownGuard {
        name: "sql-injection".into(),
    };
    assert_eq!(unknown.error_code(), "CONFIG_ERROR");
    assert_eq!(unknown.to_string(), "Unknown guard: sql-injection");
}
