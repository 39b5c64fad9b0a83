//! Quick-fix application: fixes are re-resolved on a fresh parse by
//! fingerprint, validated, applied as byte edits and written atomically.

pub mod apply;
pub mod edits;

pub use apply::{apply_fix, resolve_fix, write_atomic, FixOutcome};
pub use edits::apply_edits;
