//! Byte-range edit application.

use sentinel_core::errors::FixError;
use sentinel_core::TextEdit;

/// Apply `edits` to `source`. Edits may arrive in any order; they must be in
/// bounds, on char boundaries and non-overlapping. Insertions at the same
/// offset keep their given order.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> Result<String, FixError> {
    let len = source.len();
    for edit in edits {
        let reason = if edit.start > edit.end {
            Some("start after end")
        } else if edit.end > len {
            Some("out of bounds")
        } else if !source.is_char_boundary(edit.start) || !source.is_char_boundary(edit.end) {
            Some("not on a char boundary")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(FixError::InvalidEdit {
                start: edit.start,
                end: edit.end,
                len,
                reason,
            });
        }
    }

    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by_key(|e| (e.start, e.end));

    let extra: usize = edits.iter().map(|e| e.replacement.len()).sum();
    let mut out = String::with_capacity(len + extra);
    let mut cursor = 0;
    for edit in ordered {
        if edit.start < cursor {
            return Err(FixError::InvalidEdit {
                start: edit.start,
                end: edit.end,
                len,
                reason: "overlaps another edit",
            });
        }
        out.push_str(&source[cursor..edit.start]);
        out.push_str(&edit.replacement);
        cursor = edit.end;
    }
    out.push_str(&source[cursor..]);
    Ok(out)
}
