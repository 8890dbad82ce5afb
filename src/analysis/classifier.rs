//! Change classification from aggregate size totals

use crate::types::{ChangeKind, EditTotals};

/// Minimum min/max character ratio for a balanced add+delete burst
const REFACTOR_BALANCE_RATIO: f64 = 0.8;

/// Maximum line-count difference for a balanced add+delete burst
const REFACTOR_MAX_LINE_DELTA: usize = 2;

/// Classify a burst by its add/delete totals
///
/// Large, balanced add+delete bursts with near-equal line counts look like
/// find/replace or restructuring and are tagged `refactor`.
pub fn classify(totals: &EditTotals) -> ChangeKind {
    let added = totals.chars_added;
    let deleted = totals.chars_deleted;

    if deleted == 0 && added > 0 {
        return ChangeKind::Addition;
    }
    if added == 0 && deleted > 0 {
        return ChangeKind::Deletion;
    }

    if added > 0 && deleted > 0 {
        let ratio = added.min(deleted) as f64 / added.max(deleted) as f64;
        let line_delta = totals.lines_added.abs_diff(totals.lines_deleted);
        if ratio > REFACTOR_BALANCE_RATIO && line_delta <= REFACTOR_MAX_LINE_DELTA {
            return ChangeKind::Refactor;
        }
    }

    ChangeKind::Modification
}
