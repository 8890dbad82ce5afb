//! Admission filter for raw host edits
//!
//! Ordinary keystrokes would otherwise open a debounce window each, so
//! edits that carry no removal and at most one character (or only
//! whitespace) never enter the aggregation table.

use crate::types::RawChange;

/// Whether a raw change is worth aggregating
pub fn is_meaningful(change: &RawChange) -> bool {
    if change.removed_len > 0 {
        return true;
    }

    if change.text.is_empty() || change.text.trim().is_empty() {
        return false;
    }

    change.text.chars().count() > 1
}
