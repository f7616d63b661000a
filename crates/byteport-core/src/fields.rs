//! Field name validation
//!
//! Applied to every key of a data point before submission, regardless of
//! transport. Reserved payload fields (`_key`, `_ts`) are added after
//! validation and are intentionally outside this rule.

use crate::error::{ByteportError, ByteportResult};

/// Maximum accepted field name length
pub const MAX_FIELD_NAME_LEN: usize = 32;

/// Check a field name against the naming rule
///
/// Valid names are 1-32 characters from `[A-Za-z0-9:_-]` and must not start
/// or end with a hyphen or underscore.
pub fn is_valid_field_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_FIELD_NAME_LEN {
        return false;
    }

    if name.starts_with(['-', '_']) || name.ends_with(['-', '_']) {
        return false;
    }

    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}

/// Validate a field name, failing with `InvalidFieldName` when it violates
/// the naming rule
pub fn ensure_valid_field_name(name: &str) -> ByteportResult<()> {
    if is_valid_field_name(name) {
        Ok(())
    } else {
        Err(ByteportError::InvalidFieldName(name.to_string()))
    }
}
