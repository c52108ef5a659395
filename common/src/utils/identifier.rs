//! SQL identifier guard.
//!
//! Schema, table and column names arrive from the caller and end up in query
//! text. A name must pass [`IdentifierValidator::validate`] and be confirmed
//! against the catalog before [`IdentifierValidator::quote`] emits it.

use crate::errors::AppError;

/// PostgreSQL truncates identifiers longer than NAMEDATALEN - 1 bytes.
pub const MAX_IDENTIFIER_BYTES: usize = 63;

/// Sequences that terminate a statement or open a comment.
const FORBIDDEN_SEQUENCES: [(&str, &str); 4] = [
    (";", "statement terminator"),
    ("--", "line comment"),
    ("/*", "block comment"),
    ("*/", "block comment"),
];

/// Validates and quotes caller supplied identifiers.
pub struct IdentifierValidator;

impl IdentifierValidator {
    /// Checks a name before it is compared against the catalog.
    ///
    /// # Errors
    /// Returns `AppError::UnsafeIdentifier` for empty or over-long names and for
    /// names containing a NUL byte, a statement terminator or a comment sequence.
    pub fn validate(name: &str) -> Result<(), AppError> {
        let reject = |reason: &str| AppError::UnsafeIdentifier {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.trim().is_empty() {
            return Err(reject("empty name"));
        }
        if name.len() > MAX_IDENTIFIER_BYTES {
            return Err(reject("name exceeds 63 bytes"));
        }
        if name.contains('\0') {
            return Err(reject("NUL byte"));
        }
        for (sequence, what) in FORBIDDEN_SEQUENCES {
            if name.contains(sequence) {
                return Err(reject(what));
            }
        }
        Ok(())
    }

    /// Validates every name in order, stopping at the first failure.
    pub fn validate_all(names: &[&str]) -> Result<(), AppError> {
        names.iter().try_for_each(|name| Self::validate(name))
    }

    /// Emits a double-quoted identifier with embedded quotes doubled.
    pub fn quote(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Emits `"schema"."table"`.
    pub fn qualified(schema: &str, table: &str) -> String {
        format!("{}.{}", Self::quote(schema), Self::quote(table))
    }
}
