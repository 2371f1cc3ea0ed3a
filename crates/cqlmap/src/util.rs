//! Helpers for building CQL text.

/// Escape a value for use inside a single-quoted CQL string literal.
pub fn escape(text: &str) -> String {
    text.replace('\'', "''")
}

/// A single-quoted CQL string literal.
pub fn quote(text: &str) -> String {
    format!("'{}'", escape(text))
}
