//! Error types for ETON encoding and decoding.
//!
//! ETON separates failures into two groups:
//!
//! - **Fatal**: conditions that prevent producing any meaningful output, such as
//!   encoding against a schema id that was never declared. These are returned to
//!   the caller as `Err`.
//! - **Recovered**: malformed dictionary entries, unresolved symbols and lines
//!   truncated mid-token. The decoders never return these; they recover (skip the
//!   entry, pass the token through, decode the cells best-effort) and log the
//!   matching variant through `tracing`.
//!
//! ## Examples
//!
//! ```rust
//! use eton::{encode_batch, Error, EncodeOptions, SchemaMap, SymbolState};
//!
//! let schemas = SchemaMap::new();
//! let result = encode_batch(&[], "Missing", &schemas, &SymbolState::new(), &EncodeOptions::new());
//! assert!(matches!(result, Err(Error::SchemaNotFound { .. })));
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all errors produced by the ETON codec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Encode requested against an undeclared schema identifier.
    #[error("Schema ID '{schema}' not found")]
    SchemaNotFound { schema: String },

    /// A schema definition is structurally invalid.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A dictionary entry whose token does not have the `@<n>` shape.
    #[error("Malformed dictionary entry at line {line}: {entry}")]
    MalformedDictionaryEntry { line: usize, entry: String },

    /// A token that has no dictionary entry.
    #[error("Unresolved symbol: {0}")]
    UnresolvedSymbol(String),

    /// A line that ends inside an open quoted cell.
    #[error("Truncated line {line}: unterminated quoted cell")]
    TruncatedLine { line: usize },

    /// JSON conversion failure (nested cells, JSON dictionaries, input files)
    #[error("JSON error: {0}")]
    Json(String),

    /// TOML parse failure in the bridge
    #[error("TOML error: {0}")]
    Toml(String),

    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a [`Error::SchemaNotFound`] for the given schema id.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use eton::Error;
    ///
    /// let err = Error::schema_not_found("User");
    /// assert!(err.to_string().contains("'User'"));
    /// ```
    pub fn schema_not_found(schema: &str) -> Self {
        Error::SchemaNotFound {
            schema: schema.to_string(),
        }
    }

    /// Creates a schema validation error.
    pub fn schema<T: fmt::Display>(msg: T) -> Self {
        Error::Schema(msg.to_string())
    }

    pub fn malformed_entry(line: usize, entry: &str) -> Self {
        Error::MalformedDictionaryEntry {
            line,
            entry: entry.to_string(),
        }
    }

    pub fn unresolved(token: &str) -> Self {
        Error::UnresolvedSymbol(token.to_string())
    }

    pub fn truncated(line: usize) -> Self {
        Error::TruncatedLine { line }
    }

    /// Returns `true` for the variants the decoders recover from instead of
    /// returning.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use eton::Error;
    ///
    /// assert!(Error::truncated(3).is_recoverable());
    /// assert!(!Error::schema_not_found("User").is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MalformedDictionaryEntry { .. }
                | Error::UnresolvedSymbol(_)
                | Error::TruncatedLine { .. }
        )
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_split() {
        assert!(Error::malformed_entry(2, "Alice,1").is_recoverable());
        assert!(Error::unresolved("@9").is_recoverable());
        assert!(!Error::schema("bad").is_recoverable());
        assert!(!Error::custom("boom").is_recoverable());
    }

    #[test]
    fn test_messages() {
        let err = Error::malformed_entry(4, "Bob,x");
        assert_eq!(err.to_string(), "Malformed dictionary entry at line 4: Bob,x");

        let err = Error::truncated(7);
        assert!(err.to_string().contains("line 7"));
    }
}
