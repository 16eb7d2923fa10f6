//! ETON text grammar.
//!
//! An ETON document is newline-delimited. Blank lines are ignored everywhere.
//!
//! ```text
//! %User                      schema header: marker + schema id
//! 1,@1,T                     data line: one cell per schema field
//! !1,Alice,true              audit line: raw values of the line above
//! %Symbol                    dictionary block, line form
//! Alice,@1                   key,token
//! ```
//!
//! The JSON dictionary form replaces the `key,token` lines with a single
//! compact object:
//!
//! ```text
//! %Symbol:JSON
//! {"Alice":"@1"}
//! ```
//!
//! The streaming protocol uses the compact schema header followed by the
//! field list, and `%Data` to close a dictionary block:
//!
//! ```text
//! %Schema:User
//! name,role
//! %Symbol
//! Alice,@1
//! Admin,@2
//! %Data
//! @1,@2
//! ```
//!
//! # Cells
//!
//! | Value | Cell |
//! |-------|------|
//! | null / absent | `_` |
//! | `true` / `false` | `T` / `F` |
//! | string, number | literal text or a token `@<n>` |
//! | array | `(a ;b ;c)`, empty `()` |
//! | object | compact JSON text |
//!
//! Cells follow RFC 4180 quoting (see [`crate::cell`]).

/// First character of a schema header or any block marker.
pub const HEADER_MARKER: char = '%';

/// First character of an audit line.
pub const AUDIT_MARKER: char = '!';

/// Line-form dictionary header.
pub const SYMBOL_HEADER: &str = "%Symbol";

/// JSON-form dictionary header.
pub const SYMBOL_JSON_HEADER: &str = "%Symbol:JSON";

/// Compact schema header prefix used by the streaming protocol.
pub const SCHEMA_HEADER: &str = "%Schema";

/// Streaming marker that forces data mode.
pub const DATA_HEADER: &str = "%Data";

/// Prefix of every minted token.
pub const TOKEN_PREFIX: char = '@';

pub const NULL_TOKEN: &str = "_";
pub const TRUE_TOKEN: &str = "T";
pub const FALSE_TOKEN: &str = "F";

/// Cell delimiter.
pub const DELIMITER: char = ',';

pub const LIST_OPEN: char = '(';
pub const LIST_CLOSE: char = ')';

/// Separator between list items inside a list cell.
pub const LIST_SEPARATOR: &str = " ;";

/// Returns `true` if `s` has the minted token shape `@<digits>`.
///
/// # Examples
///
/// ```rust
/// use eton::format::is_token;
///
/// assert!(is_token("@12"));
/// assert!(!is_token("@"));
/// assert!(!is_token("@1a"));
/// assert!(!is_token("_"));
/// ```
#[must_use]
pub fn is_token(s: &str) -> bool {
    match s.strip_prefix(TOKEN_PREFIX) {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Numeric suffix of a token, if it has the token shape and fits in `u64`.
#[must_use]
pub fn token_id(s: &str) -> Option<u64> {
    if is_token(s) {
        s[1..].parse().ok()
    } else {
        None
    }
}
