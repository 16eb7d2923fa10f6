//! Structural (debug) decoding.
//!
//! This module provides the [`DebugDecoder`], a line classifier that breaks
//! an ETON document into schema headers, data rows, audit rows and
//! dictionary rows without hydrating symbols. It is a validation and
//! inspection tool: it accepts any text and never fails.
//!
//! ## Overview
//!
//! - **Line classification**: [`parse_line`] looks at one line in isolation
//! - **Context tracking**: the decoder remembers the current schema name and
//!   whether it is inside a dictionary block or a compact schema header
//! - **Corruption tolerance**: a row that ends inside an open quote is
//!   decoded best-effort and flagged `truncated`
//!
//! ## Usage
//!
//! ```rust
//! use eton::{debug_loads, EntryKind};
//!
//! let entries = debug_loads("%User\n1,@1\n!1,Alice\n%Symbol\nAlice,@1");
//! assert_eq!(entries.len(), 5);
//! assert_eq!(entries[0].kind, EntryKind::Schema { name: "User".into() });
//! assert_eq!(
//!     entries[1].kind,
//!     EntryKind::Data { schema: "User".into(), row: vec!["1".into(), "@1".into()] }
//! );
//! assert_eq!(entries[2].kind, EntryKind::Audit { row: vec!["1".into(), "Alice".into()] });
//! assert_eq!(entries[4].kind, EntryKind::Dictionary { row: vec!["Alice".into(), "@1".into()] });
//! ```

use crate::cell::{decode_row, decode_row_checked, logical_lines, LogicalLines};
use crate::format::{AUDIT_MARKER, HEADER_MARKER};
use crate::Error;
use serde::Serialize;
use tracing::warn;

const SCHEMA_PREFIX: &str = "Schema:";
const SYMBOL_NAME: &str = "Symbol";
const DATA_NAME: &str = "Data";

/// Classification of a single line, without context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// `%<name>`: the name after the marker, trimmed.
    Schema(String),
    Data(Vec<String>),
    /// `!<row>`: the raw values.
    Audit(Vec<String>),
    Empty,
}

/// Classifies one line.
///
/// # Examples
///
/// ```rust
/// use eton::de::{parse_line, ParsedLine};
///
/// assert_eq!(parse_line("%User"), ParsedLine::Schema("User".into()));
/// assert_eq!(parse_line("!1,Alice"), ParsedLine::Audit(vec!["1".into(), "Alice".into()]));
/// assert_eq!(parse_line("   "), ParsedLine::Empty);
/// ```
#[must_use]
pub fn parse_line(line: &str) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ParsedLine::Empty;
    }
    if let Some(name) = trimmed.strip_prefix(HEADER_MARKER) {
        return ParsedLine::Schema(name.trim().to_string());
    }
    if let Some(row) = trimmed.strip_prefix(AUDIT_MARKER) {
        return ParsedLine::Audit(decode_row(row));
    }
    ParsedLine::Data(decode_row(trimmed))
}

/// What a decoded line turned out to be, in context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryKind {
    /// A schema header; compact `%Schema:<id>` headers report `<id>`.
    Schema { name: String },
    /// The field list following a compact schema header.
    Fields { row: Vec<String> },
    /// A `%Symbol`, `%Symbol:JSON` or `%Data` block marker.
    Marker { name: String },
    Data { schema: String, row: Vec<String> },
    Audit { row: Vec<String> },
    /// A row inside a dictionary block.
    Dictionary { row: Vec<String> },
}

/// One non-empty line of a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugEntry {
    /// 1-based physical line the entry starts on.
    pub line: usize,
    #[serde(flatten)]
    pub kind: EntryKind,
    /// The row ended inside an open quoted cell.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Data,
    Fields,
    Dictionary,
}

/// Iterator over the [`DebugEntry`] items of a document.
///
/// Created via [`debug_decode`].
pub struct DebugDecoder<'a> {
    lines: LogicalLines<'a>,
    schema: String,
    block: Block,
}

impl<'a> DebugDecoder<'a> {
    #[must_use]
    pub fn new(content: &'a str) -> Self {
        DebugDecoder {
            lines: logical_lines(content),
            schema: String::new(),
            block: Block::Data,
        }
    }

    /// Name of the schema the next data row would be attributed to.
    #[must_use]
    pub fn current_schema(&self) -> &str {
        &self.schema
    }

    fn header(&mut self, name: &str) -> EntryKind {
        if let Some(id) = name.strip_prefix(SCHEMA_PREFIX) {
            self.schema = id.trim().to_string();
            self.block = Block::Fields;
            return EntryKind::Schema {
                name: self.schema.clone(),
            };
        }
        if name == DATA_NAME {
            self.block = Block::Data;
            return EntryKind::Marker {
                name: name.to_string(),
            };
        }
        if name == SYMBOL_NAME || name.starts_with("Symbol:") {
            self.block = Block::Dictionary;
            return EntryKind::Marker {
                name: name.to_string(),
            };
        }

        self.schema = name.to_string();
        self.block = Block::Data;
        EntryKind::Schema {
            name: self.schema.clone(),
        }
    }
}

impl<'a> Iterator for DebugDecoder<'a> {
    type Item = DebugEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (line_no, line) = self.lines.next()?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(name) = trimmed.strip_prefix(HEADER_MARKER) {
                let kind = self.header(name.trim());
                return Some(DebugEntry {
                    line: line_no,
                    kind,
                    truncated: false,
                });
            }

            let (row_text, is_audit) = match trimmed.strip_prefix(AUDIT_MARKER) {
                Some(rest) => (rest, true),
                None => (trimmed, false),
            };
            let decoded = decode_row_checked(row_text);
            if decoded.truncated {
                warn!("{}", Error::truncated(line_no));
            }
            let row = decoded.cells;

            let kind = if is_audit {
                EntryKind::Audit { row }
            } else {
                match self.block {
                    Block::Fields => {
                        self.block = Block::Data;
                        EntryKind::Fields { row }
                    }
                    Block::Dictionary => EntryKind::Dictionary { row },
                    Block::Data => EntryKind::Data {
                        schema: self.schema.clone(),
                        row,
                    },
                }
            };
            return Some(DebugEntry {
                line: line_no,
                kind,
                truncated: decoded.truncated,
            });
        }
    }
}

/// Decodes a document structurally. See [`DebugDecoder`].
#[must_use]
pub fn debug_decode(content: &str) -> DebugDecoder<'_> {
    DebugDecoder::new(content)
}

/// Collects [`debug_decode`] into a vector.
#[must_use]
pub fn debug_loads(content: &str) -> Vec<DebugEntry> {
    debug_decode(content).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_compact_schema_header() {
        let entries = debug_loads("%Schema:Log\nts,level\n%Symbol\nINFO,@1\n%Data\n10:00,@1\n");
        let kinds: Vec<_> = entries.into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntryKind::Schema { name: "Log".into() },
                EntryKind::Fields { row: row(&["ts", "level"]) },
                EntryKind::Marker { name: "Symbol".into() },
                EntryKind::Dictionary { row: row(&["INFO", "@1"]) },
                EntryKind::Marker { name: "Data".into() },
                EntryKind::Data { schema: "Log".into(), row: row(&["10:00", "@1"]) },
            ]
        );
    }

    #[test]
    fn test_line_numbers_skip_blank_lines() {
        let entries = debug_loads("\n%A\n\n1,2\r\n");
        assert_eq!(entries[0].line, 2);
        assert_eq!(entries[1].line, 4);
        assert_eq!(entries[1].kind, EntryKind::Data { schema: "A".into(), row: row(&["1", "2"]) });
    }

    #[test]
    fn test_multiline_cell_is_one_entry() {
        let entries = debug_loads("%A\n\"x\ny\",2\n3,4");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].kind, EntryKind::Data { schema: "A".into(), row: row(&["x\ny", "2"]) });
        assert_eq!(entries[2].line, 4);
    }

    #[test]
    fn test_truncated_row_is_flagged() {
        let entries = debug_loads("%A\n1,\"open");
        assert_eq!(entries.len(), 2);
        assert!(entries[1].truncated);
        assert_eq!(entries[1].kind, EntryKind::Data { schema: "A".into(), row: row(&["1", "open"]) });
    }

    #[test]
    fn test_data_before_any_header() {
        let entries = debug_loads("a,b");
        assert_eq!(entries[0].kind, EntryKind::Data { schema: String::new(), row: row(&["a", "b"]) });
    }

    #[test]
    fn test_serialize_entry() {
        let entry = DebugEntry {
            line: 3,
            kind: EntryKind::Audit { row: row(&["1"]) },
            truncated: false,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"line":3,"type":"audit","row":["1"]}"#);
    }
}
