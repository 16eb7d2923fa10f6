//! Row-of-cells codec.
//!
//! Converts a sequence of cell strings into one delimited line and back, with
//! RFC 4180 quoting: a cell is wrapped in double quotes when it needs them and
//! inner quotes are doubled. For every sequence of strings
//! `decode_row(&encode_row(&cells)) == cells`, including cells holding
//! delimiters, quotes and line breaks.
//!
//! ```rust
//! use eton::cell::{decode_row, encode_row};
//!
//! let cells = vec!["Last, First", "say \"hi\"", "plain"];
//! let line = encode_row(&cells);
//! assert_eq!(line, r#""Last, First","say ""hi""",plain"#);
//! assert_eq!(decode_row(&line), cells);
//! ```
//!
//! Because a quoted cell may contain a line break, splitting a document into
//! lines is quote-aware as well: [`logical_lines`] for complete text and
//! [`LineBuffer`] for text arriving in arbitrary chunks. A physical line
//! starting with `%` or `!` always starts a new logical line, so a stray
//! quote cannot swallow the block markers after it. The flip side is that a
//! quoted cell cannot hold a line that starts with one of those markers.

use crate::format::{AUDIT_MARKER, DELIMITER, HEADER_MARKER};

const QUOTE: char = '"';

/// Returns `true` if the cell must be quoted to survive a round trip.
///
/// Besides the RFC 4180 triggers, cells starting with a line marker are quoted
/// so that a data line is never classified as a header or audit line, and
/// cells with surrounding whitespace are quoted because decoders trim lines.
#[inline]
#[must_use]
pub fn needs_quotes(cell: &str) -> bool {
    cell.contains(DELIMITER)
        || cell.contains(QUOTE)
        || cell.contains('\n')
        || cell.contains('\r')
        || cell.starts_with(HEADER_MARKER)
        || cell.starts_with(AUDIT_MARKER)
        || cell.starts_with(char::is_whitespace)
        || cell.ends_with(char::is_whitespace)
}

fn write_cell(out: &mut String, cell: &str) {
    if needs_quotes(cell) {
        out.push(QUOTE);
        for ch in cell.chars() {
            if ch == QUOTE {
                out.push(QUOTE);
            }
            out.push(ch);
        }
        out.push(QUOTE);
    } else {
        out.push_str(cell);
    }
}

/// Encodes one row of cells as a single line (without a trailing newline).
#[must_use]
pub fn encode_row<S: AsRef<str>>(cells: &[S]) -> String {
    // A lone empty cell would otherwise encode to an empty line, which decodes
    // to zero cells.
    if let [only] = cells {
        if only.as_ref().is_empty() {
            return "\"\"".to_string();
        }
    }

    let mut out = String::with_capacity(cells.iter().map(|c| c.as_ref().len() + 1).sum());
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        write_cell(&mut out, cell.as_ref());
    }
    out
}

/// Result of a best-effort row decode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedRow {
    pub cells: Vec<String>,
    /// The line ended inside an open quoted cell.
    pub truncated: bool,
}

/// Decodes one line into its cells.
///
/// Never fails: stray quotes inside unquoted cells are kept literally, text
/// after a closing quote is appended to the cell, and an unterminated quoted
/// cell runs to the end of the line.
#[must_use]
pub fn decode_row(line: &str) -> Vec<String> {
    decode_row_checked(line).cells
}

/// Like [`decode_row`], also reporting whether the line was truncated
/// mid-cell.
#[must_use]
pub fn decode_row_checked(line: &str) -> DecodedRow {
    if line.is_empty() {
        return DecodedRow::default();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut at_cell_start = true;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == QUOTE {
                if chars.peek() == Some(&QUOTE) {
                    chars.next();
                    current.push(QUOTE);
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
            continue;
        }

        match ch {
            DELIMITER => {
                cells.push(std::mem::take(&mut current));
                at_cell_start = true;
                continue;
            }
            QUOTE if at_cell_start => in_quotes = true,
            _ => current.push(ch),
        }
        at_cell_start = false;
    }

    cells.push(current);
    DecodedRow {
        cells,
        truncated: in_quotes,
    }
}

/// Splits a `key,token` line on its last delimiter outside quotes.
///
/// The key part is unquoted; the token part is returned trimmed and
/// unvalidated. Returns `None` when the line has no unquoted delimiter.
///
/// # Examples
///
/// ```rust
/// use eton::cell::split_pair;
///
/// assert_eq!(
///     split_pair(r#""Hello, World",@1"#),
///     Some(("Hello, World".to_string(), "@1".to_string()))
/// );
/// assert_eq!(split_pair("no delimiter"), None);
/// ```
#[must_use]
pub fn split_pair(line: &str) -> Option<(String, String)> {
    let mut in_quotes = false;
    let mut split_at = None;
    for (idx, ch) in line.char_indices() {
        match ch {
            QUOTE => in_quotes = !in_quotes,
            DELIMITER if !in_quotes => split_at = Some(idx),
            _ => {}
        }
    }

    let idx = split_at?;
    let key = decode_row(&line[..idx]).join(",");
    let token = line[idx + DELIMITER.len_utf8()..].trim().to_string();
    Some((key, token))
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

fn is_line_marker(byte: u8) -> bool {
    byte == HEADER_MARKER as u8 || byte == AUDIT_MARKER as u8
}

/// Finds where the line at the start of `bytes` ends.
///
/// Returns the end of the line (exclusive, without the line break) and the
/// start of the next one, or `None` when more input is needed to decide.
///
/// A quote opens a quoted cell only at the start of a cell. A line break
/// inside a quoted cell continues the line unless the cell is shown to be
/// truncated: the next physical line starts with a line marker (`%`, `!`),
/// the quote is closed by something other than a delimiter or a line break,
/// or the input ends with the quote still open. A truncated row ends at its
/// first physical line break so that only that row is lost.
fn scan_line(bytes: &[u8], at_eof: bool) -> Option<(usize, usize)> {
    let cut = |brk: usize| Some((brk, brk + 1));
    let mut in_quotes = false;
    let mut at_cell_start = true;
    let mut first_break: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_quotes {
            match b {
                b'"' => match bytes.get(i + 1) {
                    Some(b'"') => {
                        i += 2;
                        continue;
                    }
                    Some(b',' | b'\n' | b'\r') => in_quotes = false,
                    None if !at_eof => return None,
                    None => in_quotes = false,
                    Some(_) => {
                        if let Some(brk) = first_break {
                            return cut(brk);
                        }
                        in_quotes = false;
                    }
                },
                b'\n' => {
                    let brk = *first_break.get_or_insert(i);
                    match bytes.get(i + 1) {
                        Some(&next) if is_line_marker(next) => return cut(brk),
                        None if !at_eof => return None,
                        _ => {}
                    }
                }
                _ => {}
            }
            i += 1;
            continue;
        }

        match b {
            b'\n' => return Some((i, i + 1)),
            b',' => at_cell_start = true,
            b'"' if at_cell_start => {
                in_quotes = true;
                at_cell_start = false;
                first_break = None;
            }
            _ => at_cell_start = false,
        }
        i += 1;
    }

    if !at_eof {
        return None;
    }
    match first_break {
        Some(brk) if in_quotes => cut(brk),
        _ => Some((bytes.len(), bytes.len())),
    }
}

/// Iterator over the logical lines of a document, paired with the physical
/// (1-based) line number each one starts on.
///
/// A line break inside a quoted cell does not end the line, unless the
/// cell turns out to be truncated (see [`LineBuffer`] for the rules); a
/// truncated row then ends at its first line break.
pub struct LogicalLines<'a> {
    text: &'a str,
    position: usize,
    line: usize,
}

/// Splits `text` into logical lines. See [`LogicalLines`].
///
/// # Examples
///
/// ```rust
/// use eton::cell::logical_lines;
///
/// let text = "a,b\r\n\"multi\nline\",c\nlast";
/// let lines: Vec<_> = logical_lines(text).collect();
/// assert_eq!(lines, vec![(1, "a,b"), (2, "\"multi\nline\",c"), (4, "last")]);
///
/// // An unterminated quote only swallows its own row.
/// let lines: Vec<_> = logical_lines("\"broken,1\n2,3\n4,5").collect();
/// assert_eq!(lines, vec![(1, "\"broken,1"), (2, "2,3"), (3, "4,5")]);
/// ```
#[must_use]
pub fn logical_lines(text: &str) -> LogicalLines<'_> {
    LogicalLines {
        text,
        position: 0,
        line: 1,
    }
}

impl<'a> LogicalLines<'a> {
    /// The text not yet handed out.
    #[must_use]
    pub fn rest(&self) -> &'a str {
        &self.text[self.position..]
    }
}

impl<'a> Iterator for LogicalLines<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }

        let (end, next) = scan_line(rest.as_bytes(), true).unwrap_or((rest.len(), rest.len()));
        let start_line = self.line;
        self.line += rest[..next].matches('\n').count();
        self.position += next;
        Some((start_line, strip_cr(&rest[..end])))
    }
}

/// Incremental, quote-aware line reassembly for chunked input.
///
/// Chunks may split a line anywhere, including mid-token or inside a quoted
/// cell. Only complete lines are handed out; the incomplete tail stays
/// buffered. An open quoted cell stops holding lines back as soon as it is
/// shown to be truncated: the next physical line starts with `%` or `!`, or
/// the quote is closed by anything but a delimiter or a line break.
///
/// # Examples
///
/// ```rust
/// use eton::cell::LineBuffer;
///
/// let mut buffer = LineBuffer::new();
/// buffer.push("%Sche");
/// assert_eq!(buffer.next_line(), None);
/// buffer.push("ma:Log\nlev");
/// assert_eq!(buffer.next_line(), Some("%Schema:Log".to_string()));
/// assert_eq!(buffer.next_line(), None);
/// assert_eq!(buffer.take_rest(), Some("lev".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) {
        self.pending.push_str(chunk);
    }

    /// Returns the next complete line, if one is buffered.
    pub fn next_line(&mut self) -> Option<String> {
        let (end, next) = scan_line(self.pending.as_bytes(), false)?;
        let line = strip_cr(&self.pending[..end]).to_string();
        self.pending.drain(..next);
        Some(line)
    }

    /// Takes whatever is left, for a best-effort final flush. The text may
    /// still hold several lines if a quoted cell was left open; split it with
    /// [`logical_lines`].
    pub fn take_rest(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    /// Number of buffered bytes not yet handed out.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(cells: &[&str]) {
        let line = encode_row(cells);
        assert_eq!(decode_row(&line), cells, "line was {:?}", line);
    }

    #[test]
    fn test_roundtrip_edge_cells() {
        roundtrip(&["a", "b", "c"]);
        roundtrip(&[""]);
        roundtrip(&["", ""]);
        roundtrip(&["line1\nline2", "cr\r"]);
        roundtrip(&["\"", "\"\"", "a\"b"]);
        roundtrip(&["%User", "!raw", " padded "]);
        roundtrip(&["(a ;b)", "{\"k\":1}"]);
    }

    #[test]
    fn test_empty_line_is_zero_cells() {
        assert!(decode_row("").is_empty());
        assert_eq!(encode_row::<&str>(&[]), "");
    }

    #[test]
    fn test_marker_cells_are_quoted() {
        assert_eq!(encode_row(&["%x", "y"]), "\"%x\",y");
        assert_eq!(encode_row(&["!x"]), "\"!x\"");
    }

    #[test]
    fn test_relaxed_decoding() {
        assert_eq!(decode_row("ab\"c,d"), vec!["ab\"c", "d"]);
        assert_eq!(decode_row("\"ab\"c,d"), vec!["abc", "d"]);

        let row = decode_row_checked("x,\"unterminated");
        assert!(row.truncated);
        assert_eq!(row.cells, vec!["x", "unterminated"]);
    }

    #[test]
    fn test_split_pair_uses_last_delimiter() {
        assert_eq!(
            split_pair("a,b,@3"),
            Some(("a,b".to_string(), "@3".to_string()))
        );
        assert_eq!(
            split_pair("\"say \"\"hi\"\"\",@2"),
            Some(("say \"hi\"".to_string(), "@2".to_string()))
        );
        assert_eq!(split_pair(",@1"), Some((String::new(), "@1".to_string())));
    }

    #[test]
    fn test_line_buffer_quoted_newline() {
        let mut buffer = LineBuffer::new();
        buffer.push("\"a\n");
        assert_eq!(buffer.next_line(), None);
        buffer.push("b\",c\r\nnext");
        assert_eq!(buffer.next_line(), Some("\"a\nb\",c".to_string()));
        assert_eq!(buffer.next_line(), None);
        assert_eq!(buffer.pending_len(), 4);
        assert_eq!(buffer.take_rest(), Some("next".to_string()));
        assert_eq!(buffer.take_rest(), None);
    }

    #[test]
    fn test_open_quote_closed_by_marker_line() {
        let text = "1,\"broken\n!1,raw\n2,ok\n%Symbol\nk,@1";
        let lines: Vec<&str> = logical_lines(text).map(|(_, l)| l).collect();
        assert_eq!(lines, vec!["1,\"broken", "!1,raw", "2,ok", "%Symbol", "k,@1"]);
    }

    #[test]
    fn test_open_quote_closed_by_stray_quote() {
        // The quote opened on line 1 is "closed" by the opening quote of a
        // later cell, which is followed by text.
        let text = "\"a,1\n2,3\n4,\"x y\",5\n6,7";
        let lines: Vec<(usize, &str)> = logical_lines(text).collect();
        assert_eq!(
            lines,
            vec![(1, "\"a,1"), (2, "2,3"), (3, "4,\"x y\",5"), (4, "6,7")]
        );
    }

    #[test]
    fn test_closed_multiline_cell_does_not_move_the_cut() {
        let text = "\"a\nb\",\"c\nd\"e\n%X";
        let lines: Vec<&str> = logical_lines(text).map(|(_, l)| l).collect();
        assert_eq!(lines, vec!["\"a\nb\",\"c", "d\"e", "%X"]);
    }

    #[test]
    fn test_quote_inside_unquoted_cell_does_not_open() {
        let lines: Vec<&str> = logical_lines("ab\"c,d\ne,f").map(|(_, l)| l).collect();
        assert_eq!(lines, vec!["ab\"c,d", "e,f"]);
    }

    #[test]
    fn test_line_buffer_releases_truncated_row_at_marker() {
        let mut buffer = LineBuffer::new();
        buffer.push("\"5,@2\n");
        assert_eq!(buffer.next_line(), None);
        buffer.push("%Symbol\nuser4,@6\n");
        assert_eq!(buffer.next_line(), Some("\"5,@2".to_string()));
        assert_eq!(buffer.next_line(), Some("%Symbol".to_string()));
        assert_eq!(buffer.next_line(), Some("user4,@6".to_string()));
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn test_line_buffer_waits_on_quote_at_chunk_end() {
        let mut buffer = LineBuffer::new();
        buffer.push("\"a\"");
        assert_eq!(buffer.next_line(), None);
        buffer.push("\"b\",c\n");
        assert_eq!(buffer.next_line(), Some("\"a\"\"b\",c".to_string()));
    }
}
