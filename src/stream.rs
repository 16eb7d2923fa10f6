//! Streaming protocol: one record at a time, dictionary sent incrementally.
//!
//! A [`StreamEncoder`] session turns records into text chunks. The first
//! chunk carries the compact schema header; every chunk that mints new
//! symbols carries exactly those entries in a `%Symbol` block closed by
//! `%Data`; then comes the data line. A [`StreamDecoder`] consumes the text
//! in chunks of any size (a line may be split anywhere) and rebuilds the
//! records.
//!
//! ```rust
//! use eton::{eton, EncodeOptions, StreamDecoder, StreamEncoder, Value};
//!
//! let mut encoder = StreamEncoder::new("Log")
//!     .with_options(EncodeOptions::new().with_threshold(4));
//! let first = encoder.push(eton!({"ts": "10:00", "level": "INFO"}).as_object().unwrap());
//! assert_eq!(first, "%Schema:Log\nts,level\n%Symbol\n10:00,@1\nINFO,@2\n%Data\n@1,@2\n");
//!
//! let mut decoder = StreamDecoder::new();
//! let records = decoder.feed(&first);
//! assert_eq!(records[0].get("level"), Some(&Value::from("INFO")));
//! ```
//!
//! Each session owns its dictionary. Dropping the encoder ends the session;
//! [`StreamDecoder::finish`] is the close signal on the decoding side.

use crate::cell::{
    decode_row, decode_row_checked, encode_row, logical_lines, split_pair, LineBuffer,
};
use crate::format::{
    is_token, AUDIT_MARKER, DATA_HEADER, FALSE_TOKEN, HEADER_MARKER, NULL_TOKEN, SCHEMA_HEADER,
    SYMBOL_HEADER, TRUE_TOKEN,
};
use crate::options::EncodeOptions;
use crate::ser::encode_data_line;
use crate::symbols::{coerce_scalar, SymbolPolicy, SymbolState, SymbolTable};
use crate::{Error, Map, Value};
use std::borrow::Borrow;
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

/// Encoding side of a stream session.
#[derive(Debug, Clone)]
pub struct StreamEncoder {
    schema_id: String,
    fields: Option<Vec<String>>,
    policy: SymbolPolicy,
    table: SymbolTable,
    header_emitted: bool,
}

impl StreamEncoder {
    /// Starts a session for `schema_id` with default options.
    pub fn new(schema_id: impl Into<String>) -> Self {
        StreamEncoder {
            schema_id: schema_id.into(),
            fields: None,
            policy: SymbolPolicy::default(),
            table: SymbolTable::new(),
            header_emitted: false,
        }
    }

    /// Declares the field list instead of taking it from the first record.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the symbolization thresholds. Audit lines are never streamed and
    /// the dictionary is always sent in line form.
    #[must_use]
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.policy = options.policy();
        self
    }

    /// Encodes one record into the next chunk of wire text.
    ///
    /// The field list is fixed by the first record (its keys, in order)
    /// unless declared, and is never re-inferred.
    pub fn push(&mut self, record: &Map) -> String {
        let fields: &[String] = self
            .fields
            .get_or_insert_with(|| record.keys().cloned().collect());

        let known = self.table.state().len();
        let line = encode_data_line(&mut self.table, record, fields, &self.policy);

        let mut out = String::new();
        if !self.header_emitted {
            out.push_str(SCHEMA_HEADER);
            out.push(':');
            out.push_str(&self.schema_id);
            out.push('\n');
            out.push_str(&encode_row(fields));
            out.push('\n');
            self.header_emitted = true;
        }

        // Minting only appends, so the new entries are the tail.
        let mut minted = 0usize;
        for (key, token) in self.table.state().entries().skip(known) {
            if minted == 0 {
                out.push_str(SYMBOL_HEADER);
                out.push('\n');
            }
            out.push_str(&encode_row(&[key, token]));
            out.push('\n');
            minted += 1;
        }
        if minted > 0 {
            out.push_str(DATA_HEADER);
            out.push('\n');
        }

        out.push_str(&line);
        out.push('\n');

        debug!(schema = %self.schema_id, minted, bytes = out.len(), "stream record encoded");
        out
    }

    /// Field list in use, once known.
    #[must_use]
    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    /// Snapshot of everything transmitted so far.
    #[must_use]
    pub fn state(&self) -> SymbolState {
        self.table.snapshot()
    }

    /// Adapts an iterator of records into an iterator of wire chunks.
    pub fn encode_iter<I>(self, records: I) -> EncodeStream<I::IntoIter>
    where
        I: IntoIterator,
    {
        EncodeStream {
            records: records.into_iter(),
            encoder: self,
        }
    }
}

/// Decoder mode, driven by block markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// No header seen yet; nothing is interpreted.
    #[default]
    Idle,
    /// The next non-empty line is the field list.
    AwaitingSchemaFields,
    DictionaryBlock,
    DataBlock,
}

/// Decoding side of a stream session.
///
/// # Examples
///
/// ```rust
/// use eton::{StreamDecoder, Value};
///
/// let mut decoder = StreamDecoder::new();
/// assert!(decoder.feed("%Schema:User\nname,ro").is_empty());
/// assert!(decoder.feed("le\n%Symbol\nAdministrator,@1\n%Data\nBob,@").is_empty());
///
/// let records = decoder.feed("1\n");
/// assert_eq!(records[0].get("name"), Some(&Value::from("Bob")));
/// assert_eq!(records[0].get("role"), Some(&Value::from("Administrator")));
/// ```
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: LineBuffer,
    table: SymbolTable,
    fields: Vec<String>,
    mode: Mode,
    sentinels: bool,
    line: usize,
}

impl StreamDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps the `_`, `T` and `F` cells to null, true and false. Off by
    /// default, where they decode as the literal one-letter text.
    #[must_use]
    pub fn with_sentinels(mut self, sentinels: bool) -> Self {
        self.sentinels = sentinels;
        self
    }

    /// Consumes one chunk and returns the records completed by it.
    pub fn feed(&mut self, chunk: &str) -> Vec<Map> {
        self.buffer.push(chunk);
        let mut records = Vec::new();
        while let Some(line) = self.buffer.next_line() {
            if let Some(record) = self.process(&line) {
                records.push(record);
            }
        }
        records
    }

    /// Ends the session, decoding the buffered tail best-effort. A quoted
    /// cell left open holds back every line after it, so the tail may be
    /// several lines.
    pub fn finish(mut self) -> Vec<Map> {
        let Some(rest) = self.buffer.take_rest() else {
            return Vec::new();
        };
        logical_lines(&rest)
            .filter_map(|(_, line)| self.process(line))
            .collect()
    }

    /// Dictionary received so far.
    #[must_use]
    pub fn dictionary(&self) -> &SymbolState {
        self.table.state()
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Adapts an iterator of text chunks into an iterator of records.
    pub fn decode_iter<I>(self, chunks: I) -> DecodeStream<I::IntoIter>
    where
        I: IntoIterator,
    {
        DecodeStream {
            chunks: chunks.into_iter(),
            decoder: Some(self),
            ready: VecDeque::new(),
        }
    }

    fn process(&mut self, line: &str) -> Option<Map> {
        self.line += 1;
        let start_line = self.line;
        self.line += line.matches('\n').count();

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.starts_with(HEADER_MARKER) {
            let next = if trimmed.starts_with(SCHEMA_HEADER) {
                Mode::AwaitingSchemaFields
            } else if trimmed.starts_with(SYMBOL_HEADER) {
                Mode::DictionaryBlock
            } else if trimmed.starts_with(DATA_HEADER) {
                Mode::DataBlock
            } else {
                trace!(line = start_line, header = trimmed, "ignoring unknown header");
                self.mode
            };
            self.mode = next;
            return None;
        }

        match self.mode {
            Mode::Idle => None,
            Mode::AwaitingSchemaFields => {
                self.fields = decode_row(trimmed);
                self.mode = Mode::DataBlock;
                debug!(fields = self.fields.len(), "stream schema received");
                None
            }
            Mode::DictionaryBlock => {
                let merged = match split_pair(trimmed) {
                    Some((key, token)) => self.table.insert(key, token),
                    None => false,
                };
                if !merged {
                    warn!("{}", Error::malformed_entry(start_line, trimmed));
                }
                None
            }
            Mode::DataBlock => {
                if trimmed.starts_with(AUDIT_MARKER) || self.fields.is_empty() {
                    return None;
                }
                let decoded = decode_row_checked(trimmed);
                if decoded.truncated {
                    warn!("{}", Error::truncated(start_line));
                }
                let mut record = Map::with_capacity(self.fields.len());
                for (field, cell) in self.fields.iter().zip(decoded.cells) {
                    record.insert(field.clone(), self.resolve_cell(&cell));
                }
                Some(record)
            }
        }
    }

    fn resolve_cell(&self, cell: &str) -> Value {
        if self.sentinels {
            match cell {
                NULL_TOKEN => return Value::Null,
                TRUE_TOKEN => return Value::Bool(true),
                FALSE_TOKEN => return Value::Bool(false),
                _ => {}
            }
        }

        if !is_token(cell) {
            return coerce_scalar(cell);
        }
        match self.table.state().lookup(cell) {
            Some(raw) => coerce_scalar(raw),
            None => {
                warn!("{}", Error::unresolved(cell));
                Value::String(cell.to_string())
            }
        }
    }
}

/// Iterator of wire chunks produced from an iterator of records.
///
/// Created via [`StreamEncoder::encode_iter`].
pub struct EncodeStream<I> {
    records: I,
    encoder: StreamEncoder,
}

impl<I> EncodeStream<I> {
    /// The underlying session.
    pub fn encoder(&self) -> &StreamEncoder {
        &self.encoder
    }
}

impl<I, R> Iterator for EncodeStream<I>
where
    I: Iterator<Item = R>,
    R: Borrow<Map>,
{
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(self.encoder.push(record.borrow()))
    }
}

/// Iterator of records decoded from an iterator of text chunks. The
/// trailing partial line is flushed once the chunks run out.
///
/// Created via [`StreamDecoder::decode_iter`].
pub struct DecodeStream<I> {
    chunks: I,
    decoder: Option<StreamDecoder>,
    ready: VecDeque<Map>,
}

impl<I, S> Iterator for DecodeStream<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Map;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.ready.pop_front() {
                return Some(record);
            }
            let decoder = self.decoder.as_mut()?;
            match self.chunks.next() {
                Some(chunk) => {
                    let records = decoder.feed(chunk.as_ref());
                    self.ready.extend(records);
                }
                None => {
                    if let Some(decoder) = self.decoder.take() {
                        self.ready.extend(decoder.finish());
                    }
                }
            }
        }
    }
}
