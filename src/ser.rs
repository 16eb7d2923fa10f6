//! Batch encoding.
//!
//! This module provides the [`Encoder`] that turns records into an ETON
//! document body, plus the high-level [`encode_batch`], [`encode`] and
//! [`dumps`] functions built on it.
//!
//! ## Overview
//!
//! For every record, in schema field order, one cell is computed:
//!
//! - **Null / absent**: `_`
//! - **Booleans**: `T` / `F`
//! - **Scalars**: literal text or a symbol token, decided by the symbol table
//! - **Arrays**: `(a ;b ;c)`, each item resolved through the symbol table
//! - **Objects**: compact JSON text, never symbolized directly
//!
//! With audit enabled each data line is followed by `!` and the raw values.
//!
//! ## Direct Encoder Usage
//!
//! ```rust
//! use eton::{eton, EncodeOptions, Encoder, SymbolState};
//!
//! let options = EncodeOptions::new().with_threshold(0).with_audit(false);
//! let mut encoder = Encoder::new(SymbolState::new(), options);
//!
//! let fields = vec!["id".to_string(), "name".to_string()];
//! encoder.write_header("User");
//! let record = eton!({"id": 1, "name": "Alice"});
//! encoder.write_record(record.as_object().unwrap(), &fields);
//!
//! let (text, state) = encoder.into_parts();
//! assert_eq!(text, "%User\n1,@1");
//! assert_eq!(state.get("Alice"), Some("@1"));
//! ```

use crate::cell::encode_row;
use crate::format::{AUDIT_MARKER, HEADER_MARKER, LIST_CLOSE, LIST_OPEN, LIST_SEPARATOR};
use crate::options::{DictionaryFormat, EncodeOptions};
use crate::schema::{check_schema_id, detect_recommended_format, SchemaMap};
use crate::symbols::{
    serialize_dictionary, serialize_dictionary_json, SymbolPolicy, SymbolState, SymbolTable,
};
use crate::{Error, Map, Result, Value};
use tracing::debug;

/// The ETON batch encoder.
///
/// Owns the output buffer and the symbol table of one encoding session.
/// Created via [`Encoder::new`]; [`Encoder::into_parts`] hands back the text
/// and the final dictionary snapshot.
pub struct Encoder {
    output: String,
    options: EncodeOptions,
    policy: SymbolPolicy,
    table: SymbolTable,
}

impl Encoder {
    pub fn new(state: SymbolState, options: EncodeOptions) -> Self {
        Encoder {
            output: String::with_capacity(256),
            policy: options.policy(),
            options,
            table: SymbolTable::from_state(state),
        }
    }

    fn push_line(&mut self, line: &str) {
        if !self.output.is_empty() {
            self.output.push('\n');
        }
        self.output.push_str(line);
    }

    /// Writes the `%<schema_id>` header line.
    pub fn write_header(&mut self, schema_id: &str) {
        let header = format!("{}{}", HEADER_MARKER, schema_id);
        self.push_line(&header);
    }

    /// Writes one data line, and its audit line when enabled.
    pub fn write_record(&mut self, record: &Map, fields: &[String]) {
        let line = encode_data_line(&mut self.table, record, fields, &self.policy);
        self.push_line(&line);

        if self.options.audit {
            let line = audit_line(record, fields);
            self.push_line(&line);
        }
    }

    /// The symbol table as it stands after the records written so far.
    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn into_inner(self) -> String {
        self.output
    }

    pub fn into_parts(self) -> (String, SymbolState) {
        (self.output, self.table.into_state())
    }
}

/// Encodes one value into its cell text.
pub(crate) fn encode_cell(table: &mut SymbolTable, value: Option<&Value>, policy: &SymbolPolicy) -> String {
    match value {
        None => table.get_or_create(&Value::Null, policy),
        Some(Value::Array(items)) => {
            let mut cell = String::new();
            cell.push(LIST_OPEN);
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    cell.push_str(LIST_SEPARATOR);
                }
                cell.push_str(&table.get_or_create(item, policy));
            }
            cell.push(LIST_CLOSE);
            cell
        }
        Some(obj @ Value::Object(_)) => obj.to_json().to_string(),
        Some(scalar) => table.get_or_create(scalar, policy),
    }
}

/// Encodes the data line of one record, in `fields` order.
pub(crate) fn encode_data_line(
    table: &mut SymbolTable,
    record: &Map,
    fields: &[String],
    policy: &SymbolPolicy,
) -> String {
    let cells: Vec<String> = fields
        .iter()
        .map(|field| encode_cell(table, record.get(field), policy))
        .collect();
    encode_row(&cells)
}

fn audit_line(record: &Map, fields: &[String]) -> String {
    let cells: Vec<String> = fields
        .iter()
        .map(|field| record.get(field).map(Value::canonical_text).unwrap_or_default())
        .collect();
    format!("{}{}", AUDIT_MARKER, encode_row(&cells))
}

/// Encodes a batch of records against a declared schema.
///
/// Returns the document body (header, data lines, optional audit lines,
/// joined by `\n`) and the updated dictionary. `state` is left untouched.
///
/// # Errors
///
/// Returns [`Error::Schema`] if `schema_id` would read back as a block
/// marker (see [`check_schema_id`]) and [`Error::SchemaNotFound`] if it is
/// not declared in `schemas`.
///
/// # Examples
///
/// ```rust
/// use eton::{encode_batch, eton, EncodeOptions, Record, SchemaMap, SymbolState};
///
/// let schemas = SchemaMap::new().with("TestSchema", ["id", "name", "isActive"]);
/// let records: Vec<Record> = vec![
///     eton!({"id": 1, "name": "Alice", "isActive": true}).as_object().cloned().unwrap(),
/// ];
/// let options = EncodeOptions::new().with_threshold(0).with_audit(false);
///
/// let (text, state) = encode_batch(&records, "TestSchema", &schemas, &SymbolState::new(), &options)?;
/// assert_eq!(text, "%TestSchema\n1,@1,T");
/// assert_eq!(state.lookup("@1"), Some("Alice"));
/// # Ok::<(), eton::Error>(())
/// ```
pub fn encode_batch(
    records: &[Map],
    schema_id: &str,
    schemas: &SchemaMap,
    state: &SymbolState,
    options: &EncodeOptions,
) -> Result<(String, SymbolState)> {
    check_schema_id(schema_id)?;
    let fields = schemas
        .get(schema_id)
        .ok_or_else(|| Error::schema_not_found(schema_id))?;

    let mut encoder = Encoder::new(state.clone(), options.clone());
    encoder.write_header(schema_id);
    for record in records {
        encoder.write_record(record, fields);
    }

    let (text, state) = encoder.into_parts();
    debug!(
        schema = schema_id,
        records = records.len(),
        symbols = state.len(),
        bytes = text.len(),
        "encoded batch"
    );
    Ok((text, state))
}

/// Alias of [`encode_batch`] for callers threading the state themselves.
///
/// # Errors
///
/// Same as [`encode_batch`].
pub fn encode(
    records: &[Map],
    schema_id: &str,
    schemas: &SchemaMap,
    state: &SymbolState,
    options: &EncodeOptions,
) -> Result<(String, SymbolState)> {
    encode_batch(records, schema_id, schemas, state, options)
}

/// Encodes a batch and appends the dictionary block, producing a complete
/// self-contained document.
///
/// The block form follows `options.dictionary_format`; `Auto` asks
/// [`detect_recommended_format`].
///
/// # Errors
///
/// Same as [`encode_batch`].
///
/// # Examples
///
/// ```rust
/// use eton::{dumps, eton, DictionaryFormat, EncodeOptions, Record, SchemaMap, SymbolState};
///
/// let schemas = SchemaMap::new().with("User", ["name"]);
/// let records: Vec<Record> = vec![eton!({"name": "Alice"}).as_object().cloned().unwrap()];
/// let options = EncodeOptions::new()
///     .with_threshold(0)
///     .with_audit(false)
///     .with_dictionary_format(DictionaryFormat::Json);
///
/// let doc = dumps(&records, "User", &schemas, &SymbolState::new(), &options)?;
/// assert_eq!(doc, "%User\n@1\n%Symbol:JSON\n{\"Alice\":\"@1\"}");
/// # Ok::<(), eton::Error>(())
/// ```
pub fn dumps(
    records: &[Map],
    schema_id: &str,
    schemas: &SchemaMap,
    state: &SymbolState,
    options: &EncodeOptions,
) -> Result<String> {
    let (mut text, state) = encode_batch(records, schema_id, schemas, state, options)?;
    text.push('\n');
    write_dictionary(&mut text, records, &state, options.dictionary_format);
    Ok(text)
}

/// Appends the dictionary block in the requested form, resolving `Auto`
/// from the records.
pub(crate) fn write_dictionary(
    out: &mut String,
    records: &[Map],
    state: &SymbolState,
    format: DictionaryFormat,
) {
    let format = match format {
        DictionaryFormat::Auto => detect_recommended_format(records),
        explicit => explicit,
    };
    match format {
        DictionaryFormat::Json => out.push_str(&serialize_dictionary_json(state)),
        DictionaryFormat::Lines | DictionaryFormat::Auto => {
            out.push_str(&serialize_dictionary(state))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eton;

    fn policy(threshold: usize) -> SymbolPolicy {
        SymbolPolicy::new(threshold)
    }

    #[test]
    fn test_encode_cell_shapes() {
        let mut table = SymbolTable::new();
        let p = policy(0);

        assert_eq!(encode_cell(&mut table, None, &p), "_");
        assert_eq!(encode_cell(&mut table, Some(&Value::Null), &p), "_");
        assert_eq!(encode_cell(&mut table, Some(&eton!([])), &p), "()");
        assert_eq!(encode_cell(&mut table, Some(&eton!(["a", "b"])), &p), "(@1 ;@2)");
        assert_eq!(encode_cell(&mut table, Some(&eton!([1, null, true])), &p), "(1 ;_ ;T)");
        assert_eq!(
            encode_cell(&mut table, Some(&eton!({"b": 1, "a": "x"})), &p),
            r#"{"b":1,"a":"x"}"#
        );
        assert_eq!(table.state().len(), 2);
    }

    #[test]
    fn test_audit_line_raw_values() {
        let record = eton!({"id": 1, "name": "Alice", "ok": true, "meta": {"k": 1}, "none": null});
        let fields: Vec<String> = ["id", "name", "ok", "meta", "none", "missing"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let line = audit_line(record.as_object().unwrap(), &fields);
        assert_eq!(line, r#"!1,Alice,true,"{""k"":1}",,"#);
    }

    #[test]
    fn test_encoder_threads_table_across_records() {
        let fields = vec!["name".to_string()];
        let mut encoder = Encoder::new(SymbolState::new(), EncodeOptions::new().with_threshold(0));
        encoder.write_header("User");
        for _ in 0..3 {
            encoder.write_record(eton!({"name": "Alice"}).as_object().unwrap(), &fields);
        }
        assert_eq!(encoder.table().state().len(), 1);
        assert_eq!(
            encoder.into_inner(),
            "%User\n@1\n!Alice\n@1\n!Alice\n@1\n!Alice"
        );
    }
}
