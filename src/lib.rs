//! # eton
//!
//! A schema-aware, dictionary-compressing, line-oriented text format for
//! batches of structured records, with a streaming protocol that ships the
//! dictionary incrementally.
//!
//! ## What is ETON?
//!
//! ETON lays records out as delimited rows under a schema header. Long,
//! repetitive values are replaced by short `@<n>` tokens declared once in a
//! dictionary block at the end of the document (or, when streaming, right
//! before the first row that uses them).
//!
//! ```text
//! %User
//! 1,@1,T
//! !1,Alice,true
//! %Symbol
//! Alice,@1
//! ```
//!
//! ## Key Features
//!
//! - **Dictionary Substitution**: repeated values cost one token after their
//!   first occurrence
//! - **Graceful Degradation**: audit lines keep raw values recoverable, and the
//!   decoders skip what they cannot read instead of failing
//! - **Streaming**: one record at a time over transports that re-chunk text
//!   arbitrarily, each dictionary entry sent exactly once
//! - **Serde Compatible**: records are ordered maps of dynamic [`Value`]s,
//!   convertible from any `T: Serialize`
//!
//! ## Quick Start
//!
//! ```rust
//! use eton::{dumps, eton, EncodeOptions, Record, SchemaMap, SymbolState};
//!
//! let schemas = SchemaMap::new().with("User", ["id", "name", "active"]);
//! let records: Vec<Record> = vec![
//!     eton!({"id": 1, "name": "Alice", "active": true}).as_object().cloned().unwrap(),
//!     eton!({"id": 2, "name": "Alice", "active": false}).as_object().cloned().unwrap(),
//! ];
//!
//! let options = EncodeOptions::new().with_threshold(5).with_audit(false);
//! let doc = dumps(&records, "User", &schemas, &SymbolState::new(), &options)?;
//! assert_eq!(doc, "%User\n1,@1,T\n2,@1,F\n%Symbol\nAlice,@1");
//! # Ok::<(), eton::Error>(())
//! ```
//!
//! ### Streaming
//!
//! ```rust
//! use eton::{eton, EncodeOptions, StreamDecoder, StreamEncoder};
//!
//! let encoder = StreamEncoder::new("User").with_options(EncodeOptions::new().with_threshold(0));
//! let records = vec![
//!     eton!({"name": "Alice", "role": "Admin"}).as_object().cloned().unwrap(),
//!     eton!({"name": "Bob", "role": "Admin"}).as_object().cloned().unwrap(),
//! ];
//! let wire: String = encoder.encode_iter(&records).collect();
//!
//! let decoded: Vec<_> = StreamDecoder::new().decode_iter(wire.split_inclusive('@')).collect();
//! assert_eq!(decoded, records);
//! ```
//!
//! ### Inspecting a document
//!
//! ```rust
//! use eton::{debug_loads, EntryKind};
//!
//! let entries = debug_loads("%User\n1,@1\n%Symbol\nAlice,@1");
//! assert!(matches!(entries[0].kind, EntryKind::Schema { .. }));
//! ```
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - Only an undeclared schema id fails an encode; decoding never fails
//! - A corrupted line is decoded best-effort and reported through `tracing`

pub mod cell;
pub mod de;
pub mod error;
pub mod format;
pub mod macros;
pub mod map;
pub mod options;
pub mod schema;
pub mod ser;
pub mod stream;
pub mod symbols;
pub mod toml_bridge;
pub mod value;

pub use de::{debug_decode, debug_loads, parse_line, DebugDecoder, DebugEntry, EntryKind, ParsedLine};
pub use error::{Error, Result};
pub use map::Map;
pub use options::{DictionaryFormat, EncodeOptions, DEFAULT_NUMERIC_THRESHOLD, DEFAULT_THRESHOLD};
pub use schema::{
    check_schema_id, detect_recommended_format, infer_schema, infer_schema_with, normalize_schema,
    validate_schema, InferencePolicy, SchemaMap, MAX_INFER_DEPTH,
};
pub use ser::{dumps, encode, encode_batch, Encoder};
pub use stream::{DecodeStream, EncodeStream, Mode, StreamDecoder, StreamEncoder};
pub use symbols::{
    coerce_scalar, parse_dictionary, parse_numeric, resolve, serialize_dictionary,
    serialize_dictionary_json, SymbolPolicy, SymbolState, SymbolTable,
};
pub use toml_bridge::{toml_to_eton, toml_to_eton_with, TomlConversion};
pub use value::{Number, Value};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;

/// One record: field names mapped to values, in insertion order.
pub type Record = Map;

/// Convert any `T: Serialize` to a [`Value`].
///
/// # Examples
///
/// ```rust
/// use eton::{to_value, Value};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let value = to_value(&Point { x: 1, y: 2 }).unwrap();
/// assert!(value.is_object());
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be represented (e.g. maps with
/// non-string keys).
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    Ok(Value::from(serde_json::to_value(value)?))
}

/// Convert a [`Value`] back into any `T: Deserialize`.
///
/// Dates and big integers arrive as strings.
///
/// # Errors
///
/// Returns an error if the value does not match the shape of `T`.
pub fn from_value<T>(value: Value) -> Result<T>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_value(value.to_json())?)
}

/// Convert a slice of serializable items into records.
///
/// # Errors
///
/// Returns [`Error::Custom`] if an item does not serialize to an object.
pub fn to_records<T>(items: &[T]) -> Result<Vec<Record>>
where
    T: Serialize,
{
    items
        .iter()
        .map(|item| match to_value(item)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::custom(format!(
                "expected a record object, found {}",
                other.kind()
            ))),
        })
        .collect()
}

/// Write a complete document (see [`dumps`]) to a writer.
///
/// # Errors
///
/// Returns an error if encoding fails or writing to the writer fails.
pub fn dumps_to_writer<W>(
    mut writer: W,
    records: &[Record],
    schema_id: &str,
    schemas: &SchemaMap,
    options: &EncodeOptions,
) -> Result<SymbolState>
where
    W: io::Write,
{
    let (mut doc, state) = encode_batch(records, schema_id, schemas, &SymbolState::new(), options)?;
    doc.push('\n');
    ser::write_dictionary(&mut doc, records, &state, options.dictionary_format);
    writer
        .write_all(doc.as_bytes())
        .map_err(|e| Error::io(&e.to_string()))?;
    Ok(state)
}
