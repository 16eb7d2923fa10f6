//! Schema registry: schema ids mapped to ordered field lists.
//!
//! Schemas are plain name lists. A record field missing from the schema is
//! not encoded; a schema field missing from the record encodes as `_`.
//!
//! ```rust
//! use eton::{eton, infer_schema, Record};
//!
//! let records: Vec<Record> = vec![
//!     eton!({"id": 1, "tags": [{"k": "a", "v": 1}]}).as_object().cloned().unwrap(),
//! ];
//! let schemas = infer_schema(&records, "Root");
//! assert_eq!(schemas.get("Root"), Some(&["id".to_string(), "tags".to_string()][..]));
//! assert_eq!(schemas.get("tags"), Some(&["k".to_string(), "v".to_string()][..]));
//! ```

use crate::format::{DATA_HEADER, HEADER_MARKER, SCHEMA_HEADER, SYMBOL_HEADER};
use crate::options::DictionaryFormat;
use crate::{Error, Map, Result, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum nesting level followed by schema inference. Deeper arrays of
/// objects are left to be encoded as opaque values.
pub const MAX_INFER_DEPTH: usize = 32;

/// Number of leading records inspected by [`detect_recommended_format`].
const FORMAT_SAMPLE_SIZE: usize = 10;

/// Share of object-valued fields above which the JSON dictionary is preferred.
const NESTED_RATIO: f64 = 0.2;

/// Ordered map of schema id to field names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaMap(IndexMap<String, Vec<String>>);

impl SchemaMap {
    #[must_use]
    pub fn new() -> Self {
        SchemaMap(IndexMap::new())
    }

    /// Declares (or replaces) a schema.
    pub fn insert<I, S>(&mut self, id: impl Into<String>, fields: I) -> Option<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(id.into(), fields.into_iter().map(Into::into).collect())
    }

    /// Builder form of [`SchemaMap::insert`].
    #[must_use]
    pub fn with<I, S>(mut self, id: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(id, fields);
        self
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&[String]> {
        self.0.get(id).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, Vec<V>)> for SchemaMap {
    fn from_iter<T: IntoIterator<Item = (K, Vec<V>)>>(iter: T) -> Self {
        let mut map = SchemaMap::new();
        for (id, fields) in iter {
            map.insert(id, fields);
        }
        map
    }
}

/// Rejects schema ids that cannot be written as a batch header: ids whose
/// `%<id>` line would read back as a block marker (`%Data`, `%Symbol...`,
/// `%Schema:...`), empty ids, and ids holding a line break.
///
/// # Errors
///
/// Returns [`Error::Schema`] for a rejected id.
///
/// # Examples
///
/// ```rust
/// use eton::check_schema_id;
///
/// assert!(check_schema_id("User").is_ok());
/// assert!(check_schema_id("Database").is_ok());
/// assert!(check_schema_id("Symbol").is_err());
/// assert!(check_schema_id("Schema:User").is_err());
/// ```
pub fn check_schema_id(id: &str) -> Result<()> {
    if id.trim().is_empty() || id.contains(['\n', '\r']) {
        return Err(Error::schema(format!("Invalid schema id {:?}", id)));
    }

    let header = format!("{}{}", HEADER_MARKER, id);
    let reserved = header == DATA_HEADER
        || header.starts_with(SYMBOL_HEADER)
        || header
            .strip_prefix(SCHEMA_HEADER)
            .is_some_and(|rest| rest.starts_with(':'));
    if reserved {
        return Err(Error::schema(format!(
            "Schema '{}' collides with a block marker",
            id
        )));
    }
    Ok(())
}

/// How [`infer_schema_with`] picks the fields of a level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InferencePolicy {
    /// Keys of the first record only. Fields that appear only in later
    /// records are dropped.
    #[default]
    FirstRecord,
    /// Keys of every record, in first-seen order.
    Union,
}

/// Infers schemas from the first record of `records`, recursing into
/// fields that hold arrays of objects (the field name becomes the
/// sub-schema id).
#[must_use]
pub fn infer_schema(records: &[Map], root_id: &str) -> SchemaMap {
    infer_schema_with(records, root_id, InferencePolicy::FirstRecord)
}

/// Like [`infer_schema`] with an explicit policy.
///
/// # Examples
///
/// ```rust
/// use eton::{eton, infer_schema_with, InferencePolicy, Record};
///
/// let records: Vec<Record> = [eton!({"a": 1}), eton!({"a": 2, "b": 3})]
///     .into_iter()
///     .filter_map(|v| v.as_object().cloned())
///     .collect();
///
/// let first = infer_schema_with(&records, "Root", InferencePolicy::FirstRecord);
/// assert_eq!(first.get("Root").unwrap().len(), 1);
///
/// let union = infer_schema_with(&records, "Root", InferencePolicy::Union);
/// assert_eq!(union.get("Root").unwrap(), &["a".to_string(), "b".to_string()][..]);
/// ```
#[must_use]
pub fn infer_schema_with(records: &[Map], root_id: &str, policy: InferencePolicy) -> SchemaMap {
    let mut schemas = SchemaMap::new();
    let level: Vec<&Map> = records.iter().collect();
    infer_level(&level, root_id, policy, 0, &mut schemas);
    debug!(root = root_id, schemas = schemas.len(), "inferred schemas");
    schemas
}

fn infer_level(
    records: &[&Map],
    id: &str,
    policy: InferencePolicy,
    depth: usize,
    schemas: &mut SchemaMap,
) {
    if depth >= MAX_INFER_DEPTH {
        debug!(schema = id, depth, "schema inference depth limit reached");
        return;
    }
    let Some(first) = records.first() else {
        return;
    };

    let considered: &[&Map] = match policy {
        InferencePolicy::FirstRecord => std::slice::from_ref(first),
        InferencePolicy::Union => records,
    };

    let mut fields: Vec<String> = Vec::new();
    for record in considered {
        for key in record.keys() {
            if !fields.contains(key) {
                fields.push(key.clone());
            }
        }
    }
    schemas.insert(id, fields.iter().cloned());

    for field in &fields {
        let Some(nested) = nested_records(considered, field) else {
            continue;
        };
        infer_level(&nested, field, policy, depth + 1, schemas);
    }
}

/// Objects held by `field` across `records`, when the field is a non-empty
/// array starting with an object.
fn nested_records<'a>(records: &[&'a Map], field: &str) -> Option<Vec<&'a Map>> {
    let mut nested = Vec::new();
    for record in records {
        if let Some(Value::Array(items)) = record.get(field) {
            if matches!(items.first(), Some(Value::Object(_))) {
                nested.extend(items.iter().filter_map(Value::as_object));
            }
        }
    }
    if nested.is_empty() {
        None
    } else {
        Some(nested)
    }
}

/// Checks an untyped schema document: every value must be a list of
/// strings.
///
/// # Errors
///
/// Returns [`Error::Schema`] naming the first offending schema.
///
/// # Examples
///
/// ```rust
/// use eton::validate_schema;
///
/// let ok = serde_json::json!({"User": ["id", "name"]});
/// assert!(validate_schema(&ok).is_ok());
///
/// let bad = serde_json::json!({"User": "id,name"});
/// assert!(validate_schema(&bad).unwrap_err().to_string().contains("fields must be a list"));
/// ```
pub fn validate_schema(input: &serde_json::Value) -> Result<()> {
    let Some(object) = input.as_object() else {
        return Err(Error::schema(
            "Invalid schema input: must be an object whose values are lists of strings",
        ));
    };
    for (name, fields) in object {
        let Some(fields) = fields.as_array() else {
            return Err(Error::schema(format!(
                "Schema '{}' fields must be a list",
                name
            )));
        };
        if fields.iter().any(|f| !f.is_string()) {
            return Err(Error::schema(format!(
                "Schema '{}' contains non-string field definition",
                name
            )));
        }
    }
    Ok(())
}

/// Turns an untyped schema document into a [`SchemaMap`].
///
/// # Errors
///
/// Returns [`Error::Schema`] ("Invalid schema input") unless the input is an
/// object whose values are lists of strings.
pub fn normalize_schema(input: &serde_json::Value) -> Result<SchemaMap> {
    if validate_schema(input).is_err() {
        return Err(Error::schema(
            "Invalid schema input: must be an object whose values are lists of strings",
        ));
    }
    let mut schemas = SchemaMap::new();
    if let Some(object) = input.as_object() {
        for (name, fields) in object {
            let fields = fields
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(serde_json::Value::as_str);
            schemas.insert(name.as_str(), fields);
        }
    }
    Ok(schemas)
}

/// Recommends a dictionary form for a batch.
///
/// Counts the top-level fields of the first records; when more than a fifth
/// of them hold (non-array) objects the data is considered nested and the
/// JSON form is recommended, otherwise the line form.
///
/// # Examples
///
/// ```rust
/// use eton::{detect_recommended_format, eton, DictionaryFormat, Record};
///
/// let flat: Vec<Record> = vec![eton!({"a": 1, "b": "x"}).as_object().cloned().unwrap()];
/// assert_eq!(detect_recommended_format(&flat), DictionaryFormat::Lines);
///
/// let nested: Vec<Record> = vec![eton!({"a": 1, "meta": {"k": "v"}}).as_object().cloned().unwrap()];
/// assert_eq!(detect_recommended_format(&nested), DictionaryFormat::Json);
///
/// assert_eq!(detect_recommended_format(&[]), DictionaryFormat::Lines);
/// ```
#[must_use]
pub fn detect_recommended_format(records: &[Map]) -> DictionaryFormat {
    let mut total = 0usize;
    let mut nested = 0usize;
    for record in records.iter().take(FORMAT_SAMPLE_SIZE) {
        for value in record.values() {
            total += 1;
            if value.is_object() {
                nested += 1;
            }
        }
    }

    if total > 0 && (nested as f64) / (total as f64) > NESTED_RATIO {
        DictionaryFormat::Json
    } else {
        DictionaryFormat::Lines
    }
}
