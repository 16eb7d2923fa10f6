//! One-way conversion from TOML documents to ETON.
//!
//! Every top-level table becomes one record and every array of tables a
//! batch, each encoded under a schema named after its key. Top-level scalars
//! have no record shape and are skipped. All batches share one dictionary.
//!
//! ```rust
//! use eton::toml_to_eton;
//!
//! let converted = toml_to_eton(r#"
//! [[users]]
//! name = "Alice"
//! role = "admin"
//!
//! [[users]]
//! name = "Bob"
//! role = "admin"
//! "#)?;
//!
//! assert_eq!(converted.document, "%users\nAlice,admin\nBob,admin");
//! assert_eq!(converted.schemas.get("users").unwrap().len(), 2);
//! # Ok::<(), eton::Error>(())
//! ```

use crate::options::EncodeOptions;
use crate::schema::{check_schema_id, SchemaMap};
use crate::ser::encode_batch;
use crate::symbols::SymbolState;
use crate::{Map, Number, Result, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, warn};

/// Output of [`toml_to_eton`].
#[derive(Debug, Clone, PartialEq)]
pub struct TomlConversion {
    /// Encoded blocks, one per table, separated by a blank line.
    pub document: String,
    pub schemas: SchemaMap,
    /// Dictionary shared by all blocks.
    pub state: SymbolState,
}

/// Converts a TOML document with default thresholds.
///
/// # Errors
///
/// Returns [`crate::Error::Toml`] if the text is not valid TOML.
pub fn toml_to_eton(text: &str) -> Result<TomlConversion> {
    toml_to_eton_with(text, &EncodeOptions::new())
}

/// Like [`toml_to_eton`] with explicit thresholds. Audit lines are always
/// off. Tables whose name would read back as a block marker (`[Data]`,
/// `[Symbol]`) are skipped.
///
/// # Errors
///
/// Returns [`crate::Error::Toml`] if the text is not valid TOML.
pub fn toml_to_eton_with(text: &str, options: &EncodeOptions) -> Result<TomlConversion> {
    let root: toml::Table = toml::from_str(text)?;
    let options = options.clone().with_audit(false);

    let mut schemas = SchemaMap::new();
    let mut state = SymbolState::new();
    let mut blocks = Vec::new();

    for (key, value) in &root {
        let records = to_records(value);
        let Some(first) = records.first() else {
            continue;
        };
        if let Err(err) = check_schema_id(key) {
            warn!(table = key.as_str(), "skipping table: {}", err);
            continue;
        }
        schemas.insert(key.as_str(), first.keys().cloned());

        let (block, next) = encode_batch(&records, key, &schemas, &state, &options)?;
        state = next;
        blocks.push(block);
    }

    debug!(
        tables = schemas.len(),
        symbols = state.len(),
        "converted TOML document"
    );
    Ok(TomlConversion {
        document: blocks.join("\n\n"),
        schemas,
        state,
    })
}

fn to_records(value: &toml::Value) -> Vec<Map> {
    match value {
        toml::Value::Table(table) => vec![table_to_map(table)],
        toml::Value::Array(items) if matches!(items.first(), Some(toml::Value::Table(_))) => items
            .iter()
            .filter_map(|item| item.as_table().map(table_to_map))
            .collect(),
        _ => Vec::new(),
    }
}

fn table_to_map(table: &toml::Table) -> Map {
    table
        .iter()
        .map(|(k, v)| (k.clone(), from_toml(v)))
        .collect()
}

fn from_toml(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Number(Number::Integer(*i)),
        toml::Value::Float(f) => Value::Number(Number::Float(*f)),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => datetime_value(&dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(from_toml).collect()),
        toml::Value::Table(table) => Value::Object(table_to_map(table)),
    }
}

/// Offset datetimes keep their instant, local datetimes are read as UTC and
/// local dates as midnight UTC. Local times have no date and stay text.
fn datetime_value(text: &str) -> Value {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Value::Date(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Value::Date(naive.and_utc());
    }
    if let Some(naive) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Value::Date(naive.and_utc());
    }
    Value::String(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_table_is_one_record() {
        let converted = toml_to_eton("[server]\nhost = \"localhost\"\nport = 8080\n").unwrap();
        assert_eq!(converted.document, "%server\nlocalhost,8080");
        assert!(converted.state.is_empty());

        let options = EncodeOptions::new().with_threshold(4);
        let converted = toml_to_eton_with("[server]\nhost = \"localhost\"\nport = 8080\n", &options).unwrap();
        assert_eq!(converted.document, "%server\n@1,@2");
        assert_eq!(converted.state.get("8080"), Some("@2"));
    }

    #[test]
    fn test_top_level_scalars_skipped() {
        let converted = toml_to_eton("title = \"x\"\nnums = [1, 2]\n[a]\nk = 1\n").unwrap();
        assert_eq!(converted.schemas.ids().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(converted.document, "%a\n1");
    }

    #[test]
    fn test_blocks_separated_by_blank_line() {
        let converted = toml_to_eton("[a]\nk = 1\n[b]\nk = 2\n").unwrap();
        assert_eq!(converted.document, "%a\n1\n\n%b\n2");
    }

    #[test]
    fn test_datetimes() {
        assert!(matches!(datetime_value("1979-05-27T07:32:00Z"), Value::Date(_)));
        assert!(matches!(datetime_value("1979-05-27T00:32:00-07:00"), Value::Date(_)));
        assert!(matches!(datetime_value("1979-05-27T07:32:00.5"), Value::Date(_)));
        assert!(matches!(datetime_value("1979-05-27"), Value::Date(_)));
        assert_eq!(datetime_value("07:32:00"), Value::from("07:32:00"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = toml_to_eton("[unclosed").unwrap_err();
        assert!(matches!(err, crate::Error::Toml(_)));
    }
}
