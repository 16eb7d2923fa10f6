//! The symbol table: raw values to short substitution tokens.
//!
//! There is a single implementation of the symbolization policy, on the
//! mutable [`SymbolTable`]. [`SymbolState`] is the immutable snapshot threaded
//! between calls; its pure [`SymbolState::get_symbol`] runs the same policy on
//! a copy-on-write table, so both styles are observably identical.
//!
//! ## Policy
//!
//! Evaluated in order:
//!
//! 1. null / absent → `_` (never stored)
//! 2. booleans → `T` / `F` (never stored)
//! 3. numbers with magnitude below the numeric threshold → literal text
//! 4. anything else → canonical text; an already known text reuses its token,
//!    a text shorter than the threshold stays literal, otherwise a token
//!    `@<next_id>` is minted.
//!
//! ```rust
//! use eton::{SymbolPolicy, SymbolState, Value};
//!
//! let policy = SymbolPolicy::new(0);
//! let state = SymbolState::new();
//!
//! let (token, state) = state.get_symbol(&Value::from("Alice"), &policy);
//! assert_eq!(token, "@1");
//! let (again, state) = state.get_symbol(&Value::from("Alice"), &policy);
//! assert_eq!(again, "@1");
//! assert_eq!(state.len(), 1);
//! ```

use crate::cell::{encode_row, logical_lines, split_pair};
use crate::format::{
    is_token, token_id, FALSE_TOKEN, HEADER_MARKER, NULL_TOKEN, SYMBOL_HEADER,
    SYMBOL_JSON_HEADER, TOKEN_PREFIX, TRUE_TOKEN,
};
use crate::options::{DEFAULT_NUMERIC_THRESHOLD, DEFAULT_THRESHOLD};
use crate::{Error, Number, Value};
use indexmap::IndexMap;
use num_bigint::BigInt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

/// Thresholds deciding which values are symbolized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SymbolPolicy {
    /// Minimum canonical text length, in characters, for a new token.
    pub threshold: usize,
    /// Numbers with a magnitude strictly below this stay literal.
    pub numeric_threshold: f64,
}

impl Default for SymbolPolicy {
    fn default() -> Self {
        SymbolPolicy {
            threshold: DEFAULT_THRESHOLD,
            numeric_threshold: DEFAULT_NUMERIC_THRESHOLD,
        }
    }
}

impl SymbolPolicy {
    /// A policy with the given text threshold and the default numeric one.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        SymbolPolicy {
            threshold,
            ..Default::default()
        }
    }
}

/// Immutable dictionary snapshot.
///
/// Cloning is cheap: the maps are shared until a table derived from the
/// snapshot mints a new token.
#[derive(Clone, Debug)]
pub struct SymbolState {
    forward: Arc<IndexMap<String, String>>,
    reverse: Arc<HashMap<String, String>>,
    next_id: u64,
}

impl Default for SymbolState {
    fn default() -> Self {
        SymbolState {
            forward: Arc::default(),
            reverse: Arc::default(),
            next_id: 1,
        }
    }
}

impl PartialEq for SymbolState {
    fn eq(&self, other: &Self) -> bool {
        self.next_id == other.next_id && self.forward == other.forward
    }
}

impl SymbolState {
    /// Creates an empty state.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use eton::SymbolState;
    ///
    /// let state = SymbolState::new();
    /// assert!(state.is_empty());
    /// assert_eq!(state.next_id(), 1);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a state from a persisted `key → token` mapping.
    ///
    /// Entries whose token is not shaped `@<n>` are skipped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use eton::SymbolState;
    ///
    /// let state = SymbolState::from_entries([("hello", "@1"), ("world", "@2")]);
    /// assert_eq!(state.get("hello"), Some("@1"));
    /// assert_eq!(state.lookup("@2"), Some("world"));
    /// assert_eq!(state.next_id(), 3);
    /// ```
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = SymbolTable::new();
        for (key, token) in entries {
            table.insert(key.into(), token.into());
        }
        table.into_state()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Numeric suffix the next minted token will carry.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Token for a raw text, if one was minted.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.forward.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.forward.contains_key(key)
    }

    /// Raw text for a token.
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<&str> {
        self.reverse.get(token).map(String::as_str)
    }

    /// Entries in mint order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries sorted by key, the order both dictionary forms are written in.
    #[must_use]
    pub fn sorted_entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self.entries().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Entries present here but absent from `previous`, in mint order.
    ///
    /// This is the streaming diff: exactly the entries a stream step has to
    /// transmit.
    #[must_use]
    pub fn entries_since<'a>(&'a self, previous: &SymbolState) -> Vec<(&'a str, &'a str)> {
        self.entries()
            .filter(|(key, _)| !previous.contains_key(key))
            .collect()
    }

    /// Pure form of [`SymbolTable::get_or_create`]: returns the token and the
    /// derived state, leaving `self` untouched.
    #[must_use]
    pub fn get_symbol(&self, value: &Value, policy: &SymbolPolicy) -> (String, SymbolState) {
        let mut table = SymbolTable::from_state(self.clone());
        let token = table.get_or_create(value, policy);
        (token, table.into_state())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SymbolState {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        SymbolState::from_entries(iter)
    }
}

/// Mutable symbol table, exclusively owned by one encoding session.
///
/// # Examples
///
/// ```rust
/// use eton::{SymbolPolicy, SymbolTable, Value};
///
/// let mut table = SymbolTable::new();
/// let policy = SymbolPolicy::new(5);
///
/// assert_eq!(table.get_or_create(&Value::from("hi"), &policy), "hi");
/// assert_eq!(table.get_or_create(&Value::from("hello"), &policy), "@1");
/// assert_eq!(table.get_or_create(&Value::from(true), &policy), "T");
/// assert_eq!(table.get_or_create(&Value::Null, &policy), "_");
///
/// let snapshot = table.snapshot();
/// assert_eq!(snapshot.len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    state: SymbolState,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_state(state: SymbolState) -> Self {
        SymbolTable { state }
    }

    /// Applies the symbolization policy to one value.
    pub fn get_or_create(&mut self, value: &Value, policy: &SymbolPolicy) -> String {
        match value {
            Value::Null => return NULL_TOKEN.to_string(),
            Value::Bool(b) => return bool_token(*b).to_string(),
            Value::Number(n) if n.magnitude() < policy.numeric_threshold => return n.to_string(),
            _ => {}
        }
        self.symbolize_text(value.canonical_text(), policy)
    }

    fn symbolize_text(&mut self, text: String, policy: &SymbolPolicy) -> String {
        if let Some(token) = self.state.forward.get(&text) {
            return token.clone();
        }
        if text.chars().count() < policy.threshold {
            return text;
        }
        self.mint(text)
    }

    /// Mints `@<next_id>` for `text`. Once the id space is used up the text
    /// stays literal.
    fn mint(&mut self, text: String) -> String {
        let Some(next_id) = self.state.next_id.checked_add(1) else {
            warn!(len = text.len(), "symbol ids exhausted, keeping value literal");
            return text;
        };
        let token = format!("{}{}", TOKEN_PREFIX, self.state.next_id);
        trace!(%token, len = text.len(), "minted symbol");
        Arc::make_mut(&mut self.state.reverse).insert(token.clone(), text.clone());
        Arc::make_mut(&mut self.state.forward).insert(text, token.clone());
        self.state.next_id = next_id;
        token
    }

    /// Merges one `key → token` entry, as read from a dictionary block.
    ///
    /// Returns `false` (and changes nothing) when the token is not shaped
    /// `@<n>` or `n` leaves no id to mint after it. A key or token that was
    /// already mapped is re-pointed so the forward and reverse maps stay
    /// exact inverses.
    pub fn insert(&mut self, key: String, token: String) -> bool {
        let Some(next_id) = token_id(&token).and_then(|id| id.checked_add(1)) else {
            return false;
        };

        let forward = Arc::make_mut(&mut self.state.forward);
        let reverse = Arc::make_mut(&mut self.state.reverse);
        if let Some(old_key) = reverse.get(&token) {
            if *old_key != key {
                forward.shift_remove(old_key);
            }
        }
        if let Some(old_token) = forward.insert(key.clone(), token.clone()) {
            if old_token != token {
                reverse.remove(&old_token);
            }
        }
        reverse.insert(token, key);

        let floor = forward.len() as u64 + 1;
        self.state.next_id = self.state.next_id.max(next_id).max(floor);
        true
    }

    /// Resolves a token against the current entries. See [`resolve`].
    #[must_use]
    pub fn resolve(&self, token: &str) -> Value {
        resolve(token, &self.state)
    }

    #[must_use]
    pub fn state(&self) -> &SymbolState {
        &self.state
    }

    /// Immutable view of the current entries.
    #[must_use]
    pub fn snapshot(&self) -> SymbolState {
        self.state.clone()
    }

    #[must_use]
    pub fn into_state(self) -> SymbolState {
        self.state
    }
}

impl From<SymbolState> for SymbolTable {
    fn from(state: SymbolState) -> Self {
        SymbolTable::from_state(state)
    }
}

#[inline]
fn bool_token(b: bool) -> &'static str {
    if b {
        TRUE_TOKEN
    } else {
        FALSE_TOKEN
    }
}

/// Resolves a cell token back to a value.
///
/// Sentinels first, then the dictionary. A token with no entry resolves to
/// itself. Resolved text that is entirely numeric is coerced to a number,
/// which loses leading zeros (`"02134"` becomes `2134`).
///
/// # Examples
///
/// ```rust
/// use eton::{resolve, SymbolState, Value};
///
/// let state = SymbolState::from_entries([("LONG_VALUE", "@1")]);
/// assert_eq!(resolve("@1", &state), Value::from("LONG_VALUE"));
/// assert_eq!(resolve("T", &state), Value::from(true));
/// assert_eq!(resolve("_", &state), Value::Null);
/// assert_eq!(resolve("@999", &state), Value::from("@999"));
/// assert_eq!(resolve("123", &state), Value::from(123));
/// ```
#[must_use]
pub fn resolve(token: &str, state: &SymbolState) -> Value {
    match token {
        NULL_TOKEN => return Value::Null,
        TRUE_TOKEN => return Value::Bool(true),
        FALSE_TOKEN => return Value::Bool(false),
        _ => {}
    }

    let raw = match state.lookup(token) {
        Some(raw) => raw,
        None => {
            if is_token(token) {
                trace!("{}", Error::unresolved(token));
            }
            token
        }
    };
    parse_numeric(raw).unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Parses text that is entirely numeric: an optional sign, digits, and at
/// most one decimal point. Integers beyond `i64` become [`Value::BigInt`].
///
/// # Examples
///
/// ```rust
/// use eton::{parse_numeric, Value};
///
/// assert_eq!(parse_numeric("-42"), Some(Value::from(-42)));
/// assert_eq!(parse_numeric("3.5"), Some(Value::from(3.5)));
/// assert_eq!(parse_numeric("1e5"), None);
/// assert_eq!(parse_numeric("1.2.3"), None);
/// assert_eq!(parse_numeric(""), None);
/// ```
#[must_use]
pub fn parse_numeric(text: &str) -> Option<Value> {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    let mut digits = 0usize;
    let mut points = 0usize;
    for b in body.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => points += 1,
            _ => return None,
        }
    }
    if digits == 0 || points > 1 {
        return None;
    }

    if points == 1 {
        return text.parse::<f64>().ok().map(|f| Value::Number(Number::Float(f)));
    }
    match text.parse::<i64>() {
        Ok(i) => Some(Value::Number(Number::Integer(i))),
        Err(_) => text.parse::<BigInt>().ok().map(Value::BigInt),
    }
}

/// Scalar coercion applied to decoded stream cells: `true`/`false` become
/// booleans, numeric text becomes a number, anything else stays text.
#[must_use]
pub fn coerce_scalar(text: &str) -> Value {
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => parse_numeric(text).unwrap_or_else(|| Value::String(text.to_string())),
    }
}

/// Writes the line-form dictionary: `%Symbol`, then one `key,token` line per
/// entry, keys sorted.
///
/// # Examples
///
/// ```rust
/// use eton::{serialize_dictionary, SymbolState};
///
/// let state = SymbolState::from_entries([("Bob", "@2"), ("Alice", "@1"), ("Hello, World", "@3")]);
/// assert_eq!(
///     serialize_dictionary(&state),
///     "%Symbol\nAlice,@1\nBob,@2\n\"Hello, World\",@3"
/// );
/// assert_eq!(serialize_dictionary(&SymbolState::new()), "%Symbol");
/// ```
#[must_use]
pub fn serialize_dictionary(state: &SymbolState) -> String {
    let mut out = String::from(SYMBOL_HEADER);
    for (key, token) in state.sorted_entries() {
        out.push('\n');
        out.push_str(&encode_row(&[key, token]));
    }
    out
}

/// Writes the JSON-form dictionary: `%Symbol:JSON`, then one compact object
/// with keys sorted.
///
/// # Examples
///
/// ```rust
/// use eton::{serialize_dictionary_json, SymbolState};
///
/// let state = SymbolState::from_entries([("test", "@1")]);
/// assert_eq!(serialize_dictionary_json(&state), "%Symbol:JSON\n{\"test\":\"@1\"}");
/// assert_eq!(serialize_dictionary_json(&SymbolState::new()), "%Symbol:JSON\n{}");
/// ```
#[must_use]
pub fn serialize_dictionary_json(state: &SymbolState) -> String {
    let object: serde_json::Map<String, serde_json::Value> = state
        .sorted_entries()
        .into_iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    format!("{}\n{}", SYMBOL_JSON_HEADER, serde_json::Value::Object(object))
}

/// Parses a dictionary block back into a state.
///
/// The form is detected from the header marker, which may follow other
/// content (a complete document can be passed). Malformed entries are skipped
/// and logged; an unparsable JSON body yields an empty state. `next_id` is
/// recomputed as the entry count plus one, raised past the largest token in
/// use when tokens are sparse.
///
/// # Examples
///
/// ```rust
/// use eton::parse_dictionary;
///
/// let state = parse_dictionary("%Symbol\nAlice,@1\n\"Hello, World\",@2\nbroken,2");
/// assert_eq!(state.get("Alice"), Some("@1"));
/// assert_eq!(state.get("Hello, World"), Some("@2"));
/// assert_eq!(state.len(), 2);
///
/// let state = parse_dictionary("%Symbol:JSON\n{\"Alice\":\"@1\",\"Bob\":\"@2\"}");
/// assert_eq!(state.lookup("@2"), Some("Bob"));
/// assert_eq!(state.next_id(), 3);
/// ```
#[must_use]
pub fn parse_dictionary(content: &str) -> SymbolState {
    let mut table = SymbolTable::new();
    let mut lines = logical_lines(content);
    let mut in_block = false;

    while let Some((line_no, line)) = lines.next() {
        let trimmed = line.trim();
        if trimmed.starts_with(SYMBOL_JSON_HEADER) {
            return parse_json_block(lines.rest(), line_no + 1);
        }
        if trimmed.starts_with(SYMBOL_HEADER) {
            in_block = true;
            continue;
        }
        if trimmed.starts_with(HEADER_MARKER) {
            in_block = false;
            continue;
        }
        if !in_block || trimmed.is_empty() {
            continue;
        }

        let merged = match split_pair(trimmed) {
            Some((key, token)) => table.insert(key, token),
            None => false,
        };
        if !merged {
            warn!("{}", Error::malformed_entry(line_no, trimmed));
        }
    }

    table.into_state()
}

fn parse_json_block(body: &str, line_no: usize) -> SymbolState {
    let object = match serde_json::from_str::<serde_json::Value>(body.trim()) {
        Ok(serde_json::Value::Object(object)) => object,
        Ok(other) => {
            warn!(line = line_no, kind = ?other, "JSON dictionary is not an object");
            return SymbolState::new();
        }
        Err(err) => {
            warn!(line = line_no, error = %err, "failed to parse JSON dictionary");
            return SymbolState::new();
        }
    };

    let mut table = SymbolTable::new();
    for (key, token) in object {
        let merged = match token {
            serde_json::Value::String(token) => table.insert(key.clone(), token),
            _ => false,
        };
        if !merged {
            warn!("{}", Error::malformed_entry(line_no, &key));
        }
    }
    table.into_state()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::from(s)
    }

    #[test]
    fn test_threshold_boundary() {
        let policy = SymbolPolicy::new(5);
        let state = SymbolState::new();

        let (token, state) = state.get_symbol(&text("four"), &policy);
        assert_eq!(token, "four");
        assert!(state.is_empty());

        let (token, state) = state.get_symbol(&text("hello"), &policy);
        assert_eq!(token, "@1");
        assert_eq!(state.get("hello"), Some("@1"));
    }

    #[test]
    fn test_threshold_counts_characters() {
        let policy = SymbolPolicy::new(3);
        let mut table = SymbolTable::new();
        // two characters, six bytes
        assert_eq!(table.get_or_create(&text("日本"), &policy), "日本");
        assert_eq!(table.get_or_create(&text("日本語"), &policy), "@1");
    }

    #[test]
    fn test_empty_string_is_not_null() {
        let (token, state) = SymbolState::new().get_symbol(&text(""), &SymbolPolicy::new(0));
        assert_eq!(token, "@1");
        assert_eq!(state.get(""), Some("@1"));

        let (token, _) = SymbolState::new().get_symbol(&text(""), &SymbolPolicy::new(1));
        assert_eq!(token, "");
    }

    #[test]
    fn test_numbers() {
        let policy = SymbolPolicy::new(0);
        let mut table = SymbolTable::new();
        assert_eq!(table.get_or_create(&Value::from(1), &policy), "1");
        assert_eq!(table.get_or_create(&Value::from(-999), &policy), "-999");
        assert_eq!(table.get_or_create(&Value::from(1000), &policy), "@1");
        assert_eq!(table.get_or_create(&Value::from(1000), &policy), "@1");
        assert_eq!(table.snapshot().get("1000"), Some("@1"));

        let policy = SymbolPolicy {
            threshold: 10,
            numeric_threshold: 0.0,
        };
        assert_eq!(table.get_or_create(&Value::from(123456), &policy), "123456");
    }

    #[test]
    fn test_sentinels_never_stored() {
        let policy = SymbolPolicy::new(0);
        let mut table = SymbolTable::new();
        assert_eq!(table.get_or_create(&Value::Null, &policy), "_");
        assert_eq!(table.get_or_create(&Value::from(false), &policy), "F");
        assert!(table.state().is_empty());
    }

    #[test]
    fn test_pure_form_leaves_input_untouched() {
        let policy = SymbolPolicy::new(0);
        let state = SymbolState::new();
        let (_, first) = state.get_symbol(&text("first"), &policy);
        let (_, second) = first.get_symbol(&text("second"), &policy);
        let (sym3, third) = second.get_symbol(&text("third"), &policy);

        assert!(state.is_empty());
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(sym3, "@3");
        assert_eq!(third.next_id(), 4);
    }

    #[test]
    fn test_pure_and_mutable_agree() {
        let policy = SymbolPolicy::new(3);
        let values = [
            text("alpha"),
            text("be"),
            Value::from(5000),
            text("alpha"),
            Value::Null,
            text("gamma"),
        ];

        let mut table = SymbolTable::new();
        let mutable: Vec<_> = values.iter().map(|v| table.get_or_create(v, &policy)).collect();

        let mut state = SymbolState::new();
        let mut pure = Vec::new();
        for v in &values {
            let (token, next) = state.get_symbol(v, &policy);
            pure.push(token);
            state = next;
        }

        assert_eq!(mutable, pure);
        assert_eq!(table.snapshot(), state);
    }

    #[test]
    fn test_insert_keeps_maps_inverse() {
        let mut table = SymbolTable::new();
        assert!(table.insert("a".into(), "@1".into()));
        assert!(table.insert("a".into(), "@2".into()));
        assert_eq!(table.state().lookup("@1"), None);
        assert_eq!(table.state().lookup("@2"), Some("a"));

        assert!(table.insert("b".into(), "@2".into()));
        assert_eq!(table.state().get("a"), None);
        assert_eq!(table.state().len(), 1);

        assert!(!table.insert("c".into(), "2".into()));
        assert!(!table.insert("c".into(), "@x".into()));
    }

    #[test]
    fn test_sparse_tokens_raise_next_id() {
        let state = SymbolState::from_entries([("a", "@5"), ("b", "@9")]);
        assert_eq!(state.next_id(), 10);

        let (token, _) = state.get_symbol(&text("c"), &SymbolPolicy::new(0));
        assert_eq!(token, "@10");
    }

    #[test]
    fn test_largest_token_id_is_malformed() {
        let state = parse_dictionary("%Symbol\nbig,@18446744073709551615\nok,@2");
        assert_eq!(state.len(), 1);
        assert_eq!(state.get("big"), None);
        assert_eq!(state.next_id(), 3);

        let mut table = SymbolTable::from_state(state);
        assert_eq!(table.get_or_create(&text("fresh"), &SymbolPolicy::new(0)), "@3");
        let state = table.state();
        assert_eq!(state.len(), 2);
        for (key, token) in state.entries() {
            assert_eq!(state.lookup(token), Some(key));
        }
    }

    #[test]
    fn test_exhausted_ids_keep_values_literal() {
        let mut table = SymbolTable::new();
        assert!(table.insert("last".into(), "@18446744073709551614".into()));
        assert_eq!(table.state().next_id(), u64::MAX);

        let policy = SymbolPolicy::new(0);
        assert_eq!(table.get_or_create(&text("fresh"), &policy), "fresh");
        assert_eq!(table.get_or_create(&text("last"), &policy), "@18446744073709551614");
        assert_eq!(table.state().len(), 1);
    }

    #[test]
    fn test_numeric_coercion_loses_leading_zero() {
        let state = SymbolState::from_entries([("02134", "@1")]);
        assert_eq!(resolve("@1", &state), Value::from(2134));
    }

    #[test]
    fn test_numeric_coercion_bigint() {
        let value = parse_numeric("123456789012345678901234567890").unwrap();
        assert!(matches!(value, Value::BigInt(_)));
    }

    #[test]
    fn test_coerce_scalar() {
        assert_eq!(coerce_scalar("true"), Value::from(true));
        assert_eq!(coerce_scalar("false"), Value::from(false));
        assert_eq!(coerce_scalar("T"), Value::from("T"));
        assert_eq!(coerce_scalar("10"), Value::from(10));
        assert_eq!(coerce_scalar("10:00"), Value::from("10:00"));
    }

    #[test]
    fn test_parse_dictionary_skips_malformed() {
        let state = parse_dictionary("%Symbol\nAlice,@1\nnot a pair\nBob,token\nCarol,@3\n");
        assert_eq!(state.len(), 2);
        assert_eq!(state.get("Carol"), Some("@3"));
        assert_eq!(state.next_id(), 4);
    }

    #[test]
    fn test_parse_dictionary_ignores_lines_before_block() {
        let doc = "%User\n@1,@2\n!Alice,Admin\n%Symbol\nAdmin,@2\nAlice,@1";
        let state = parse_dictionary(doc);
        assert_eq!(state.len(), 2);
        assert_eq!(state.get("Admin"), Some("@2"));
    }

    #[test]
    fn test_parse_json_dictionary_tolerance() {
        let state = parse_dictionary("%Symbol:JSON\n{\"a\":\"@1\",\"b\":2,\"c\":\"x\"}");
        assert_eq!(state.len(), 1);

        let state = parse_dictionary("%Symbol:JSON\n{not json");
        assert!(state.is_empty());

        let state = parse_dictionary("%Symbol:JSON\n{}");
        assert!(state.is_empty());
    }

    #[test]
    fn test_multiline_key_roundtrip() {
        let state = SymbolState::from_entries([("Line1\nLine2", "@1"), ("plain", "@2")]);
        let parsed = parse_dictionary(&serialize_dictionary(&state));
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_entries_since() {
        let policy = SymbolPolicy::new(0);
        let mut table = SymbolTable::new();
        table.get_or_create(&text("Alice"), &policy);
        let before = table.snapshot();
        table.get_or_create(&text("Bob"), &policy);
        table.get_or_create(&text("Alice"), &policy);
        table.get_or_create(&text("User"), &policy);

        let after = table.snapshot();
        assert_eq!(after.entries_since(&before), vec![("Bob", "@2"), ("User", "@3")]);
    }
}
