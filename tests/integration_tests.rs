use serde::{Deserialize, Serialize};
use eton::{
    debug_loads, dumps, encode, encode_batch, eton, infer_schema, parse_dictionary, to_records,
    DictionaryFormat, EncodeOptions, EntryKind, Error, Record, SchemaMap, SymbolState, Value,
};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct User {
    id: u32,
    name: String,
    role: String,
}

fn records(values: Vec<Value>) -> Vec<Record> {
    values
        .into_iter()
        .map(|v| v.as_object().cloned().expect("record literal"))
        .collect()
}

fn quiet(threshold: usize) -> EncodeOptions {
    EncodeOptions::new().with_threshold(threshold).with_audit(false)
}

fn test_schemas() -> SchemaMap {
    SchemaMap::new()
        .with("TestSchema", ["id", "name", "isActive"])
        .with("Tagged", ["id", "tags"])
        .with("NullTest", ["a", "b", "c"])
        .with("User", ["id", "name", "role"])
}

#[test]
fn test_threshold_zero_symbolizes_every_string() {
    let data = records(vec![
        eton!({"id": 1, "name": "Alice", "isActive": true}),
        eton!({"id": 2, "name": "Bob", "isActive": false}),
    ]);
    let (encoded, state) =
        encode_batch(&data, "TestSchema", &test_schemas(), &SymbolState::new(), &quiet(0)).unwrap();

    let lines: Vec<&str> = encoded.lines().collect();
    assert_eq!(lines, vec!["%TestSchema", "1,@1,T", "2,@2,F"]);
    assert_eq!(state.len(), 2);
    assert_eq!(state.next_id(), 3);
}

#[test]
fn test_empty_batch_is_header_only() {
    let (encoded, state) =
        encode_batch(&[], "User", &test_schemas(), &SymbolState::new(), &EncodeOptions::new()).unwrap();
    assert_eq!(encoded, "%User");
    assert!(state.is_empty());
}

#[test]
fn test_unknown_schema_is_fatal() {
    let data = records(vec![eton!({"id": 1})]);
    let err = encode_batch(&data, "Nope", &test_schemas(), &SymbolState::new(), &quiet(0)).unwrap_err();
    assert_eq!(err, Error::schema_not_found("Nope"));
    assert!(err.to_string().contains("'Nope'"));
}

#[test]
fn test_marker_schema_ids_are_rejected() {
    let data = records(vec![eton!({"k": "v"})]);
    for id in ["Symbol", "Symbol:JSON", "Data", "Schema:User"] {
        let schemas = SchemaMap::new().with(id, ["k"]);
        let err = encode_batch(&data, id, &schemas, &SymbolState::new(), &quiet(0)).unwrap_err();
        assert!(matches!(err, Error::Schema(_)), "{}: {:?}", id, err);
        assert!(dumps(&data, id, &schemas, &SymbolState::new(), &quiet(0)).is_err());
    }

    // A schema named like a marker would have hidden the real dictionary.
    let schemas = SchemaMap::new().with("Database", ["k"]);
    let doc = dumps(&data, "Database", &schemas, &SymbolState::new(), &quiet(0)).unwrap();
    assert_eq!(parse_dictionary(&doc).get("v"), Some("@1"));
}

#[test]
fn test_lists() {
    let data = records(vec![
        eton!({"id": 1, "tags": []}),
        eton!({"id": 2, "tags": ["important", "urgent", "review"]}),
        eton!({"id": 3, "tags": ["urgent"]}),
    ]);
    let (encoded, _) =
        encode_batch(&data, "Tagged", &test_schemas(), &SymbolState::new(), &quiet(0)).unwrap();
    let lines: Vec<&str> = encoded.lines().collect();
    assert_eq!(lines[1], "1,()");
    assert_eq!(lines[2], "2,(@1 ;@2 ;@3)");
    assert_eq!(lines[3], "3,(@2)");
}

#[test]
fn test_null_absent_and_empty_string() {
    let data = records(vec![eton!({"a": null, "c": ""})]);
    let (encoded, _) =
        encode_batch(&data, "NullTest", &test_schemas(), &SymbolState::new(), &quiet(10)).unwrap();
    assert_eq!(encoded, "%NullTest\n_,_,");

    let (encoded, state) =
        encode_batch(&data, "NullTest", &test_schemas(), &SymbolState::new(), &quiet(0)).unwrap();
    assert_eq!(encoded, "%NullTest\n_,_,@1");
    assert_eq!(state.get(""), Some("@1"));
}

#[test]
fn test_missing_schema_field_encodes_null() {
    let schemas = SchemaMap::new().with("S", ["id", "role"]);
    let data = records(vec![eton!({"id": 1, "extra": "ignored"})]);
    let (encoded, _) = encode_batch(&data, "S", &schemas, &SymbolState::new(), &quiet(0)).unwrap();
    assert_eq!(encoded, "%S\n1,_");
}

#[test]
fn test_nested_objects_are_json_cells() {
    let schemas = SchemaMap::new().with("Record", ["id", "metadata"]);
    let data = records(vec![eton!({
        "id": 1,
        "metadata": {"role": "Admin", "permissions": ["read", "write"]}
    })]);
    let (encoded, state) = encode_batch(&data, "Record", &schemas, &SymbolState::new(), &quiet(0)).unwrap();

    assert_eq!(
        encoded,
        r#"%Record
1,"{""role"":""Admin"",""permissions"":[""read"",""write""]}""#
    );
    assert!(state.is_empty());

    let entries = debug_loads(&encoded);
    assert_eq!(
        entries[1].kind,
        EntryKind::Data {
            schema: "Record".into(),
            row: vec![
                "1".into(),
                r#"{"role":"Admin","permissions":["read","write"]}"#.into()
            ],
        }
    );
}

#[test]
fn test_special_characters_survive() {
    let data = records(vec![
        eton!({"id": 1, "name": "Last, First", "role": "say \"hi\""}),
        eton!({"id": 2, "name": "Line1\nLine2", "role": "%Admin"}),
    ]);
    let (encoded, _) =
        encode_batch(&data, "User", &test_schemas(), &SymbolState::new(), &quiet(1000)).unwrap();

    let rows: Vec<Vec<String>> = debug_loads(&encoded)
        .into_iter()
        .filter_map(|e| match e.kind {
            EntryKind::Data { row, .. } => Some(row),
            _ => None,
        })
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["1", "Last, First", "say \"hi\""]);
    assert_eq!(rows[1], vec!["2", "Line1\nLine2", "%Admin"]);
}

#[test]
fn test_audit_lines() {
    let data = records(vec![eton!({"id": 1, "name": "Alice", "role": null})]);
    let options = EncodeOptions::new().with_threshold(0);
    let (encoded, _) = encode_batch(&data, "User", &test_schemas(), &SymbolState::new(), &options).unwrap();
    assert_eq!(encoded, "%User\n1,@1,_\n!1,Alice,");

    let (encoded, _) =
        encode_batch(&data, "User", &test_schemas(), &SymbolState::new(), &quiet(0)).unwrap();
    assert!(!encoded.contains('!'));
}

#[test]
fn test_audit_recovers_values_without_dictionary() {
    let data = records(vec![
        eton!({"id": 1, "name": "Alice", "role": "Administrator"}),
        eton!({"id": 2, "name": "Bob", "role": "Administrator"}),
    ]);
    let options = EncodeOptions::new().with_threshold(4);
    let (encoded, _) = encode_batch(&data, "User", &test_schemas(), &SymbolState::new(), &options).unwrap();

    let audits: Vec<Vec<String>> = debug_loads(&encoded)
        .into_iter()
        .filter_map(|e| match e.kind {
            EntryKind::Audit { row } => Some(row),
            _ => None,
        })
        .collect();
    assert_eq!(audits[0], vec!["1", "Alice", "Administrator"]);
    assert_eq!(audits[1], vec!["2", "Bob", "Administrator"]);
}

#[test]
fn test_state_threads_across_batches() {
    let schemas = test_schemas();
    let first = records(vec![eton!({"id": 1, "name": "Alice", "role": "Admin"})]);
    let second = records(vec![eton!({"id": 2, "name": "Bob", "role": "Admin"})]);

    let (_, state) = encode(&first, "User", &schemas, &SymbolState::new(), &quiet(0)).unwrap();
    let (encoded, state) = encode(&second, "User", &schemas, &state, &quiet(0)).unwrap();

    assert_eq!(encoded, "%User\n2,@3,@2");
    assert_eq!(state.len(), 3);
}

#[test]
fn test_input_state_is_not_mutated() {
    let seed = SymbolState::from_entries([("Alice", "@1")]);
    let data = records(vec![eton!({"id": 1, "name": "Alice", "role": "Admin"})]);
    let (encoded, next) = encode_batch(&data, "User", &test_schemas(), &seed, &quiet(0)).unwrap();

    assert_eq!(encoded, "%User\n1,@1,@2");
    assert_eq!(seed.len(), 1);
    assert_eq!(next.len(), 2);
}

#[test]
fn test_dumps_formats() {
    let data = records(vec![eton!({"id": 1, "name": "Alice", "role": "Admin"})]);
    let schemas = test_schemas();

    let lines = dumps(
        &data,
        "User",
        &schemas,
        &SymbolState::new(),
        &quiet(0).with_dictionary_format(DictionaryFormat::Lines),
    )
    .unwrap();
    assert_eq!(lines, "%User\n1,@1,@2\n%Symbol\nAdmin,@2\nAlice,@1");

    let json = dumps(
        &data,
        "User",
        &schemas,
        &SymbolState::new(),
        &quiet(0).with_dictionary_format(DictionaryFormat::Json),
    )
    .unwrap();
    assert_eq!(json, "%User\n1,@1,@2\n%Symbol:JSON\n{\"Admin\":\"@2\",\"Alice\":\"@1\"}");

    assert_eq!(parse_dictionary(&lines), parse_dictionary(&json));
}

#[test]
fn test_dumps_auto_format() {
    let schemas = SchemaMap::new()
        .with("User", ["id", "name"])
        .with("Record", ["id", "meta"]);

    let flat = records(vec![eton!({"id": 1, "name": "Alice"})]);
    let doc = dumps(&flat, "User", &schemas, &SymbolState::new(), &quiet(0)).unwrap();
    assert!(doc.contains("\n%Symbol\n"));

    let nested = records(vec![eton!({"id": 1, "meta": {"role": "Admin"}})]);
    let doc = dumps(&nested, "Record", &schemas, &SymbolState::new(), &quiet(0)).unwrap();
    assert!(doc.ends_with("%Symbol:JSON\n{}"));
}

#[test]
fn test_serde_records_with_inferred_schema() {
    let users = vec![
        User { id: 1, name: "Alice".into(), role: "Admin".into() },
        User { id: 2, name: "Bob".into(), role: "Admin".into() },
    ];
    let data = to_records(&users).unwrap();
    let schemas = infer_schema(&data, "User");
    assert_eq!(schemas.get("User").unwrap(), &["id", "name", "role"]);

    let doc = dumps(&data, "User", &schemas, &SymbolState::new(), &quiet(5)).unwrap();
    assert_eq!(doc, "%User\n1,@1,@2\n2,Bob,@2\n%Symbol\nAdmin,@2\nAlice,@1");
}

#[test]
fn test_dates_and_bigints_use_canonical_text() {
    use chrono::{TimeZone, Utc};
    use num_bigint::BigInt;

    let mut record = Record::new();
    record.insert(
        "at".into(),
        Value::Date(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
    );
    record.insert("big".into(), Value::BigInt(BigInt::from(10).pow(30)));
    let schemas = SchemaMap::new().with("E", ["at", "big"]);

    let options = EncodeOptions::new().with_threshold(1000);
    let (encoded, _) = encode_batch(&[record], "E", &schemas, &SymbolState::new(), &options).unwrap();
    let big = format!("1{}", "0".repeat(30));
    assert_eq!(
        encoded,
        format!("%E\n2024-01-02T03:04:05Z,{}\n!2024-01-02T03:04:05Z,{}", big, big)
    );
}
