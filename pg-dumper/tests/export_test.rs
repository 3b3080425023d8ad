//! Export encoder behavior on realistic result sets

use pg_dumper::export::{encode, ExportFormat};
use pg_dumper::schema::{QuerySpec, ResultColumn, ResultSet, Row, TypeCategory};
use pg_dumper::Error;
use serde_json::{json, Value};

fn result_set(table: &str, columns: &[(&str, TypeCategory)], rows: Vec<Value>) -> ResultSet {
    ResultSet {
        columns: columns
            .iter()
            .map(|(name, category)| ResultColumn {
                name: name.to_string(),
                category: *category,
            })
            .collect(),
        total: rows.len() as u64,
        rows: rows
            .into_iter()
            .map(|row| match row {
                Value::Object(map) => map,
                _ => Row::new(),
            })
            .collect(),
        spec: QuerySpec::new(table),
    }
}

fn orders() -> ResultSet {
    result_set(
        "orders",
        &[
            ("id", TypeCategory::Numeric),
            ("note", TypeCategory::Text),
            ("amount", TypeCategory::Numeric),
            ("shipped", TypeCategory::Boolean),
            ("details", TypeCategory::Other),
        ],
        vec![
            json!({"id": 1, "note": "needs, \"quotes\"", "amount": 12.5, "shipped": true, "details": {"tags": ["a"]}}),
            json!({"id": 2, "note": null, "amount": 0.1, "shipped": false, "details": null}),
            json!({"id": 3, "note": "multi\nline", "amount": null, "shipped": null, "details": [1, 2]}),
        ],
    )
}

#[test]
fn test_json_export_parses_back() {
    let result = orders();
    let bytes = encode(&result, ExportFormat::Json).unwrap();
    let parsed: Vec<serde_json::Map<String, Value>> = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(parsed.len(), result.rows.len());
    for (parsed_row, original) in parsed.iter().zip(&result.rows) {
        let keys: Vec<&String> = parsed_row.keys().collect();
        assert_eq!(keys, vec!["id", "note", "amount", "shipped", "details"]);
        assert_eq!(parsed_row, original);
    }
}

#[test]
fn test_json_export_fills_missing_keys_with_null() {
    let result = result_set(
        "sparse",
        &[("a", TypeCategory::Numeric), ("b", TypeCategory::Text)],
        vec![json!({"b": "only b"})],
    );

    let bytes = encode(&result, ExportFormat::Json).unwrap();
    let parsed: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed, json!([{"a": null, "b": "only b"}]));
}

#[test]
fn test_csv_export_quotes_and_stringifies() {
    let bytes = encode(&orders(), ExportFormat::Csv).unwrap();

    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, vec!["id", "note", "amount", "shipped", "details"]);

    let records: Vec<csv::StringRecord> = reader.records().map(|record| record.unwrap()).collect();
    assert_eq!(records.len(), 3);
    assert_eq!(&records[0][1], "needs, \"quotes\"");
    assert_eq!(&records[0][2], "12.5");
    assert_eq!(&records[0][3], "true");
    assert_eq!(&records[0][4], "{\"tags\":[\"a\"]}");
    assert_eq!(&records[1][1], "");
    assert_eq!(&records[1][2], "0.1");
    assert_eq!(&records[2][1], "multi\nline");
    assert_eq!(&records[2][4], "[1,2]");
}

#[test]
fn test_exact_numeric_text_is_exported_verbatim() {
    let result = result_set(
        "ledger",
        &[("id", TypeCategory::Numeric), ("amount", TypeCategory::Numeric)],
        vec![
            json!({"id": 1, "amount": "1234567890123456.7891"}),
            json!({"id": 2, "amount": 12.5}),
        ],
    );

    let csv = String::from_utf8(encode(&result, ExportFormat::Csv).unwrap()).unwrap();
    assert_eq!(csv, "id,amount\n1,1234567890123456.7891\n2,12.5\n");

    let parsed: Value = serde_json::from_slice(&encode(&result, ExportFormat::Json).unwrap()).unwrap();
    assert_eq!(parsed[0]["amount"], json!("1234567890123456.7891"));

    let workbook = encode(&result, ExportFormat::Spreadsheet).unwrap();
    assert_eq!(&workbook[..2], b"PK");
}

#[test]
fn test_csv_export_of_empty_result_has_header_only() {
    let result = result_set("empty", &[("id", TypeCategory::Numeric)], vec![]);
    let bytes = encode(&result, ExportFormat::Csv).unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), "id\n");
}

#[test]
fn test_spreadsheet_export_is_a_workbook() {
    let bytes = encode(&orders(), ExportFormat::Spreadsheet).unwrap();
    // xlsx files are zip archives
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn test_spreadsheet_accepts_large_integers_and_awkward_names() {
    let result = result_set(
        "weird/name:[2024]",
        &[("big", TypeCategory::Numeric)],
        vec![json!({"big": 9_007_199_254_740_993_i64}), json!({"big": -5})],
    );

    let bytes = encode(&result, ExportFormat::Spreadsheet).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn test_spreadsheet_rejects_oversized_cells() {
    let result = result_set(
        "notes",
        &[("body", TypeCategory::Text)],
        vec![json!({"body": "x".repeat(40_000)})],
    );

    let error = encode(&result, ExportFormat::Spreadsheet).unwrap_err();
    assert!(matches!(error, Error::Encoding(_)));

    // CSV and JSON have no cell limit
    assert!(encode(&result, ExportFormat::Csv).is_ok());
    assert!(encode(&result, ExportFormat::Json).is_ok());
}
