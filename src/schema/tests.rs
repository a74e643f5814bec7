//! Schema inference tests

use super::*;
use crate::types::Row;
use serde_json::{json, Value};
use test_case::test_case;

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => panic!("row must be an object"),
    }
}

// ============================================================================
// Type Merging Tests
// ============================================================================

#[test_case(DataType::Bigint, DataType::Bigint => DataType::Bigint ; "same type")]
#[test_case(DataType::Bigint, DataType::Double => DataType::Double ; "integer widens to double")]
#[test_case(DataType::Double, DataType::Bigint => DataType::Double ; "double absorbs integer")]
#[test_case(DataType::Date, DataType::Timestamp => DataType::Timestamp ; "date widens to timestamp")]
#[test_case(DataType::Boolean, DataType::Bigint => DataType::Text ; "bool and integer")]
#[test_case(DataType::Timestamp, DataType::Double => DataType::Text ; "timestamp and double")]
#[test_case(DataType::Text, DataType::Date => DataType::Text ; "text absorbs everything")]
fn test_merge_types(a: DataType, b: DataType) -> DataType {
    a.merge_with(b)
}

#[test]
fn test_sql_names_round_trip() {
    for data_type in [
        DataType::Bigint,
        DataType::Double,
        DataType::Boolean,
        DataType::Date,
        DataType::Timestamp,
        DataType::Text,
    ] {
        assert_eq!(DataType::from_sql(data_type.sql_name()), Some(data_type));
    }
    assert_eq!(DataType::from_sql("TIMESTAMP WITH TIME ZONE"), Some(DataType::Timestamp));
    assert_eq!(DataType::from_sql("integer"), Some(DataType::Bigint));
    assert_eq!(DataType::from_sql("BLOB"), None);
}

// ============================================================================
// Value Inference Tests
// ============================================================================

#[test]
fn test_infer_values() {
    let inferrer = SchemaInferrer::new();
    assert_eq!(inferrer.infer_value(&json!(42)), Some(DataType::Bigint));
    assert_eq!(inferrer.infer_value(&json!(4.2)), Some(DataType::Double));
    assert_eq!(inferrer.infer_value(&json!(true)), Some(DataType::Boolean));
    assert_eq!(inferrer.infer_value(&json!("hello")), Some(DataType::Text));
    assert_eq!(inferrer.infer_value(&json!("2017-08-01")), Some(DataType::Date));
    assert_eq!(
        inferrer.infer_value(&json!("2017-08-01T00:00:00")),
        Some(DataType::Timestamp)
    );
    assert_eq!(inferrer.infer_value(&json!(null)), None);
    assert_eq!(inferrer.infer_value(&json!([1, 2])), Some(DataType::Text));
}

#[test]
fn test_date_detection_can_be_disabled() {
    let inferrer = SchemaInferrer::new().with_date_detection(false);
    assert_eq!(inferrer.infer_value(&json!("2017-08-01")), Some(DataType::Text));
}

#[test_case("2024-01-15" => true ; "date")]
#[test_case("2024-13-45" => false ; "invalid month")]
#[test_case("15/01/2024" => false ; "other format")]
fn test_is_date(s: &str) -> bool {
    is_date(s)
}

#[test_case("2024-01-15T10:30:00Z" => true ; "utc")]
#[test_case("2024-01-15T10:30:00.123+02:00" => true ; "offset with fraction")]
#[test_case("2024-01-15 10:30:00" => true ; "space separated")]
#[test_case("2024-01-15" => false ; "plain date")]
#[test_case("2024-01-15T25:00:00" => false ; "invalid hour")]
#[test_case("yesterday" => false ; "text")]
fn test_is_timestamp(s: &str) -> bool {
    is_timestamp(s)
}

#[test]
fn test_normalize_timestamp() {
    assert_eq!(
        normalize_timestamp("2017-08-01T00:00:00").as_deref(),
        Some("2017-08-01 00:00:00.000000")
    );
    assert_eq!(
        normalize_timestamp("2024-01-15T10:30:00.5+02:00").as_deref(),
        Some("2024-01-15 08:30:00.500000")
    );
    assert_eq!(
        normalize_timestamp("2024-01-15").as_deref(),
        Some("2024-01-15 00:00:00.000000")
    );
    assert_eq!(normalize_timestamp("not a date"), None);
}

// ============================================================================
// Table Inference Tests
// ============================================================================

#[test]
fn test_infer_table_keeps_first_appearance_order() {
    let rows = vec![
        row(json!({"id": "a", "amount": 10, "ordered_at": "2017-08-01T10:00:00"})),
        row(json!({"id": "b", "amount": 12.5, "note": "gift"})),
    ];

    let schema = infer_table_schema("orders", &rows);
    assert_eq!(schema.name, "orders");
    assert_eq!(schema.column_names(), vec!["id", "amount", "ordered_at", "note"]);
    assert_eq!(schema.get("amount").unwrap().data_type, DataType::Double);
    assert_eq!(
        schema.get("ordered_at").unwrap().data_type,
        DataType::Timestamp
    );
    assert!(!schema.get("id").unwrap().nullable);
    assert!(schema.get("note").unwrap().nullable);
    assert!(schema.get("ordered_at").unwrap().nullable);
}

#[test]
fn test_infer_table_skips_null_only_columns() {
    let rows = vec![
        row(json!({"id": 1, "deleted_at": null})),
        row(json!({"id": 2, "deleted_at": null})),
    ];

    let schema = infer_table_schema("customers", &rows);
    assert_eq!(schema.column_names(), vec!["id"]);
    assert!(schema.get("deleted_at").is_none());
}

#[test]
fn test_infer_table_nulls_mark_nullable() {
    let rows = vec![
        row(json!({"id": 1, "email": null})),
        row(json!({"id": 2, "email": "a@example.com"})),
    ];

    let schema = infer_table_schema("customers", &rows);
    let email = schema.get("email").unwrap();
    assert_eq!(email.data_type, DataType::Text);
    assert!(email.nullable);
}

#[test]
fn test_infer_table_conflicting_types_fall_back_to_text() {
    let rows = vec![row(json!({"code": 7})), row(json!({"code": "X7"}))];
    let schema = infer_table_schema("products", &rows);
    assert_eq!(schema.get("code").unwrap().data_type, DataType::Text);
}

#[test]
fn test_table_schema_merge() {
    let mut existing = infer_table_schema("t", &[row(json!({"a": 1, "b": "2024-01-01"}))]);
    let incoming = infer_table_schema(
        "t",
        &[row(json!({"a": 1.5, "b": "2024-01-01T12:00:00", "c": true}))],
    );

    existing.merge(&incoming);
    assert_eq!(existing.column_names(), vec!["a", "b", "c"]);
    assert_eq!(existing.get("a").unwrap().data_type, DataType::Double);
    assert_eq!(existing.get("b").unwrap().data_type, DataType::Timestamp);
    assert_eq!(existing.get("c").unwrap().data_type, DataType::Boolean);
    assert_eq!(existing.len(), 3);
}

#[test]
fn test_infer_empty_rows() {
    let schema = infer_table_schema("empty", &[]);
    assert!(schema.is_empty());
}
