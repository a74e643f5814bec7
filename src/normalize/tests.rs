//! Tests for record normalization

use super::*;
use crate::types::Page;
use serde_json::json;
use std::collections::HashSet;
use test_case::test_case;

fn page(records: Vec<serde_json::Value>) -> Page {
    Page::new(1, "http://localhost/api/v1/orders?page=1", records)
}

// ============================================================================
// Identifier Tests
// ============================================================================

#[test_case("id" => "id" ; "already snake case")]
#[test_case("customerId" => "customer_id" ; "camel case")]
#[test_case("OrderTotal" => "order_total" ; "pascal case")]
#[test_case("HTTPStatus" => "http_status" ; "acronym")]
#[test_case("order total ($)" => "order_total" ; "punctuation")]
#[test_case("1st_place" => "_1st_place" ; "leading digit")]
#[test_case("_id" => "_id" ; "leading underscore kept")]
#[test_case("---" => "_" ; "nothing left")]
fn test_normalize_identifier(name: &str) -> String {
    normalize_identifier(name)
}

#[test]
fn test_join_path() {
    assert_eq!(join_path("", "id"), "id");
    assert_eq!(join_path("address", "city"), "address__city");
}

// ============================================================================
// Flattening Tests
// ============================================================================

#[test]
fn test_flat_records_keep_values_and_get_system_columns() {
    let normalizer = Normalizer::new("1700000000.123456", 2);
    let result = normalizer
        .normalize_page(
            "customers",
            "customers",
            &page(vec![json!({"id": "c1", "name": "Ann"}), json!({"id": "c2", "name": "Bo"})]),
        )
        .unwrap();

    assert_eq!(result.records, 2);
    assert_eq!(result.tables.len(), 1);
    let rows = result.rows("customers");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], "c1");
    assert_eq!(rows[0][LOAD_ID_COLUMN], "1700000000.123456");
    assert_ne!(rows[0][ROW_ID_COLUMN], rows[1][ROW_ID_COLUMN]);
}

#[test]
fn test_nested_objects_are_flattened() {
    let normalizer = Normalizer::new("load", 2);
    let result = normalizer
        .normalize_page(
            "customers",
            "customers",
            &page(vec![json!({
                "id": 1,
                "billingAddress": {"city": "Berlin", "geo": {"lat": 52.5}}
            })]),
        )
        .unwrap();

    let row = &result.rows("customers")[0];
    assert_eq!(row["billing_address__city"], "Berlin");
    assert_eq!(row["billing_address__geo__lat"], 52.5);
    assert!(!row.contains_key("billing_address"));
}

#[test]
fn test_arrays_become_child_tables() {
    let normalizer = Normalizer::new("load", 2);
    let result = normalizer
        .normalize_page(
            "orders",
            "orders",
            &page(vec![json!({
                "id": "o1",
                "items": [{"sku": "A", "qty": 2}, {"sku": "B", "qty": 1}],
                "tags": ["gift", "rush"]
            })]),
        )
        .unwrap();

    let parent = &result.rows("orders")[0];
    assert!(!parent.contains_key("items"));
    let parent_id = parent[ROW_ID_COLUMN].clone();

    let items = result.rows("orders__items");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["sku"], "A");
    assert_eq!(items[1][LIST_INDEX_COLUMN], 1);
    assert!(items.iter().all(|r| r[PARENT_ID_COLUMN] == parent_id));
    assert!(items.iter().all(|r| r[LOAD_ID_COLUMN] == "load"));

    let tags = result.rows("orders__tags");
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0][VALUE_COLUMN], "gift");
    assert_eq!(result.row_count(), 5);
}

#[test]
fn test_nesting_limit_stores_json_text() {
    let normalizer = Normalizer::new("load", 1);
    let result = normalizer
        .normalize_page(
            "orders",
            "orders",
            &page(vec![json!({
                "id": "o1",
                "items": [{"sku": "A", "parts": [1, 2]}]
            })]),
        )
        .unwrap();

    let items = result.rows("orders__items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["parts"], "[1,2]");
    assert!(result.tables.get("orders__items__parts").is_none());
}

#[test]
fn test_zero_nesting_keeps_everything_in_root_table() {
    let normalizer = Normalizer::new("load", 0);
    let result = normalizer
        .normalize_page("orders", "orders", &page(vec![json!({"tags": ["a"]})]))
        .unwrap();

    assert_eq!(result.tables.len(), 1);
    assert_eq!(result.rows("orders")[0]["tags"], "[\"a\"]");
}

#[test]
fn test_scalar_records_use_value_column() {
    let normalizer = Normalizer::new("load", 2);
    let result = normalizer
        .normalize_page("ids", "ids", &page(vec![json!(1), json!(2)]))
        .unwrap();

    let rows = result.rows("ids");
    assert_eq!(rows[0][VALUE_COLUMN], 1);
    assert_eq!(rows[1][VALUE_COLUMN], 2);
}

#[test]
fn test_row_ids_unique_across_tables_and_pages() {
    let normalizer = Normalizer::new("load", 2);
    let record = json!({"id": 1, "items": [{"a": 1}, {"a": 2}]});

    let first = normalizer
        .normalize_page("orders", "orders", &Page::new(1, "u", vec![record.clone(), record.clone()]))
        .unwrap();
    let second = normalizer
        .normalize_page("orders", "orders", &Page::new(2, "u", vec![record]))
        .unwrap();

    let ids: Vec<String> = [first, second]
        .iter()
        .flat_map(|p| p.tables.values().flatten())
        .map(|row| row[ROW_ID_COLUMN].as_str().unwrap().to_string())
        .collect();
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(ids.len(), 9);
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn test_row_ids_unique_across_resources_sharing_a_table() {
    let normalizer = Normalizer::new("load", 2);
    let record = json!({"id": 1, "roles": ["admin"]});

    let customers = normalizer
        .normalize_page("customers", "people", &page(vec![record.clone()]))
        .unwrap();
    let employees = normalizer
        .normalize_page("employees", "people", &page(vec![record]))
        .unwrap();

    let customer = &customers.rows("people")[0];
    let employee = &employees.rows("people")[0];
    assert_ne!(customer[ROW_ID_COLUMN], employee[ROW_ID_COLUMN]);
    assert_eq!(customer[ROW_ID_COLUMN], "load-customers-1-0");
    assert_eq!(employee[ROW_ID_COLUMN], "load-employees-1-0");

    let customer_role = &customers.rows("people__roles")[0];
    let employee_role = &employees.rows("people__roles")[0];
    assert_eq!(customer_role[PARENT_ID_COLUMN], customer[ROW_ID_COLUMN]);
    assert_eq!(employee_role[PARENT_ID_COLUMN], employee[ROW_ID_COLUMN]);
    assert_ne!(customer_role[ROW_ID_COLUMN], employee_role[ROW_ID_COLUMN]);
}

#[test]
fn test_table_name_is_normalized() {
    let normalizer = Normalizer::new("load", 2);
    let result = normalizer
        .normalize_page("Line Items", "LineItems", &page(vec![json!({"id": 1})]))
        .unwrap();
    assert!(result.tables.contains_key("line_items"));
    assert_eq!(result.resource, "Line Items");
}

#[test]
fn test_empty_page() {
    let normalizer = Normalizer::new("load", 2);
    let result = normalizer
        .normalize_page("orders", "orders", &page(vec![]))
        .unwrap();
    assert!(result.tables.is_empty());
    assert_eq!(result.row_count(), 0);
}
