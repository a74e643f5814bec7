//! Tests for the pipeline runner

use super::load::TableBuffers;
use super::*;
use crate::config::{PipelineConfig, PipelineSettings};
use crate::destination::{Destination, DuckDbDestination};
use crate::normalize::NormalizedPage;
use crate::source::jaffle_shop::{get_customers, get_orders, get_products, jaffle_shop_source};
use crate::types::Row;
use chrono::TimeZone;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

async fn mount_pages(server: &MockServer, endpoint: &str, pages: Vec<Vec<Value>>) {
    let total = pages.len();
    for (i, records) in pages.into_iter().enumerate() {
        let page = i + 1;
        let mut template = ResponseTemplate::new(200).set_body_json(records);
        if page < total {
            template = template.insert_header(
                "link",
                format!(
                    "<{}/api/v1/{endpoint}?page={}>; rel=\"next\"",
                    server.uri(),
                    page + 1
                )
                .as_str(),
            );
        }
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/{endpoint}")))
            .and(query_param("page", page.to_string().as_str()))
            .respond_with(template)
            .mount(server)
            .await;
    }
}

fn customers_page(page: usize) -> Vec<Value> {
    (0..100)
        .map(|i| json!({"id": format!("c-{page}-{i}"), "name": format!("Customer {i}")}))
        .collect()
}

async fn jaffle_server() -> MockServer {
    let server = MockServer::start().await;
    mount_pages(
        &server,
        "customers",
        vec![customers_page(1), customers_page(2), customers_page(3)],
    )
    .await;
    mount_pages(
        &server,
        "orders",
        vec![vec![
            json!({
                "id": "o1",
                "customer_id": "c-1-0",
                "ordered_at": "2017-08-01T10:00:00",
                "order_total": 1250,
                "items": [{"sku": "JAF-001"}, {"sku": "BEV-002"}]
            }),
            json!({
                "id": "o2",
                "customer_id": "c-1-1",
                "ordered_at": "2017-08-02T11:30:00",
                "order_total": 700,
                "items": [{"sku": "JAF-003"}]
            }),
        ]],
    )
    .await;
    mount_pages(
        &server,
        "products",
        vec![vec![
            json!({"sku": "JAF-001", "name": "nutellaphone who dis?", "price": 1100, "is_food_item": true}),
            json!({"sku": "BEV-002", "name": "cold brew", "price": 700.5, "is_food_item": false}),
        ]],
    )
    .await;
    server
}

fn client_for(server: &MockServer) -> Arc<RestClient> {
    Arc::new(RestClient::new(format!("{}/api/v1", server.uri())).unwrap())
}

fn config_in(dir: &TempDir) -> PipelineConfig {
    PipelineConfig::new("jaffle_shop_pipeline", "jaffle_shop")
        .with_database_path(dir.path().join("jaffle_shop_pipeline.duckdb"))
}

fn open(path: &Path) -> DuckDbDestination {
    DuckDbDestination::open(path, "jaffle_shop").unwrap()
}

/// Destination keeping every write in memory
#[derive(Clone, Default)]
struct RecordingDestination {
    writes: Arc<Mutex<Vec<(String, usize)>>>,
    loads: Arc<Mutex<Vec<String>>>,
}

impl Destination for RecordingDestination {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn location(&self) -> &str {
        "memory"
    }

    fn dataset(&self) -> &str {
        "test"
    }

    fn write_rows(&mut self, table: &str, rows: &[Row]) -> crate::Result<usize> {
        self.writes
            .lock()
            .unwrap()
            .push((table.to_string(), rows.len()));
        Ok(rows.len())
    }

    fn complete_load(&mut self, load_id: &str, _pipeline_name: &str) -> crate::Result<()> {
        self.loads.lock().unwrap().push(load_id.to_string());
        Ok(())
    }
}

/// Destination rejecting every write
struct FailingDestination;

impl Destination for FailingDestination {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn location(&self) -> &str {
        "nowhere"
    }

    fn dataset(&self) -> &str {
        "test"
    }

    fn write_rows(&mut self, _table: &str, _rows: &[Row]) -> crate::Result<usize> {
        Err(crate::Error::destination("disk full"))
    }

    fn complete_load(&mut self, _load_id: &str, _pipeline_name: &str) -> crate::Result<()> {
        Ok(())
    }
}

fn normalized(table: &str, rows: usize) -> NormalizedPage {
    let mut page = NormalizedPage::default();
    page.tables.insert(
        table.to_string(),
        (0..rows)
            .map(|i| {
                let mut row = Row::new();
                row.insert("i".to_string(), json!(i));
                row
            })
            .collect(),
    );
    page
}

// ============================================================================
// Load Id Tests
// ============================================================================

#[test]
fn test_new_load_id() {
    let at = Utc.timestamp_opt(1_700_000_000, 42_000).unwrap();
    assert_eq!(new_load_id(at), "1700000000.000042");
}

#[test]
fn test_pipeline_rejects_invalid_config() {
    let config = PipelineConfig::new("p", "d")
        .with_settings(PipelineSettings::default().with_normalize_workers(0));
    assert!(Pipeline::new(config).is_err());
}

#[test]
fn test_pipeline_rejects_oversized_worker_counts() {
    let config = PipelineConfig::new("p", "d")
        .with_settings(PipelineSettings::default().with_extract_workers(usize::MAX / 2));
    assert!(matches!(
        Pipeline::new(config),
        Err(Error::InvalidConfigValue { ref field, .. }) if field == "extract_workers"
    ));
}

// ============================================================================
// Buffer Tests
// ============================================================================

#[test]
fn test_buffers_flush_at_threshold() {
    let destination = RecordingDestination::default();
    let writes = Arc::clone(&destination.writes);
    let mut buffers = TableBuffers::new(Box::new(destination), 5);

    buffers.push(normalized("customers", 3)).unwrap();
    assert!(writes.lock().unwrap().is_empty());
    assert_eq!(buffers.pending(), 3);

    buffers.push(normalized("customers", 3)).unwrap();
    assert_eq!(*writes.lock().unwrap(), vec![("customers".to_string(), 6)]);
    assert_eq!(buffers.pending(), 0);

    buffers.push(normalized("orders", 2)).unwrap();
    buffers.flush_all().unwrap();
    assert_eq!(writes.lock().unwrap().len(), 2);

    let (_, written) = buffers.into_parts();
    assert_eq!(written.get("customers"), Some(&6));
    assert_eq!(written.get("orders"), Some(&2));
}

#[test]
fn test_buffers_propagate_write_errors() {
    let mut buffers = TableBuffers::new(Box::new(FailingDestination), 1);
    let err = buffers.push(normalized("customers", 1)).unwrap_err();
    assert!(err.to_string().contains("disk full"));
}

// ============================================================================
// Run Tests
// ============================================================================

#[tokio::test]
async fn test_run_loads_jaffle_shop() {
    let server = jaffle_server().await;
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let db_path = config.database_path();

    let pipeline = Pipeline::new(config).unwrap();
    let trace = pipeline
        .run(&jaffle_shop_source(), client_for(&server))
        .await
        .unwrap();

    assert_eq!(trace.pipeline_name, "jaffle_shop_pipeline");
    assert_eq!(trace.destination, "duckdb");
    assert_eq!(
        trace
            .resources
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>(),
        vec!["customers", "orders", "products"]
    );
    assert_eq!(trace.resource("customers").unwrap().pages, 3);
    assert_eq!(trace.resource("customers").unwrap().records, 300);
    assert_eq!(trace.total_records(), 304);
    assert_eq!(trace.rows_in("customers"), 300);
    assert_eq!(trace.rows_in("orders"), 2);
    assert_eq!(trace.rows_in("orders__items"), 3);
    assert_eq!(trace.rows_in("products"), 2);

    let mut destination = open(&db_path);
    assert_eq!(destination.row_count("customers").unwrap(), 300);
    assert_eq!(destination.row_count("orders__items").unwrap(), 3);
    assert_eq!(
        destination.tables().unwrap(),
        vec!["customers", "orders", "orders__items", "products"]
    );
    assert_eq!(destination.completed_loads().unwrap(), vec![trace.load_id.clone()]);

    let orders = destination.table_schema("orders").unwrap().unwrap();
    assert_eq!(
        orders.get("ordered_at").unwrap().data_type,
        crate::schema::DataType::Timestamp
    );
    let products = destination.table_schema("products").unwrap().unwrap();
    assert_eq!(
        products.get("price").unwrap().data_type,
        crate::schema::DataType::Double
    );
}

#[tokio::test]
async fn test_run_with_small_buffers_and_single_workers() {
    let server = jaffle_server().await;
    let dir = TempDir::new().unwrap();
    let settings = PipelineSettings::default()
        .with_extract_workers(1)
        .with_normalize_workers(1)
        .with_buffer_max_items(7);
    let config = config_in(&dir).with_settings(settings);
    let db_path = config.database_path();

    let trace = Pipeline::new(config)
        .unwrap()
        .run(&jaffle_shop_source(), client_for(&server))
        .await
        .unwrap();

    assert_eq!(trace.rows_in("customers"), 300);
    assert_eq!(open(&db_path).row_count("customers").unwrap(), 300);
}

#[tokio::test]
async fn test_run_with_recording_destination() {
    let server = jaffle_server().await;
    let destination = RecordingDestination::default();
    let loads = Arc::clone(&destination.loads);

    let config = PipelineConfig::new("jaffle_shop_pipeline", "jaffle_shop").with_settings(
        PipelineSettings::default()
            .with_normalize_workers(4)
            .with_buffer_max_items(100),
    );
    let source = jaffle_shop_source().with_resources(["customers"]).unwrap();

    let trace = Pipeline::new(config)
        .unwrap()
        .run_with_destination(&source, client_for(&server), Box::new(destination))
        .await
        .unwrap();

    assert_eq!(trace.destination, "recording");
    assert_eq!(trace.resources.len(), 1);
    assert_eq!(trace.rows_in("customers"), 300);
    assert_eq!(*loads.lock().unwrap(), vec![trace.load_id.clone()]);
}

#[tokio::test]
async fn test_run_with_page_limit() {
    let server = jaffle_server().await;
    let dir = TempDir::new().unwrap();

    let trace = Pipeline::new(config_in(&dir))
        .unwrap()
        .run(&jaffle_shop_source().with_page_limit(1), client_for(&server))
        .await
        .unwrap();

    assert_eq!(trace.resource("customers").unwrap().pages, 1);
    assert_eq!(trace.rows_in("customers"), 100);
}

#[tokio::test]
async fn test_trace_reports_normalized_table_names() {
    let server = jaffle_server().await;
    let destination = RecordingDestination::default();
    let writes = Arc::clone(&destination.writes);
    let source = Source::new(
        "shop",
        vec![get_orders().table_name("OrderItems")],
    );

    let trace = Pipeline::new(PipelineConfig::new("p", "d"))
        .unwrap()
        .run_with_destination(&source, client_for(&server), Box::new(destination))
        .await
        .unwrap();

    let orders = trace.resource("orders").unwrap();
    assert_eq!(orders.table, "order_items");
    assert_eq!(trace.rows_in(&orders.table), 2);
    assert_eq!(trace.rows_in("order_items__items"), 3);
    assert!(writes
        .lock()
        .unwrap()
        .iter()
        .any(|(table, rows)| table == "order_items" && *rows == 2));
}

#[tokio::test]
async fn test_runs_append_and_record_each_load() {
    let server = jaffle_server().await;
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let db_path = config.database_path();
    let pipeline = Pipeline::new(config).unwrap();
    let source = jaffle_shop_source().with_resources(["customers"]).unwrap();

    let first = pipeline.run(&source, client_for(&server)).await.unwrap();
    let second = pipeline.run(&source, client_for(&server)).await.unwrap();

    assert_ne!(first.load_id, second.load_id);
    let destination = open(&db_path);
    assert_eq!(destination.row_count("customers").unwrap(), 600);
    assert_eq!(destination.completed_loads().unwrap().len(), 2);
}

#[tokio::test]
async fn test_run_fails_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/customers"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(customers_page(1))
                .insert_header("link", "</api/v1/customers?page=2>; rel=\"next\""),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/customers"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/customers"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(customers_page(3)))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let db_path = config.database_path();
    let source = crate::source::Source::new("jaffle_shop", vec![get_customers()]);

    let err = Pipeline::new(config)
        .unwrap()
        .run(&source, client_for(&server))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(matches!(err, crate::Error::Extraction { ref resource, .. } if resource == "customers"));
    assert!(open(&db_path).completed_loads().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_fails_on_destination_error() {
    let server = jaffle_server().await;
    let source = crate::source::Source::new("jaffle_shop", vec![get_orders(), get_products()]);
    let config = PipelineConfig::new("p", "d")
        .with_settings(PipelineSettings::default().with_buffer_max_items(1));

    let err = Pipeline::new(config)
        .unwrap()
        .run_with_destination(&source, client_for(&server), Box::new(FailingDestination))
        .await
        .unwrap_err();

    assert!(matches!(err, crate::Error::Destination { .. }));
}

#[tokio::test]
async fn test_run_empty_source() {
    let server = MockServer::start().await;
    let destination = RecordingDestination::default();
    let source = crate::source::Source::new("empty", vec![]);

    let trace = Pipeline::new(PipelineConfig::new("p", "d"))
        .unwrap()
        .run_with_destination(&source, client_for(&server), Box::new(destination))
        .await
        .unwrap();

    assert_eq!(trace.total_rows(), 0);
    assert!(trace.resources.is_empty());
}

#[test]
fn test_run_trace_display() {
    let started = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let trace = RunTrace {
        pipeline_name: "jaffle_shop_pipeline".to_string(),
        load_id: "1700000000.000000".to_string(),
        dataset_name: "jaffle_shop".to_string(),
        destination: "duckdb".to_string(),
        location: "jaffle_shop_pipeline.duckdb".to_string(),
        started_at: started,
        finished_at: started + chrono::Duration::milliseconds(2500),
        resources: vec![ResourceTrace {
            name: "customers".to_string(),
            table: "customers".to_string(),
            pages: 3,
            records: 300,
        }],
        tables: [("customers".to_string(), 300)].into_iter().collect(),
    };

    let text = trace.to_string();
    assert!(text.contains("Pipeline jaffle_shop_pipeline load step completed in 2.50 seconds"));
    assert!(text.contains("destination duckdb and into dataset jaffle_shop"));
    assert!(text.contains("Load package 1700000000.000000 is COMPLETED"));
    assert!(text.contains("customers: 3 pages, 300 records"));
    assert!(text.contains("customers: 300 rows"));
    assert_eq!(trace.total_pages(), 3);
}
