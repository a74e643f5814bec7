//! The jaffle shop demo API: customers, orders and products

use tracing::info;

use super::{Resource, Source};
use crate::config::PipelineSettings;
use crate::error::Result;
use crate::http::RestClient;

/// Root of the jaffle shop REST API
pub const BASE_URL: &str = "https://jaffle-shop.scalevector.ai/api/v1";

/// Source name used for the built-in definition
pub const SOURCE_NAME: &str = "jaffle_shop";

/// Pipeline the jaffle shop is loaded by, also the database file stem
pub const PIPELINE_NAME: &str = "jaffle_shop_pipeline_v3";

/// Client for the jaffle shop API, following `Link: rel="next"` headers
pub fn client() -> Result<RestClient> {
    RestClient::new(BASE_URL)
}

/// Worker counts the jaffle shop runs with: 12 extract, 4 normalize, 5000 buffered rows
pub fn settings() -> PipelineSettings {
    PipelineSettings::default()
        .with_extract_workers(12)
        .with_normalize_workers(4)
        .with_buffer_max_items(5000)
}

/// Customers, 100 per page
pub fn get_customers() -> Resource {
    Resource::new("customers", "customers")
        .param("page", 1)
        .param("page_size", 100)
}

/// Orders placed since August 2017, 500 per page
pub fn get_orders() -> Resource {
    Resource::new("orders", "orders")
        .param("page", 1)
        .param("page_size", 500)
        .param("start_date", "2017-08-01T00:00:00")
}

/// Products, 100 per page
pub fn get_products() -> Resource {
    Resource::new("products", "products")
        .param("page", 1)
        .param("page_size", 100)
}

/// All three jaffle shop resources as one source
pub fn jaffle_shop_source() -> Source {
    info!("Initializing jaffle shop data source");
    Source::new(
        SOURCE_NAME,
        vec![get_customers(), get_orders(), get_products()],
    )
}
