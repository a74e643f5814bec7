//! Pipeline runner
//!
//! Drives a [`Source`] into a [`Destination`] in three stages:
//!
//! - **extract**: one task per resource drains its page stream, at most
//!   `extract_workers` at a time, into a bounded channel
//! - **normalize**: pages are flattened into rows on the blocking pool,
//!   `normalize_workers` at a time
//! - **load**: rows are buffered per table and written out every
//!   `buffer_max_items` rows, then once more at the end
//!
//! A run either completes, recording its load id in the destination, or
//! fails on the first error. Rows flushed before a failure stay where they
//! are; the load is not recorded.

mod load;
mod types;

pub use types::{ResourceTrace, RunTrace};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::destination::{Destination, DuckDbDestination};
use crate::error::{Error, Result};
use crate::http::RestClient;
use crate::normalize::{normalize_identifier, NormalizedPage, Normalizer};
use crate::source::{Resource, Source};
use crate::types::Page;
use load::TableBuffers;

/// A page on its way from extraction to normalization
struct ExtractedPage {
    resource: String,
    table: String,
    page: Page,
}

enum LoadCommand {
    Page(NormalizedPage),
    Finish,
}

enum LoadOutcome {
    Finished {
        destination: Box<dyn Destination>,
        written: BTreeMap<String, usize>,
    },
    Aborted,
}

/// Runs sources into a destination
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline, validating its configuration
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.pipeline_name
    }

    /// Run `source` into the configured DuckDB database
    pub async fn run(&self, source: &Source, client: Arc<RestClient>) -> Result<RunTrace> {
        let path = self.config.database_path();
        let dataset = self.config.dataset_name.clone();
        let destination = tokio::task::spawn_blocking(move || DuckDbDestination::open(path, dataset))
            .await
            .map_err(|e| task_failed("destination", &e))??;

        self.run_with_destination(source, client, Box::new(destination))
            .await
    }

    /// Run `source` into `destination`
    pub async fn run_with_destination(
        &self,
        source: &Source,
        client: Arc<RestClient>,
        destination: Box<dyn Destination>,
    ) -> Result<RunTrace> {
        let started_at = Utc::now();
        let load_id = new_load_id(started_at);
        let settings = self.config.settings;
        settings.validate()?;

        let destination_name = destination.name().to_string();
        let location = destination.location().to_string();
        info!(
            "Pipeline {} starting load {} of source {} into {}.{}",
            self.config.pipeline_name,
            load_id,
            source.name(),
            location,
            self.config.dataset_name
        );

        // Extract
        let (page_tx, page_rx) =
            mpsc::channel::<ExtractedPage>(settings.extract_workers.saturating_mul(2));
        let semaphore = Arc::new(Semaphore::new(settings.extract_workers));
        let mut extractors = JoinSet::new();
        for (index, resource) in source.resources().iter().enumerate() {
            let resource = resource.clone();
            let client = Arc::clone(&client);
            let tx = page_tx.clone();
            let semaphore = Arc::clone(&semaphore);
            extractors.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Other(format!("Extraction slots closed: {e}")))?;
                let trace = extract_resource(&resource, &client, &tx).await?;
                Ok::<_, Error>((index, trace))
            });
        }
        drop(page_tx);

        // Normalize
        let normalizer = Arc::new(Normalizer::new(
            load_id.clone(),
            self.config.max_table_nesting,
        ));
        let mut normalized = stream::unfold(page_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .map(move |item: ExtractedPage| {
            let normalizer = Arc::clone(&normalizer);
            tokio::task::spawn_blocking(move || {
                normalizer.normalize_page(&item.resource, &item.table, &item.page)
            })
        })
        .buffered(settings.normalize_workers)
        .boxed();

        // Load
        let (load_tx, mut load_rx) =
            mpsc::channel::<LoadCommand>(settings.normalize_workers.saturating_mul(2));
        let buffer_max_items = settings.buffer_max_items;
        let loader = tokio::task::spawn_blocking(move || -> Result<LoadOutcome> {
            let mut buffers = TableBuffers::new(destination, buffer_max_items);
            while let Some(command) = load_rx.blocking_recv() {
                match command {
                    LoadCommand::Page(page) => buffers.push(page)?,
                    LoadCommand::Finish => {
                        buffers.flush_all()?;
                        let (destination, written) = buffers.into_parts();
                        return Ok(LoadOutcome::Finished {
                            destination,
                            written,
                        });
                    }
                }
            }
            debug!(
                "Load aborted with {} rows buffered, {} tables written",
                buffers.pending(),
                buffers.written().len()
            );
            Ok(LoadOutcome::Aborted)
        });

        let mut traces: BTreeMap<usize, ResourceTrace> = BTreeMap::new();
        let mut loader_stopped = false;
        let pumped: Result<()> = async {
            loop {
                tokio::select! {
                    Some(joined) = extractors.join_next() => {
                        let (index, trace) = finished_extraction(joined)?;
                        traces.insert(index, trace);
                    }
                    next = normalized.next() => {
                        let Some(joined) = next else { break };
                        let page = joined.map_err(|e| task_failed("normalization", &e))??;
                        debug!(
                            "Normalized page {} of {} into {} rows",
                            page.page,
                            page.resource,
                            page.row_count()
                        );
                        if load_tx.send(LoadCommand::Page(page)).await.is_err() {
                            loader_stopped = true;
                            return Ok(());
                        }
                    }
                }
            }
            // every sender is gone, so every extractor has finished
            while let Some(joined) = extractors.join_next().await {
                let (index, trace) = finished_extraction(joined)?;
                traces.insert(index, trace);
            }
            Ok(())
        }
        .await;

        if pumped.is_err() || loader_stopped {
            extractors.abort_all();
            drop(normalized);
            drop(load_tx);
            let loaded = loader.await.map_err(|e| task_failed("load", &e))?;
            warn!(
                "Load {} of pipeline {} did not complete",
                load_id, self.config.pipeline_name
            );
            pumped?;
            loaded?;
            return Err(Error::destination("Loader stopped before the run completed"));
        }

        let finish_sent = load_tx.send(LoadCommand::Finish).await.is_ok();
        drop(load_tx);
        let outcome = loader.await.map_err(|e| task_failed("load", &e))??;
        let LoadOutcome::Finished {
            mut destination,
            written,
        } = outcome
        else {
            return Err(Error::destination(if finish_sent {
                "Loader ended without finishing the load"
            } else {
                "Loader stopped before the run completed"
            }));
        };

        let pipeline_name = self.config.pipeline_name.clone();
        let completed_id = load_id.clone();
        tokio::task::spawn_blocking(move || destination.complete_load(&completed_id, &pipeline_name))
            .await
            .map_err(|e| task_failed("load", &e))??;

        let trace = RunTrace {
            pipeline_name: self.config.pipeline_name.clone(),
            load_id,
            dataset_name: self.config.dataset_name.clone(),
            destination: destination_name,
            location,
            started_at,
            finished_at: Utc::now(),
            resources: traces.into_values().collect(),
            tables: written,
        };
        info!(
            "Load {} completed: {} records, {} rows in {} tables",
            trace.load_id,
            trace.total_records(),
            trace.total_rows(),
            trace.tables.len()
        );
        Ok(trace)
    }
}

/// Drain one resource into the page channel
async fn extract_resource(
    resource: &Resource,
    client: &Arc<RestClient>,
    tx: &mpsc::Sender<ExtractedPage>,
) -> Result<ResourceTrace> {
    let mut trace = ResourceTrace::new(resource.name(), normalize_identifier(resource.table()));
    let mut pages = resource.extract(client);

    while let Some(page) = pages.next().await {
        let page = page.map_err(|e| Error::extraction(resource.name(), e))?;
        trace.add_page(page.len());
        let item = ExtractedPage {
            resource: resource.name().to_string(),
            table: resource.table().to_string(),
            page,
        };
        if tx.send(item).await.is_err() {
            debug!("Run stopped, leaving {} early", resource.name());
            break;
        }
    }

    info!(
        "Extracted {} pages ({} records) from {}",
        trace.pages,
        trace.records,
        resource.name()
    );
    Ok(trace)
}

fn finished_extraction(
    joined: std::result::Result<Result<(usize, ResourceTrace)>, JoinError>,
) -> Result<(usize, ResourceTrace)> {
    joined.map_err(|e| task_failed("extraction", &e))?
}

fn task_failed(stage: &str, e: &JoinError) -> Error {
    Error::Other(format!("{stage} task failed: {e}"))
}

/// Load id for a run started at `at`: unix seconds with microseconds
pub fn new_load_id(at: DateTime<Utc>) -> String {
    format!("{}.{:06}", at.timestamp(), at.timestamp_subsec_micros())
}

#[cfg(test)]
mod tests;
