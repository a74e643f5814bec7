//! CLI runner - executes commands

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cli::commands::{Cli, Commands, RunArgs};
use crate::config::{PipelineConfig, PipelineSettings};
use crate::loader::{load_source, LoadedSource};
use crate::pipeline::{Pipeline, RunTrace};
use crate::source::Resource;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run(args) => {
                let trace = self.run_pipeline(args).await?;
                println!("{trace}");
                Ok(())
            }
            Commands::Resources { source } => self.resources(source),
            Commands::Validate { source } => self.validate(source),
        }
    }

    /// Load the source and run it into DuckDB
    pub async fn run_pipeline(&self, args: &RunArgs) -> Result<RunTrace> {
        let loaded = load(&args.source)?;
        let loaded = match &args.base_url {
            Some(url) => loaded.with_base_url(url),
            None => loaded,
        };

        let mut source = if args.resources.is_empty() {
            loaded.source.clone()
        } else {
            loaded
                .source
                .with_resources(&args.resources)
                .context("Failed to select resources")?
        };
        if let Some(limit) = args.page_limit {
            source = source.with_page_limit(limit);
        }

        let settings = apply_overrides(
            PipelineSettings::from_env_over(loaded.settings)
                .context("Invalid pipeline settings in environment")?,
            args,
        );
        let mut config =
            PipelineConfig::new(&args.pipeline_name, &args.dataset).with_settings(settings);
        if let Some(path) = &args.database {
            config = config.with_database_path(path);
        }
        debug!("Pipeline configuration: {:?}", config);

        let client = Arc::new(
            loaded
                .client()
                .context("Failed to create the REST client")?,
        );
        let pipeline = Pipeline::new(config).context("Invalid pipeline configuration")?;

        info!(
            "Running {} resources of source {}",
            source.resources().len(),
            source.name()
        );
        let trace = pipeline
            .run(&source, client)
            .await
            .with_context(|| format!("Pipeline {} failed", pipeline.name()))?;
        Ok(trace)
    }

    /// List the resources of a source
    fn resources(&self, name: &str) -> Result<()> {
        let loaded = load(name)?;
        println!("Source: {}", loaded.source.name());
        println!("Base URL: {}", loaded.client_config.base_url);
        for resource in loaded.source.resources() {
            println!("{}", describe(resource));
        }
        Ok(())
    }

    /// Validate a source definition
    fn validate(&self, name: &str) -> Result<()> {
        let loaded = load(name)?;
        loaded
            .client()
            .with_context(|| format!("Source {} has an unusable client configuration", name))?;
        println!(
            "Source {} is valid: {} resources ({})",
            loaded.source.name(),
            loaded.source.resources().len(),
            loaded.source.resource_names().join(", ")
        );
        Ok(())
    }
}

fn load(name: &str) -> Result<LoadedSource> {
    load_source(name).with_context(|| format!("Failed to load source {name}"))
}

/// Apply `run` flags over settings read from the environment
pub(crate) fn apply_overrides(mut settings: PipelineSettings, args: &RunArgs) -> PipelineSettings {
    if let Some(workers) = args.extract_workers {
        settings = settings.with_extract_workers(workers);
    }
    if let Some(workers) = args.normalize_workers {
        settings = settings.with_normalize_workers(workers);
    }
    if let Some(items) = args.buffer_max_items {
        settings = settings.with_buffer_max_items(items);
    }
    settings
}

/// One line per resource: name, endpoint, table, params and page limit
pub(crate) fn describe(resource: &Resource) -> String {
    let params = resource
        .params()
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut line = format!(
        "  {} -> /{} (table {})",
        resource.name(),
        resource.endpoint().trim_start_matches('/'),
        resource.table()
    );
    if !params.is_empty() {
        line.push_str(&format!(" ?{params}"));
    }
    if let Some(limit) = resource.page_limit() {
        line.push_str(&format!(" [page limit {limit}]"));
    }
    line
}
