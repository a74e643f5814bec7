//! YAML parser for source definitions
//!
//! Parses and validates source YAML files.
//! Supports both built-in sources (by name) and custom YAML files (by path).

use crate::error::{Error, Result};
use crate::http::RestClientConfig;
use crate::loader::types::{LoadedSource, PaginatorDefinition, ResourceDefinition, SourceDefinition};
use crate::source::jaffle_shop;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use url::Url;

/// Names of the sources defined in code
pub fn list_builtin() -> Vec<&'static str> {
    vec![jaffle_shop::SOURCE_NAME]
}

/// Built-in source by name
pub fn get_builtin(name: &str) -> Option<LoadedSource> {
    match name {
        jaffle_shop::SOURCE_NAME => Some(LoadedSource {
            source: jaffle_shop::jaffle_shop_source(),
            client_config: RestClientConfig::builder()
                .base_url(jaffle_shop::BASE_URL)
                .build(),
            paginator: PaginatorDefinition::default(),
            settings: jaffle_shop::settings(),
        }),
        _ => None,
    }
}

/// Load a source from a built-in name or a file path
///
/// This function first checks if the input is a built-in source name (e.g., "jaffle_shop"),
/// then falls back to loading from a file path.
///
/// # Examples
///
/// ```ignore
/// // Load built-in source by name
/// let loaded = load_source("jaffle_shop")?;
///
/// // Load custom source from file
/// let loaded = load_source("./my-source.yaml")?;
/// ```
pub fn load_source(path: impl AsRef<Path>) -> Result<LoadedSource> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    if !path_str.contains('/')
        && !path_str.contains('\\')
        && !path_str.ends_with(".yaml")
        && !path_str.ends_with(".yml")
    {
        if let Some(loaded) = get_builtin(&path_str) {
            return Ok(loaded);
        }
    }

    load_source_file(path).map(SourceDefinition::into_loaded)
}

/// Read and validate a source definition file
pub fn load_source_file(path: &Path) -> Result<SourceDefinition> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config(format!(
                "Source '{}' not found. Built-in sources: {}. Or provide a path to a YAML file.",
                path.display(),
                list_builtin().join(", ")
            ))
        } else {
            Error::config(format!(
                "Failed to read source file '{}': {}",
                path.display(),
                e
            ))
        }
    })?;
    load_source_from_str(&content)
}

/// Load a source definition from a YAML string
pub fn load_source_from_str(yaml: &str) -> Result<SourceDefinition> {
    let def: SourceDefinition = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse source YAML: {e}")))?;

    validate_source(&def)?;
    Ok(def)
}

/// Validate a source definition
fn validate_source(def: &SourceDefinition) -> Result<()> {
    if def.name.trim().is_empty() {
        return Err(Error::config("Source name cannot be empty"));
    }

    if def.base_url.trim().is_empty() {
        return Err(Error::config("Source base_url cannot be empty"));
    }
    Url::parse(&def.base_url).map_err(|e| {
        Error::config(format!("Source base_url '{}' is invalid: {e}", def.base_url))
    })?;

    if def.resources.is_empty() {
        return Err(Error::config("Source must have at least one resource"));
    }

    let mut names = HashSet::new();
    for resource in &def.resources {
        validate_resource(resource)?;
        if !names.insert(resource.name.as_str()) {
            return Err(Error::config(format!(
                "Duplicate resource name: {}",
                resource.name
            )));
        }
    }

    if let PaginatorDefinition::JsonLink { next_url_path } = &def.paginator {
        if next_url_path.trim().is_empty() {
            return Err(Error::config("json_link paginator needs a next_url_path"));
        }
    }

    Ok(())
}

/// Validate a resource definition
fn validate_resource(resource: &ResourceDefinition) -> Result<()> {
    if resource.name.trim().is_empty() {
        return Err(Error::config("Resource name cannot be empty"));
    }

    if let Some(endpoint) = &resource.endpoint {
        if endpoint.trim().is_empty() {
            return Err(Error::config(format!(
                "Resource '{}' endpoint cannot be empty",
                resource.name
            )));
        }
    }

    for (key, value) in &resource.params {
        if value.is_object() || value.is_array() {
            return Err(Error::config(format!(
                "Resource '{}' param '{key}' must be a scalar",
                resource.name
            )));
        }
    }

    Ok(())
}
