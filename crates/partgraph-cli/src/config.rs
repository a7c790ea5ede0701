//! Pipeline configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use partgraph_adjacency::AdjacencySettings;
use partgraph_store::DEFAULT_MESH_CACHE_CAPACITY;
use serde::{Deserialize, Serialize};

/// Everything a run can be configured with. Missing keys take defaults.
///
/// ```toml
/// mesh_cache_capacity = 64
///
/// [adjacency]
/// failure_distance = 10.0
/// edge_threshold = 0.01
///
/// [adjacency.gjk]
/// max_iterations = 128
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Box fitting, distance and edge settings (`[adjacency]`).
    pub adjacency: AdjacencySettings,
    /// Meshes kept in memory by the dataset store. Zero disables the cache.
    pub mesh_cache_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            adjacency: AdjacencySettings::default(),
            mesh_cache_capacity: DEFAULT_MESH_CACHE_CAPACITY,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document and validate the adjacency settings.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.adjacency.validate()?;
        Ok(config)
    }

    /// Read `path`, or use defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config.mesh_cache_capacity, DEFAULT_MESH_CACHE_CAPACITY);
        assert_eq!(config.adjacency.failure_distance, 10.0);
        assert_eq!(config.adjacency.edge_threshold, None);
        assert!(config.adjacency.reuse_cached);
    }

    #[test]
    fn test_partial_sections() {
        let config = PipelineConfig::from_toml(
            r#"
            mesh_cache_capacity = 4

            [adjacency]
            edge_threshold = 0.01
            reuse_cached = false

            [adjacency.gjk]
            max_iterations = 128
            "#,
        )
        .unwrap();
        assert_eq!(config.mesh_cache_capacity, 4);
        assert_eq!(config.adjacency.edge_threshold, Some(0.01));
        assert!(!config.adjacency.reuse_cached);
        assert_eq!(config.adjacency.gjk.max_iterations, 128);
        assert_eq!(config.adjacency.failure_distance, 10.0);
    }

    #[test]
    fn test_documented_example_parses() {
        let config = PipelineConfig::from_toml(
            r#"
            mesh_cache_capacity = 64

            [adjacency]
            failure_distance = 10.0
            edge_threshold = 0.01

            [adjacency.gjk]
            max_iterations = 128
            "#,
        )
        .unwrap();
        assert_eq!(config.mesh_cache_capacity, 64);
        assert_eq!(config.adjacency.failure_distance, 10.0);
        assert_eq!(config.adjacency.edge_threshold, Some(0.01));
        assert_eq!(config.adjacency.gjk.max_iterations, 128);

        let disabled = PipelineConfig::from_toml("mesh_cache_capacity = 0\n").unwrap();
        assert_eq!(disabled.mesh_cache_capacity, 0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(PipelineConfig::from_toml("[adjacency.gjk]\nmax_iterations = 0\n").is_err());
        assert!(PipelineConfig::from_toml("mesh_cache_capacity = \"many\"\n").is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(PipelineConfig::load(None).is_ok());
        assert!(PipelineConfig::load(Some(Path::new("/nonexistent/partgraph.toml"))).is_err());
    }
}
