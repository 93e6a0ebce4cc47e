//! The data source configuration for a dataset directory.
//!
//! Every dataset directory contains a `sources.toml` file which names the versions of the
//! upstream sources and the file-name patterns under which their tables are stored. Patterns
//! may contain placeholders such as `{year}`, `{version}`, `{region_set}` or `{category}`
//! which are interpolated when a path is resolved.
use crate::input::read_toml;
use anyhow::{bail, ensure, Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The name of the data source configuration file
pub const SOURCES_FILE_NAME: &str = "sources.toml";

/// Data source configuration for a dataset directory
#[derive(Debug, Deserialize, PartialEq)]
pub struct DataConfig {
    /// Root of the dataset directory. Not part of the file; filled in on load.
    #[serde(skip)]
    pub dataset_dir: PathBuf,
    /// Versions of the upstream sources
    pub sources: SourceVersions,
    /// File-name patterns for each source table, relative to the dataset directory
    pub files: FilePatterns,
    /// Parameters for feed-in preparation
    pub feedin: FeedinConfig,
    /// Parameters for the spatial join
    #[serde(default)]
    pub spatial: SpatialConfig,
    /// Mapping from fuel column names to main fuel groups for balance grouping
    #[serde(default)]
    pub fuel_groups: IndexMap<String, String>,
}

/// Versions of the upstream sources, interpolated into file patterns and cache keys
#[derive(Debug, Deserialize, PartialEq)]
pub struct SourceVersions {
    /// Version of the power plant registry
    pub registry: String,
    /// Version of the energy balance tables
    pub balance: String,
    /// Version of the weather/feed-in source
    pub weather: String,
    /// Version of the municipality/population source
    pub census: String,
}

/// File-name patterns for the source tables
#[derive(Debug, Deserialize, PartialEq)]
pub struct FilePatterns {
    /// Power plant registry (placeholders: `category`, `version`)
    pub powerplants: String,
    /// Curated replacement table for offshore wind
    pub offshore_patch: String,
    /// Centroids of federal states, used to fill missing plant coordinates
    pub state_centroids: String,
    /// Region set polygons (placeholder: `region_set`)
    pub region_set: String,
    /// Weather grid cell polygons
    pub weather_grid: String,
    /// Hourly weather parameter table (placeholders: `parameter`, `year`)
    pub weather: String,
    /// Normalised per-cell feed-in profiles (placeholders: `category`, `set_name`, `year`)
    pub feedin: String,
    /// National normalised load profile (placeholder: `year`)
    pub load_profile: String,
    /// Load areas with annual consumption
    pub load_areas: String,
    /// Energy balance of the federal states (placeholder: `year`)
    pub balance: String,
    /// Manual corrections for a balance year (placeholder: `year`); the file may be absent
    pub balance_fixes: String,
    /// Municipality population table (placeholder: `year`)
    pub municipalities: String,
    /// National annual electricity demand statistics
    pub annual_demand: String,
    /// National renewable capacity and energy statistics
    pub renewables: String,
}

/// Parameters for feed-in preparation
#[derive(Debug, Deserialize, PartialEq)]
pub struct FeedinConfig {
    /// Full-load hours assumed for geothermal feed-in
    pub geothermal_full_load_hours: f64,
    /// Names of the wind parameter sets for which per-cell profiles exist
    pub wind_sets: Vec<String>,
    /// Names of the solar parameter sets for which per-cell profiles exist
    pub solar_sets: Vec<String>,
}

/// Parameters for the spatial join fallback
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpatialConfig {
    /// Step by which the distance tolerance is increased for unmatched points (degrees)
    pub buffer_step: f64,
    /// Upper limit for the distance tolerance (degrees); 0 disables the fallback
    pub buffer_limit: f64,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            buffer_step: 0.05,
            buffer_limit: 1.0,
        }
    }
}

impl DataConfig {
    /// Read the data source configuration from a dataset directory
    pub fn from_dataset_dir(dataset_dir: &Path) -> Result<Self> {
        let file_path = dataset_dir.join(SOURCES_FILE_NAME);
        let mut config: DataConfig = read_toml(&file_path)?;
        config.dataset_dir = dataset_dir.to_path_buf();

        Ok(config)
    }

    /// Resolve a file pattern to a path under the dataset directory.
    ///
    /// # Arguments
    ///
    /// * `pattern` - One of the patterns in [`FilePatterns`]
    /// * `params` - Placeholder name/value pairs to interpolate
    pub fn resolve(&self, pattern: &str, params: &[(&str, &str)]) -> Result<PathBuf> {
        let relative = interpolate(pattern, params)
            .with_context(|| format!("Cannot resolve file pattern '{pattern}'"))?;

        Ok(self.dataset_dir.join(relative))
    }
}

/// Replace every `{name}` placeholder in `template` with its value from `params`.
///
/// Unknown placeholders and stray braces are errors; unused parameters are allowed.
pub fn interpolate(template: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        rest = &rest[start + 1..];
        let end = rest
            .find('}')
            .with_context(|| format!("Unclosed placeholder in template '{template}'"))?;
        let name = &rest[..end];
        ensure!(
            !name.contains('{'),
            "Stray '{{' in template '{template}'"
        );
        let value = params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .with_context(|| format!("No value provided for placeholder '{name}'"))?;
        out.push_str(value);
        rest = &rest[end + 1..];
    }
    if rest.contains('}') {
        bail!("Stray '}}' in template '{template}'");
    }
    out.push_str(rest);

    Ok(out)
}
