//! Configuration management for `AirTrend`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::AirTrendError;
use crate::models::dataset::YEAR_PLACEHOLDER;
use crate::models::{Lv95, PollutantDataset, SpatialReference};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for `AirTrend`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AirTrendConfig {
    /// Geocoding service configuration
    pub geocoder: GeocoderConfig,
    /// Raster sampling configuration
    pub sampling: SamplingConfig,
    /// Known pollutant datasets by identifier
    pub datasets: BTreeMap<String, PollutantDataset>,
    /// Dataset used for every run of this deployment
    pub active_dataset: String,
    /// Map layer configuration
    pub map: MapConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
}

/// Which response attribute carries the easting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisOrder {
    /// `x` is the easting, `y` the northing
    EastingNorthing,
    /// `x` is the northing, `y` the easting (Swiss survey convention)
    NorthingEasting,
}

/// Geocoding service configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Search service endpoint
    #[serde(default = "default_geocoder_base_url")]
    pub base_url: String,
    /// EPSG code requested from the service
    #[serde(default = "default_spatial_reference")]
    pub spatial_reference: u32,
    /// Attribute order of the projected coordinates
    #[serde(default = "default_axis_order")]
    pub axis_order: AxisOrder,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

/// Raster sampling configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Timeout for one raster open plus point read, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Years sampled in parallel
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

/// Map layer configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Base tile layer template
    #[serde(default = "default_base_tiles")]
    pub base_tiles: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// HTTP server configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

// Default value functions
fn default_geocoder_base_url() -> String {
    "https://api3.geo.admin.ch/rest/services/api/SearchServer".to_string()
}

fn default_spatial_reference() -> u32 {
    Lv95::EPSG
}

fn default_axis_order() -> AxisOrder {
    AxisOrder::NorthingEasting
}

fn default_timeout() -> u32 {
    30
}

fn default_max_concurrency() -> usize {
    5
}

fn default_base_tiles() -> String {
    "https://wmts.geo.admin.ch/1.0.0/ch.swisstopo.pixelkarte-grau/default/current/3857/{z}/{x}/{y}.jpeg"
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_datasets() -> BTreeMap<String, PollutantDataset> {
    [
        PollutantDataset::sulfur_dioxide(),
        PollutantDataset::nitrogen_dioxide(),
    ]
    .into_iter()
    .map(|dataset| (dataset.id.clone(), dataset))
    .collect()
}

fn default_active_dataset() -> String {
    "so2".to_string()
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoder_base_url(),
            spatial_reference: default_spatial_reference(),
            axis_order: default_axis_order(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            base_tiles: default_base_tiles(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for AirTrendConfig {
    fn default() -> Self {
        Self {
            geocoder: GeocoderConfig::default(),
            sampling: SamplingConfig::default(),
            datasets: default_datasets(),
            active_dataset: default_active_dataset(),
            map: MapConfig::default(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl GeocoderConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl SamplingConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl AirTrendConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. AIRTREND_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("AIRTREND")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AirTrendConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("airtrend").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.geocoder.base_url.is_empty() {
            self.geocoder.base_url = default_geocoder_base_url();
        }
        if self.geocoder.timeout_seconds == 0 {
            self.geocoder.timeout_seconds = default_timeout();
        }
        if self.sampling.timeout_seconds == 0 {
            self.sampling.timeout_seconds = default_timeout();
        }
        if self.sampling.max_concurrency == 0 {
            self.sampling.max_concurrency = default_max_concurrency();
        }
        if self.datasets.is_empty() {
            self.datasets = default_datasets();
        }
        if self.active_dataset.is_empty() {
            self.active_dataset = default_active_dataset();
        }
        if self.map.base_tiles.is_empty() {
            self.map.base_tiles = default_base_tiles();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        // Identifiers come from the table keys
        for (id, dataset) in &mut self.datasets {
            dataset.id.clone_from(id);
        }
    }

    /// The dataset selected for this deployment
    pub fn dataset(&self) -> Result<&PollutantDataset, AirTrendError> {
        self.datasets.get(&self.active_dataset).ok_or_else(|| {
            AirTrendError::config(format!(
                "Active dataset '{}' is not configured. Known datasets: {}",
                self.active_dataset,
                self.datasets.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_datasets()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.geocoder.timeout_seconds > 300 {
            return Err(AirTrendError::config("Geocoder timeout cannot exceed 300 seconds").into());
        }

        if self.sampling.timeout_seconds > 300 {
            return Err(AirTrendError::config("Sampling timeout cannot exceed 300 seconds").into());
        }

        if self.sampling.max_concurrency > 32 {
            return Err(AirTrendError::config("Sampling concurrency cannot exceed 32").into());
        }

        if self.geocoder.spatial_reference != Lv95::EPSG {
            return Err(AirTrendError::config(format!(
                "Geocoder spatial reference must be EPSG:{} ({}) to match the rasters",
                Lv95::EPSG,
                Lv95::NAME
            ))
            .into());
        }

        Ok(())
    }

    /// Validate the dataset table and the active selection
    fn validate_datasets(&self) -> Result<()> {
        self.dataset()?;

        for (id, dataset) in &self.datasets {
            if dataset.first_year > dataset.last_year {
                return Err(AirTrendError::config(format!(
                    "Dataset '{id}': first_year {} is after last_year {}",
                    dataset.first_year, dataset.last_year
                ))
                .into());
            }

            if !dataset.url_template.contains(YEAR_PLACEHOLDER) {
                return Err(AirTrendError::config(format!(
                    "Dataset '{id}': url_template must contain {YEAR_PLACEHOLDER}"
                ))
                .into());
            }

            if !is_http_url(&dataset.url_template) {
                return Err(AirTrendError::config(format!(
                    "Dataset '{id}': url_template must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }

            if !dataset.threshold.is_finite() || dataset.threshold < 0.0 {
                return Err(AirTrendError::config(format!(
                    "Dataset '{id}': threshold must be a non-negative number"
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AirTrendError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AirTrendError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !is_http_url(&self.geocoder.base_url) {
            return Err(AirTrendError::config(
                "Geocoder base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
