//! Data models for the AirTrend pipeline
//!
//! This module contains the core domain models organized by concern:
//! - Coordinates: projected points and geographic positions
//! - Place: the end-user query
//! - Dataset: pollutant raster product families
//! - Series: yearly samples and the assembled time series
//! - Report: the bundle handed to presentation

pub mod coordinates;
pub mod dataset;
pub mod place;
pub mod report;
pub mod series;

// Re-export all public types for convenient access
pub use coordinates::{CoordinatePair, GeoPosition, Lv95, SpatialReference};
pub use dataset::PollutantDataset;
pub use place::PlaceQuery;
pub use report::{AirQualityReport, MapView};
pub use series::{TimeSeries, YearSample};
