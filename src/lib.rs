//! `AirTrend` - air pollutant time series for a place name
//!
//! This library resolves a place name to Swiss LV95 coordinates, samples the
//! yearly national pollutant rasters at that point and assembles a gap-tolerant
//! time series, ready to be charted against the regulatory limit.

pub mod api;
pub mod config;
pub mod error;
pub mod location_resolver;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod raster;
pub mod timeseries;
pub mod web;

// Re-export core types for public API
pub use config::AirTrendConfig;
pub use error::{AirTrendError, ResolutionError, SampleError};
pub use location_resolver::{CoordinateResolver, ResolvedPlace, SearchServerResolver};
pub use models::{
    AirQualityReport, CoordinatePair, GeoPosition, Lv95, PlaceQuery, PollutantDataset, TimeSeries,
    YearSample,
};
pub use pipeline::AirQualityPipeline;
pub use raster::{CogSampler, RasterSource};
pub use timeseries::build_series;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, AirTrendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
