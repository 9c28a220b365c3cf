//! End-to-end run: place name → coordinates → yearly samples → report
//!
//! Nothing is kept between runs; the pipeline only holds its collaborators and
//! the dataset selected for this deployment.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::config::AirTrendConfig;
use crate::error::ResolutionError;
use crate::location_resolver::{CoordinateResolver, SearchServerResolver};
use crate::models::{AirQualityReport, PlaceQuery, PollutantDataset};
use crate::raster::{CogSampler, RasterSource};
use crate::timeseries::build_series;

pub struct AirQualityPipeline {
    resolver: Arc<dyn CoordinateResolver>,
    sampler: Arc<dyn RasterSource>,
    dataset: PollutantDataset,
    base_tiles: String,
    max_concurrency: usize,
}

impl AirQualityPipeline {
    pub fn new(
        resolver: Arc<dyn CoordinateResolver>,
        sampler: Arc<dyn RasterSource>,
        dataset: PollutantDataset,
        base_tiles: impl Into<String>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            resolver,
            sampler,
            dataset,
            base_tiles: base_tiles.into(),
            max_concurrency,
        }
    }

    /// Wire the HTTP-backed resolver and sampler from configuration
    pub fn from_config(config: &AirTrendConfig) -> Result<Self> {
        let resolver = SearchServerResolver::new(&config.geocoder)?;
        let sampler = CogSampler::new(&config.sampling)?;

        Ok(Self::new(
            Arc::new(resolver),
            Arc::new(sampler),
            config.dataset()?.clone(),
            config.map.base_tiles.clone(),
            config.sampling.max_concurrency,
        ))
    }

    #[must_use]
    pub fn dataset(&self) -> &PollutantDataset {
        &self.dataset
    }

    /// Run once for raw user input.
    ///
    /// Blank input is the idle state: `Ok(None)`, and nothing is requested.
    /// Failed years show up as gaps in the series; only a failed lookup is an
    /// error.
    #[instrument(skip(self), fields(dataset = %self.dataset.id))]
    pub async fn run(&self, input: &str) -> Result<Option<AirQualityReport>, ResolutionError> {
        let Some(place) = PlaceQuery::parse(input) else {
            debug!("Empty place name, nothing to do");
            return Ok(None);
        };

        let resolved = self.resolver.resolve(&place).await?;

        let series = build_series(
            self.sampler.as_ref(),
            &self.dataset,
            self.dataset.years(),
            resolved.point,
            self.max_concurrency,
        )
        .await;

        let report = AirQualityReport::new(
            place,
            &self.dataset,
            &self.base_tiles,
            resolved.position,
            series,
        );

        info!(
            "Report for '{}': {} of {} years sampled, {} above {} {}",
            report.place,
            report.series.present_count(),
            report.series.len(),
            report.exceedances().len(),
            report.threshold,
            report.units
        );

        Ok(Some(report))
    }
}
