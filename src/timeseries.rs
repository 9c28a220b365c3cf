//! Time series assembly
//!
//! Samples every year of a range for one point. Years are sampled with bounded
//! concurrency but collected in ascending order; a failed year becomes a gap
//! and never affects its siblings.

use std::ops::RangeInclusive;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::models::{CoordinatePair, Lv95, PollutantDataset, TimeSeries, YearSample};
use crate::raster::RasterSource;

/// Sample `years` at `point`; one entry per year, always
pub async fn build_series(
    source: &dyn RasterSource,
    dataset: &PollutantDataset,
    years: RangeInclusive<i32>,
    point: CoordinatePair<Lv95>,
    max_concurrency: usize,
) -> TimeSeries {
    let samples: Vec<YearSample> = stream::iter(years)
        .map(|year| async move {
            match source.sample(dataset, year, point).await {
                Ok(value) => {
                    debug!(year, value, "Year sampled");
                    YearSample::new(year, Some(value))
                }
                Err(e) => {
                    warn!(year, error = %e, "Sample failed, recording a gap");
                    YearSample::new(year, None)
                }
            }
        })
        // `buffered` keeps input order
        .buffered(max_concurrency.max(1))
        .collect()
        .await;

    let series = TimeSeries::from_ordered(samples);
    info!(
        "Assembled {} years for {} ({} with values)",
        series.len(),
        dataset.id,
        series.present_count()
    );
    series
}
