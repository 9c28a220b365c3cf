//! Raster point sampling
//!
//! A [`RasterSource`] answers "what is the value of this dataset at this point
//! in this year". [`CogSampler`] does so by opening the year's cloud-optimized
//! GeoTIFF over HTTP and reading the one chunk that covers the point.

pub mod geotiff;
pub mod range_reader;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tokio::runtime::Handle;
use tokio::task;
use tracing::{debug, instrument};

use crate::config::SamplingConfig;
use crate::error::SampleError;
use crate::models::{CoordinatePair, Lv95, PollutantDataset};

pub use geotiff::{GeoRaster, GeoTransform};
pub use range_reader::HttpRangeReader;

/// Reads one scalar per (dataset, year, point)
#[async_trait]
pub trait RasterSource: Send + Sync {
    async fn sample(
        &self,
        dataset: &PollutantDataset,
        year: i32,
        point: CoordinatePair<Lv95>,
    ) -> Result<f64, SampleError>;
}

/// Samples remote cloud-optimized GeoTIFFs through range requests
pub struct CogSampler {
    client: Client,
    timeout: Duration,
}

impl CogSampler {
    /// Create a new sampler
    pub fn new(config: &SamplingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("AirTrend/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        Ok(Self {
            client,
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl RasterSource for CogSampler {
    #[instrument(skip(self, dataset), fields(dataset = %dataset.id))]
    async fn sample(
        &self,
        dataset: &PollutantDataset,
        year: i32,
        point: CoordinatePair<Lv95>,
    ) -> Result<f64, SampleError> {
        let url = dataset.resource_url(year);

        if !dataset.covers(year) {
            return Err(SampleError::unavailable(
                url,
                format!(
                    "{year} is outside the published years {}-{}",
                    dataset.first_year, dataset.last_year
                ),
            ));
        }

        let client = self.client.clone();
        let runtime = Handle::current();
        let task_url = url.clone();

        // The decoder is synchronous; run it where blocking is allowed.
        let read = task::spawn_blocking(move || {
            let reader = HttpRangeReader::open(client, &task_url, runtime)?;
            let mut raster = GeoRaster::open(reader, &task_url)?;
            raster.sample(point)
        });

        let value = match tokio::time::timeout(self.timeout, read).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => {
                return Err(SampleError::unavailable(
                    url,
                    format!("sampling task failed: {join_error}"),
                ));
            }
            Err(_) => {
                return Err(SampleError::unavailable(
                    url,
                    format!("timed out after {}s", self.timeout.as_secs()),
                ));
            }
        };

        debug!(year, value, "Sampled {}", point);
        Ok(value)
    }
}
