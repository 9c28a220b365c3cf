//! Values handed to the presentation boundary

use serde::Serialize;

use super::{GeoPosition, PlaceQuery, PollutantDataset, TimeSeries};

/// Default zoom level for the map centered on a municipality
pub const DEFAULT_MAP_ZOOM: u8 = 12;

/// Map layers and marker for one report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    /// Base tile layer template (`{z}`/`{x}`/`{y}`)
    pub base_tiles: String,
    /// Pollutant overlay tile layer template
    pub overlay_tiles: String,
    /// Marker and map center
    pub marker: GeoPosition,
    pub zoom: u8,
}

/// Everything a chart plus map view needs for one place
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirQualityReport {
    pub place: PlaceQuery,
    pub dataset: String,
    pub units: String,
    /// Horizontal reference line for the chart
    pub threshold: f64,
    pub position: GeoPosition,
    pub series: TimeSeries,
    pub map: MapView,
}

impl AirQualityReport {
    #[must_use]
    pub fn new(
        place: PlaceQuery,
        dataset: &PollutantDataset,
        base_tiles: &str,
        position: GeoPosition,
        series: TimeSeries,
    ) -> Self {
        Self {
            place,
            dataset: dataset.name.clone(),
            units: dataset.units.clone(),
            threshold: dataset.threshold,
            position,
            series,
            map: MapView {
                base_tiles: base_tiles.to_string(),
                overlay_tiles: dataset.overlay_tiles.clone(),
                marker: position,
                zoom: DEFAULT_MAP_ZOOM,
            },
        }
    }

    /// Years above the regulatory threshold
    #[must_use]
    pub fn exceedances(&self) -> Vec<i32> {
        self.series.years_above(self.threshold)
    }
}
