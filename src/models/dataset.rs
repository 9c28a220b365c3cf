//! Pollutant raster product families

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the four-digit year in resource URLs
pub const YEAR_PLACEHOLDER: &str = "{year}";

/// One raster product family: where its yearly rasters live, which years are
/// published and what limit the measurements are compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantDataset {
    /// Identifier, filled from the configuration key
    #[serde(default)]
    pub id: String,
    /// Display name, e.g. "Sulfur dioxide (SO₂)"
    pub name: String,
    /// Resource URL with a `{year}` placeholder
    pub url_template: String,
    /// First published year (inclusive)
    pub first_year: i32,
    /// Last published year (inclusive)
    pub last_year: i32,
    /// Regulatory annual limit in `units`
    pub threshold: f64,
    /// Unit of the raster values
    pub units: String,
    /// Overlay tile layer template with `{z}`, `{x}`, `{y}`
    pub overlay_tiles: String,
}

impl PollutantDataset {
    /// Sulfur dioxide annual mean, Swiss national grid
    #[must_use]
    pub fn sulfur_dioxide() -> Self {
        Self {
            id: "so2".to_string(),
            name: "Sulfur dioxide (SO₂)".to_string(),
            url_template: "https://data.geo.admin.ch/ch.bafu.luftreinhaltung-schwefeldioxid/luftreinhaltung-schwefeldioxid_{year}/luftreinhaltung-schwefeldioxid_{year}_2056.tif".to_string(),
            first_year: 1980,
            last_year: 1984,
            threshold: 30.0,
            units: "µg/m³".to_string(),
            overlay_tiles: "https://wmts.geo.admin.ch/1.0.0/ch.bafu.luftreinhaltung-schwefeldioxid/default/current/3857/{z}/{x}/{y}.png".to_string(),
        }
    }

    /// Nitrogen dioxide annual mean, Swiss national grid
    #[must_use]
    pub fn nitrogen_dioxide() -> Self {
        Self {
            id: "no2".to_string(),
            name: "Nitrogen dioxide (NO₂)".to_string(),
            url_template: "https://data.geo.admin.ch/ch.bafu.luftreinhaltung-stickstoffdioxid/luftreinhaltung-stickstoffdioxid_{year}/luftreinhaltung-stickstoffdioxid_{year}_2056.tif".to_string(),
            first_year: 2019,
            last_year: 2023,
            threshold: 30.0,
            units: "µg/m³".to_string(),
            overlay_tiles: "https://wmts.geo.admin.ch/1.0.0/ch.bafu.luftreinhaltung-stickstoffdioxid/default/current/3857/{z}/{x}/{y}.png".to_string(),
        }
    }

    /// Published years, ascending
    #[must_use]
    pub fn years(&self) -> RangeInclusive<i32> {
        self.first_year..=self.last_year
    }

    #[must_use]
    pub fn covers(&self, year: i32) -> bool {
        self.years().contains(&year)
    }

    /// Resource locator for one year
    #[must_use]
    pub fn resource_url(&self, year: i32) -> String {
        self.url_template
            .replace(YEAR_PLACEHOLDER, &format!("{year:04}"))
    }
}
