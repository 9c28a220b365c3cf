//! Location Resolution Module
//!
//! Turns a place name into a projected coordinate pair for raster sampling and
//! a geographic position for the map, using one search-by-name request.

use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::{AxisOrder, GeocoderConfig};
use crate::error::ResolutionError;
use crate::models::{CoordinatePair, GeoPosition, Lv95, PlaceQuery};

/// Both coordinate forms of one matched location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPlace {
    pub point: CoordinatePair<Lv95>,
    pub position: GeoPosition,
}

/// Resolves place names to coordinates
#[async_trait]
pub trait CoordinateResolver: Send + Sync {
    async fn resolve(&self, place: &PlaceQuery) -> Result<ResolvedPlace, ResolutionError>;
}

/// Search service response
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub attrs: SearchAttrs,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchAttrs {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub label: Option<String>,
}

impl SearchResponse {
    /// Take the first result; both coordinate forms come from that one object.
    pub fn first_match(
        self,
        place: &PlaceQuery,
        axis_order: AxisOrder,
    ) -> Result<ResolvedPlace, ResolutionError> {
        let Some(first) = self.results.into_iter().next() else {
            return Err(ResolutionError::not_found(place.as_str()));
        };
        let attrs = first.attrs;

        let (easting, northing) = match axis_order {
            AxisOrder::EastingNorthing => (attrs.x, attrs.y),
            AxisOrder::NorthingEasting => (attrs.y, attrs.x),
        };

        let (Some(easting), Some(northing)) = (easting, northing) else {
            warn!(
                "First result for '{}' has no projected coordinates",
                place
            );
            return Err(ResolutionError::not_found(place.as_str()));
        };

        debug!(
            "Matched '{}' to {:?}",
            place,
            attrs.label.as_deref().unwrap_or("unlabelled result")
        );

        Ok(ResolvedPlace {
            point: CoordinatePair::new(easting, northing),
            position: GeoPosition::from_parts(attrs.lat, attrs.lon),
        })
    }
}

/// Client for a geo.admin.ch style `SearchServer` endpoint
pub struct SearchServerResolver {
    client: Client,
    base_url: String,
    spatial_reference: u32,
    axis_order: AxisOrder,
}

impl SearchServerResolver {
    /// Create a new resolver
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("AirTrend/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            spatial_reference: config.spatial_reference,
            axis_order: config.axis_order,
        })
    }

    /// Request URL for a place
    #[must_use]
    pub fn search_url(&self, place: &PlaceQuery) -> String {
        format!(
            "{}?searchText={}&type=locations&sr={}",
            self.base_url,
            urlencoding::encode(place.as_str()),
            self.spatial_reference
        )
    }
}

#[async_trait]
impl CoordinateResolver for SearchServerResolver {
    #[instrument(skip(self), fields(place = %place))]
    async fn resolve(&self, place: &PlaceQuery) -> Result<ResolvedPlace, ResolutionError> {
        info!("Geocoding place: '{}'", place);
        let start_time = Instant::now();

        let url = self.search_url(place);
        debug!("Search request URL: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolutionError::transport(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Search service answered HTTP {}", status);
            return Err(ResolutionError::transport(format!(
                "search service answered HTTP {status}"
            )));
        }

        let search_response: SearchResponse = response
            .json()
            .await
            .map_err(|e| ResolutionError::transport(format!("invalid search response: {e}")))?;

        let result_count = search_response.results.len();
        let resolved = search_response.first_match(place, self.axis_order)?;

        info!(
            "Resolved '{}' to {} ({}) from {} results in {:.3}s",
            place,
            resolved.point,
            resolved.position.format_coordinates(),
            result_count,
            start_time.elapsed().as_secs_f64()
        );

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn place(name: &str) -> PlaceQuery {
        PlaceQuery::parse(name).unwrap()
    }

    fn response(value: serde_json::Value) -> SearchResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_first_result_wins() {
        let response = response(json!({
            "results": [
                { "attrs": { "x": 1200000.0, "y": 2600000.0, "lat": 47.0, "lon": 8.3, "label": "<b>Luzern</b>" } },
                { "attrs": { "x": 1100000.0, "y": 2500000.0, "lat": 46.0, "lon": 7.0 } }
            ]
        }));

        let resolved = response
            .first_match(&place("Luzern"), AxisOrder::NorthingEasting)
            .unwrap();
        assert_eq!(resolved.point.easting(), 2_600_000.0);
        assert_eq!(resolved.point.northing(), 1_200_000.0);
        assert_eq!(resolved.position.lat_lon(), Some((47.0, 8.3)));
    }

    #[test]
    fn test_easting_northing_axis_order() {
        let response = response(json!({
            "results": [ { "attrs": { "x": 2600000.0, "y": 1200000.0, "lat": 47.0, "lon": 8.3 } } ]
        }));

        let resolved = response
            .first_match(&place("Luzern"), AxisOrder::EastingNorthing)
            .unwrap();
        assert_eq!(resolved.point, CoordinatePair::new(2_600_000.0, 1_200_000.0));
    }

    #[test]
    fn test_zero_results_is_not_found() {
        let err = response(json!({ "results": [] }))
            .first_match(&place("Nonexistentville"), AxisOrder::NorthingEasting)
            .unwrap_err();
        assert_eq!(err, ResolutionError::not_found("Nonexistentville"));

        let err = response(json!({}))
            .first_match(&place("Nonexistentville"), AxisOrder::NorthingEasting)
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NotFound { .. }));
    }

    #[test]
    fn test_missing_projected_coordinates_is_not_found() {
        let err = response(json!({ "results": [ { "attrs": { "x": 1200000.0, "lat": 47.0, "lon": 8.3 } } ] }))
            .first_match(&place("Halfway"), AxisOrder::NorthingEasting)
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NotFound { .. }));
    }

    #[test]
    fn test_missing_geographic_coordinates_is_unresolved() {
        let resolved = response(json!({ "results": [ { "attrs": { "x": 1200000.0, "y": 2600000.0 } } ] }))
            .first_match(&place("Nowhere"), AxisOrder::NorthingEasting)
            .unwrap();
        assert_eq!(resolved.position, GeoPosition::Unresolved);
    }

    #[test]
    fn test_search_url_encodes_place_verbatim() {
        let resolver = SearchServerResolver::new(&GeocoderConfig::default()).unwrap();
        assert_eq!(
            resolver.search_url(&place("  Zürich Höngg ")),
            "https://api3.geo.admin.ch/rest/services/api/SearchServer?searchText=Z%C3%BCrich%20H%C3%B6ngg&type=locations&sr=2056"
        );
    }

    #[test]
    fn test_search_url_uses_configured_reference() {
        let config = GeocoderConfig {
            base_url: "http://localhost:9000/search".to_string(),
            spatial_reference: 21781,
            ..GeocoderConfig::default()
        };
        let resolver = SearchServerResolver::new(&config).unwrap();
        assert_eq!(
            resolver.search_url(&place("Bern")),
            "http://localhost:9000/search?searchText=Bern&type=locations&sr=21781"
        );
    }
}
