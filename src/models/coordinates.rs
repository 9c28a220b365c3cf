//! Projected and geographic coordinates
//!
//! A [`CoordinatePair`] is tagged with its spatial reference at the type level,
//! so a point resolved in one projection cannot be handed to a sampler that
//! expects another.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// A projected coordinate reference system identified by its EPSG code
pub trait SpatialReference: Copy + Send + Sync + 'static {
    /// EPSG code of the projection
    const EPSG: u32;
    /// Short human-readable name
    const NAME: &'static str;
}

/// Swiss CH1903+ / LV95 (EPSG:2056)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lv95;

impl SpatialReference for Lv95 {
    const EPSG: u32 = 2056;
    const NAME: &'static str = "CH1903+ / LV95";
}

/// Easting/northing in the projection `C`
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CoordinatePair<C: SpatialReference> {
    easting: f64,
    northing: f64,
    #[serde(skip)]
    crs: PhantomData<C>,
}

impl<C: SpatialReference> CoordinatePair<C> {
    #[must_use]
    pub fn new(easting: f64, northing: f64) -> Self {
        Self {
            easting,
            northing,
            crs: PhantomData,
        }
    }

    #[must_use]
    pub fn easting(&self) -> f64 {
        self.easting
    }

    #[must_use]
    pub fn northing(&self) -> f64 {
        self.northing
    }

    /// EPSG code the coordinates are expressed in
    #[must_use]
    pub fn epsg(&self) -> u32 {
        C::EPSG
    }
}

// Manual impls: derives would require `C: Clone` etc. on the marker only.
impl<C: SpatialReference> Clone for CoordinatePair<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: SpatialReference> Copy for CoordinatePair<C> {}

impl<C: SpatialReference> PartialEq for CoordinatePair<C> {
    fn eq(&self, other: &Self) -> bool {
        self.easting == other.easting && self.northing == other.northing
    }
}

impl<C: SpatialReference> fmt::Debug for CoordinatePair<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatePair")
            .field("epsg", &C::EPSG)
            .field("easting", &self.easting)
            .field("northing", &self.northing)
            .finish()
    }
}

impl<C: SpatialReference> fmt::Display for CoordinatePair<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "E {:.1} / N {:.1} (EPSG:{})",
            self.easting,
            self.northing,
            C::EPSG
        )
    }
}

/// Geographic position used for map display
///
/// The geocoding response may omit `lat`/`lon`; that is modelled as
/// [`GeoPosition::Unresolved`] rather than a missing value further down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GeoPosition {
    Resolved { latitude: f64, longitude: f64 },
    Unresolved,
}

impl GeoPosition {
    /// Build from optional response fields; both must be present
    #[must_use]
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Self {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Self::Resolved {
                latitude,
                longitude,
            },
            _ => Self::Unresolved,
        }
    }

    #[must_use]
    pub fn lat_lon(&self) -> Option<(f64, f64)> {
        match *self {
            Self::Resolved {
                latitude,
                longitude,
            } => Some((latitude, longitude)),
            Self::Unresolved => None,
        }
    }

    /// Format position as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        match self.lat_lon() {
            Some((lat, lon)) => format!("{lat:.4}, {lon:.4}"),
            None => "unresolved".to_string(),
        }
    }
}
