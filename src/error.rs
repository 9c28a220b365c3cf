//! Error types and handling for `AirTrend`

use thiserror::Error;

/// Failure to turn a place name into coordinates. Fatal to a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    /// The search service answered but had no usable match
    #[error("Place not found: {place}")]
    NotFound { place: String },

    /// The search service could not be reached or answered with an error
    #[error("Geocoding service error: {message}")]
    TransportError { message: String },
}

impl ResolutionError {
    pub fn not_found<S: Into<String>>(place: S) -> Self {
        Self::NotFound {
            place: place.into(),
        }
    }

    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::TransportError {
            message: message.into(),
        }
    }

    /// Whether trying again later may help
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportError { .. })
    }
}

/// Failure to read one year's value. Recovered per year as an absent sample.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    /// Raster not published for that year, or not reachable
    #[error("Raster unavailable at {url}: {reason}")]
    ResourceUnavailable { url: String, reason: String },

    /// Point lies outside the raster grid
    #[error("Point ({easting:.1}, {northing:.1}) lies outside the raster extent")]
    OutOfExtent { easting: f64, northing: f64 },

    /// The covering cell holds the no-data marker
    #[error("No data at the requested point")]
    NoData,

    /// Raster is georeferenced in another projection
    #[error("Raster uses EPSG:{found}, expected EPSG:{expected}")]
    CrsMismatch { expected: u32, found: u32 },

    /// Raster could not be decoded
    #[error("Invalid raster: {message}")]
    Format { message: String },
}

impl SampleError {
    pub fn unavailable<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        Self::ResourceUnavailable {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn format<S: Into<String>>(message: S) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Classify a decoder error for the raster at `url`; I/O failures come
    /// from the transport underneath the decoder.
    pub fn from_tiff(err: tiff::TiffError, url: &str) -> Self {
        match err {
            tiff::TiffError::IoError(io) => match io.get_ref().and_then(|e| e.downcast_ref::<Self>()) {
                Some(inner) => inner.clone(),
                None => Self::unavailable(url, io.to_string()),
            },
            other => Self::format(other.to_string()),
        }
    }
}

/// Main error type for the `AirTrend` application
#[derive(Error, Debug)]
pub enum AirTrendError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Place could not be resolved
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AirTrendError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            AirTrendError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            AirTrendError::Validation { message } => format!("Invalid input: {message}"),
            AirTrendError::Resolution(ResolutionError::NotFound { place }) => {
                format!("Place not found: {place}. Please check the spelling.")
            }
            AirTrendError::Resolution(ResolutionError::TransportError { .. }) => {
                "Unable to reach the geocoding service. Please try again later.".to_string()
            }
            AirTrendError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
