use std::io;
use thiserror::Error;

/// Errors surfaced by the map pipeline.
#[derive(Debug, Error)]
pub enum MapError {
    /// The geocoder knows no geometry for this place.
    #[error("No geometry found for: {place}")]
    NotFound { place: String },

    /// Malformed user input (arguments, coordinates, radius, form fields).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The buffer polygon contains no street network.
    #[error("No street network found within {buffer_km} km of {label}")]
    NoData { label: String, buffer_km: f64 },

    /// Geocoding or street download failed.
    #[error("Upstream service failure: {0:#}")]
    Upstream(#[source] anyhow::Error),

    /// The rasterisation backend failed.
    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl MapError {
    pub fn invalid(message: impl Into<String>) -> Self {
        MapError::InvalidParameter(message.into())
    }
}

pub type Result<T, E = MapError> = std::result::Result<T, E>;
