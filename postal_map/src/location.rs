use crate::error::{MapError, Result};
use openstreetmap::{lat_lon, Geocoder, GeometryExt, LatLon, Point};
use std::fmt;

/// What the user asked to map.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Place(String),
    Coordinates { lat: f64, lon: f64 },
}

/// The centre of the map, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePoint(Point);

impl ReferencePoint {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(MapError::invalid(format!("latitude out of range: {}", lat)));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(MapError::invalid(format!("longitude out of range: {}", lon)));
        }
        Ok(Self(lat_lon(lat, lon)))
    }

    pub fn lat(&self) -> f64 {
        self.0.lat()
    }

    pub fn lon(&self) -> f64 {
        self.0.lon()
    }

    pub fn point(&self) -> Point {
        self.0
    }
}

impl fmt::Display for ReferencePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POINT ({} {})", self.0.lon(), self.0.lat())
    }
}

/// Caption text of the map; never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLabel(String);

impl DisplayLabel {
    pub fn for_place(name: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(MapError::invalid("place name is empty"));
        }
        Ok(Self(name.to_string()))
    }

    pub fn for_coordinates(lat: f64, lon: f64) -> Self {
        Self(format!("{:.4}, {:.4}", lat, lon))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub point: ReferencePoint,
    pub label: DisplayLabel,
}

/// Turn a query into a centre point and its label.
///
/// Coordinates are taken as given with no network call; a place name is
/// geocoded and reduced to the representative point of its geometry.
pub async fn resolve(query: &LocationQuery, geocoder: &dyn Geocoder) -> Result<ResolvedLocation> {
    match query {
        LocationQuery::Coordinates { lat, lon } => {
            let point = ReferencePoint::new(*lat, *lon)?;
            debug!("Using coordinates: {}", point);
            Ok(ResolvedLocation {
                point,
                label: DisplayLabel::for_coordinates(*lat, *lon),
            })
        }
        LocationQuery::Place(name) => {
            let label = DisplayLabel::for_place(name)?;
            debug!("Geocoding place: {}", name);
            let geometry = geocoder
                .geocode(name)
                .await
                .map_err(MapError::Upstream)?
                .ok_or_else(|| MapError::NotFound { place: name.clone() })?;
            let center = geometry.representative_point().ok_or_else(|| {
                MapError::Upstream(anyhow::anyhow!("empty {} geometry for {}", geometry.kind(), name))
            })?;
            let point = ReferencePoint::new(center.lat(), center.lon())?;
            debug!("Geographic centre ({}): {}", geometry.kind(), point);
            Ok(ResolvedLocation { point, label })
        }
    }
}

/// Parse a `"lat,lon"` argument: exactly two comma separated numbers.
pub fn parse_coordinates(text: &str) -> Result<(f64, f64)> {
    let bad = || MapError::invalid("coordinates must be <latitude>,<longitude>");
    let mut parts = text.split(',');
    let (lat, lon) = match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lon), None) => (lat.trim(), lon.trim()),
        _ => return Err(bad()),
    };
    let lat: f64 = lat.parse().map_err(|_| bad())?;
    let lon: f64 = lon.parse().map_err(|_| bad())?;
    Ok((lat, lon))
}
