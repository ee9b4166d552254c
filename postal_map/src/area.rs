use crate::error::{MapError, Result};
use crate::location::ReferencePoint;
use openstreetmap::Polygon;

/// Kilometres per degree, taken at the equator for both axes.
pub const KM_PER_DEGREE: f64 = 111.0;

/// The circular region to map around the reference point.
#[derive(Debug, Clone)]
pub struct Area {
    pub polygon: Polygon,
    pub radius_deg: f64,
    pub buffer_km: f64,
}

/// Convert a radius in kilometres to the approximate degree radius.
pub fn km_to_degrees(buffer_km: f64) -> f64 {
    buffer_km / KM_PER_DEGREE
}

/// Buffer `point` by `buffer_km` kilometres in degree space.
///
/// The conversion ignores the shrinking of longitude degrees away from the
/// equator, so the area is an ellipse on the ground at higher latitudes.
pub fn build_area(point: &ReferencePoint, buffer_km: f64) -> Result<Area> {
    if !buffer_km.is_finite() || buffer_km <= 0.0 {
        return Err(MapError::invalid(format!(
            "buffer radius must be a positive number of km, got {}",
            buffer_km
        )));
    }
    let radius_deg = km_to_degrees(buffer_km);
    let polygon = openstreetmap::buffer(point.point(), radius_deg);
    debug!("Buffer of {} km (~{:.4} degrees)", buffer_km, radius_deg);
    Ok(Area {
        polygon,
        radius_deg,
        buffer_km,
    })
}
