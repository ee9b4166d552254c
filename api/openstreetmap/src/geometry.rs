//! Geographic geometry on top of `geo`, in degrees (x = longitude, y = latitude).

use anyhow::{anyhow, Result};
use geo::{BoundingRect, Centroid, Coord};
use serde::Deserialize;
use std::f64::consts::FRAC_PI_2;

pub use geo::{Geometry, LineString, MultiLineString, MultiPolygon, Point, Polygon};

/// Number of segments used to approximate a quarter circle when buffering.
pub const QUAD_SEGMENTS: usize = 16;

/// Build a point from latitude and longitude, in that order.
pub fn lat_lon(lat: f64, lon: f64) -> Point {
    Point::new(lon, lat)
}

/// Latitude/longitude accessors for `geo` points.
pub trait LatLon {
    fn lat(&self) -> f64;
    fn lon(&self) -> f64;
}

impl LatLon for Point {
    fn lat(&self) -> f64 {
        self.y()
    }

    fn lon(&self) -> f64 {
        self.x()
    }
}

/// Dilate `center` by `radius` degrees into a regular polygon.
///
/// The buffer is computed in degree space: no latitude correction is
/// applied, so the shape is a circle on a plate carrée map only.
pub fn buffer(center: Point, radius: f64) -> Polygon {
    let steps = QUAD_SEGMENTS * 4;
    let ring: Vec<Coord> = (0..steps)
        .map(|i| {
            let angle = i as f64 * FRAC_PI_2 / QUAD_SEGMENTS as f64;
            Coord {
                x: center.x() + radius * angle.cos(),
                y: center.y() + radius * angle.sin(),
            }
        })
        .collect();
    // Polygon::new closes the ring.
    Polygon::new(LineString::from(ring), Vec::new())
}

/// Bounding box as (min_lat, min_lon, max_lat, max_lon); `None` for an empty polygon.
pub fn bounds(polygon: &Polygon) -> Option<(f64, f64, f64, f64)> {
    let rect = polygon.bounding_rect()?;
    Some((rect.min().y, rect.min().x, rect.max().y, rect.max().x))
}

/// Geocoder-facing helpers over `geo::Geometry`.
pub trait GeometryExt {
    fn kind(&self) -> &'static str;
    fn is_areal(&self) -> bool;
    /// A single point standing in for the whole geometry (its centroid).
    fn representative_point(&self) -> Option<Point>;
}

impl GeometryExt for Geometry {
    fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            _ => "Geometry",
        }
    }

    fn is_areal(&self) -> bool {
        matches!(self, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
    }

    fn representative_point(&self) -> Option<Point> {
        match self {
            Geometry::Point(p) => Some(*p),
            Geometry::LineString(line) => line.centroid(),
            Geometry::MultiLineString(lines) => lines.centroid(),
            Geometry::Polygon(polygon) => polygon.centroid(),
            Geometry::MultiPolygon(parts) => parts.centroid(),
            other => other.centroid(),
        }
    }
}

/// Parse a GeoJSON geometry object (`{"type": ..., "coordinates": ...}`).
pub fn from_geojson(value: &serde_json::Value) -> Result<Geometry> {
    let raw: RawGeometry = serde_json::from_value(value.clone())?;
    raw.try_into()
}

#[derive(Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum RawGeometry {
    Point(Vec<f64>),
    LineString(Vec<Vec<f64>>),
    MultiLineString(Vec<Vec<Vec<f64>>>),
    Polygon(Vec<Vec<Vec<f64>>>),
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
}

impl TryFrom<RawGeometry> for Geometry {
    type Error = anyhow::Error;

    fn try_from(raw: RawGeometry) -> Result<Self> {
        Ok(match raw {
            RawGeometry::Point(p) => Geometry::Point(Point::from(position(&p)?)),
            RawGeometry::LineString(line) => Geometry::LineString(line_string(&line)?),
            RawGeometry::MultiLineString(lines) => Geometry::MultiLineString(MultiLineString::new(
                lines.iter().map(|l| line_string(l)).collect::<Result<_>>()?,
            )),
            RawGeometry::Polygon(rings) => Geometry::Polygon(polygon(&rings)?),
            RawGeometry::MultiPolygon(parts) => Geometry::MultiPolygon(MultiPolygon::new(
                parts.iter().map(|rings| polygon(rings)).collect::<Result<_>>()?,
            )),
        })
    }
}

fn position(coords: &[f64]) -> Result<Coord> {
    match coords {
        [lon, lat, ..] => Ok(Coord { x: *lon, y: *lat }),
        _ => Err(anyhow!("GeoJSON position needs at least two values, got {}", coords.len())),
    }
}

fn line_string(coords: &[Vec<f64>]) -> Result<LineString> {
    coords
        .iter()
        .map(|c| position(c))
        .collect::<Result<Vec<_>>>()
        .map(LineString::from)
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon> {
    let mut rings = rings.iter().map(|r| line_string(r));
    let exterior = rings
        .next()
        .ok_or_else(|| anyhow!("GeoJSON polygon without exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}
