use crate::geometry::{from_geojson, lat_lon, Geometry, GeometryExt};
use anyhow::{anyhow, Result};
use serde::Deserialize;

/// Number of candidates requested per query.
pub const RESULT_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: Option<String>,
    lon: Option<String>,
    geojson: Option<serde_json::Value>,
    display_name: Option<String>,
}

impl SearchResult {
    fn geometry(&self) -> Result<Geometry> {
        if let Some(geojson) = &self.geojson {
            return from_geojson(geojson);
        }
        match (&self.lat, &self.lon) {
            (Some(lat), Some(lon)) => Ok(Geometry::Point(lat_lon(lat.parse()?, lon.parse()?))),
            _ => Err(anyhow!("Nominatim result without geometry")),
        }
    }
}

/// Query string for a free-form search.
pub fn search_params(query: &str) -> Vec<(&'static str, String)> {
    vec![
        ("q", query.to_string()),
        ("format", "json".to_string()),
        ("polygon_geojson", "1".to_string()),
        ("limit", RESULT_LIMIT.to_string()),
        ("dedupe", "0".to_string()),
    ]
}

/// Pick the geometry of a search response: the first (Multi)Polygon result,
/// otherwise the first result of any kind. Candidates whose geometry cannot
/// be read are skipped. `None` when nothing usable matched.
pub fn select_geometry(body: &str) -> Result<Option<Geometry>> {
    let results: Vec<SearchResult> = serde_json::from_str(body)?;
    let mut first = None;
    for result in &results {
        let geometry = match result.geometry() {
            Ok(geometry) => geometry,
            Err(e) => {
                debug!(
                    "Skipping Nominatim result {:?}: {}",
                    result.display_name.as_deref().unwrap_or(""),
                    e
                );
                continue;
            }
        };
        if geometry.is_areal() {
            debug!(
                "Nominatim selected {} for {:?}",
                geometry.kind(),
                result.display_name.as_deref().unwrap_or("")
            );
            return Ok(Some(geometry));
        }
        if first.is_none() {
            first = Some(geometry);
        }
    }
    Ok(first)
}
