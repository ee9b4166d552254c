use postal_map::{LocationQuery, MapError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PLACE: &str = "Madrid, Spain";
pub const DEFAULT_LAT: f64 = 40.4168;
pub const DEFAULT_LON: f64 = -3.7038;

/// Which input the user filled in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Place,
    Coords,
}

/// Submitted map form. Numbers stay text here so bad input can be reported inline.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MapForm {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub lon: Option<String>,
}

fn parse_number(name: &str, value: Option<&str>) -> Result<f64, MapError> {
    let text = value.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(MapError::invalid(format!("{} is required", name)));
    }
    text.parse()
        .map_err(|_| MapError::invalid(format!("{} must be a number, got {:?}", name, text)))
}

impl MapForm {
    pub fn to_query(&self) -> Result<LocationQuery, MapError> {
        match self.mode {
            Mode::Place => {
                let place = self.place.as_deref().map(str::trim).unwrap_or_default();
                if place.is_empty() {
                    return Err(MapError::invalid("place name is empty"));
                }
                Ok(LocationQuery::Place(place.to_string()))
            }
            Mode::Coords => Ok(LocationQuery::Coordinates {
                lat: parse_number("latitude", self.lat.as_deref())?,
                lon: parse_number("longitude", self.lon.as_deref())?,
            }),
        }
    }

    /// Heading shown above the preview.
    pub fn caption(&self, query: &LocationQuery) -> String {
        match query {
            LocationQuery::Place(place) => format!("Map of {}", place),
            LocationQuery::Coordinates { lat, lon } => format!("Map at {}, {}", lat, lon),
        }
    }
}
