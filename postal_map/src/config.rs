//! Pipeline configuration.
//!
//! Every knob of a map request lives in [`MapConfig`], which is passed to the
//! pipeline explicitly. It can be loaded from a JSON file; missing fields take
//! their defaults.

use crate::error::{MapError, Result};
use openstreetmap::{NetworkType, OsmSettings};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "POSTAL_MAP_CONFIG";

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "postal_map.json";

/// An opaque RGB colour, written as `#rrggbb` or a basic colour name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const WHITE: Color = Color([255, 255, 255]);
    pub const BLACK: Color = Color([0, 0, 0]);
    pub const GRAY: Color = Color([128, 128, 128]);
}

impl FromStr for Color {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(Color::WHITE),
            "black" => Ok(Color::BLACK),
            "gray" | "grey" => Ok(Color::GRAY),
            hex if hex.len() == 7 && hex.starts_with('#') => {
                let channel = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 2], 16)
                        .map_err(|_| MapError::invalid(format!("Bad colour: {}", s)))
                };
                Ok(Color([channel(1)?, channel(3)?, channel(5)?]))
            }
            _ => Err(MapError::invalid(format!("Bad colour: {}", s))),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = MapError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

/// Drawing style of the street plot. Widths and sizes are in points.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    pub background: Color,
    pub edge_color: Color,
    pub edge_width_pt: f64,
    /// Node marker diameter; 0 hides nodes.
    pub node_size: f64,
    pub node_color: Color,
    /// Width of the border around the plot axes.
    pub frame_width_pt: f64,
    pub label_font_pt: f64,
    pub label_color: Color,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            edge_color: Color::GRAY,
            edge_width_pt: 0.5,
            node_size: 0.0,
            node_color: Color::WHITE,
            frame_width_pt: 2.0,
            label_font_pt: 12.0,
            label_color: Color::BLACK,
        }
    }
}

/// Output geometry of the rendered figure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FigureSpec {
    /// Side of the square figure, in inches.
    pub size_in: f64,
    pub dpi: f64,
    /// Padding kept around the axes when cropping to the tight bounding box.
    pub pad_inches: f64,
}

impl Default for FigureSpec {
    fn default() -> Self {
        Self {
            size_in: 8.0,
            dpi: 300.0,
            pad_inches: 0.1,
        }
    }
}

impl FigureSpec {
    /// Convert a length in points to whole pixels, at least one.
    pub fn pt_to_px(&self, pt: f64) -> u32 {
        ((pt * self.dpi / 72.0).round() as u32).max(1)
    }

    pub fn side_px(&self) -> u32 {
        (self.size_in * self.dpi).round() as u32
    }

    pub fn pad_px(&self) -> u32 {
        (self.pad_inches * self.dpi).round() as u32
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Radius of the mapped area around the centre point.
    pub buffer_km: f64,
    pub network_type: NetworkType,
    pub use_cache: bool,
    pub cache_dir: PathBuf,
    /// Verbose stage-by-stage logging.
    pub debug: bool,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub nominatim_url: String,
    pub overpass_url: String,
    pub margin_px: u32,
    pub font_path: PathBuf,
    pub caption_font_px: f32,
    pub style: RenderStyle,
    pub figure: FigureSpec,
    /// Address of the interactive web UI.
    pub bind_address: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        let osm = OsmSettings::default();
        Self {
            buffer_km: 5.0,
            network_type: NetworkType::All,
            use_cache: true,
            cache_dir: PathBuf::from("cache"),
            debug: true,
            timeout_secs: osm.timeout_secs,
            user_agent: osm.user_agent,
            nominatim_url: osm.nominatim_url,
            overpass_url: osm.overpass_url,
            margin_px: 50,
            font_path: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"),
            caption_font_px: 24.0,
            style: RenderStyle::default(),
            figure: FigureSpec::default(),
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

impl MapConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| MapError::invalid(format!("Bad configuration: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Load the configuration named by `POSTAL_MAP_CONFIG`, else
    /// `postal_map.json` when it exists, else the defaults.
    pub fn load() -> Result<Self> {
        let config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.buffer_km.is_finite() || self.buffer_km <= 0.0 {
            return Err(MapError::invalid(format!(
                "buffer_km must be positive, got {}",
                self.buffer_km
            )));
        }
        if !(self.figure.dpi > 0.0 && self.figure.size_in > 0.0 && self.figure.pad_inches >= 0.0) {
            return Err(MapError::invalid("figure size, dpi and padding must be positive"));
        }
        if self.figure.side_px() == 0 {
            return Err(MapError::invalid("figure is smaller than one pixel"));
        }
        Ok(())
    }

    /// Settings for the OpenStreetMap client.
    pub fn osm_settings(&self) -> OsmSettings {
        OsmSettings {
            nominatim_url: self.nominatim_url.clone(),
            overpass_url: self.overpass_url.clone(),
            user_agent: self.user_agent.clone(),
            timeout_secs: self.timeout_secs,
            cache_dir: self.use_cache.then(|| self.cache_dir.clone()),
        }
    }

    /// Default log filter for the binaries.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MapConfig::default();
        assert_eq!(config.buffer_km, 5.0);
        assert_eq!(config.margin_px, 50);
        assert_eq!(config.network_type, NetworkType::All);
        assert_eq!(config.figure.side_px(), 2400);
        assert_eq!(config.figure.pad_px(), 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = MapConfig::from_json(
            r##"{"buffer_km": 2.5, "use_cache": false, "style": {"edge_color": "#102030"}}"##,
        )
        .unwrap();
        assert_eq!(config.buffer_km, 2.5);
        assert_eq!(config.style.edge_color, Color([0x10, 0x20, 0x30]));
        assert_eq!(config.style.background, Color::WHITE);
        assert!(config.osm_settings().cache_dir.is_none());
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(MapConfig::from_json(r#"{"style": {"edge_color": "teal-ish"}}"#).is_err());
        let config = MapConfig {
            buffer_km: 0.0,
            ..MapConfig::default()
        };
        assert!(matches!(config.validate(), Err(MapError::InvalidParameter(_))));
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!("grey".parse::<Color>().unwrap(), Color::GRAY);
        assert_eq!("#FFFFFF".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!(Color([1, 2, 255]).to_string(), "#0102ff");
        assert!("#12345".parse::<Color>().is_err());
    }

    #[test]
    fn test_pt_to_px() {
        let figure = FigureSpec::default();
        assert_eq!(figure.pt_to_px(0.5), 2);
        assert_eq!(figure.pt_to_px(2.0), 8);
        assert_eq!(figure.pt_to_px(0.0), 1);
    }
}
