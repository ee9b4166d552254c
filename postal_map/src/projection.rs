//! UTM projection of the street graph.
//!
//! The graph is moved from degrees to metres in the Universal Transverse
//! Mercator zone containing its mean longitude, so lengths and angles are
//! preserved well enough for a pixel-accurate drawing.

use openstreetmap::{LatLon, StreetGraph};
use std::collections::HashMap;
use std::fmt;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const SCALE_FACTOR: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    pub number: u8,
    pub north: bool,
}

impl UtmZone {
    pub fn containing(lat: f64, lon: f64) -> Self {
        let number = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8;
        Self {
            number,
            north: lat >= 0.0,
        }
    }

    pub fn central_meridian(&self) -> f64 {
        (self.number as f64 - 1.0) * 6.0 - 180.0 + 3.0
    }

    /// Project a geographic coordinate to (easting, northing) in metres.
    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);

        let phi = lat.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * (lon - self.central_meridian()).to_radians();

        let m = WGS84_A
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

        let easting = SCALE_FACTOR
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
            + FALSE_EASTING;
        let mut northing = SCALE_FACTOR
            * (m + n
                * tan_phi
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
        if !self.north {
            northing += FALSE_NORTHING_SOUTH;
        }
        (easting, northing)
    }
}

impl fmt::Display for UtmZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UTM zone {}{}", self.number, if self.north { "N" } else { "S" })
    }
}

/// Planar extent in projected metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Street graph in projected metres; edges index into `points`.
#[derive(Debug, Clone)]
pub struct ProjectedGraph {
    pub zone: UtmZone,
    pub points: Vec<(f64, f64)>,
    pub edges: Vec<(usize, usize)>,
}

impl ProjectedGraph {
    pub fn bounds(&self) -> Option<Bounds> {
        let (first, rest) = self.points.split_first()?;
        let init = Bounds {
            min_x: first.0,
            min_y: first.1,
            max_x: first.0,
            max_y: first.1,
        };
        Some(rest.iter().fold(init, |b, &(x, y)| Bounds {
            min_x: b.min_x.min(x),
            min_y: b.min_y.min(y),
            max_x: b.max_x.max(x),
            max_y: b.max_y.max(y),
        }))
    }
}

/// Project every node of `graph` into the UTM zone of its mean position.
pub fn project_graph(graph: &StreetGraph) -> Option<ProjectedGraph> {
    let center = graph.mean_point()?;
    let zone = UtmZone::containing(center.lat(), center.lon());
    let mut index = HashMap::with_capacity(graph.node_count());
    let mut points = Vec::with_capacity(graph.node_count());
    for node in graph.nodes() {
        index.insert(node.id, points.len());
        points.push(zone.project(node.point.lat(), node.point.lon()));
    }
    let edges = graph
        .edges()
        .iter()
        .filter_map(|e| Some((*index.get(&e.from)?, *index.get(&e.to)?)))
        .collect();
    debug!("Projected {} nodes to {}", points.len(), zone);
    Some(ProjectedGraph { zone, points, edges })
}
