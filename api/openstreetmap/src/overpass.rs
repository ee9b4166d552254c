use crate::geometry::{lat_lon, Polygon};
use crate::graph::StreetGraph;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which ways of the street network to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    /// Every non-private street and path.
    #[default]
    All,
    /// Every street and path, private ones included.
    AllPrivate,
    Drive,
    Walk,
    Bike,
}

impl NetworkType {
    pub fn name(&self) -> &'static str {
        match self {
            NetworkType::All => "all",
            NetworkType::AllPrivate => "all_private",
            NetworkType::Drive => "drive",
            NetworkType::Walk => "walk",
            NetworkType::Bike => "bike",
        }
    }

    /// Overpass QL tag filter applied to ways.
    pub fn way_filter(&self) -> &'static str {
        match self {
            NetworkType::All => concat!(
                r#"["highway"]["area"!~"yes"]"#,
                r#"["highway"!~"abandoned|construction|no|planned|platform|proposed|raceway|razed"]"#,
                r#"["service"!~"private"]["access"!~"private"]"#,
            ),
            NetworkType::AllPrivate => concat!(
                r#"["highway"]["area"!~"yes"]"#,
                r#"["highway"!~"abandoned|construction|no|planned|platform|proposed|raceway|razed"]"#,
            ),
            NetworkType::Drive => concat!(
                r#"["highway"]["area"!~"yes"]["access"!~"private"]"#,
                r#"["highway"!~"abandoned|bridleway|bus_guideway|construction|corridor|cycleway|elevator|"#,
                r#"escalator|footway|no|path|pedestrian|planned|platform|proposed|raceway|razed|service|steps|track"]"#,
                r#"["motor_vehicle"!~"no"]["motorcar"!~"no"]"#,
                r#"["service"!~"alley|driveway|emergency_access|parking|parking_aisle|private"]"#,
            ),
            NetworkType::Walk => concat!(
                r#"["highway"]["area"!~"yes"]["access"!~"private"]"#,
                r#"["highway"!~"abandoned|bus_guideway|construction|cycleway|motor|no|planned|platform|proposed|raceway|razed"]"#,
                r#"["foot"!~"no"]["service"!~"private"]"#,
            ),
            NetworkType::Bike => concat!(
                r#"["highway"]["area"!~"yes"]["access"!~"private"]"#,
                r#"["highway"!~"abandoned|bus_guideway|construction|corridor|elevator|escalator|footway|"#,
                r#"motor|no|planned|platform|proposed|raceway|razed|steps"]"#,
                r#"["bicycle"!~"no"]["service"!~"private"]"#,
            ),
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NetworkType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(NetworkType::All),
            "all_private" => Ok(NetworkType::AllPrivate),
            "drive" => Ok(NetworkType::Drive),
            "walk" => Ok(NetworkType::Walk),
            "bike" => Ok(NetworkType::Bike),
            other => Err(anyhow::anyhow!("Unknown network type: {}", other)),
        }
    }
}

/// Overpass `poly:` filter value: space separated "lat lon" pairs.
pub fn poly_filter(polygon: &Polygon) -> String {
    let ring = &polygon.exterior().0;
    let open = match (ring.first(), ring.last()) {
        (Some(a), Some(b)) if ring.len() > 1 && a == b => &ring[..ring.len() - 1],
        _ => &ring[..],
    };
    open.iter()
        .map(|p| format!("{:.6} {:.6}", p.y, p.x))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Overpass QL query for the ways of `network_type` inside `polygon`, with their nodes.
pub fn build_query(polygon: &Polygon, network_type: NetworkType, timeout_secs: u64) -> String {
    format!(
        "[out:json][timeout:{}];(way{}(poly:\"{}\");>;);out;",
        timeout_secs,
        network_type.way_filter(),
        poly_filter(polygon)
    )
}

/// Overpass marks queries it gave up on (timeout, memory) with this remark prefix.
const RUNTIME_ERROR: &str = "runtime error";

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    elements: Vec<Element>,
    remark: Option<String>,
}

/// A parsed Overpass response. A remark means the data may be incomplete.
#[derive(Debug, Clone)]
pub struct OverpassGraph {
    pub graph: StreetGraph,
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Element {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
    },
    Way {
        id: i64,
        #[serde(default)]
        nodes: Vec<i64>,
    },
    #[serde(other)]
    Other,
}

/// Build the street graph of an Overpass JSON response, truncated to `polygon`.
///
/// A `runtime error` remark is an error: its elements are empty or partial.
pub fn parse_response(body: &str, polygon: &Polygon) -> Result<OverpassGraph> {
    let response: Response = serde_json::from_str(body)?;
    if let Some(remark) = &response.remark {
        if remark.trim_start().starts_with(RUNTIME_ERROR) {
            return Err(anyhow::anyhow!("Overpass query failed: {}", remark));
        }
        warn!("Overpass remarked: {}", remark);
    }
    let mut graph = StreetGraph::new();
    let mut ways = Vec::new();
    for element in response.elements {
        match element {
            Element::Node { id, lat, lon } => graph.add_node(id, lat_lon(lat, lon)),
            Element::Way { id, nodes } => ways.push((id, nodes)),
            Element::Other => {}
        }
    }
    for (way, nodes) in &ways {
        for pair in nodes.windows(2) {
            graph.add_edge(pair[0], pair[1], *way);
        }
    }
    debug!(
        "Overpass returned {} ways, {} nodes, {} edges",
        ways.len(),
        graph.node_count(),
        graph.edge_count()
    );
    graph.truncate_to(polygon);
    Ok(OverpassGraph {
        graph,
        remark: response.remark,
    })
}

pub fn parse_graph(body: &str, polygon: &Polygon) -> Result<StreetGraph> {
    parse_response(body, polygon).map(|parsed| parsed.graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::buffer;

    fn area() -> Polygon {
        buffer(lat_lon(40.0, -3.0), 0.01)
    }

    #[test]
    fn test_query_contains_filter_and_polygon() {
        let q = build_query(&area(), NetworkType::All, 180);
        assert!(q.starts_with("[out:json][timeout:180];(way[\"highway\"]"));
        assert!(q.contains("(poly:\"40.000000 -2.990000 "));
        assert!(q.ends_with(");>;);out;"));
    }

    #[test]
    fn test_poly_filter_drops_closing_vertex() {
        let poly = poly_filter(&area());
        assert_eq!(poly.split(' ').count(), 2 * 64);
    }

    #[test]
    fn test_parse_graph_truncates_to_polygon() {
        let body = r#"{"elements": [
            {"type": "node", "id": 1, "lat": 40.0, "lon": -3.0},
            {"type": "node", "id": 2, "lat": 40.001, "lon": -3.0},
            {"type": "node", "id": 3, "lat": 40.002, "lon": -3.001},
            {"type": "node", "id": 4, "lat": 41.0, "lon": -3.0},
            {"type": "way", "id": 100, "nodes": [1, 2, 3, 4], "tags": {"highway": "residential"}},
            {"type": "relation", "id": 7}
        ]}"#;
        let graph = parse_graph(body, &area()).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.node(4).is_none());
    }

    #[test]
    fn test_parse_empty_response() {
        let graph = parse_graph(r#"{"elements": []}"#, &area()).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_runtime_error_remark_is_an_error() {
        let body = r#"{"elements": [],
            "remark": "runtime error: Query timed out in \"query\" at line 1 after 181 seconds."}"#;
        let err = parse_graph(body, &area()).unwrap_err();
        assert!(err.to_string().contains("Query timed out"));
    }

    #[test]
    fn test_other_remarks_are_kept() {
        let body = r#"{"elements": [
            {"type": "node", "id": 1, "lat": 40.0, "lon": -3.0},
            {"type": "node", "id": 2, "lat": 40.001, "lon": -3.0},
            {"type": "way", "id": 100, "nodes": [1, 2]}
        ], "remark": "runtime remark: Timeout is rather high"}"#;
        let parsed = parse_response(body, &area()).unwrap();
        assert_eq!(parsed.graph.edge_count(), 1);
        assert_eq!(parsed.remark.as_deref(), Some("runtime remark: Timeout is rather high"));
    }

    #[test]
    fn test_network_type_names_round_trip() {
        for t in [
            NetworkType::All,
            NetworkType::AllPrivate,
            NetworkType::Drive,
            NetworkType::Walk,
            NetworkType::Bike,
        ] {
            assert_eq!(t.name().parse::<NetworkType>().unwrap(), t);
        }
        assert!("tram".parse::<NetworkType>().is_err());
        let parsed: NetworkType = serde_json::from_str("\"all_private\"").unwrap();
        assert_eq!(parsed, NetworkType::AllPrivate);
    }
}
