use crate::geometry::{lat_lon, LatLon, Point, Polygon};
use geo::Contains;
use std::collections::{BTreeMap, HashSet};

/// An intersection or shape point of the street network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: i64,
    pub point: Point,
}

/// A path segment between two nodes, tagged with the OSM way it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: i64,
    pub to: i64,
    pub way: i64,
}

/// Street/path graph in geographic coordinates.
#[derive(Debug, Clone, Default)]
pub struct StreetGraph {
    nodes: BTreeMap<i64, Node>,
    edges: Vec<Edge>,
}

impl StreetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: i64, point: Point) {
        self.nodes.insert(id, Node { id, point });
    }

    /// Add an edge; edges referring to unknown nodes are ignored.
    pub fn add_edge(&mut self, from: i64, to: i64, way: i64) -> bool {
        if from == to || !self.nodes.contains_key(&from) || !self.nodes.contains_key(&to) {
            return false;
        }
        self.edges.push(Edge { from, to, way });
        true
    }

    pub fn node(&self, id: i64) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() || self.edges.is_empty()
    }

    /// Remove nodes outside `polygon` together with every edge touching them,
    /// then drop nodes left without any edge.
    pub fn truncate_to(&mut self, polygon: &Polygon) {
        self.nodes.retain(|_, node| polygon.contains(&node.point));
        let nodes = &self.nodes;
        self.edges
            .retain(|e| nodes.contains_key(&e.from) && nodes.contains_key(&e.to));
        let used: HashSet<i64> = self.edges.iter().flat_map(|e| [e.from, e.to]).collect();
        self.nodes.retain(|id, _| used.contains(id));
    }

    /// Mean latitude and longitude of all nodes.
    pub fn mean_point(&self) -> Option<Point> {
        if self.nodes.is_empty() {
            return None;
        }
        let n = self.nodes.len() as f64;
        let (lat, lon) = self
            .nodes
            .values()
            .fold((0.0, 0.0), |(lat, lon), node| (lat + node.point.lat(), lon + node.point.lon()));
        Some(lat_lon(lat / n, lon / n))
    }
}
