//! Stand-in collaborators for exercising the pipeline without network access.

use crate::config::{FigureSpec, MapConfig};
use anyhow::anyhow;
use async_trait::async_trait;
use openstreetmap::{lat_lon, Geocoder, Geometry, NetworkFetcher, NetworkType, Polygon, StreetGraph};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A small, fast configuration: 2 x 2 inch figure at 100 dpi, no cache.
pub fn test_config() -> MapConfig {
    MapConfig {
        use_cache: false,
        debug: false,
        font_path: PathBuf::from("/nonexistent/DejaVuSans-Bold.ttf"),
        figure: FigureSpec {
            size_in: 2.0,
            dpi: 100.0,
            pad_inches: 0.1,
        },
        ..MapConfig::default()
    }
}

#[derive(Clone)]
enum Reply<T> {
    Value(T),
    Fail(String),
}

/// Geocoder returning a canned answer and counting its calls.
#[derive(Clone)]
pub struct MockGeocoder {
    reply: Reply<Option<Geometry>>,
    calls: Arc<AtomicUsize>,
}

impl MockGeocoder {
    /// Knows no place at all.
    pub fn empty() -> Self {
        Self::with_reply(Reply::Value(None))
    }

    pub fn returning(geometry: Geometry) -> Self {
        Self::with_reply(Reply::Value(Some(geometry)))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_reply(Reply::Fail(message.to_string()))
    }

    fn with_reply(reply: Reply<Option<Geometry>>) -> Self {
        Self {
            reply,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, _query: &str) -> Result<Option<Geometry>, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Value(geometry) => Ok(geometry.clone()),
            Reply::Fail(message) => Err(anyhow!("{}", message)),
        }
    }
}

/// Network fetcher returning a canned graph, recording the polygons it was asked for.
#[derive(Clone)]
pub struct MockFetcher {
    reply: Reply<StreetGraph>,
    calls: Arc<AtomicUsize>,
    last_polygon: Arc<Mutex<Option<Polygon>>>,
}

impl MockFetcher {
    pub fn returning(graph: StreetGraph) -> Self {
        Self::with_reply(Reply::Value(graph))
    }

    /// Three nodes joined by two edges, near Madrid.
    pub fn three_nodes() -> Self {
        let mut graph = StreetGraph::new();
        graph.add_node(1, lat_lon(40.4000, -3.7000));
        graph.add_node(2, lat_lon(40.4010, -3.7000));
        graph.add_node(3, lat_lon(40.4010, -3.6990));
        graph.add_edge(1, 2, 100);
        graph.add_edge(2, 3, 100);
        Self::returning(graph)
    }

    pub fn empty() -> Self {
        Self::returning(StreetGraph::new())
    }

    pub fn failing(message: &str) -> Self {
        Self::with_reply(Reply::Fail(message.to_string()))
    }

    fn with_reply(reply: Reply<StreetGraph>) -> Self {
        Self {
            reply,
            calls: Arc::new(AtomicUsize::new(0)),
            last_polygon: Arc::new(Mutex::new(None)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_polygon(&self) -> Option<Polygon> {
        self.last_polygon.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl NetworkFetcher for MockFetcher {
    async fn fetch_graph(
        &self,
        polygon: &Polygon,
        _network_type: NetworkType,
    ) -> Result<StreetGraph, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_polygon.lock() {
            *last = Some(polygon.clone());
        }
        match &self.reply {
            Reply::Value(graph) => Ok(graph.clone()),
            Reply::Fail(message) => Err(anyhow!("{}", message)),
        }
    }
}
