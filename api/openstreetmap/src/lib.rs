#[macro_use] extern crate log;

pub mod cache;
pub mod geometry;
pub mod graph;
pub mod nominatim;
pub mod overpass;

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use cache::ResponseCache;
pub use geometry::{buffer, lat_lon, Geometry, GeometryExt, LatLon, Point, Polygon};
pub use graph::{Edge, Node, StreetGraph};
pub use overpass::NetworkType;

/// Resolves a free-form place name to a geometry.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the service knows no such place.
    async fn geocode(&self, query: &str) -> Result<Option<Geometry>, anyhow::Error>;
}

/// Downloads the street network inside a polygon.
#[async_trait]
pub trait NetworkFetcher: Send + Sync {
    async fn fetch_graph(
        &self,
        polygon: &Polygon,
        network_type: NetworkType,
    ) -> Result<StreetGraph, anyhow::Error>;
}

#[async_trait]
impl<T: Geocoder + ?Sized> Geocoder for Arc<T> {
    async fn geocode(&self, query: &str) -> Result<Option<Geometry>, anyhow::Error> {
        (**self).geocode(query).await
    }
}

#[async_trait]
impl<T: NetworkFetcher + ?Sized> NetworkFetcher for Arc<T> {
    async fn fetch_graph(
        &self,
        polygon: &Polygon,
        network_type: NetworkType,
    ) -> Result<StreetGraph, anyhow::Error> {
        (**self).fetch_graph(polygon, network_type).await
    }
}

/// Connection settings for the OpenStreetMap services.
#[derive(Debug, Clone)]
pub struct OsmSettings {
    pub nominatim_url: String,
    pub overpass_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Directory of the response cache, `None` disables caching.
    pub cache_dir: Option<PathBuf>,
}

impl Default for OsmSettings {
    fn default() -> Self {
        Self {
            nominatim_url: "https://nominatim.openstreetmap.org/search".to_string(),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            user_agent: concat!("postal-map/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 180,
            cache_dir: Some(PathBuf::from("cache")),
        }
    }
}

/// OpenStreetMap API client (Nominatim geocoding and Overpass street data)
pub struct OpenStreetMapAPI {
    client: Client,
    settings: OsmSettings,
    cache: Option<ResponseCache>,
}

impl OpenStreetMapAPI {
    /// Create a new OpenStreetMapAPI instance with default settings
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::with_settings(OsmSettings::default())
    }

    pub fn with_settings(settings: OsmSettings) -> Result<Self, anyhow::Error> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        let cache = settings.cache_dir.clone().map(ResponseCache::new);
        Ok(Self {
            client,
            settings,
            cache,
        })
    }

    pub fn settings(&self) -> &OsmSettings {
        &self.settings
    }

    /// A cached response for this request, if one exists and `parse` accepts it.
    fn cached<T>(&self, url: &str, body: &str, parse: impl FnOnce(&str) -> Result<T, anyhow::Error>) -> Option<T> {
        let text = self.cache.as_ref()?.get(url, body)?;
        match parse(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring unreadable cached response for {}: {}", url, e);
                None
            }
        }
    }

    fn store(&self, url: &str, body: &str, response: &str) {
        if let Some(cache) = &self.cache {
            cache.put(url, body, response);
        }
    }

    /// GET a URL with query parameters
    async fn get_text(&self, url: Url) -> Result<String, anyhow::Error> {
        debug!("GET {}", url);
        let resp = self.client.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("Request to {} failed: HTTP {}", url, resp.status()));
        }
        Ok(resp.text().await?)
    }

    /// POST an Overpass query
    async fn post_query(&self, query: &str) -> Result<String, anyhow::Error> {
        let url = self.settings.overpass_url.as_str();
        debug!("POST {} ({} bytes of query)", url, query.len());
        let resp = self.client.post(url).form(&[("data", query)]).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let error_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(anyhow!("Overpass query failed: HTTP {}: {}", status, error_text));
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl Geocoder for OpenStreetMapAPI {
    async fn geocode(&self, query: &str) -> Result<Option<Geometry>, anyhow::Error> {
        let params = nominatim::search_params(query);
        let url = Url::parse_with_params(&self.settings.nominatim_url, &params)?;
        if let Some(geometry) = self.cached(url.as_str(), "", nominatim::select_geometry) {
            return Ok(geometry);
        }
        let body = self.get_text(url.clone()).await?;
        let geometry = nominatim::select_geometry(&body)?;
        self.store(url.as_str(), "", &body);
        Ok(geometry)
    }
}

#[async_trait]
impl NetworkFetcher for OpenStreetMapAPI {
    async fn fetch_graph(
        &self,
        polygon: &Polygon,
        network_type: NetworkType,
    ) -> Result<StreetGraph, anyhow::Error> {
        let query = overpass::build_query(polygon, network_type, self.settings.timeout_secs);
        let url = self.settings.overpass_url.as_str();
        let parse = |text: &str| overpass::parse_response(text, polygon);
        if let Some(parsed) = self.cached(url, &query, parse) {
            return Ok(parsed.graph);
        }
        let body = self.post_query(&query).await?;
        let parsed = overpass::parse_response(&body, polygon)?;
        // Remarked responses may be partial and are never cached.
        if parsed.remark.is_none() {
            self.store(url, &query, &body);
        }
        Ok(parsed.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one HTTP request with `status 200` and `body`, then stop listening.
    async fn serve_once(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}/api/interpreter", addr)
    }

    fn overpass_api(url: String, cache_dir: &std::path::Path) -> OpenStreetMapAPI {
        OpenStreetMapAPI::with_settings(OsmSettings {
            overpass_url: url,
            cache_dir: Some(cache_dir.to_path_buf()),
            timeout_secs: 5,
            ..OsmSettings::default()
        })
        .unwrap()
    }

    fn cached_files(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_overpass_runtime_error_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once(
            r#"{"elements": [], "remark": "runtime error: Query timed out in \"query\" at line 1 after 180 seconds."}"#,
        )
        .await;
        let api = overpass_api(url, dir.path());
        let area = buffer(lat_lon(0.0, 0.0), 0.01);

        let err = api.fetch_graph(&area, NetworkType::All).await.unwrap_err();
        assert!(err.to_string().contains("runtime error"));
        assert_eq!(cached_files(dir.path()), 0);

        // The server is gone: the failure must not have turned into a cached empty graph.
        assert!(api.fetch_graph(&area, NetworkType::All).await.is_err());
    }

    #[tokio::test]
    async fn test_clean_overpass_response_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once(
            r#"{"elements": [
                {"type": "node", "id": 1, "lat": 0.0, "lon": 0.0},
                {"type": "node", "id": 2, "lat": 0.001, "lon": 0.0},
                {"type": "way", "id": 5, "nodes": [1, 2]}
            ]}"#,
        )
        .await;
        let api = overpass_api(url, dir.path());
        let area = buffer(lat_lon(0.0, 0.0), 0.01);

        let graph = api.fetch_graph(&area, NetworkType::All).await.unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(cached_files(dir.path()), 1);

        let again = api.fetch_graph(&area, NetworkType::All).await.unwrap();
        assert_eq!(again.edge_count(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_cache_entry_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once(r#"{"elements": []}"#).await;
        let api = overpass_api(url.clone(), dir.path());
        let area = buffer(lat_lon(0.0, 0.0), 0.01);
        let query = overpass::build_query(&area, NetworkType::All, 5);
        ResponseCache::new(dir.path()).put(&url, &query, "{truncated");

        let graph = api.fetch_graph(&area, NetworkType::All).await.unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_api_creation() {
        let api = OpenStreetMapAPI::new();
        assert!(api.is_ok());
    }

    #[tokio::test]
    async fn test_cached_geocode_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let settings = OsmSettings {
            // Unroutable address: a network call would fail.
            nominatim_url: "http://127.0.0.1:9/search".to_string(),
            cache_dir: Some(dir.path().to_path_buf()),
            timeout_secs: 1,
            ..OsmSettings::default()
        };
        let api = OpenStreetMapAPI::with_settings(settings).unwrap();
        let params = nominatim::search_params("Cached Town");
        let url = Url::parse_with_params("http://127.0.0.1:9/search", &params).unwrap();
        ResponseCache::new(dir.path()).put(
            url.as_str(),
            "",
            r#"[{"lat": "10.5", "lon": "20.25"}]"#,
        );

        let geometry = api.geocode("Cached Town").await.unwrap();
        assert_eq!(geometry, Some(Geometry::Point(lat_lon(10.5, 20.25))));
    }

    #[tokio::test]
    async fn test_cached_network_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let settings = OsmSettings {
            overpass_url: "http://127.0.0.1:9/api/interpreter".to_string(),
            cache_dir: Some(dir.path().to_path_buf()),
            timeout_secs: 1,
            ..OsmSettings::default()
        };
        let api = OpenStreetMapAPI::with_settings(settings).unwrap();
        let area = buffer(lat_lon(0.0, 0.0), 0.01);
        let query = overpass::build_query(&area, NetworkType::Walk, 1);
        ResponseCache::new(dir.path()).put(
            "http://127.0.0.1:9/api/interpreter",
            &query,
            r#"{"elements": [
                {"type": "node", "id": 1, "lat": 0.0, "lon": 0.0},
                {"type": "node", "id": 2, "lat": 0.001, "lon": 0.0},
                {"type": "way", "id": 5, "nodes": [1, 2]}
            ]}"#,
        );

        let graph = api.fetch_graph(&area, NetworkType::Walk).await.unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }
}
