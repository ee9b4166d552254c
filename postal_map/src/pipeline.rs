use crate::area::build_area;
use crate::config::MapConfig;
use crate::error::{MapError, Result};
use crate::font::CaptionFont;
use crate::frame;
use crate::location::{resolve, DisplayLabel, LocationQuery};
use crate::projection::{project_graph, ProjectedGraph};
use crate::render::{render_figure, RenderedFigure};
use image::{DynamicImage, RgbImage};
use openstreetmap::{Geocoder, NetworkFetcher, OpenStreetMapAPI};
use std::sync::Arc;
use std::time::Instant;

/// A located, downloaded and projected street network, ready to plot.
#[derive(Debug, Clone)]
pub struct FetchedNetwork {
    pub graph: ProjectedGraph,
    pub label: DisplayLabel,
}

/// The map composition pipeline: resolve, buffer, fetch, project, render, frame.
///
/// Holds no per-request state, so one value can serve any number of requests.
pub struct MapPipeline {
    config: MapConfig,
    geocoder: Box<dyn Geocoder>,
    fetcher: Box<dyn NetworkFetcher>,
    font: CaptionFont,
}

impl MapPipeline {
    /// Build a pipeline talking to the OpenStreetMap services named in `config`.
    pub fn new(config: MapConfig) -> Result<Self> {
        config.validate()?;
        let api = OpenStreetMapAPI::with_settings(config.osm_settings()).map_err(MapError::Upstream)?;
        let api = Arc::new(api);
        Ok(Self::with_services(config, Box::new(api.clone()), Box::new(api)))
    }

    /// Build a pipeline around explicit collaborators.
    pub fn with_services(
        config: MapConfig,
        geocoder: Box<dyn Geocoder>,
        fetcher: Box<dyn NetworkFetcher>,
    ) -> Self {
        let font = CaptionFont::load(&config.font_path);
        Self {
            config,
            geocoder,
            fetcher,
            font,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn font(&self) -> &CaptionFont {
        &self.font
    }

    /// Resolve `query` and download its projected street network.
    pub async fn fetch_network(&self, query: &LocationQuery) -> Result<FetchedNetwork> {
        let location = resolve(query, self.geocoder.as_ref()).await?;
        let area = build_area(&location.point, self.config.buffer_km)?;

        info!("Downloading street network around {}...", location.label);
        let start = Instant::now();
        let graph = self
            .fetcher
            .fetch_graph(&area.polygon, self.config.network_type)
            .await
            .map_err(MapError::Upstream)?;
        if graph.is_empty() {
            return Err(MapError::NoData {
                label: location.label.to_string(),
                buffer_km: area.buffer_km,
            });
        }
        debug!(
            "Network downloaded in {:.2}s: {} nodes, {} edges",
            start.elapsed().as_secs_f64(),
            graph.node_count(),
            graph.edge_count()
        );

        let graph = project_graph(&graph).ok_or_else(|| MapError::NoData {
            label: location.label.to_string(),
            buffer_km: area.buffer_km,
        })?;
        Ok(FetchedNetwork {
            graph,
            label: location.label,
        })
    }

    /// Draw a fetched network. CPU only, no I/O.
    pub fn plot(&self, network: &FetchedNetwork) -> Result<RenderedFigure> {
        debug!("Plotting map...");
        let start = Instant::now();
        let figure = render_figure(
            &network.graph,
            &network.label,
            &self.config.style,
            &self.config.figure,
            &self.font,
        )?;
        debug!("Plot ready in {:.2}s", start.elapsed().as_secs_f64());
        Ok(figure)
    }

    /// Produce the unframed street plot for `query`.
    pub async fn render_figure(&self, query: &LocationQuery) -> Result<RenderedFigure> {
        let network = self.fetch_network(query).await?;
        self.plot(&network)
    }

    /// Frame a rendered raster with the configured margin and caption font.
    pub fn compose(&self, raster: &DynamicImage, label: &str) -> RgbImage {
        frame::compose(
            raster,
            label,
            self.config.margin_px,
            &self.font,
            self.config.caption_font_px,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, MockFetcher, MockGeocoder};

    #[tokio::test]
    async fn test_coordinates_render_without_geocoding() {
        let geocoder = MockGeocoder::empty();
        let fetcher = MockFetcher::three_nodes();
        let pipeline = MapPipeline::with_services(
            test_config(),
            Box::new(geocoder.clone()),
            Box::new(fetcher.clone()),
        );
        let query = LocationQuery::Coordinates { lat: 40.4, lon: -3.7 };
        let figure = pipeline.render_figure(&query).await.unwrap();
        assert_eq!(figure.label.as_str(), "40.4000, -3.7000");
        assert_eq!(geocoder.calls(), 0);
        assert_eq!(fetcher.calls(), 1);
        let framed = pipeline.compose(&DynamicImage::ImageRgb8(figure.image.clone()), figure.label.as_str());
        assert_eq!(
            framed.dimensions(),
            (figure.image.width() + 100, figure.image.height() + 100)
        );
    }

    #[tokio::test]
    async fn test_fetcher_receives_buffer_polygon() {
        let fetcher = MockFetcher::three_nodes();
        let pipeline = MapPipeline::with_services(
            test_config(),
            Box::new(MockGeocoder::empty()),
            Box::new(fetcher.clone()),
        );
        let query = LocationQuery::Coordinates { lat: 40.4, lon: -3.7 };
        pipeline.render_figure(&query).await.unwrap();
        let polygon = fetcher.last_polygon().unwrap();
        let (min_lat, _, max_lat, _) = openstreetmap::geometry::bounds(&polygon).unwrap();
        assert!((max_lat - min_lat - 2.0 * 5.0 / 111.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_network_is_no_data() {
        let pipeline = MapPipeline::with_services(
            test_config(),
            Box::new(MockGeocoder::empty()),
            Box::new(MockFetcher::empty()),
        );
        let query = LocationQuery::Coordinates { lat: 0.0, lon: -160.0 };
        let err = pipeline.render_figure(&query).await.unwrap_err();
        assert!(matches!(err, MapError::NoData { .. }));
    }

    #[tokio::test]
    async fn test_not_found_stops_before_fetching() {
        let fetcher = MockFetcher::three_nodes();
        let pipeline = MapPipeline::with_services(
            test_config(),
            Box::new(MockGeocoder::empty()),
            Box::new(fetcher.clone()),
        );
        let query = LocationQuery::Place("Nowhereville, Unreal".to_string());
        let err = pipeline.render_figure(&query).await.unwrap_err();
        assert!(matches!(err, MapError::NotFound { .. }));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_upstream() {
        let pipeline = MapPipeline::with_services(
            test_config(),
            Box::new(MockGeocoder::empty()),
            Box::new(MockFetcher::failing("Overpass timed out")),
        );
        let query = LocationQuery::Coordinates { lat: 1.0, lon: 1.0 };
        let err = pipeline.render_figure(&query).await.unwrap_err();
        assert!(matches!(err, MapError::Upstream(_)));
        assert!(err.to_string().contains("Overpass timed out"));
    }
}
