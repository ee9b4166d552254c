extern crate pretty_env_logger;
#[macro_use] extern crate log;

use openstreetmap::{buffer, Geocoder, GeometryExt, LatLon, NetworkFetcher, NetworkType, OpenStreetMapAPI};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    pretty_env_logger::init();

    let place = std::env::args().nth(1).unwrap_or_else(|| "Vatican City".to_string());
    info!("OpenStreetMap API test for {:?}", place);

    let api = OpenStreetMapAPI::new()?;

    let geometry = match api.geocode(&place).await? {
        Some(geometry) => geometry,
        None => {
            error!("No geometry found for {:?}", place);
            return Ok(());
        }
    };
    let center = geometry
        .representative_point()
        .ok_or_else(|| anyhow::anyhow!("Empty {} geometry", geometry.kind()))?;
    info!("{} centred at {:.4}, {:.4}", geometry.kind(), center.lat(), center.lon());

    let area = buffer(center, 1.0 / 111.0);
    match api.fetch_graph(&area, NetworkType::All).await {
        Ok(graph) => info!("Street graph: {} nodes, {} edges", graph.node_count(), graph.edge_count()),
        Err(e) => error!("Street download failed: {}", e),
    }

    Ok(())
}
