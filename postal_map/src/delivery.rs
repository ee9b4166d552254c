use crate::error::Result;
use crate::location::LocationQuery;
use crate::pipeline::{FetchedNetwork, MapPipeline};
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat, ImageOutputFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

pub const ATTACHMENT_FILE_NAME: &str = "mapa.png";
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// A framed map ready to be served as a download.
#[derive(Debug, Clone)]
pub struct PngAttachment {
    pub bytes: Vec<u8>,
    pub file_name: &'static str,
    pub content_type: &'static str,
}

/// The framed map as PNG bytes, plus its caption.
#[derive(Debug, Clone)]
pub struct RenderedMap {
    pub attachment: PngAttachment,
    pub label: String,
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone()).write_to(&mut bytes, ImageOutputFormat::Png)?;
    Ok(bytes.into_inner())
}

/// Render `query`, write it to `path` as PNG, then frame that file in place.
pub async fn write_png_file(pipeline: &MapPipeline, query: &LocationQuery, path: &Path) -> Result<()> {
    let start = Instant::now();
    let figure = pipeline.render_figure(query).await?;
    figure.image.save_with_format(path, ImageFormat::Png)?;
    debug!("Figure written to {}", path.display());

    let raster = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let framed = pipeline.compose(&raster, figure.label.as_str());
    framed.save_with_format(path, ImageFormat::Png)?;
    info!(
        "Framed map written to {} in {:.2}s",
        path.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Render `query` entirely in memory and return the framed PNG.
pub async fn render_png(pipeline: &MapPipeline, query: &LocationQuery) -> Result<RenderedMap> {
    let network = pipeline.fetch_network(query).await?;
    encode_network_png(pipeline, &network)
}

/// Plot, frame and encode an already fetched network.
///
/// Blocking: async callers should run this on a blocking thread.
pub fn encode_network_png(pipeline: &MapPipeline, network: &FetchedNetwork) -> Result<RenderedMap> {
    let start = Instant::now();
    let figure = pipeline.plot(network)?;
    let plot_png = encode_png(&figure.image)?;

    let raster = image::load_from_memory_with_format(&plot_png, ImageFormat::Png)?;
    let framed = pipeline.compose(&raster, figure.label.as_str());
    let bytes = encode_png(&framed)?;
    info!(
        "Framed map of {} bytes ready in {:.2}s",
        bytes.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(RenderedMap {
        attachment: PngAttachment {
            bytes,
            file_name: ATTACHMENT_FILE_NAME,
            content_type: PNG_CONTENT_TYPE,
        },
        label: figure.label.to_string(),
    })
}
