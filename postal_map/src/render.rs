use crate::config::{Color, FigureSpec, RenderStyle};
use crate::error::{MapError, Result};
use crate::font::CaptionFont;
use crate::location::DisplayLabel;
use crate::projection::{Bounds, ProjectedGraph};
use image::{Rgb, RgbImage};
use plotters::prelude::{BitMapBackend, Circle, IntoDrawingArea, PathElement, RGBColor, Rectangle, ShapeStyle};
use plotters::style::Color as _;

/// Share of the data extent kept free on each side of the axes.
pub const DATA_MARGIN: f64 = 0.02;

/// Vertical position of the in-plot label, as a fraction of the axes height from the bottom.
pub const LABEL_HEIGHT_FRACTION: f64 = 0.05;

/// Street plot before framing.
#[derive(Debug, Clone)]
pub struct RenderedFigure {
    pub image: RgbImage,
    pub label: DisplayLabel,
}

/// Pixel layout of the cropped figure: the axes box plus uniform padding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureLayout {
    pub axes_width: u32,
    pub axes_height: u32,
    pub pad: u32,
    scale: f64,
    origin_x: f64,
    origin_y: f64,
}

impl FigureLayout {
    /// Fit `bounds` with equal aspect into the square figure, then crop to
    /// the axes plus padding.
    pub fn new(bounds: Bounds, figure: &FigureSpec) -> Self {
        let side = figure.side_px().max(1) as f64;
        let margin_x = bounds.width() * DATA_MARGIN;
        let margin_y = bounds.height() * DATA_MARGIN;
        let data_w = bounds.width() + 2.0 * margin_x;
        let data_h = bounds.height() + 2.0 * margin_y;
        let longest = data_w.max(data_h);
        let scale = if longest > 0.0 { side / longest } else { 1.0 };
        let (axes_width, axes_height) = if longest > 0.0 {
            (
                ((data_w * scale).round() as u32).max(1),
                ((data_h * scale).round() as u32).max(1),
            )
        } else {
            (side as u32, side as u32)
        };
        let pad = figure.pad_px();
        // A degenerate extent is centred in its axes.
        let origin_x = bounds.min_x - margin_x - (axes_width as f64 / scale - data_w) / 2.0;
        let origin_y = bounds.min_y - margin_y - (axes_height as f64 / scale - data_h) / 2.0;
        Self {
            axes_width,
            axes_height,
            pad,
            scale,
            origin_x,
            origin_y,
        }
    }

    pub fn width(&self) -> u32 {
        self.axes_width + 2 * self.pad
    }

    pub fn height(&self) -> u32 {
        self.axes_height + 2 * self.pad
    }

    /// Map projected metres to pixel coordinates, y growing downwards.
    pub fn to_pixel(&self, x: f64, y: f64) -> (i32, i32) {
        let px = self.pad as f64 + (x - self.origin_x) * self.scale;
        let py = self.pad as f64 + self.axes_height as f64 - (y - self.origin_y) * self.scale;
        (px.round() as i32, py.round() as i32)
    }
}

fn rgb(color: Color) -> RGBColor {
    let [r, g, b] = color.0;
    RGBColor(r, g, b)
}

fn render_err(e: impl std::fmt::Display) -> MapError {
    MapError::Render(e.to_string())
}

/// Draw the projected street graph with its label and axes border.
pub fn render_figure(
    graph: &ProjectedGraph,
    label: &DisplayLabel,
    style: &RenderStyle,
    figure: &FigureSpec,
    font: &CaptionFont,
) -> Result<RenderedFigure> {
    let bounds = graph
        .bounds()
        .ok_or_else(|| MapError::Render("graph has no nodes to draw".to_string()))?;
    let layout = FigureLayout::new(bounds, figure);
    let (width, height) = (layout.width(), layout.height());
    let mut buffer = vec![0u8; width as usize * height as usize * 3];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&rgb(style.background)).map_err(render_err)?;

        let edge_style = ShapeStyle {
            color: rgb(style.edge_color).to_rgba(),
            filled: false,
            stroke_width: figure.pt_to_px(style.edge_width_pt),
        };
        for &(a, b) in &graph.edges {
            let (ax, ay) = graph.points[a];
            let (bx, by) = graph.points[b];
            let path = vec![layout.to_pixel(ax, ay), layout.to_pixel(bx, by)];
            root.draw(&PathElement::new(path, edge_style)).map_err(render_err)?;
        }

        if style.node_size > 0.0 {
            let radius = (figure.pt_to_px(style.node_size) / 2).max(1);
            let node_style = rgb(style.node_color).filled();
            for &(x, y) in &graph.points {
                root.draw(&Circle::new(layout.to_pixel(x, y), radius, node_style))
                    .map_err(render_err)?;
            }
        }

        // Axes frame, centred on the axes edge.
        let stroke = figure.pt_to_px(style.frame_width_pt) as i32;
        let frame_style = RGBColor(0, 0, 0).filled();
        let left = layout.pad as i32 - stroke / 2;
        let top = left;
        let right = (layout.pad + layout.axes_width) as i32 + (stroke - stroke / 2) - 1;
        let bottom = (layout.pad + layout.axes_height) as i32 + (stroke - stroke / 2) - 1;
        let sides = [
            [(left, top), (right, top + stroke - 1)],
            [(left, bottom - stroke + 1), (right, bottom)],
            [(left, top), (left + stroke - 1, bottom)],
            [(right - stroke + 1, top), (right, bottom)],
        ];
        for corners in sides {
            root.draw(&Rectangle::new(corners, frame_style)).map_err(render_err)?;
        }

        root.present().map_err(render_err)?;
    }

    let mut image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| MapError::Render("figure buffer has the wrong size".to_string()))?;

    let font_px = (style.label_font_pt * figure.dpi / 72.0) as f32;
    let (text_w, text_h) = font.text_size(label.as_str(), font_px);
    let center_x = layout.pad as f64 + layout.axes_width as f64 / 2.0;
    let center_y = layout.pad as f64 + layout.axes_height as f64 * (1.0 - LABEL_HEIGHT_FRACTION);
    let [r, g, b] = style.label_color.0;
    font.draw_text(
        &mut image,
        label.as_str(),
        font_px,
        (center_x - text_w as f64 / 2.0).round() as i32,
        (center_y - text_h as f64 / 2.0).round() as i32,
        Rgb([r, g, b]),
    );

    debug!("Rendered figure of {}x{} px", width, height);
    Ok(RenderedFigure {
        image,
        label: label.clone(),
    })
}
