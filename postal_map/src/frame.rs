use crate::font::CaptionFont;
use image::{imageops, DynamicImage, Rgb, RgbImage};

pub const DEFAULT_MARGIN_PX: u32 = 50;
pub const BORDER_WIDTH_PX: u32 = 5;
pub const CAPTION_FONT_PX: f32 = 24.0;
/// Caption offset from the top-left corner of the bottom margin strip.
pub const CAPTION_OFFSET_PX: u32 = 10;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Frame a rendered map: white margin, black border and a caption in the bottom margin.
///
/// The output is always `(width + 2 * margin, height + 2 * margin)`. The
/// caption sits at a fixed offset and is not fitted to its length.
pub fn compose(raster: &DynamicImage, label: &str, margin: u32, font: &CaptionFont, font_px: f32) -> RgbImage {
    let source = raster.to_rgb8();
    let (width, height) = source.dimensions();
    let mut canvas = RgbImage::from_pixel(width + 2 * margin, height + 2 * margin, WHITE);
    imageops::replace(&mut canvas, &source, margin as i64, margin as i64);

    let (canvas_w, canvas_h) = canvas.dimensions();
    draw_outline(&mut canvas, canvas_w as i64, canvas_h as i64, BORDER_WIDTH_PX as i64);

    font.draw_text(
        &mut canvas,
        label,
        font_px,
        (margin + CAPTION_OFFSET_PX) as i32,
        (height + margin + CAPTION_OFFSET_PX) as i32,
        BLACK,
    );
    canvas
}

/// Outline the box `[0, 0, x1, y1]`, both corners inclusive, with a stroke
/// growing inwards. Parts beyond the canvas are clipped.
fn draw_outline(canvas: &mut RgbImage, x1: i64, y1: i64, stroke: i64) {
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    for y in 0..h {
        for x in 0..w {
            let on_border = x < stroke || y < stroke || x > x1 - stroke || y > y1 - stroke;
            if on_border {
                canvas.put_pixel(x as u32, y as u32, BLACK);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(w: u32, h: u32, shade: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([shade, shade, shade])))
    }

    #[test]
    fn test_output_grows_by_twice_the_margin() {
        for (w, h) in [(1, 1), (300, 200), (640, 1024)] {
            let framed = compose(&raster(w, h, 128), "x", 50, &CaptionFont::Builtin, 24.0);
            assert_eq!(framed.dimensions(), (w + 100, h + 100));
        }
        let framed = compose(&raster(10, 10, 0), "x", 7, &CaptionFont::Builtin, 24.0);
        assert_eq!(framed.dimensions(), (24, 24));
    }

    #[test]
    fn test_same_size_inputs_give_same_geometry() {
        let a = compose(&raster(120, 80, 10), "First", 50, &CaptionFont::Builtin, 24.0);
        let b = compose(&raster(120, 80, 200), "Another caption", 50, &CaptionFont::Builtin, 24.0);
        assert_eq!(a.dimensions(), b.dimensions());
    }

    #[test]
    fn test_border_margin_and_paste() {
        let framed = compose(&raster(100, 60, 128), "", 50, &CaptionFont::Builtin, 24.0);
        let (w, h) = framed.dimensions();
        // Five pixels of border on the top/left edges.
        assert_eq!(framed.get_pixel(4, 100).0, [0, 0, 0]);
        assert_eq!(framed.get_pixel(5, 100).0, [255, 255, 255]);
        assert_eq!(framed.get_pixel(100, 4).0, [0, 0, 0]);
        // The outline box ends one pixel past the canvas: four visible pixels.
        assert_eq!(framed.get_pixel(w - 4, 100).0, [0, 0, 0]);
        assert_eq!(framed.get_pixel(w - 5, 100).0, [255, 255, 255]);
        assert_eq!(framed.get_pixel(100, h - 4).0, [0, 0, 0]);
        assert_eq!(framed.get_pixel(100, h - 5).0, [255, 255, 255]);
        // Raster pasted at the margin offset.
        assert_eq!(framed.get_pixel(50, 50).0, [128, 128, 128]);
        assert_eq!(framed.get_pixel(149, 109).0, [128, 128, 128]);
        assert_eq!(framed.get_pixel(150, 110).0, [255, 255, 255]);
    }

    #[test]
    fn test_caption_drawn_in_bottom_margin() {
        let framed = compose(&raster(200, 100, 255), "Madrid", 50, &CaptionFont::Builtin, 24.0);
        let caption_dark = (60..200u32)
            .flat_map(|x| (160..190u32).map(move |y| (x, y)))
            .filter(|&(x, y)| framed.get_pixel(x, y).0 == [0, 0, 0])
            .count();
        assert!(caption_dark > 0);
        // Nothing dark inside the pasted white raster.
        assert!((50..250u32).all(|x| framed.get_pixel(x, 100).0 == [255, 255, 255]));
    }

    #[test]
    fn test_invalid_font_path_still_frames() {
        let font = CaptionFont::load(std::path::Path::new("/no/such/font.ttf"));
        let framed = compose(&raster(40, 30, 90), "40.4000, -3.7000", 50, &font, 24.0);
        assert_eq!(framed.dimensions(), (140, 130));
    }
}
