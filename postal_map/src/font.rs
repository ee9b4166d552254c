//! Caption fonts.
//!
//! Bold TrueType faces are loaded from disk; when none can be read the
//! built-in 8x8 bitmap font is used instead, so captions always render.

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Well-known locations of a bold sans-serif face, tried after the configured path.
pub const SYSTEM_BOLD_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/local/share/fonts/DejaVuSans-Bold.ttf",
    "/Library/Fonts/DejaVuSans-Bold.ttf",
    "DejaVuSans-Bold.ttf",
];

#[derive(Debug, Error)]
pub enum FontError {
    #[error("Failed to read font {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Invalid font data in {path:?}")]
    Invalid { path: PathBuf },
}

/// Load a TrueType/OpenType font file.
pub fn load_truetype(path: &Path) -> Result<FontVec, FontError> {
    let data = fs::read(path).map_err(|source| FontError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    FontVec::try_from_vec(data).map_err(|_| FontError::Invalid {
        path: path.to_path_buf(),
    })
}

pub enum CaptionFont {
    TrueType(FontVec),
    Builtin,
}

impl fmt::Debug for CaptionFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptionFont::TrueType(_) => f.write_str("CaptionFont::TrueType"),
            CaptionFont::Builtin => f.write_str("CaptionFont::Builtin"),
        }
    }
}

impl CaptionFont {
    /// Load `preferred`, then the system candidates, then fall back to the builtin font.
    pub fn load(preferred: &Path) -> Self {
        let candidates = std::iter::once(preferred).chain(SYSTEM_BOLD_FONTS.iter().map(Path::new));
        for path in candidates {
            match load_truetype(path) {
                Ok(font) => {
                    debug!("Loaded caption font {:?}", path);
                    return CaptionFont::TrueType(font);
                }
                Err(e) => debug!("{}", e),
            }
        }
        warn!("No TrueType font available, using the builtin bitmap font");
        CaptionFont::Builtin
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, CaptionFont::Builtin)
    }

    /// Width and height in pixels of `text` rendered at `px`.
    pub fn text_size(&self, text: &str, px: f32) -> (u32, u32) {
        match self {
            CaptionFont::TrueType(font) => {
                let scale = px_scale(font, px);
                let scaled = font.as_scaled(scale);
                let mut width = 0.0;
                let mut prev = None;
                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = prev {
                        width += scaled.kern(prev, id);
                    }
                    width += scaled.h_advance(id);
                    prev = Some(id);
                }
                (width.ceil() as u32, scaled.height().ceil() as u32)
            }
            CaptionFont::Builtin => {
                let k = builtin_scale(px);
                (text.chars().count() as u32 * 8 * k, 8 * k)
            }
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`. Pixels outside the image are clipped.
    pub fn draw_text(&self, image: &mut RgbImage, text: &str, px: f32, x: i32, y: i32, color: Rgb<u8>) {
        match self {
            CaptionFont::TrueType(font) => {
                let scale = px_scale(font, px);
                let scaled = font.as_scaled(scale);
                let baseline = y as f32 + scaled.ascent();
                let mut caret = x as f32;
                let mut prev = None;
                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = prev {
                        caret += scaled.kern(prev, id);
                    }
                    let glyph = id.with_scale_and_position(scale, point(caret, baseline));
                    caret += scaled.h_advance(id);
                    prev = Some(id);
                    if let Some(outlined) = font.outline_glyph(glyph) {
                        let bounds = outlined.px_bounds();
                        outlined.draw(|gx, gy, coverage| {
                            let px = bounds.min.x as i32 + gx as i32;
                            let py = bounds.min.y as i32 + gy as i32;
                            blend(image, px, py, color, coverage);
                        });
                    }
                }
            }
            CaptionFont::Builtin => {
                let k = builtin_scale(px) as i32;
                for (i, c) in text.chars().enumerate() {
                    let rows = BASIC_FONTS
                        .get(c)
                        .or_else(|| LATIN_FONTS.get(c))
                        .or_else(|| BASIC_FONTS.get('?'))
                        .unwrap_or([0; 8]);
                    let left = x + i as i32 * 8 * k;
                    for (row, bits) in rows.iter().enumerate() {
                        for col in 0..8 {
                            if bits & (1 << col) == 0 {
                                continue;
                            }
                            for dy in 0..k {
                                for dx in 0..k {
                                    let px = left + col * k + dx;
                                    let py = y + row as i32 * k + dy;
                                    blend(image, px, py, color, 1.0);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Treat `px` as the em size, the way pixel font sizes are usually meant.
fn px_scale(font: &FontVec, px: f32) -> PxScale {
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(px * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(px),
    }
}

fn builtin_scale(px: f32) -> u32 {
    ((px / 8.0).round() as u32).max(1)
}

fn blend(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    for (dst, src) in pixel.0.iter_mut().zip(color.0) {
        *dst = (src as f32 * coverage + *dst as f32 * (1.0 - coverage)).round() as u8;
    }
}
