use crate::app::form::{MapForm, DEFAULT_LAT, DEFAULT_LON, DEFAULT_PLACE};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use postal_map::PngAttachment;
use tera::{Context as TContext, Tera};

/// HTML pages of the web UI. Values are escaped by tera's `.html` autoescaping.
pub struct Pages {
    tera: Tera,
}

impl Pages {
    pub fn new() -> tera::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("base.html", include_str!("../../templates/base.html")),
            ("form.html", include_str!("../../templates/form.html")),
            ("index.html", include_str!("../../templates/index.html")),
            ("result.html", include_str!("../../templates/result.html")),
            ("error.html", include_str!("../../templates/error.html")),
        ])?;
        Ok(Self { tera })
    }

    pub fn index(&self) -> tera::Result<String> {
        let ctx = form_context("Street map poster", None);
        self.tera.render("index.html", &ctx)
    }

    /// Result page; the preview and the download link share the same PNG bytes.
    pub fn result(&self, form: &MapForm, caption: &str, png: &PngAttachment) -> tera::Result<String> {
        let mut ctx = form_context(caption, Some(form));
        ctx.insert("caption", caption);
        ctx.insert("png_base64", &STANDARD.encode(&png.bytes));
        ctx.insert("content_type", png.content_type);
        ctx.insert("file_name", png.file_name);
        self.tera.render("result.html", &ctx)
    }

    pub fn error(&self, form: &MapForm, message: &str) -> tera::Result<String> {
        let mut ctx = form_context("Map generation failed", Some(form));
        ctx.insert("message", message);
        self.tera.render("error.html", &ctx)
    }
}

/// Page title plus the form fields, pre-filled with the previous submission when present.
fn form_context(title: &str, form: Option<&MapForm>) -> TContext {
    let field = |value: Option<&String>, default: String| value.cloned().unwrap_or(default);
    let mut ctx = TContext::new();
    ctx.insert("title", title);
    ctx.insert("mode", &form.map(|f| f.mode).unwrap_or_default());
    ctx.insert("place", &field(form.and_then(|f| f.place.as_ref()), DEFAULT_PLACE.to_string()));
    ctx.insert("lat", &field(form.and_then(|f| f.lat.as_ref()), DEFAULT_LAT.to_string()));
    ctx.insert("lon", &field(form.and_then(|f| f.lon.as_ref()), DEFAULT_LON.to_string()));
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::form::Mode;

    fn png(bytes: &[u8]) -> PngAttachment {
        PngAttachment {
            bytes: bytes.to_vec(),
            file_name: "mapa.png",
            content_type: "image/png",
        }
    }

    #[test]
    fn test_index_has_defaults() {
        let html = Pages::new().unwrap().index().unwrap();
        assert!(html.contains("value=\"Madrid, Spain\""));
        assert!(html.contains("value=\"40.4168\""));
        assert!(html.contains("value=\"-3.7038\""));
        assert!(html.contains("value=\"place\" checked"));
        assert!(!html.contains("value=\"coords\" checked"));
    }

    #[test]
    fn test_result_page_embeds_png_and_download() {
        let form = MapForm {
            mode: Mode::Place,
            place: Some("Lyon".to_string()),
            ..MapForm::default()
        };
        let html = Pages::new().unwrap().result(&form, "Map of Lyon", &png(&[1, 2, 3])).unwrap();
        assert!(html.contains("<h2>Map of Lyon</h2>"));
        assert!(html.contains("src=\"data:image/png;base64,AQID\""));
        assert!(html.contains("href=\"data:image/png;base64,AQID\" download=\"mapa.png\""));
        assert!(!html.contains("/mapa.png?"));
    }

    #[test]
    fn test_coordinate_mode_is_checked() {
        let form = MapForm {
            mode: Mode::Coords,
            lat: Some("1.5".to_string()),
            lon: Some("2.5".to_string()),
            ..MapForm::default()
        };
        let html = Pages::new().unwrap().error(&form, "boom").unwrap();
        assert!(html.contains("value=\"coords\" checked"));
        assert!(html.contains("name=\"lat\" value=\"1.5\""));
    }

    #[test]
    fn test_user_text_is_escaped() {
        let form = MapForm {
            place: Some("\"><script>alert(1)</script>".to_string()),
            ..MapForm::default()
        };
        let pages = Pages::new().unwrap();
        let html = pages.error(&form, "No geometry found for: <script>").unwrap();
        assert!(html.contains("class=\"error\">No geometry found for: &lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<img"));

        let html = pages.result(&form, "Map of <b>", &png(&[0])).unwrap();
        assert!(html.contains("<h2>Map of &lt;b&gt;</h2>"));
        assert!(!html.contains("<b>"));
    }
}
