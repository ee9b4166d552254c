use crate::app::form::MapForm;
use crate::app::pages::Pages;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use postal_map::{encode_network_png, MapError, MapPipeline, RenderedMap};

const HTML: &str = "text/html; charset=utf-8";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/map", web::get().to(map_page));
}

fn status_for(error: &MapError) -> StatusCode {
    match error {
        MapError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        MapError::NotFound { .. } | MapError::NoData { .. } => StatusCode::NOT_FOUND,
        MapError::Upstream(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn html(status: StatusCode, page: tera::Result<String>) -> HttpResponse {
    match page {
        Ok(body) => HttpResponse::build(status).content_type(HTML).body(body),
        Err(e) => {
            error!("Template rendering failed: {:?}", e);
            HttpResponse::InternalServerError()
                .content_type("text/plain; charset=utf-8")
                .body("Template rendering failed")
        }
    }
}

/// Fetch on the async path, then plot, frame and encode on a blocking thread.
async fn generate(pipeline: web::Data<MapPipeline>, form: &MapForm) -> Result<(String, RenderedMap), MapError> {
    let query = form.to_query()?;
    let caption = form.caption(&query);
    let network = pipeline.fetch_network(&query).await?;
    let map = web::block(move || encode_network_png(&pipeline, &network))
        .await
        .map_err(|e| MapError::Render(format!("render worker failed: {}", e)))??;
    Ok((caption, map))
}

async fn index(pages: web::Data<Pages>) -> HttpResponse {
    html(StatusCode::OK, pages.index())
}

async fn map_page(
    pipeline: web::Data<MapPipeline>,
    pages: web::Data<Pages>,
    form: web::Query<MapForm>,
) -> HttpResponse {
    let form = form.into_inner();
    match generate(pipeline, &form).await {
        Ok((caption, map)) => {
            info!("Serving {} ({} bytes)", caption, map.attachment.bytes.len());
            html(StatusCode::OK, pages.result(&form, &caption, &map.attachment))
        }
        Err(e) => {
            warn!("Map request failed: {}", e);
            html(status_for(&e), pages.error(&form, &e.to_string()))
        }
    }
}
