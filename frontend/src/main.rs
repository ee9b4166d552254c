mod app;

#[macro_use] extern crate log;

use actix_web::{web, App, HttpServer};
use app::pages::Pages;
use postal_map::{logging, MapConfig, MapPipeline};

#[actix_web::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = MapConfig::load()?;
    logging::init(config.log_level());

    let bind_address = config.bind_address.clone();
    let pipeline = web::Data::new(MapPipeline::new(config)?);
    let pages = web::Data::new(Pages::new()?);

    info!("Starting map frontend on http://{}", bind_address);
    HttpServer::new(move || {
        App::new()
            .app_data(pipeline.clone())
            .app_data(pages.clone())
            .configure(app::routes::configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
