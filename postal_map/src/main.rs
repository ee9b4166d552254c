#[macro_use] extern crate log;

use postal_map::{cli, logging, MapConfig, MapPipeline};
use std::time::Instant;

fn main() {
    let config = match MapConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    logging::init(config.log_level());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = match run(config, &args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

fn run(config: MapConfig, args: &[String]) -> Result<i32, anyhow::Error> {
    let start = Instant::now();
    let runtime = tokio::runtime::Runtime::new()?;
    let pipeline = MapPipeline::new(config)?;
    let code = runtime.block_on(cli::run(args, &pipeline));
    debug!("Finished in {:.2}s", start.elapsed().as_secs_f64());
    Ok(code)
}
