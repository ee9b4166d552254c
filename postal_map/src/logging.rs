use log::LevelFilter;

/// Install the pretty logger at `level`; a `RUST_LOG` setting still wins.
pub fn init(level: LevelFilter) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if builder.try_init().is_err() {
        warn!("Logger already initialised");
    }
}
