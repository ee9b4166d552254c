#[macro_use] extern crate log;

pub mod area;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod error;
pub mod font;
pub mod frame;
pub mod location;
pub mod logging;
pub mod pipeline;
pub mod projection;
pub mod render;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::MapConfig;
pub use delivery::{encode_network_png, render_png, write_png_file, PngAttachment, RenderedMap};
pub use error::{MapError, Result};
pub use location::{DisplayLabel, LocationQuery};
pub use pipeline::{FetchedNetwork, MapPipeline};
