use crate::delivery::write_png_file;
use crate::error::{MapError, Result};
use crate::location::{parse_coordinates, LocationQuery};
use crate::pipeline::MapPipeline;
use std::path::PathBuf;

pub const USAGE: &str = "Usage:\n  postal_map <place_name> <output_file>\n  postal_map -coords <lat>,<lon> <output_file>";

const COORDS_FLAG: &str = "-coords";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CliRequest {
    pub query: LocationQuery,
    pub output: PathBuf,
}

#[derive(Debug, PartialEq)]
pub enum ParsedArgs {
    Usage,
    Request(CliRequest),
}

/// Parse the arguments following the program name.
pub fn parse_args(args: &[String]) -> Result<ParsedArgs> {
    if args.len() < 2 {
        return Ok(ParsedArgs::Usage);
    }
    if args[0] == COORDS_FLAG {
        let (lat, lon) = parse_coordinates(&args[1])?;
        let output = args
            .get(2)
            .ok_or_else(|| MapError::invalid("missing output file after coordinates"))?;
        return Ok(ParsedArgs::Request(CliRequest {
            query: LocationQuery::Coordinates { lat, lon },
            output: PathBuf::from(output),
        }));
    }
    Ok(ParsedArgs::Request(CliRequest {
        query: LocationQuery::Place(args[0].clone()),
        output: PathBuf::from(&args[1]),
    }))
}

/// Run the command line against `pipeline` and return the process exit code.
pub async fn run(args: &[String], pipeline: &MapPipeline) -> i32 {
    let request = match parse_args(args) {
        Ok(ParsedArgs::Request(request)) => request,
        Ok(ParsedArgs::Usage) => {
            eprintln!("{}", USAGE);
            return 1;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    match write_png_file(pipeline, &request.query, &request.output).await {
        Ok(()) => {
            println!("Map saved to: {}", request.output.display());
            0
        }
        Err(e) => {
            error!("Map generation failed: {}", e);
            eprintln!("Error: {}", e);
            1
        }
    }
}
