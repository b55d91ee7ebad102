//! Command-line driver: run one conversion job described by a JSON file.
//!
//! The binary is only a consumer of the library. It loads the palette,
//! decodes the input image, composites, writes the mosaic PNG, and prints
//! the usage table.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tilemosaic::{composite, ConversionError, DirectoryTileLoader, Mosaic, PaletteStore};

/// One conversion job. Every field has a default mirroring the stock asset
/// layout, so an empty job file (or none at all) is a valid job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct JobConfig {
    /// Palette description file
    palette_file: PathBuf,
    /// Directory holding one sprite image per tile id
    tiles_dir: PathBuf,
    /// Source image to convert
    input_image: PathBuf,
    /// Where to write the mosaic PNG
    output_image: PathBuf,
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            palette_file: PathBuf::from("assets/color_map.json"),
            tiles_dir: PathBuf::from("assets/tiles"),
            input_image: PathBuf::from("input.png"),
            output_image: PathBuf::from("mosaic.png"),
        }
    }
}

impl JobConfig {
    /// Read a job file, or fall back to the defaults when `path` is `None`
    fn load(path: Option<&str>) -> Result<Self, RunError> {
        match path {
            Some(path) => {
                let file = File::open(path)?;
                Ok(serde_json::from_reader(BufReader::new(file))?)
            }
            None => Ok(JobConfig::default()),
        }
    }
}

#[derive(Error, Debug)]
enum RunError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed job file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read input image: {0}")]
    ImageRead(#[from] image::ImageError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

fn main() -> ExitCode {
    env_logger::init();

    let config = match JobConfig::load(std::env::args().nth(1).as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("tilemosaic: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tilemosaic: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &JobConfig) -> Result<(), RunError> {
    // A palette that fails to load is not fatal here: the conversion runs
    // against the empty store and surfaces NoMatches on its own.
    let mut palette = PaletteStore::new();
    if let Err(err) = palette.load_path(&config.palette_file) {
        error!(
            "could not load palette from {}: {err}",
            config.palette_file.display()
        );
    }

    let source = image::open(&config.input_image)?.to_rgba8();
    info!(
        "converting {} ({}x{})",
        config.input_image.display(),
        source.width(),
        source.height()
    );

    let loader = DirectoryTileLoader::new(&config.tiles_dir);
    let mosaic = composite(&source, &palette, &loader)?;

    mosaic.image.save(&config.output_image)?;
    println!(
        "wrote {} ({}x{})",
        config.output_image.display(),
        mosaic.image.width(),
        mosaic.image.height()
    );

    print_usage_table(&mosaic);
    Ok(())
}

/// Print the per-tile usage summary, sorted by tile id, with the first
/// ".png" stripped from each label.
fn print_usage_table(mosaic: &Mosaic) {
    println!("tile usage:");
    for (tile, count) in mosaic.usage.entries() {
        println!("  {}: {count}", usage_label(tile.as_str()));
    }
}

fn usage_label(id: &str) -> String {
    id.replacen(".png", "", 1)
}
