//! Tile asset loading.
//!
//! The compositor acquires tile bitmaps through the [`TileLoader`] seam so
//! the asset source (a sprite directory, an in-memory set, a remote cache)
//! stays outside the core. Loads happen concurrently during a composite, so
//! implementations must tolerate calls from multiple threads.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use image::{ImageReader, RgbaImage};
use thiserror::Error;

use crate::palette::TileId;
use crate::TILE_SIZE;

/// Decoded tile pixel content, always [`TILE_SIZE`] square RGBA
pub type TileBitmap = RgbaImage;

/// Failure to produce the bitmap for a single tile
#[derive(Error, Debug)]
pub enum TileLoadError {
    #[error("failed to read tile asset: {0}")]
    Io(#[from] io::Error),

    #[error("failed to decode tile asset: {0}")]
    Decode(#[from] image::ImageError),

    #[error("tile bitmap is {width}x{height}, expected {expected}x{expected}", expected = TILE_SIZE)]
    WrongDimensions { width: u32, height: u32 },

    #[error("no tile asset registered under this id")]
    Missing,
}

/// Yields the bitmap for a tile id, or fails for that tile alone.
///
/// One load is issued per matched source pixel; the compositor does not
/// deduplicate repeated ids, so cheap repeated access is the loader's
/// concern if it wants it.
pub trait TileLoader: Sync {
    fn load(&self, id: &TileId) -> Result<TileBitmap, TileLoadError>;
}

fn check_dimensions(bitmap: TileBitmap) -> Result<TileBitmap, TileLoadError> {
    if bitmap.width() != TILE_SIZE || bitmap.height() != TILE_SIZE {
        return Err(TileLoadError::WrongDimensions {
            width: bitmap.width(),
            height: bitmap.height(),
        });
    }
    Ok(bitmap)
}

/// Loads tile sprites from a directory, one image file per tile id
#[derive(Debug, Clone)]
pub struct DirectoryTileLoader {
    root: PathBuf,
}

impl DirectoryTileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryTileLoader { root: root.into() }
    }
}

impl TileLoader for DirectoryTileLoader {
    fn load(&self, id: &TileId) -> Result<TileBitmap, TileLoadError> {
        let file = File::open(self.root.join(id.as_str()))?;
        let reader = ImageReader::new(BufReader::new(file)).with_guessed_format()?;
        check_dimensions(reader.decode()?.to_rgba8())
    }
}

/// In-memory tile set keyed by id. Handy for tests and generated sprites.
#[derive(Debug, Default, Clone)]
pub struct MemoryTileLoader {
    tiles: HashMap<TileId, TileBitmap>,
}

impl MemoryTileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bitmap under `id`, replacing any previous one.
    /// Dimensions are checked at load time, not here.
    pub fn insert(&mut self, id: impl Into<TileId>, bitmap: TileBitmap) {
        self.tiles.insert(id.into(), bitmap);
    }
}

impl TileLoader for MemoryTileLoader {
    fn load(&self, id: &TileId) -> Result<TileBitmap, TileLoadError> {
        let bitmap = self.tiles.get(id).cloned().ok_or(TileLoadError::Missing)?;
        check_dimensions(bitmap)
    }
}
