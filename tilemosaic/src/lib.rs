//! Image to tile-mosaic conversion.
//!
//! Replaces every opaque pixel of a source image with the 16x16 tile sprite
//! whose representative palette color is nearest in RGB space, assembling a
//! mosaic sixteen times the source size in each dimension and a per-tile
//! usage tally alongside it.
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use tilemosaic::{composite, MemoryTileLoader, PaletteStore, TILE_SIZE};
//!
//! // A 1x1 red source image and a palette with a single red tile.
//! let source = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
//!
//! let mut palette = PaletteStore::new();
//! palette.load(r#"[{ "color": [255, 0, 0], "image": "red.png" }]"#.as_bytes())?;
//!
//! let mut tiles = MemoryTileLoader::new();
//! tiles.insert(
//!     "red.png",
//!     RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba([255, 0, 0, 255])),
//! );
//!
//! let mosaic = composite(&source, &palette, &tiles)?;
//! assert_eq!(mosaic.image.dimensions(), (TILE_SIZE, TILE_SIZE));
//! assert_eq!(mosaic.usage.get(&"red.png".into()), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod color;
pub mod loader;
pub mod mosaic;
pub mod palette;

pub use color::{distance_squared, Rgb};
pub use loader::{DirectoryTileLoader, MemoryTileLoader, TileBitmap, TileLoadError, TileLoader};
pub use mosaic::{composite, ConversionError, Mosaic, UsageCount};
pub use palette::{closest_tile, PaletteEntry, PaletteError, PaletteStore, TileId};

/// Edge length of a tile sprite in pixels. Every output block is this square.
pub const TILE_SIZE: u32 = 16;
