//! Mosaic composition: per-pixel matching, usage accounting, and output
//! assembly.
//!
//! A composite runs in three phases. The match phase walks the source
//! row-major, skips fully transparent pixels, and plans one tile placement
//! per remaining pixel. The acquisition phase fans the planned loads out
//! across worker threads and joins on all of them. The assembly phase blits
//! every successfully loaded bitmap into its block of the output image.

use std::collections::HashMap;

use image::{imageops, RgbaImage};
use itertools::Itertools;
use log::{debug, warn};
use rayon::prelude::*;
use thiserror::Error;

use crate::color::Rgb;
use crate::loader::{TileBitmap, TileLoadError, TileLoader};
use crate::palette::{PaletteStore, TileId};
use crate::TILE_SIZE;

/// Whole-conversion failure. Per-tile problems never surface here; they are
/// logged and the affected block stays transparent.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConversionError {
    /// Not a single source pixel produced a tile placement
    #[error("no source pixel matched any palette tile")]
    NoMatches,
}

/// Per-tile selection counts for one conversion.
///
/// A tile is counted when the matcher picks it, so a later load failure for
/// that tile does not lower its count.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UsageCount {
    counts: HashMap<TileId, u64>,
}

impl UsageCount {
    fn record(&mut self, tile: &TileId) {
        *self.counts.entry(tile.clone()).or_insert(0) += 1;
    }

    /// Count for one tile; zero when it was never picked
    pub fn get(&self, tile: &TileId) -> u64 {
        self.counts.get(tile).copied().unwrap_or(0)
    }

    /// Total number of matches across all tiles
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Counts ordered by tile id ascending, the presentation order
    pub fn entries(&self) -> Vec<(&TileId, u64)> {
        self.counts
            .iter()
            .map(|(tile, &count)| (tile, count))
            .sorted_by(|a, b| a.0.cmp(b.0))
            .collect()
    }
}

/// A finished conversion: the assembled image and the usage tally
#[derive(Debug, Clone, PartialEq)]
pub struct Mosaic {
    /// Output buffer, source width x [`TILE_SIZE`] by source height x
    /// [`TILE_SIZE`]. Blocks without a placed tile stay fully transparent.
    pub image: RgbaImage,
    pub usage: UsageCount,
}

/// One matched pixel: which tile goes into which grid cell
struct Placement<'a> {
    cell_x: u32,
    cell_y: u32,
    tile: &'a TileId,
}

/// Convert `source` into a tile mosaic.
///
/// Every pixel with nonzero alpha is matched against the palette and its
/// block filled with the matched tile's bitmap. Pixels that match nothing
/// (empty palette) and tiles that fail to load are logged and leave their
/// block transparent. The conversion as a whole fails only when nothing at
/// all was placed.
pub fn composite<L>(
    source: &RgbaImage,
    palette: &PaletteStore,
    loader: &L,
) -> Result<Mosaic, ConversionError>
where
    L: TileLoader + ?Sized,
{
    let (usage, placements) = plan_placements(source, palette);

    // One load per matched pixel, no deduplication. The ordered collect is
    // the join point and keeps results aligned with the placement list.
    let bitmaps: Vec<Result<TileBitmap, TileLoadError>> = placements
        .par_iter()
        .map(|placement| loader.load(placement.tile))
        .collect();

    let mut image = RgbaImage::new(source.width() * TILE_SIZE, source.height() * TILE_SIZE);
    let mut placed = 0usize;

    for (placement, bitmap) in placements.iter().zip(bitmaps) {
        match bitmap {
            Ok(bitmap) if bitmap.dimensions() == (TILE_SIZE, TILE_SIZE) => {
                imageops::replace(
                    &mut image,
                    &bitmap,
                    (placement.cell_x * TILE_SIZE) as i64,
                    (placement.cell_y * TILE_SIZE) as i64,
                );
                placed += 1;
            }
            Ok(bitmap) => {
                warn!(
                    "tile {} is {}x{}, expected {TILE_SIZE}x{TILE_SIZE}; skipping cell ({}, {})",
                    placement.tile,
                    bitmap.width(),
                    bitmap.height(),
                    placement.cell_x,
                    placement.cell_y,
                );
            }
            Err(err) => {
                warn!(
                    "failed to load tile {} for cell ({}, {}): {err}",
                    placement.tile, placement.cell_x, placement.cell_y,
                );
            }
        }
    }

    if placed == 0 {
        return Err(ConversionError::NoMatches);
    }

    debug!("placed {placed} of {} matched cells", placements.len());
    Ok(Mosaic { image, usage })
}

/// Match phase: visit every pixel once, row-major, and plan a placement for
/// each one that is not fully transparent.
fn plan_placements<'a>(
    source: &RgbaImage,
    palette: &'a PaletteStore,
) -> (UsageCount, Vec<Placement<'a>>) {
    let mut usage = UsageCount::default();
    let mut placements = Vec::new();

    for y in 0..source.height() {
        for x in 0..source.width() {
            let [r, g, b, a] = source.get_pixel(x, y).0;
            if a == 0 {
                continue;
            }
            match palette.closest_tile(Rgb::new(r, g, b)) {
                Some(tile) => {
                    usage.record(tile);
                    placements.push(Placement {
                        cell_x: x,
                        cell_y: y,
                        tile,
                    });
                }
                None => {
                    warn!("no tile found for color ({r}, {g}, {b})");
                }
            }
        }
    }

    (usage, placements)
}
