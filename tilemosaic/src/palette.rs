//! Palette records, the session palette store, and the nearest-tile matcher.
//!
//! A palette is an ordered list of (color, tile id) records loaded once per
//! session from a JSON description. Order matters only as the tie-break for
//! equal-distance matches: the earliest record at the minimum distance wins.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::color::{distance_squared, Rgb};

/// Errors raised while loading a palette description
#[derive(Error, Debug)]
pub enum PaletteError {
    #[error("failed to read palette source: {0}")]
    Io(#[from] io::Error),

    #[error("malformed palette description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid hex color {value:?} for tile {tile:?}")]
    InvalidHexColor { value: String, tile: String },

    #[error("palette is already loaded")]
    AlreadyLoaded,
}

/// Opaque tile identifier, typically a sprite filename.
///
/// Comparison is byte-wise lexicographic; usage summaries sort by it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(String);

impl TileId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TileId {
    fn from(id: String) -> Self {
        TileId(id)
    }
}

impl From<&str> for TileId {
    fn from(id: &str) -> Self {
        TileId(id.to_owned())
    }
}

/// One palette record: a representative color and the tile it stands for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteEntry {
    pub color: Rgb,
    pub tile: TileId,
}

impl PaletteEntry {
    pub fn new(color: Rgb, tile: impl Into<TileId>) -> Self {
        PaletteEntry {
            color,
            tile: tile.into(),
        }
    }
}

/// Raw JSON record: `{"color": [64, 128, 0], "image": "grass.png"}`.
/// The color may also be given as a "#RRGGBB" or "RRGGBB" hex string.
#[derive(Deserialize)]
struct RawEntry {
    color: ColorSpec,
    image: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorSpec {
    Components([u8; 3]),
    Hex(String),
}

impl RawEntry {
    fn into_entry(self) -> Result<PaletteEntry, PaletteError> {
        let color = match self.color {
            ColorSpec::Components(rgb) => rgb.into(),
            ColorSpec::Hex(text) => {
                parse_hex_color(&text).ok_or_else(|| PaletteError::InvalidHexColor {
                    value: text,
                    tile: self.image.clone(),
                })?
            }
        };
        Ok(PaletteEntry {
            color,
            tile: TileId(self.image),
        })
    }
}

/// Parse a "#RRGGBB" or "RRGGBB" color string
fn parse_hex_color(text: &str) -> Option<Rgb> {
    let digits = text.strip_prefix('#').unwrap_or(text);
    if digits.len() != 6 {
        return None;
    }
    let mut bytes = [0u8; 3];
    hex::decode_to_slice(digits, &mut bytes).ok()?;
    Some(bytes.into())
}

fn parse_entries(source: impl Read) -> Result<Vec<PaletteEntry>, PaletteError> {
    let raw: Vec<RawEntry> = serde_json::from_reader(source)?;
    raw.into_iter().map(RawEntry::into_entry).collect()
}

#[derive(Debug, Default)]
enum LoadState {
    #[default]
    Uninitialized,
    Loaded(Vec<PaletteEntry>),
    Failed(String),
}

/// The session palette: empty until loaded, then fixed for its lifetime.
///
/// A failed load leaves the store empty, so every lookup degrades to "no
/// tile found", and records the reason for inspection. Loading may be
/// retried after a failure but not after a success.
#[derive(Debug, Default)]
pub struct PaletteStore {
    state: LoadState,
}

impl PaletteStore {
    /// Create an empty, not-yet-loaded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store directly from prepared entries, preserving their order
    pub fn from_entries(entries: Vec<PaletteEntry>) -> Self {
        PaletteStore {
            state: LoadState::Loaded(entries),
        }
    }

    /// Parse a JSON palette description from `source` and populate the store.
    ///
    /// Returns the number of entries read. Any read or parse problem
    /// invalidates the whole description: the store keeps no partial prefix
    /// and moves to the failed state.
    pub fn load(&mut self, source: impl Read) -> Result<usize, PaletteError> {
        if matches!(self.state, LoadState::Loaded(_)) {
            return Err(PaletteError::AlreadyLoaded);
        }
        match parse_entries(source) {
            Ok(entries) => {
                info!("loaded {} palette entries", entries.len());
                let count = entries.len();
                self.state = LoadState::Loaded(entries);
                Ok(count)
            }
            Err(err) => {
                self.state = LoadState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Load the palette description from a file
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<usize, PaletteError> {
        if matches!(self.state, LoadState::Loaded(_)) {
            return Err(PaletteError::AlreadyLoaded);
        }
        let file = match File::open(path.as_ref()) {
            Ok(file) => file,
            Err(err) => {
                let err = PaletteError::from(err);
                self.state = LoadState::Failed(err.to_string());
                return Err(err);
            }
        };
        self.load(BufReader::new(file))
    }

    /// Entries in load order; empty unless a load has succeeded
    pub fn entries(&self) -> &[PaletteEntry] {
        match &self.state {
            LoadState::Loaded(entries) => entries,
            _ => &[],
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded(_))
    }

    /// Reason the last load failed, if it did
    pub fn load_failure(&self) -> Option<&str> {
        match &self.state {
            LoadState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Nearest palette tile to `color`; see [`closest_tile`]
    pub fn closest_tile(&self, color: Rgb) -> Option<&TileId> {
        closest_tile(color, self.entries())
    }
}

/// Find the entry whose color is nearest to `color` in RGB space.
///
/// Linear scan holding a running minimum, compared with strict less-than:
/// the earliest entry at the minimum distance wins and later exact ties do
/// not displace it. Palettes stay small (tens of records), so no index
/// structure is used. Returns `None` only when `entries` is empty.
pub fn closest_tile(color: Rgb, entries: &[PaletteEntry]) -> Option<&TileId> {
    let mut best = None;
    let mut best_distance = u32::MAX;

    for entry in entries {
        let distance = distance_squared(color, entry.color);
        if distance < best_distance {
            best_distance = distance;
            best = Some(&entry.tile);
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(color: (u8, u8, u8), tile: &str) -> PaletteEntry {
        PaletteEntry::new(Rgb::new(color.0, color.1, color.2), tile)
    }

    #[test]
    fn parses_component_and_hex_colors() {
        let json = r##"[
            { "color": [64, 128, 0], "image": "grass.png" },
            { "color": "#804000", "image": "dirt.png" },
            { "color": "A0A0A0", "image": "stone.png" }
        ]"##;

        let mut store = PaletteStore::new();
        assert_eq!(store.load(json.as_bytes()).unwrap(), 3);
        assert!(store.is_loaded());
        assert_eq!(
            store.entries(),
            &[
                entry((64, 128, 0), "grass.png"),
                entry((128, 64, 0), "dirt.png"),
                entry((160, 160, 160), "stone.png"),
            ]
        );
    }

    #[test]
    fn empty_description_is_a_valid_load() {
        let mut store = PaletteStore::new();
        assert_eq!(store.load("[]".as_bytes()).unwrap(), 0);
        assert!(store.is_loaded());
        assert!(store.entries().is_empty());
    }

    #[test]
    fn out_of_range_component_fails_whole_load() {
        let json = r#"[
            { "color": [0, 0, 0], "image": "black.png" },
            { "color": [256, 0, 0], "image": "red.png" }
        ]"#;

        let mut store = PaletteStore::new();
        let err = store.load(json.as_bytes()).unwrap_err();
        assert!(matches!(err, PaletteError::Json(_)));
        assert!(store.entries().is_empty());
        assert!(store.load_failure().is_some());
    }

    #[test]
    fn missing_field_fails_whole_load() {
        let json = r#"[ { "color": [1, 2, 3] } ]"#;

        let mut store = PaletteStore::new();
        assert!(matches!(
            store.load(json.as_bytes()),
            Err(PaletteError::Json(_))
        ));
        assert!(store.entries().is_empty());
    }

    #[test]
    fn malformed_hex_color_fails_whole_load() {
        let json = r##"[ { "color": "#12345", "image": "odd.png" } ]"##;

        let mut store = PaletteStore::new();
        let err = store.load(json.as_bytes()).unwrap_err();
        match err {
            PaletteError::InvalidHexColor { value, tile } => {
                assert_eq!(value, "#12345");
                assert_eq!(tile, "odd.png");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.entries().is_empty());
    }

    #[test]
    fn non_hex_digits_are_rejected() {
        let json = r##"[ { "color": "#12G45Z", "image": "bad.png" } ]"##;

        let mut store = PaletteStore::new();
        assert!(matches!(
            store.load(json.as_bytes()),
            Err(PaletteError::InvalidHexColor { .. })
        ));
    }

    #[test]
    fn second_load_is_rejected() {
        let mut store = PaletteStore::new();
        store
            .load(r#"[{ "color": [1, 2, 3], "image": "a.png" }]"#.as_bytes())
            .unwrap();

        let err = store.load("[]".as_bytes()).unwrap_err();
        assert!(matches!(err, PaletteError::AlreadyLoaded));
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn load_may_be_retried_after_failure() {
        let mut store = PaletteStore::new();
        assert!(store.load("not json".as_bytes()).is_err());
        assert!(store.load_failure().is_some());

        assert_eq!(
            store
                .load(r#"[{ "color": [1, 2, 3], "image": "a.png" }]"#.as_bytes())
                .unwrap(),
            1
        );
        assert!(store.is_loaded());
        assert!(store.load_failure().is_none());
    }

    #[test]
    fn unreadable_path_sets_failed_state() {
        let mut store = PaletteStore::new();
        let missing = std::env::temp_dir().join("tilemosaic-no-such-palette.json");

        let err = store.load_path(&missing).unwrap_err();
        assert!(matches!(err, PaletteError::Io(_)));
        assert!(store.load_failure().is_some());
        assert!(store.entries().is_empty());
    }

    #[test]
    fn matcher_returns_global_minimum() {
        // Distances from the query: 25, 25, 9. The last entry must win even
        // though two closer-indexed entries were seen first.
        let entries = vec![
            entry((105, 100, 100), "a.png"),
            entry((100, 105, 100), "b.png"),
            entry((100, 100, 103), "c.png"),
        ];

        let tile = closest_tile(Rgb::new(100, 100, 100), &entries).unwrap();
        assert_eq!(tile.as_str(), "c.png");
    }

    #[test]
    fn matcher_breaks_ties_toward_the_first_entry() {
        let entries = vec![
            entry((10, 20, 30), "first.png"),
            entry((10, 20, 30), "second.png"),
        ];

        let tile = closest_tile(Rgb::new(200, 200, 200), &entries).unwrap();
        assert_eq!(tile.as_str(), "first.png");
    }

    #[test]
    fn matcher_breaks_symmetric_ties_toward_the_first_entry() {
        // Both entries sit at distance 100 from black.
        let entries = vec![entry((10, 0, 0), "red.png"), entry((0, 10, 0), "green.png")];

        let tile = closest_tile(Rgb::new(0, 0, 0), &entries).unwrap();
        assert_eq!(tile.as_str(), "red.png");
    }

    #[test]
    fn matcher_finds_nothing_in_an_empty_palette() {
        assert!(closest_tile(Rgb::new(1, 2, 3), &[]).is_none());
    }

    #[test]
    fn unloaded_store_matches_nothing() {
        let store = PaletteStore::new();
        assert!(store.closest_tile(Rgb::new(255, 0, 0)).is_none());
    }
}
