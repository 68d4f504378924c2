//! Overlap-to-margin conversion and tile geometry
//!
//! Tiles are rendered with an extended footprint: a bounding box grown by
//! `overlap` on every side. The margin is the number of pixels per side that
//! belong to the neighbors, and every component derives it from
//! [`margin_pixels`] so crop, blend, seam repair and scoring agree.

use crate::io::configuration::{LAYOUT_FILE, MAX_OVERLAP};
use crate::io::error::{Result, WithPath, invalid_parameter, structural_error};
use crate::spatial::grid::TileGrid;
use crate::spatial::tiles::TileStore;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pixels per side covered by the overlap margin
///
/// `round(size * overlap / (1 + 2 * overlap))` with ties to even, clamped to
/// `[0, size / 2]`. Non-positive or non-finite overlaps yield 0.
pub fn margin_pixels(size: u32, overlap: f64) -> u32 {
    if !overlap.is_finite() || overlap <= 0.0 {
        return 0;
    }
    let fraction = overlap / 2.0f64.mul_add(overlap, 1.0);
    let margin = (f64::from(size) * fraction).round_ties_even();
    (margin.max(0.0) as u32).min(size / 2)
}

/// Reject overlaps outside `[0, 0.49)`
///
/// # Errors
///
/// Returns an invalid parameter error for non-finite or out of range values
pub fn validate_overlap(overlap: f64) -> Result<f64> {
    if overlap.is_finite() && (0.0..MAX_OVERLAP).contains(&overlap) {
        Ok(overlap)
    } else {
        Err(invalid_parameter(
            "overlap",
            &overlap,
            &format!("must be in [0, {MAX_OVERLAP})"),
        ))
    }
}

/// Tile dimensions together with their overlap margins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGeometry {
    /// Full tile width in pixels
    pub width: u32,
    /// Full tile height in pixels
    pub height: u32,
    /// Horizontal margin per side
    pub margin_x: u32,
    /// Vertical margin per side
    pub margin_y: u32,
}

impl TileGeometry {
    /// Derive margins for a tile size and overlap fraction
    pub fn new(width: u32, height: u32, overlap: f64) -> Self {
        Self {
            width,
            height,
            margin_x: margin_pixels(width, overlap),
            margin_y: margin_pixels(height, overlap),
        }
    }

    /// Width of the interior left after removing both horizontal margins
    pub fn cropped_width(&self) -> u32 {
        self.width.saturating_sub(2 * self.margin_x).max(1)
    }

    /// Height of the interior left after removing both vertical margins
    pub fn cropped_height(&self) -> u32 {
        self.height.saturating_sub(2 * self.margin_y).max(1)
    }
}

/// Size recorded in the layout metadata file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    /// Width in pixels
    pub w: u32,
    /// Height in pixels
    pub h: u32,
}

/// Optional `tilejson.json` found at the root of a tile layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetadata {
    /// Overlap fraction the tiles were rendered with
    #[serde(default)]
    pub overlap: Option<f64>,
    /// Tile size when it is known ahead of decoding
    #[serde(default)]
    pub tile_size: Option<TileSize>,
}

impl LayoutMetadata {
    /// Read the metadata file of a layer, if present
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed
    pub fn load(layer_dir: &Path) -> Result<Option<Self>> {
        let path = layer_dir.join(LAYOUT_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).with_path(&path, "read")?;
        let metadata = serde_json::from_str(&text).with_path(&path, "parse")?;
        Ok(Some(metadata))
    }
}

/// Tile geometry of a layer and the overlap it was derived from
///
/// The overlap comes from `overlap`, then the metadata, then 0. The tile size
/// comes from the metadata or else from the first present tile in row-major
/// order.
///
/// # Errors
///
/// Returns an invalid parameter error for an out of range overlap and a
/// structural error when no tile can be decoded to learn the size
pub fn resolve_geometry(
    metadata: Option<&LayoutMetadata>,
    overlap: Option<f64>,
    store: &dyn TileStore,
    grid: &TileGrid,
) -> Result<(TileGeometry, f64)> {
    let overlap = validate_overlap(
        overlap
            .or_else(|| metadata.and_then(|m| m.overlap))
            .unwrap_or(0.0),
    )?;
    if let Some(size) = metadata.and_then(|m| m.tile_size) {
        return Ok((TileGeometry::new(size.w, size.h, overlap), overlap));
    }
    for coord in grid.present() {
        if let Some(tile) = store.load(coord)? {
            return Ok((TileGeometry::new(tile.width(), tile.height(), overlap), overlap));
        }
    }
    Err(structural_error("<layer>", &"no readable tile to infer the tile size"))
}
