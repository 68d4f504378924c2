//! Assembly of a tile grid into one mosaic and re-splitting it into tiles
//!
//! Tiles are placed on a lattice of cropped interiors: tile `(x, y)` covers
//! `[(x - min_x) * cw, (x - min_x + 1) * cw)` horizontally, and the same with
//! `ch` vertically. Missing tiles leave background holes.

use crate::io::error::Result;
use crate::io::report::{GeometrySummary, GridSummary};
use crate::math::accumulator::{Uncovered, WeightBuffer};
use crate::math::ramp::{fade_axis, outer};
use crate::spatial::grid::{TileCoord, TileGrid};
use crate::spatial::layout::TileGeometry;
use crate::spatial::tiles::{TileStore, load_sized};
use clap::ValueEnum;
use image::{Rgb, RgbImage, imageops};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Compositing strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MosaicMode {
    /// Paste cropped interiors side by side
    #[default]
    Crop,
    /// Feather overlapping margins into their neighbors
    Blend,
}

/// Counts gathered while assembling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyStats {
    /// Tiles composited
    pub placed: usize,
    /// Span positions without a tile
    pub missing: usize,
}

/// Summary of an assembled mosaic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MosaicReport {
    /// Compositing strategy
    pub mode: MosaicMode,
    /// Grid span and gaps
    pub grid: GridSummary,
    /// Tile size and margins
    pub geometry: GeometrySummary,
    /// Mosaic width and height
    pub mosaic_size: (u32, u32),
    /// Tiles placed and missing
    pub stats: AssemblyStats,
}

impl MosaicReport {
    /// Describe an assembled mosaic
    pub fn new(
        mode: MosaicMode,
        grid: &TileGrid,
        overlap: f64,
        mosaic: &Mosaic,
        stats: AssemblyStats,
    ) -> Self {
        Self {
            mode,
            grid: GridSummary::of(grid),
            geometry: GeometrySummary::of(mosaic.geometry, overlap),
            mosaic_size: mosaic.image.dimensions(),
            stats,
        }
    }
}

/// Assembled mosaic together with the layout needed to split it again
#[derive(Debug, Clone)]
pub struct Mosaic {
    /// Composited pixels
    pub image: RgbImage,
    /// Tile geometry used for placement
    pub geometry: TileGeometry,
    /// Coordinate placed at the top-left corner
    pub origin: TileCoord,
    /// Columns in the span
    pub columns: u32,
    /// Rows in the span
    pub rows: u32,
}

impl Mosaic {
    /// Top-left pixel of a tile's cropped interior
    pub fn tile_origin(&self, coord: TileCoord) -> Option<(u32, u32)> {
        let col = u32::try_from(coord.x - self.origin.x).ok()?;
        let row = u32::try_from(coord.y - self.origin.y).ok()?;
        (col < self.columns && row < self.rows).then(|| {
            (
                col * self.geometry.cropped_width(),
                row * self.geometry.cropped_height(),
            )
        })
    }

    /// Cropped interior region of a tile
    pub fn tile_region(&self, coord: TileCoord) -> Option<RgbImage> {
        let (x0, y0) = self.tile_origin(coord)?;
        let region = imageops::crop_imm(
            &self.image,
            x0,
            y0,
            self.geometry.cropped_width(),
            self.geometry.cropped_height(),
        );
        Some(region.to_image())
    }

    /// Paste a tile's mosaic region into its original at the margin offset
    pub fn write_back(&self, coord: TileCoord, original: &RgbImage) -> Option<RgbImage> {
        let region = self.tile_region(coord)?;
        let mut tile = original.clone();
        imageops::replace(
            &mut tile,
            &region,
            i64::from(self.geometry.margin_x),
            i64::from(self.geometry.margin_y),
        );
        Some(tile)
    }
}

fn blank(grid: &TileGrid, geometry: TileGeometry, background: [u8; 3]) -> Mosaic {
    let width = geometry.cropped_width() * grid.columns();
    let height = geometry.cropped_height() * grid.rows();
    Mosaic {
        image: RgbImage::from_pixel(width, height, Rgb(background)),
        geometry,
        origin: TileCoord::new(grid.min_x(), grid.min_y()),
        columns: grid.columns(),
        rows: grid.rows(),
    }
}

/// Paste the cropped interior of every present tile
///
/// # Errors
///
/// Propagates tile decoding errors
pub fn assemble_crop(
    store: &dyn TileStore,
    grid: &TileGrid,
    geometry: TileGeometry,
    background: [u8; 3],
) -> Result<(Mosaic, AssemblyStats)> {
    let mut mosaic = blank(grid, geometry, background);
    let mut stats = AssemblyStats::default();

    for coord in grid.span() {
        let Some(tile) = load_sized(store, coord, geometry.width, geometry.height)? else {
            stats.missing += 1;
            continue;
        };
        let Some((x0, y0)) = mosaic.tile_origin(coord) else {
            continue;
        };
        let interior = imageops::crop_imm(
            &tile,
            geometry.margin_x,
            geometry.margin_y,
            geometry.cropped_width(),
            geometry.cropped_height(),
        )
        .to_image();
        imageops::replace(&mut mosaic.image, &interior, i64::from(x0), i64::from(y0));
        stats.placed += 1;
    }

    debug!(
        placed = stats.placed,
        missing = stats.missing,
        "assembled cropped mosaic"
    );
    Ok((mosaic, stats))
}

/// Composite tiles with feathered overlaps toward present neighbors
///
/// Each tile's interior is extended by `min(feather, margin)` toward every
/// side that has a neighbor. Over the shared zone the two tiles carry
/// complementary linear ramps, so their weights sum to 1; sides without a
/// neighbor keep full weight. With zero margins this equals
/// [`assemble_crop`].
///
/// # Errors
///
/// Propagates tile decoding errors
pub fn assemble_blend(
    store: &dyn TileStore,
    grid: &TileGrid,
    geometry: TileGeometry,
    feather: u32,
    background: [u8; 3],
) -> Result<(Mosaic, AssemblyStats)> {
    let mut mosaic = blank(grid, geometry, background);
    let mut buffer = WeightBuffer::new(mosaic.image.width(), mosaic.image.height());
    let mut stats = AssemblyStats::default();
    let ext_x = feather.min(geometry.margin_x);
    let ext_y = feather.min(geometry.margin_y);

    for coord in grid.span() {
        let Some(tile) = load_sized(store, coord, geometry.width, geometry.height)? else {
            stats.missing += 1;
            continue;
        };
        let Some((x0, y0)) = mosaic.tile_origin(coord) else {
            continue;
        };

        let ext = |present: bool, amount: u32| if present { amount } else { 0 };
        let left = ext(grid.contains(coord.left()), ext_x);
        let right = ext(grid.contains(coord.right()), ext_x);
        let top = ext(grid.contains(coord.top()), ext_y);
        let bottom = ext(grid.contains(coord.bottom()), ext_y);

        let region_w = geometry.cropped_width() + left + right;
        let region_h = geometry.cropped_height() + top + bottom;
        let region = imageops::crop_imm(
            &tile,
            geometry.margin_x - left,
            geometry.margin_y - top,
            region_w,
            region_h,
        )
        .to_image();

        let wx = fade_axis(
            region.width() as usize,
            2 * left as usize,
            2 * right as usize,
        );
        let wy = fade_axis(
            region.height() as usize,
            2 * top as usize,
            2 * bottom as usize,
        );
        buffer.add(
            &region,
            i64::from(x0) - i64::from(left),
            i64::from(y0) - i64::from(top),
            &outer(&wy, &wx),
        );
        stats.placed += 1;
    }

    mosaic.image = buffer.resolve(Uncovered::Background(background));
    debug!(
        placed = stats.placed,
        missing = stats.missing,
        feather,
        "assembled blended mosaic"
    );
    Ok((mosaic, stats))
}

/// Assemble with the given mode
///
/// # Errors
///
/// Propagates tile decoding errors
pub fn assemble(
    mode: MosaicMode,
    store: &dyn TileStore,
    grid: &TileGrid,
    geometry: TileGeometry,
    feather: u32,
    background: [u8; 3],
) -> Result<(Mosaic, AssemblyStats)> {
    match mode {
        MosaicMode::Crop => assemble_crop(store, grid, geometry, background),
        MosaicMode::Blend => assemble_blend(store, grid, geometry, feather, background),
    }
}
