//! Tile coordinate grid discovered from a `0/<x>/<y>.png` tree
//!
//! Coordinates need not be dense. The grid spans `min..=max` on each axis and
//! reports every index missing inside that span instead of assuming it away.

use crate::io::configuration::{TILE_EXTENSION, ZOOM_DIR};
use crate::io::error::{Result, WithPath, structural_error};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Address of a tile at zoom level 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Column index
    pub x: i32,
    /// Row index
    pub y: i32,
}

impl TileCoord {
    /// Create a coordinate
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Neighbor to the left
    pub const fn left(self) -> Self {
        Self::new(self.x - 1, self.y)
    }

    /// Neighbor above
    pub const fn top(self) -> Self {
        Self::new(self.x, self.y - 1)
    }

    /// Diagonal neighbor above and to the left
    pub const fn top_left(self) -> Self {
        Self::new(self.x - 1, self.y - 1)
    }

    /// Neighbor to the right
    pub const fn right(self) -> Self {
        Self::new(self.x + 1, self.y)
    }

    /// Neighbor below
    pub const fn bottom(self) -> Self {
        Self::new(self.x, self.y + 1)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.x, self.y)
    }
}

/// Direction of the shared edge between two adjacent tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeamOrientation {
    /// Tiles side by side, the edge runs top to bottom
    Vertical,
    /// Tiles stacked, the edge runs left to right
    Horizontal,
}

/// Ordered pair of adjacent coordinates
///
/// `first` is the left tile of a vertical seam or the top tile of a
/// horizontal seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeamPair {
    /// Edge direction
    pub orientation: SeamOrientation,
    /// Left or top tile
    pub first: TileCoord,
    /// Right or bottom tile
    pub second: TileCoord,
}

impl SeamPair {
    /// Vertical seam between `coord` and its right neighbor
    pub const fn vertical(coord: TileCoord) -> Self {
        Self {
            orientation: SeamOrientation::Vertical,
            first: coord,
            second: coord.right(),
        }
    }

    /// Horizontal seam between `coord` and the tile below it
    pub const fn horizontal(coord: TileCoord) -> Self {
        Self {
            orientation: SeamOrientation::Horizontal,
            first: coord,
            second: coord.bottom(),
        }
    }
}

/// Integer indices missing between the minimum and maximum of each axis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexGaps {
    /// Missing column indices
    pub x: Vec<i32>,
    /// Missing row indices
    pub y: Vec<i32>,
}

impl IndexGaps {
    /// True when both axes are dense
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() && self.y.is_empty()
    }
}

/// Sparse set of present tile coordinates with its bounding span
#[derive(Debug, Clone)]
pub struct TileGrid {
    present: HashSet<TileCoord>,
    x_values: Vec<i32>,
    y_values: Vec<i32>,
}

impl TileGrid {
    /// Build a grid from known coordinates
    ///
    /// # Errors
    ///
    /// Returns a structural error when no coordinate is given
    pub fn from_coords(coords: impl IntoIterator<Item = TileCoord>) -> Result<Self> {
        let present: HashSet<TileCoord> = coords.into_iter().collect();
        if present.is_empty() {
            return Err(structural_error("<memory>", &"no tiles found"));
        }

        let mut x_values: Vec<i32> = present.iter().map(|c| c.x).collect();
        let mut y_values: Vec<i32> = present.iter().map(|c| c.y).collect();
        x_values.sort_unstable();
        x_values.dedup();
        y_values.sort_unstable();
        y_values.dedup();

        Ok(Self {
            present,
            x_values,
            y_values,
        })
    }

    /// Enumerate `<layer_dir>/0/<x>/<y>.png`
    ///
    /// Non-numeric directory names and file stems are ignored.
    ///
    /// # Errors
    ///
    /// Returns a structural error when the zoom directory is missing or holds
    /// no tiles, and a file system error when a directory cannot be read
    pub fn scan(layer_dir: &Path) -> Result<Self> {
        let zoom_dir = layer_dir.join(ZOOM_DIR);
        if !zoom_dir.is_dir() {
            return Err(structural_error(
                layer_dir,
                &format!("missing '{ZOOM_DIR}' directory"),
            ));
        }

        let mut coords = Vec::new();
        for entry in std::fs::read_dir(&zoom_dir).with_path(&zoom_dir, "read_dir")? {
            let column_dir = entry.with_path(&zoom_dir, "read_dir")?.path();
            if !column_dir.is_dir() {
                continue;
            }
            let Some(x) = numeric_name(column_dir.file_name()) else {
                continue;
            };
            for tile in std::fs::read_dir(&column_dir).with_path(&column_dir, "read_dir")? {
                let tile_path = tile.with_path(&column_dir, "read_dir")?.path();
                if tile_path.extension().and_then(|e| e.to_str()) != Some(TILE_EXTENSION) {
                    continue;
                }
                if let Some(y) = numeric_name(tile_path.file_stem()) {
                    coords.push(TileCoord::new(x, y));
                }
            }
        }

        if coords.is_empty() {
            return Err(structural_error(layer_dir, &"no tiles found"));
        }
        Self::from_coords(coords)
    }

    /// Sorted distinct column indices
    pub fn x_values(&self) -> &[i32] {
        &self.x_values
    }

    /// Sorted distinct row indices
    pub fn y_values(&self) -> &[i32] {
        &self.y_values
    }

    /// Smallest column index
    pub fn min_x(&self) -> i32 {
        self.x_values.first().copied().unwrap_or(0)
    }

    /// Largest column index
    pub fn max_x(&self) -> i32 {
        self.x_values.last().copied().unwrap_or(0)
    }

    /// Smallest row index
    pub fn min_y(&self) -> i32 {
        self.y_values.first().copied().unwrap_or(0)
    }

    /// Largest row index
    pub fn max_y(&self) -> i32 {
        self.y_values.last().copied().unwrap_or(0)
    }

    /// Number of columns in the span, gaps included
    pub fn columns(&self) -> u32 {
        (self.max_x() - self.min_x() + 1) as u32
    }

    /// Number of rows in the span, gaps included
    pub fn rows(&self) -> u32 {
        (self.max_y() - self.min_y() + 1) as u32
    }

    /// Column of an x index relative to the span, `None` left of it
    pub fn column_of(&self, x: i32) -> Option<u32> {
        u32::try_from(x - self.min_x()).ok()
    }

    /// Row of a y index relative to the span, `None` above it
    pub fn row_of(&self, y: i32) -> Option<u32> {
        u32::try_from(y - self.min_y()).ok()
    }

    /// Position of a coordinate inside the span as `(column, row)`
    pub fn offset_of(&self, coord: TileCoord) -> Option<(u32, u32)> {
        self.in_span(coord).then(|| {
            (
                (coord.x - self.min_x()) as u32,
                (coord.y - self.min_y()) as u32,
            )
        })
    }

    /// Whether a coordinate lies inside the bounding span
    pub fn in_span(&self, coord: TileCoord) -> bool {
        (self.min_x()..=self.max_x()).contains(&coord.x)
            && (self.min_y()..=self.max_y()).contains(&coord.y)
    }

    /// Whether a tile exists at the coordinate
    pub fn contains(&self, coord: TileCoord) -> bool {
        self.present.contains(&coord)
    }

    /// Number of present tiles
    pub fn len(&self) -> usize {
        self.present.len()
    }

    /// Whether the grid holds no tile
    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Present tiles in row-major order
    pub fn present(&self) -> Vec<TileCoord> {
        let mut coords: Vec<TileCoord> = self.present.iter().copied().collect();
        coords.sort_unstable_by_key(|c| (c.y, c.x));
        coords
    }

    /// Every coordinate of the span in row-major order, present or not
    pub fn span(&self) -> Vec<TileCoord> {
        (self.min_y()..=self.max_y())
            .flat_map(|y| (self.min_x()..=self.max_x()).map(move |x| TileCoord::new(x, y)))
            .collect()
    }

    /// Row-major coordinates of a sub-rectangle, clipped to the span
    ///
    /// `x0` and `y0` are absolute tile indices.
    pub fn window(&self, x0: i32, y0: i32, width: u32, height: u32) -> Vec<TileCoord> {
        let x_end = (x0 + width as i32 - 1).min(self.max_x());
        let y_end = (y0 + height as i32 - 1).min(self.max_y());
        let x_start = x0.max(self.min_x());
        let y_start = y0.max(self.min_y());
        (y_start..=y_end)
            .flat_map(|y| (x_start..=x_end).map(move |x| TileCoord::new(x, y)))
            .collect()
    }

    /// Count of coordinates inside the span with no tile
    pub fn missing_count(&self) -> usize {
        (self.columns() as usize * self.rows() as usize).saturating_sub(self.present.len())
    }

    /// Indices missing between the minimum and maximum of each axis
    pub fn gaps(&self) -> IndexGaps {
        IndexGaps {
            x: missing_between(&self.x_values),
            y: missing_between(&self.y_values),
        }
    }

    /// Adjacent pairs inside the span, vertical seams first
    ///
    /// Each orientation is listed in row-major order of its first tile. Pairs
    /// with a missing side are included; callers record them as skipped.
    pub fn adjacent_pairs(&self) -> Vec<SeamPair> {
        let mut pairs = Vec::new();
        for y in self.min_y()..=self.max_y() {
            for x in self.min_x()..self.max_x() {
                pairs.push(SeamPair::vertical(TileCoord::new(x, y)));
            }
        }
        for y in self.min_y()..self.max_y() {
            for x in self.min_x()..=self.max_x() {
                pairs.push(SeamPair::horizontal(TileCoord::new(x, y)));
            }
        }
        pairs
    }
}

fn numeric_name(name: Option<&std::ffi::OsStr>) -> Option<i32> {
    name.and_then(|n| n.to_str()).and_then(|n| n.parse().ok())
}

fn missing_between(sorted: &[i32]) -> Vec<i32> {
    let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    let present: HashSet<i32> = sorted.iter().copied().collect();
    (first..=last).filter(|v| !present.contains(v)).collect()
}
