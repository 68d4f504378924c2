//! Serializable run reports and atomic JSON output

use crate::io::error::{Result, WithPath};
use crate::io::image::write_atomic;
use crate::oracle::error::OracleError;
use crate::spatial::grid::{IndexGaps, TileGrid};
use crate::spatial::layout::TileGeometry;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shape of the tile grid a run operated on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSummary {
    /// Smallest column index
    pub min_x: i32,
    /// Smallest row index
    pub min_y: i32,
    /// Columns in the span
    pub columns: u32,
    /// Rows in the span
    pub rows: u32,
    /// Present tiles
    pub tiles: usize,
    /// Span positions without a tile
    pub missing_tiles: usize,
    /// Missing indices per axis
    pub gaps: IndexGaps,
}

impl GridSummary {
    /// Summarise a grid
    pub fn of(grid: &TileGrid) -> Self {
        Self {
            min_x: grid.min_x(),
            min_y: grid.min_y(),
            columns: grid.columns(),
            rows: grid.rows(),
            tiles: grid.len(),
            missing_tiles: grid.missing_count(),
            gaps: grid.gaps(),
        }
    }
}

/// Geometry section shared by every report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometrySummary {
    /// Overlap fraction
    pub overlap: f64,
    /// Tile size and margins
    pub tile: TileGeometry,
    /// Cropped interior width
    pub cropped_width: u32,
    /// Cropped interior height
    pub cropped_height: u32,
}

impl GeometrySummary {
    /// Summarise a geometry
    pub fn of(geometry: TileGeometry, overlap: f64) -> Self {
        Self {
            overlap,
            tile: geometry,
            cropped_width: geometry.cropped_width(),
            cropped_height: geometry.cropped_height(),
        }
    }
}

/// A unit of work whose oracle call failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// Human readable unit name, such as `window 3`
    pub unit: String,
    /// Classified oracle error
    pub error: OracleError,
}

/// Write a value as pretty JSON through a temporary file
///
/// # Errors
///
/// Returns an error if encoding or writing fails
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value).with_path(path, "encode")?;
    text.push('\n');
    write_atomic(path, text.as_bytes())
}

/// Read a JSON document
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed
pub fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_path(path, "read")?;
    serde_json::from_str(&text).with_path(path, "parse")
}
