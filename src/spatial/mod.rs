//! Tile coordinates, geometry and storage
//!
//! This module contains spatial-related functionality including:
//! - Sparse tile grids and adjacency
//! - Overlap margins and layout metadata
//! - Tile stores on disk and in memory
//! - Window placement over a mosaic

/// Sparse tile grid discovered from a tile tree
pub mod grid;
/// Overlap margins and tile geometry
pub mod layout;
/// Tile storage backends
pub mod tiles;
/// Window placement over a mosaic
pub mod windows;

pub use grid::{TileCoord, TileGrid};
