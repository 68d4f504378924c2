//! Tile storage backends and tree mirroring
//!
//! A layer on disk is laid out as `<root>/0/<x>/<y>.png`. Components talk to
//! tiles through [`TileStore`] so the same algorithms run against a directory
//! or an in-memory map.

use crate::io::configuration::{LAYOUT_FILE, TILE_EXTENSION, ZOOM_DIR};
use crate::io::error::{Result, WithPath, structural_error};
use crate::io::image::{load_rgb, save_png_atomic};
use crate::spatial::grid::TileCoord;
use image::RgbImage;
use image::imageops::FilterType;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Read and write access to tiles by coordinate
pub trait TileStore {
    /// Whether a tile exists at the coordinate
    fn contains(&self, coord: TileCoord) -> bool;

    /// Load a tile, `None` when it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error when the tile exists but cannot be decoded
    fn load(&self, coord: TileCoord) -> Result<Option<RgbImage>>;

    /// Persist a tile, replacing any previous content
    ///
    /// # Errors
    ///
    /// Returns an error when the tile cannot be written
    fn save(&mut self, coord: TileCoord, tile: &RgbImage) -> Result<()>;
}

/// Tile layer stored as `<root>/0/<x>/<y>.png`
#[derive(Debug, Clone)]
pub struct TileLayer {
    root: PathBuf,
}

impl TileLayer {
    /// Open a layer rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the layer
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the tile file for a coordinate
    pub fn tile_path(&self, coord: TileCoord) -> PathBuf {
        self.root
            .join(ZOOM_DIR)
            .join(coord.x.to_string())
            .join(format!("{}.{TILE_EXTENSION}", coord.y))
    }
}

impl TileStore for TileLayer {
    fn contains(&self, coord: TileCoord) -> bool {
        self.tile_path(coord).is_file()
    }

    fn load(&self, coord: TileCoord) -> Result<Option<RgbImage>> {
        let path = self.tile_path(coord);
        if !path.is_file() {
            return Ok(None);
        }
        load_rgb(&path).map(Some)
    }

    fn save(&mut self, coord: TileCoord, tile: &RgbImage) -> Result<()> {
        save_png_atomic(tile, &self.tile_path(coord))
    }
}

/// Tile map held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryTiles {
    tiles: HashMap<TileCoord, RgbImage>,
}

impl MemoryTiles {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tile, returning the store for chaining
    #[must_use]
    pub fn with(mut self, coord: TileCoord, tile: RgbImage) -> Self {
        self.tiles.insert(coord, tile);
        self
    }

    /// Insert or replace a tile
    pub fn insert(&mut self, coord: TileCoord, tile: RgbImage) {
        self.tiles.insert(coord, tile);
    }

    /// Borrow a tile without cloning
    pub fn get(&self, coord: TileCoord) -> Option<&RgbImage> {
        self.tiles.get(&coord)
    }

    /// Coordinates currently stored
    pub fn coords(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.tiles.keys().copied()
    }

    /// Number of stored tiles
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the store holds no tile
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl TileStore for MemoryTiles {
    fn contains(&self, coord: TileCoord) -> bool {
        self.tiles.contains_key(&coord)
    }

    fn load(&self, coord: TileCoord) -> Result<Option<RgbImage>> {
        Ok(self.tiles.get(&coord).cloned())
    }

    fn save(&mut self, coord: TileCoord, tile: &RgbImage) -> Result<()> {
        self.tiles.insert(coord, tile.clone());
        Ok(())
    }
}

/// Load a tile and bring it to the expected size
///
/// Tiles of a different size are resampled with nearest-neighbor so the
/// pixel grid of pixel-art styles is kept.
///
/// # Errors
///
/// Propagates decoding errors from the store
pub fn load_sized(
    store: &dyn TileStore,
    coord: TileCoord,
    width: u32,
    height: u32,
) -> Result<Option<RgbImage>> {
    Ok(store.load(coord)?.map(|tile| {
        if tile.dimensions() == (width, height) {
            tile
        } else {
            image::imageops::resize(&tile, width, height, FilterType::Nearest)
        }
    }))
}

/// Copy every tile and layout file of `src` into `dst`
///
/// Relative paths are preserved. Existing destination files are kept unless
/// `force` is set. A `dst` nested inside `src` is not walked. Returns the
/// number of files copied.
///
/// # Errors
///
/// Returns a structural error when `src` is not a directory or is the same
/// directory as `dst`, and a file system error when a copy fails
pub fn mirror_tree(src: &Path, dst: &Path, force: bool) -> Result<usize> {
    if !src.is_dir() {
        return Err(structural_error(src, &"input layer is not a directory"));
    }
    std::fs::create_dir_all(dst).with_path(dst, "create_dir_all")?;
    let src_canonical = src.canonicalize().with_path(src, "canonicalize")?;
    let dst_canonical = dst.canonicalize().with_path(dst, "canonicalize")?;
    if src_canonical == dst_canonical {
        return Err(structural_error(dst, &"output layer is the input layer"));
    }
    mirror_dir(src, src, dst, &dst_canonical, force)
}

fn mirror_dir(
    dir: &Path,
    src_root: &Path,
    dst_root: &Path,
    dst_canonical: &Path,
    force: bool,
) -> Result<usize> {
    let mut copied = 0;
    for entry in std::fs::read_dir(dir).with_path(dir, "read_dir")? {
        let path = entry.with_path(dir, "read_dir")?.path();
        if path.is_dir() {
            if path.canonicalize().is_ok_and(|p| p == dst_canonical) {
                continue;
            }
            copied += mirror_dir(&path, src_root, dst_root, dst_canonical, force)?;
            continue;
        }
        let is_tile = path.extension().and_then(|e| e.to_str()) == Some(TILE_EXTENSION);
        let is_layout = path.file_name().and_then(|n| n.to_str()) == Some(LAYOUT_FILE);
        if !is_tile && !is_layout {
            continue;
        }
        let Ok(relative) = path.strip_prefix(src_root) else {
            continue;
        };
        let target = dst_root.join(relative);
        if target.exists() && !force {
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).with_path(parent, "create_dir_all")?;
        }
        std::fs::copy(&path, &target).with_path(&target, "copy")?;
        copied += 1;
    }
    Ok(copied)
}
