//! Content-addressed cache of oracle outputs
//!
//! Keys are SHA-256 digests of the canonical JSON of everything that can
//! change an oracle output. Stores are write-once per key; disk writes go
//! through a temporary file and a rename.

use crate::io::configuration::{CACHE_KEY_VERSION, TILE_EXTENSION};
use crate::io::error::{Result, WithPath};
use crate::io::image::{load_rgb, save_png_atomic};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Lowercase hex SHA-256 of a byte slice
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Digest of an image's dimensions and raw pixels
pub fn image_hash(img: &RgbImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(img.width().to_be_bytes());
    hasher.update(img.height().to_be_bytes());
    hasher.update(img.as_raw());
    format!("{:x}", hasher.finalize())
}

/// Everything that determines an oracle output for one candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheKeyMaterial {
    /// Layout version of the request
    pub version: u32,
    /// Backend identity
    pub model: String,
    /// Digest of the positive prompt
    pub prompt_hash: String,
    /// Digest of the negative prompt
    pub negative_hash: String,
    /// Digests of style anchor images
    pub anchors: Vec<String>,
    /// Digests of accepted neighbor tiles, in `left, top, top-left` order
    pub neighbors: Vec<String>,
    /// Tile column
    pub x: i32,
    /// Tile row
    pub y: i32,
    /// Digest of the input tile
    pub input_hash: String,
    /// Candidate seed
    pub seed: u64,
    /// Stylization strength
    pub strength: f64,
    /// Oracle steps
    pub steps: u32,
    /// Guidance scale
    pub guidance: f64,
    /// Active neighbor sides
    pub neighbor_mode: String,
    /// Whether neighbors are sent as conditioning
    pub neighbors_in_prompt: bool,
}

impl CacheKeyMaterial {
    /// Current request layout version
    pub const VERSION: u32 = CACHE_KEY_VERSION;

    /// Same material for another backend
    #[must_use]
    pub fn for_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Digest of the material's canonical JSON
    ///
    /// Object keys are sorted, so field order never affects the key.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the material cannot be encoded
    pub fn key(&self) -> Result<CacheKey> {
        let canonical = serde_json::to_value(self)?;
        let text = serde_json::to_string(&canonical)?;
        Ok(CacheKey(sha256_hex(text.as_bytes())))
    }
}

/// Hex digest identifying a cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hex string of the key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage of cached oracle outputs
pub trait CacheStore {
    /// Fetch an entry
    ///
    /// # Errors
    ///
    /// Returns an error when an entry exists but cannot be read
    fn get(&self, key: &CacheKey) -> Result<Option<RgbImage>>;

    /// Store an entry
    ///
    /// # Errors
    ///
    /// Returns an error when the entry cannot be written
    fn put(&mut self, key: &CacheKey, image: &RgbImage) -> Result<()>;
}

/// Cache kept in memory for the duration of a run
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<CacheKey, RgbImage>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Result<Option<RgbImage>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &CacheKey, image: &RgbImage) -> Result<()> {
        self.entries
            .entry(key.clone())
            .or_insert_with(|| image.clone());
        Ok(())
    }
}

/// Cache persisted as `<dir>/<key>.png`
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// Open or create a cache directory
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).with_path(dir, "create_dir_all")?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// File backing a key
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.{TILE_EXTENSION}", key.as_str()))
    }
}

impl CacheStore for DiskStore {
    fn get(&self, key: &CacheKey) -> Result<Option<RgbImage>> {
        let path = self.entry_path(key);
        if !path.is_file() {
            return Ok(None);
        }
        load_rgb(&path).map(Some)
    }

    fn put(&mut self, key: &CacheKey, image: &RgbImage) -> Result<()> {
        let path = self.entry_path(key);
        if path.is_file() {
            return Ok(());
        }
        save_png_atomic(image, &path)
    }
}

/// Performance metrics for cache effectiveness
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: usize,
    /// Number of cache misses
    pub misses: usize,
}

/// Cache front-end tracking statistics
///
/// Store failures never abort a run: unreadable entries count as misses and
/// failed writes are logged.
pub struct CandidateCache {
    store: Box<dyn CacheStore>,
    read: bool,
    /// Cache performance statistics
    pub stats: CacheStats,
}

impl CandidateCache {
    /// Wrap a store; with `read` false lookups always miss but writes happen
    pub fn new(store: Box<dyn CacheStore>, read: bool) -> Self {
        Self {
            store,
            read,
            stats: CacheStats::default(),
        }
    }

    /// In-memory cache with reads enabled
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()), true)
    }

    /// Look up an entry, counting the hit or miss
    pub fn lookup(&mut self, key: &CacheKey) -> Option<RgbImage> {
        let found = if self.read {
            self.store.get(key).unwrap_or_else(|err| {
                warn!(key = %key, error = %err, "ignoring unreadable cache entry");
                None
            })
        } else {
            None
        };
        if found.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        found
    }

    /// Store an entry, logging failures
    pub fn store(&mut self, key: &CacheKey, image: &RgbImage) {
        if let Err(err) = self.store.put(key, image) {
            warn!(key = %key, error = %err, "failed to write cache entry");
        }
    }
}
