//! Per-candidate seed derivation

use crate::io::configuration::SEED_MASK;
use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// How candidate seeds are chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum SeedMode {
    /// `base + variant`
    Fixed,
    /// Fresh entropy per candidate
    Random,
    /// Hash of base, coordinate and variant
    #[default]
    TileHash,
}

impl fmt::Display for SeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fixed => "fixed",
            Self::Random => "random",
            Self::TileHash => "tile_hash",
        };
        write!(f, "{name}")
    }
}

/// Seed of candidate `variant` for tile `(x, y)`, masked to 31 bits
///
/// `tile_hash` uses the first four bytes, big-endian, of
/// `sha256("{base}:{x}:{y}:{variant}")`.
pub fn pick_seed(mode: SeedMode, base: u64, x: i32, y: i32, variant: u32) -> u64 {
    match mode {
        SeedMode::Fixed => base.wrapping_add(u64::from(variant)) & SEED_MASK,
        SeedMode::Random => u64::from(rand::rng().random::<u32>()) & SEED_MASK,
        SeedMode::TileHash => {
            let digest = Sha256::digest(format!("{base}:{x}:{y}:{variant}").as_bytes());
            let mut head = [0u8; 4];
            for (slot, byte) in head.iter_mut().zip(digest.iter()) {
                *slot = *byte;
            }
            u64::from(u32::from_be_bytes(head)) & SEED_MASK
        }
    }
}
