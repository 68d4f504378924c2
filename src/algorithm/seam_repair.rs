//! Pairwise seam repair by inpainting a band across each shared edge
//!
//! For every adjacent pair a context patch is cut from both tiles around
//! their shared edge, a band around the split is inpainted by the oracle,
//! and the result is written back with a linear ramp that reaches full
//! weight at the seam. A short harmonization pulls both sides toward their
//! common average so the edge columns agree.
//!
//! Horizontal seams run through the same code on transposed tiles.

use crate::algorithm::retry::RetryingOracle;
use crate::io::configuration::{
    DEFAULT_GUIDANCE, DEFAULT_HARMONIZE_HALF, DEFAULT_MASK_HALF, DEFAULT_SEAM_STEPS,
    DEFAULT_SEAM_STRENGTH, DEFAULT_SEED, DEFAULT_WRITE_HALF, MAX_AUTO_SEAM_CONTEXT,
    MIN_SEAM_CONTEXT,
};
use crate::io::error::Result;
use crate::io::progress::{NoProgress, Progress};
use crate::io::report::{GeometrySummary, GridSummary};
use crate::oracle::error::OracleError;
use crate::oracle::interface::{OracleParams, effective_steps};
use crate::spatial::grid::{SeamOrientation, SeamPair, TileCoord, TileGrid};
use crate::spatial::layout::TileGeometry;
use crate::spatial::tiles::{TileLayer, TileStore, load_sized, mirror_tree};
use image::{GrayImage, Luma, Rgb, RgbImage, imageops};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Why a seam was not repaired
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// One of the two tiles does not exist
    MissingTiles,
    /// Margins leave no core rows
    InvalidCore,
    /// A context strip is empty
    InvalidContext,
    /// The patch is too narrow for a band on both sides of the split
    TinyPatch,
    /// The strips share no rows
    EmptyPatch,
    /// A tile of the pair was already present in the output tree
    ExistingOutput,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::MissingTiles => "missing_tiles",
            Self::InvalidCore => "invalid_core",
            Self::InvalidContext => "invalid_context",
            Self::TinyPatch => "tiny_patch",
            Self::EmptyPatch => "empty_patch",
            Self::ExistingOutput => "existing_output",
        };
        f.write_str(code)
    }
}

/// Settings of a seam repair pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeamRepairConfig {
    /// Inpaint parameters
    pub params: OracleParams,
    /// Base seed; seam `i` uses `seed + i`, wrapping on overflow
    pub seed: u64,
    /// Half-width of the inpaint mask band
    pub mask_half: u32,
    /// Half-width of the feathered write-back band
    pub write_half: u32,
    /// Half-width of the harmonization band
    pub harmonize_half: u32,
    /// Context strip width per side; 0 derives it from the margins
    pub seam_context: u32,
    /// Attempt at most this many seams; 0 means all
    pub max_seams: usize,
    /// Repair seams touching tiles already present in the output
    pub force: bool,
}

impl Default for SeamRepairConfig {
    fn default() -> Self {
        Self {
            params: OracleParams {
                prompt: String::new(),
                negative: None,
                strength: DEFAULT_SEAM_STRENGTH,
                steps: DEFAULT_SEAM_STEPS,
                guidance: DEFAULT_GUIDANCE,
            },
            seed: DEFAULT_SEED,
            mask_half: DEFAULT_MASK_HALF,
            write_half: DEFAULT_WRITE_HALF,
            harmonize_half: DEFAULT_HARMONIZE_HALF,
            seam_context: 0,
            max_seams: 0,
            force: false,
        }
    }
}

impl SeamRepairConfig {
    /// Context width for a geometry
    ///
    /// An explicit width wins; otherwise `max(8, min(margin_x, margin_y, 64))`.
    pub fn context_for(&self, geometry: TileGeometry) -> u32 {
        if self.seam_context > 0 {
            return self.seam_context;
        }
        geometry
            .margin_x
            .min(geometry.margin_y)
            .min(MAX_AUTO_SEAM_CONTEXT)
            .max(MIN_SEAM_CONTEXT)
    }
}

/// Result of one seam attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeamOutcome {
    /// Band inpainted and written back
    Repaired,
    /// Not attempted
    Skipped {
        /// Reason code
        reason: SkipReason,
    },
    /// Oracle call failed; tiles unchanged
    Failed {
        /// Classified oracle error
        error: OracleError,
    },
}

/// Record of one seam in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeamAttempt {
    /// Position in the processing order
    pub index: usize,
    /// Tiles sharing the seam
    pub pair: SeamPair,
    /// Seed used for the inpaint call
    pub seed: u64,
    /// What happened
    pub outcome: SeamOutcome,
}

/// Outcome of a seam repair pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeamRepairReport {
    /// Grid that was processed
    pub grid: GridSummary,
    /// Tile geometry
    pub geometry: GeometrySummary,
    /// Context width used per side
    pub seam_context: u32,
    /// Files copied from the input tree
    pub mirrored_files: usize,
    /// Vertical seams repaired
    pub processed_vertical: usize,
    /// Horizontal seams repaired
    pub processed_horizontal: usize,
    /// Skipped seams per reason
    pub skipped: BTreeMap<SkipReason, usize>,
    /// Seams whose oracle call failed
    pub failed: usize,
    /// Every attempt in processing order
    pub seams: Vec<SeamAttempt>,
}

/// Band widths resolved against one pair of tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeamBands {
    /// Context strip width per side
    pub context: u32,
    /// Requested mask half-width
    pub mask_half: u32,
    /// Requested write-back half-width
    pub write_half: u32,
}

/// Context patch cut around a vertical shared edge
#[derive(Debug, Clone)]
pub struct SeamPatch {
    /// Left strip followed by right strip
    pub image: RgbImage,
    /// Inpaint mask, 255 inside the band
    pub mask: GrayImage,
    /// Width of the left strip
    pub split: u32,
    /// Clamped mask half-width
    pub mask_half: u32,
    /// Clamped write-back half-width
    pub write_half: u32,
    /// First tile row covered by the patch
    pub row0: u32,
    /// Shared edge column in the left tile
    pub edge_left: u32,
    /// Shared edge column in the right tile
    pub edge_right: u32,
}

/// Cut the context patch for a vertical seam
///
/// `margins` are `(margin_x, margin_y)`. The shared edge is column
/// `w - margin_x` of the left tile and column `margin_x` of the right tile;
/// rows are restricted to the core `[margin_y, h - margin_y)`.
///
/// # Errors
///
/// Returns the [`SkipReason`] when the geometry leaves nothing to repair
pub fn cut_patch(
    left: &RgbImage,
    right: &RgbImage,
    margins: (u32, u32),
    bands: SeamBands,
) -> std::result::Result<SeamPatch, SkipReason> {
    let (w, h) = left.dimensions();
    let (mx, my) = margins;
    if h <= 2 * my {
        return Err(SkipReason::InvalidCore);
    }
    let row0 = my;
    let edge_left = w.saturating_sub(mx);
    let edge_right = mx.min(right.width());
    let l0 = edge_left.saturating_sub(bands.context);
    let lw = edge_left - l0;
    let r1 = (edge_right + bands.context).min(right.width());
    let rw = r1.saturating_sub(edge_right);
    if lw == 0 || rw == 0 {
        return Err(SkipReason::InvalidContext);
    }
    let rows = (h - 2 * my).min(right.height().saturating_sub(row0));
    if rows == 0 {
        return Err(SkipReason::EmptyPatch);
    }

    let width = lw + rw;
    let split = lw;
    let half_limit = split.min(width - split).saturating_sub(1);
    if half_limit == 0 {
        return Err(SkipReason::TinyPatch);
    }
    let mask_half = bands.mask_half.clamp(1, half_limit);
    let write_half = bands.write_half.clamp(1, half_limit);

    let mut image = RgbImage::new(width, rows);
    imageops::replace(
        &mut image,
        &imageops::crop_imm(left, l0, row0, lw, rows).to_image(),
        0,
        0,
    );
    imageops::replace(
        &mut image,
        &imageops::crop_imm(right, edge_right, row0, rw, rows).to_image(),
        i64::from(lw),
        0,
    );
    let mask = GrayImage::from_fn(width, rows, |x, _| {
        if x + mask_half >= split && x <= split + mask_half {
            Luma([255])
        } else {
            Luma([0])
        }
    });

    Ok(SeamPatch {
        image,
        mask,
        split,
        mask_half,
        write_half,
        row0,
        edge_left,
        edge_right,
    })
}

fn lerp(from: f32, to: f32, t: f32) -> u8 {
    (to - from).mul_add(t, from).round().clamp(0.0, 255.0) as u8
}

fn blend_into(target: &mut RgbImage, x: u32, y: u32, source: Rgb<u8>, alpha: f32) {
    if let Some(pixel) = target.get_pixel_mut_checked(x, y) {
        for (c, s) in pixel.0.iter_mut().zip(source.0) {
            *c = lerp(f32::from(*c), f32::from(s), alpha);
        }
    }
}

/// Write the inpainted band back into both tiles
///
/// Left column `edge_left - write_half + j` takes weight `(j + 1) / write_half`
/// and right column `edge_right + k` takes `(write_half - k) / write_half`, so
/// both columns touching the seam are fully replaced.
pub fn write_back(
    left: &mut RgbImage,
    right: &mut RgbImage,
    patch: &SeamPatch,
    inpainted: &RgbImage,
) {
    let whalf = patch.write_half;
    let scale = whalf as f32;
    for r in 0..patch.image.height() {
        let ty = patch.row0 + r;
        for j in 0..whalf {
            let alpha = (j + 1) as f32 / scale;
            let px = patch.split - whalf + j;
            if let Some(&source) = inpainted.get_pixel_checked(px, r) {
                blend_into(left, patch.edge_left - whalf + j, ty, source, alpha);
            }
        }
        for k in 0..whalf {
            let alpha = (whalf - k) as f32 / scale;
            if let Some(&source) = inpainted.get_pixel_checked(patch.split + k, r) {
                blend_into(right, patch.edge_right + k, ty, source, alpha);
            }
        }
    }
}

/// Pull the columns next to the seam toward their common average
///
/// `hh = min(harmonize_half, write_half)`; pair `d` moves with strength
/// `(hh - d) / hh`, so the two edge columns end up equal.
pub fn harmonize(left: &mut RgbImage, right: &mut RgbImage, patch: &SeamPatch, harmonize_half: u32) {
    let hh = harmonize_half.min(patch.write_half);
    if hh == 0 {
        return;
    }
    for r in 0..patch.image.height() {
        let ty = patch.row0 + r;
        for d in 0..hh {
            let Some(lx) = patch.edge_left.checked_sub(1 + d) else {
                break;
            };
            let rx = patch.edge_right + d;
            let (Some(&a), Some(&b)) = (left.get_pixel_checked(lx, ty), right.get_pixel_checked(rx, ty))
            else {
                break;
            };
            let t = (hh - d) as f32 / hh as f32;
            let mut new_a = a;
            let mut new_b = b;
            for c in 0..3 {
                let (Some(va), Some(vb)) = (a.0.get(c), b.0.get(c)) else {
                    continue;
                };
                let (va, vb) = (f32::from(*va), f32::from(*vb));
                let avg = (va + vb) / 2.0;
                if let Some(slot) = new_a.0.get_mut(c) {
                    *slot = lerp(va, avg, t);
                }
                if let Some(slot) = new_b.0.get_mut(c) {
                    *slot = lerp(vb, avg, t);
                }
            }
            left.put_pixel(lx, ty, new_a);
            right.put_pixel(rx, ty, new_b);
        }
    }
}

fn transpose(img: &RgbImage) -> RgbImage {
    RgbImage::from_fn(img.height(), img.width(), |x, y| *img.get_pixel(y, x))
}

struct Pass<'g> {
    grid: &'g TileGrid,
    geometry: TileGeometry,
    context: u32,
    protected: &'g HashSet<TileCoord>,
}

/// Repairs the seams of a tile tree against an oracle
pub struct SeamRepairEngine<'a> {
    oracle: RetryingOracle<'a>,
    config: SeamRepairConfig,
    progress: Box<dyn Progress + 'a>,
}

impl<'a> SeamRepairEngine<'a> {
    /// Create an engine without progress output
    pub fn new(oracle: RetryingOracle<'a>, config: SeamRepairConfig) -> Self {
        Self {
            oracle,
            config,
            progress: Box::new(NoProgress),
        }
    }

    /// Report progress to the given sink
    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn Progress + 'a>) -> Self {
        self.progress = progress;
        self
    }

    /// Mirror `input` into `output` and repair the seams of the copy
    ///
    /// Tiles present in `output` before mirroring are protected unless
    /// `force` is set.
    ///
    /// # Errors
    ///
    /// Returns an error when the input tree is malformed or tiles cannot be
    /// read or written
    pub fn run(
        &mut self,
        input: &Path,
        output: &Path,
        grid: &TileGrid,
        geometry: TileGeometry,
        overlap: f64,
    ) -> Result<SeamRepairReport> {
        let mut layer = TileLayer::new(output);
        let protected: HashSet<TileCoord> = grid
            .present()
            .into_iter()
            .filter(|&c| layer.contains(c))
            .collect();
        let mirrored = mirror_tree(input, output, self.config.force)?;
        info!(
            mirrored,
            protected = protected.len(),
            "mirrored input tree"
        );
        let mut report = self.repair(&mut layer, grid, geometry, overlap, &protected)?;
        report.mirrored_files = mirrored;
        Ok(report)
    }

    /// Repair every seam of `grid` inside `store`, in place
    ///
    /// Vertical seams come first, each orientation in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error when tiles cannot be read or written
    pub fn repair(
        &mut self,
        store: &mut dyn TileStore,
        grid: &TileGrid,
        geometry: TileGeometry,
        overlap: f64,
        protected: &HashSet<TileCoord>,
    ) -> Result<SeamRepairReport> {
        let context = self.config.context_for(geometry);
        let pass = Pass {
            grid,
            geometry,
            context,
            protected,
        };
        let mut report = SeamRepairReport {
            grid: GridSummary::of(grid),
            geometry: GeometrySummary::of(geometry, overlap),
            seam_context: context,
            mirrored_files: 0,
            processed_vertical: 0,
            processed_horizontal: 0,
            skipped: BTreeMap::new(),
            failed: 0,
            seams: Vec::new(),
        };

        let mut pairs = grid.adjacent_pairs();
        if self.config.max_seams > 0 {
            pairs.truncate(self.config.max_seams);
        }
        self.progress.start_phase("seams", pairs.len());

        for (index, pair) in pairs.into_iter().enumerate() {
            self.progress.advance(&format!("{} | {}", pair.first, pair.second));
            let seed = self.config.seed.wrapping_add(index as u64);
            let outcome = self.repair_pair(store, &pass, pair, seed)?;
            match &outcome {
                SeamOutcome::Repaired => match pair.orientation {
                    SeamOrientation::Vertical => report.processed_vertical += 1,
                    SeamOrientation::Horizontal => report.processed_horizontal += 1,
                },
                SeamOutcome::Skipped { reason } => {
                    debug!(first = %pair.first, second = %pair.second, %reason, "seam skipped");
                    *report.skipped.entry(*reason).or_insert(0) += 1;
                }
                SeamOutcome::Failed { error } => {
                    warn!(first = %pair.first, second = %pair.second, %error, "seam repair failed");
                    report.failed += 1;
                }
            }
            report.seams.push(SeamAttempt {
                index,
                pair,
                seed,
                outcome,
            });
        }

        self.progress.finish_phase();
        info!(
            vertical = report.processed_vertical,
            horizontal = report.processed_horizontal,
            failed = report.failed,
            "seam repair complete"
        );
        Ok(report)
    }

    fn repair_pair(
        &mut self,
        store: &mut dyn TileStore,
        pass: &Pass<'_>,
        pair: SeamPair,
        seed: u64,
    ) -> Result<SeamOutcome> {
        let skipped = |reason: SkipReason| -> Result<SeamOutcome> { Ok(SeamOutcome::Skipped { reason }) };
        if !pass.grid.contains(pair.first) || !pass.grid.contains(pair.second) {
            return skipped(SkipReason::MissingTiles);
        }
        let protected = pass.protected;
        if !self.config.force && (protected.contains(&pair.first) || protected.contains(&pair.second)) {
            return skipped(SkipReason::ExistingOutput);
        }
        let geometry = pass.geometry;
        let (Some(first), Some(second)) = (
            load_sized(store, pair.first, geometry.width, geometry.height)?,
            load_sized(store, pair.second, geometry.width, geometry.height)?,
        ) else {
            return skipped(SkipReason::MissingTiles);
        };

        let (mut left, mut right, margins) = match pair.orientation {
            SeamOrientation::Vertical => (first, second, (geometry.margin_x, geometry.margin_y)),
            SeamOrientation::Horizontal => (
                transpose(&first),
                transpose(&second),
                (geometry.margin_y, geometry.margin_x),
            ),
        };
        let bands = SeamBands {
            context: pass.context,
            mask_half: self.config.mask_half,
            write_half: self.config.write_half,
        };
        let patch = match cut_patch(&left, &right, margins, bands) {
            Ok(patch) => patch,
            Err(reason) => return skipped(reason),
        };

        let base = &self.config.params;
        let params = base.with_strength(base.strength, effective_steps(base.strength, base.steps));
        let inpainted = match self.oracle.inpaint("seam", &patch.image, &patch.mask, &params, seed) {
            Ok(image) => image,
            Err(error) => return Ok(SeamOutcome::Failed { error }),
        };

        write_back(&mut left, &mut right, &patch, &inpainted);
        harmonize(&mut left, &mut right, &patch, self.config.harmonize_half);

        let (first, second) = match pair.orientation {
            SeamOrientation::Vertical => (left, right),
            SeamOrientation::Horizontal => (transpose(&left), transpose(&right)),
        };
        store.save(pair.first, &first)?;
        store.save(pair.second, &second)?;
        Ok(SeamOutcome::Repaired)
    }
}
