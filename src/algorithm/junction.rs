//! Repair of four-tile crossings after the windowed pass
//!
//! Each interior crossing of the tile lattice is re-stylized in a small
//! square patch and composited back with a quadratic radial falloff, so only
//! the immediate neighborhood of the crossing changes.

use crate::algorithm::retry::RetryingOracle;
use crate::io::configuration::{
    DEFAULT_JUNCTION_HALF, DEFAULT_JUNCTION_STRENGTH_BOOST, JUNCTION_SEED_OFFSET,
    MIN_JUNCTION_HALF, MIN_JUNCTION_PATCH, MIN_JUNCTION_STEPS,
};
use crate::io::progress::Progress;
use crate::io::report::UnitFailure;
use crate::math::ramp::radial_mask;
use crate::oracle::interface::{OracleParams, StylizeRequest};
use image::{Rgb, RgbImage, imageops};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Junction repair settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JunctionConfig {
    /// Run the pass at all
    pub enabled: bool,
    /// Half side of the patch, raised to at least 8
    pub half: u32,
    /// Added to the base strength, result clamped to `[0.01, 1]`
    pub strength_boost: f64,
    /// Explicit step count; 0 uses `max(base steps, 14)`
    pub steps: u32,
    /// Process at most this many crossings; 0 means all
    pub max_junctions: usize,
}

impl Default for JunctionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            half: DEFAULT_JUNCTION_HALF,
            strength_boost: DEFAULT_JUNCTION_STRENGTH_BOOST,
            steps: 0,
            max_junctions: 0,
        }
    }
}

impl JunctionConfig {
    /// Generation parameters derived from the base parameters
    pub fn params(&self, base: &OracleParams) -> OracleParams {
        let strength = (base.strength + self.strength_boost).clamp(0.01, 1.0);
        let steps = if self.steps > 0 {
            self.steps
        } else {
            base.steps.max(MIN_JUNCTION_STEPS)
        };
        base.with_strength(strength, steps)
    }
}

/// Counters of a junction pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JunctionStats {
    /// Interior crossings of the lattice
    pub total: usize,
    /// Crossings repaired
    pub processed: usize,
    /// Crossings skipped for size or oracle failure
    pub skipped: usize,
    /// Oracle failures
    pub failures: Vec<UnitFailure>,
}

/// Interior crossings `(i * cw, j * ch)` in row-major order
pub fn junction_points(columns: u32, rows: u32, cw: u32, ch: u32) -> Vec<(u32, u32)> {
    (1..rows)
        .flat_map(|j| (1..columns).map(move |i| (i * cw, j * ch)))
        .collect()
}

/// Patch rectangle `(x0, y0, x1, y1)` around a crossing, clipped to the mosaic
///
/// Returns `None` when the clipped patch is narrower than 16 pixels.
pub fn junction_patch(
    center: (u32, u32),
    half: u32,
    width: u32,
    height: u32,
) -> Option<(u32, u32, u32, u32)> {
    let half = half.max(MIN_JUNCTION_HALF);
    let (cx, cy) = center;
    let x0 = cx.saturating_sub(half);
    let y0 = cy.saturating_sub(half);
    let x1 = (cx + half).min(width);
    let y1 = (cy + half).min(height);
    (x1.saturating_sub(x0) >= MIN_JUNCTION_PATCH && y1.saturating_sub(y0) >= MIN_JUNCTION_PATCH)
        .then_some((x0, y0, x1, y1))
}

/// Composite `stylized` over `original` with a radial weight
pub fn radial_composite(stylized: &RgbImage, original: &RgbImage) -> RgbImage {
    let (w, h) = original.dimensions();
    let mask = radial_mask(w as usize, h as usize);
    RgbImage::from_fn(w, h, |x, y| {
        let m = mask.get((y as usize, x as usize)).copied().unwrap_or(0.0);
        let base = original.get_pixel(x, y).0;
        let top = stylized.get_pixel_checked(x, y).map_or(base, |p| p.0);
        let mut out = [0u8; 3];
        for ((slot, &a), &b) in out.iter_mut().zip(top.iter()).zip(base.iter()) {
            let v = f32::from(a).mul_add(m, f32::from(b) * (1.0 - m));
            *slot = v.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    })
}

/// Repair every interior crossing of a mosaic in place
///
/// Crossing `k` uses seed `base_seed + 100000 + k`, wrapping on overflow. Failed oracle calls leave
/// the crossing untouched and are recorded.
pub fn repair_junctions(
    mosaic: &mut RgbImage,
    lattice: (u32, u32, u32, u32),
    config: &JunctionConfig,
    base: &OracleParams,
    base_seed: u64,
    oracle: &mut RetryingOracle<'_>,
    progress: &mut dyn Progress,
) -> JunctionStats {
    let (columns, rows, cw, ch) = lattice;
    let mut points = junction_points(columns, rows, cw, ch);
    let mut stats = JunctionStats {
        total: points.len(),
        ..JunctionStats::default()
    };
    if !config.enabled || points.is_empty() {
        return stats;
    }
    if config.max_junctions > 0 {
        points.truncate(config.max_junctions);
    }

    let params = config.params(base);
    let (width, height) = mosaic.dimensions();
    progress.start_phase("junctions", points.len());

    for (index, &center) in points.iter().enumerate() {
        progress.advance(&format!("{},{}", center.0, center.1));
        let Some((x0, y0, x1, y1)) = junction_patch(center, config.half, width, height) else {
            stats.skipped += 1;
            continue;
        };
        let patch = imageops::crop_imm(mosaic, x0, y0, x1 - x0, y1 - y0).to_image();
        let seed = base_seed
            .wrapping_add(JUNCTION_SEED_OFFSET)
            .wrapping_add(index as u64);
        let request = StylizeRequest::new(&patch, &params, seed);
        match oracle.stylize("junction", &request) {
            Ok(stylized) => {
                let blended = radial_composite(&stylized, &patch);
                imageops::replace(mosaic, &blended, i64::from(x0), i64::from(y0));
                stats.processed += 1;
            }
            Err(error) => {
                warn!(index, error = %error, "junction repair failed");
                stats.skipped += 1;
                stats.failures.push(UnitFailure {
                    unit: format!("junction {index}"),
                    error,
                });
            }
        }
    }

    progress.finish_phase();
    debug!(
        processed = stats.processed,
        skipped = stats.skipped,
        "junction pass complete"
    );
    stats
}
