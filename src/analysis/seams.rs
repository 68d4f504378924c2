//! Seam scoring of a candidate tile against its accepted neighbors
//!
//! Strips of width `overlap_px` are compared on each active side: the
//! neighbor's right strip against the candidate's left strip, the neighbor's
//! bottom strip against the candidate's top strip, and the bottom-right
//! corner of the diagonal neighbor against the candidate's top-left corner.

use crate::analysis::metrics::{Metrics, ScoreWeights, score_pair};
use crate::spatial::grid::{SeamOrientation, SeamPair, TileCoord};
use ndarray::{Array3, ArrayView3, Axis, Slice};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Which accepted neighbors take part in scoring and conditioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NeighborMode {
    /// Use the tile to the left
    pub left: bool,
    /// Use the tile above
    pub top: bool,
    /// Use the diagonal tile above-left
    pub top_left: bool,
}

impl Default for NeighborMode {
    fn default() -> Self {
        Self {
            left: true,
            top: true,
            top_left: false,
        }
    }
}

impl FromStr for NeighborMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mode = Self {
            left: false,
            top: false,
            top_left: false,
        };
        for part in s.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            match part {
                "left" => mode.left = true,
                "top" => mode.top = true,
                "tl" | "top-left" => mode.top_left = true,
                "none" => {}
                other => return Err(format!("unknown neighbor '{other}'")),
            }
        }
        Ok(mode)
    }
}

impl fmt::Display for NeighborMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [
            (self.left, "left"),
            (self.top, "top"),
            (self.top_left, "tl"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect();
        if parts.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", parts.join("+"))
        }
    }
}

/// Side of the candidate a neighbor sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Left neighbor
    Left,
    /// Top neighbor
    Top,
    /// Top-left diagonal neighbor
    TopLeft,
}

/// Accepted neighbor tiles as float arrays
#[derive(Debug, Clone, Copy, Default)]
pub struct Neighbors<'a> {
    /// Tile to the left
    pub left: Option<&'a Array3<f32>>,
    /// Tile above
    pub top: Option<&'a Array3<f32>>,
    /// Tile above-left
    pub top_left: Option<&'a Array3<f32>>,
}

/// Score of one side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideScore {
    /// Side compared
    pub side: Side,
    /// Weighted score
    pub score: f64,
    /// Raw metrics
    pub metrics: Metrics,
}

/// Combined seam score of a candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NeighborScore {
    /// Sum of all side scores
    pub total: f64,
    /// Individual side scores
    pub sides: Vec<SideScore>,
}

fn rows<'a>(view: ArrayView3<'a, f32>, range: impl Into<Slice>) -> ArrayView3<'a, f32> {
    view.slice_axis_move(Axis(0), range.into())
}

fn cols<'a>(view: ArrayView3<'a, f32>, range: impl Into<Slice>) -> ArrayView3<'a, f32> {
    view.slice_axis_move(Axis(1), range.into())
}

/// Strip width clamped to `[1, min(width, height)]`
pub fn strip_width(overlap_px: u32, width: usize, height: usize) -> usize {
    (overlap_px as usize).min(width).min(height).max(1)
}

/// Score a candidate against the active accepted neighbors
pub fn score_candidate_against_neighbors(
    candidate: &Array3<f32>,
    neighbors: Neighbors<'_>,
    overlap_px: u32,
    weights: &ScoreWeights,
    mode: NeighborMode,
) -> NeighborScore {
    let (h, w, _) = candidate.dim();
    let op = strip_width(overlap_px, w, h);
    let mut result = NeighborScore::default();

    let mut push = |side: Side, a: ArrayView3<'_, f32>, b: ArrayView3<'_, f32>| {
        let (score, metrics) = score_pair(a, b, weights);
        result.total += score;
        result.sides.push(SideScore {
            side,
            score,
            metrics,
        });
    };

    if let Some(left) = neighbors.left.filter(|_| mode.left) {
        let lw = left.len_of(Axis(1));
        let start = lw.saturating_sub(op);
        push(
            Side::Left,
            cols(left.view(), start..),
            cols(candidate.view(), ..op),
        );
    }
    if let Some(top) = neighbors.top.filter(|_| mode.top) {
        let th = top.len_of(Axis(0));
        let start = th.saturating_sub(op);
        push(
            Side::Top,
            rows(top.view(), start..),
            rows(candidate.view(), ..op),
        );
    }
    if let Some(corner) = neighbors.top_left.filter(|_| mode.top_left) {
        let (ch, cw, _) = corner.dim();
        push(
            Side::TopLeft,
            cols(rows(corner.view(), ch.saturating_sub(op)..), cw.saturating_sub(op)..),
            cols(rows(candidate.view(), ..op), ..op),
        );
    }
    result
}

/// Mean absolute RGB difference across a seam, one value per position along it
///
/// For a vertical seam the profile has one entry per row; for a horizontal
/// seam one entry per column.
pub fn seam_profile(
    first: &Array3<f32>,
    second: &Array3<f32>,
    orientation: SeamOrientation,
    overlap_px: u32,
) -> Vec<f32> {
    let (h, w, _) = first.dim();
    let (a, b) = match orientation {
        SeamOrientation::Vertical => {
            let op = (overlap_px as usize).clamp(1, w.max(1));
            (
                cols(first.view(), w.saturating_sub(op)..),
                cols(second.view(), ..op.min(second.len_of(Axis(1)))),
            )
        }
        SeamOrientation::Horizontal => {
            let op = (overlap_px as usize).clamp(1, h.max(1));
            (
                rows(first.view(), h.saturating_sub(op)..),
                rows(second.view(), ..op.min(second.len_of(Axis(0)))),
            )
        }
    };
    let along = match orientation {
        SeamOrientation::Vertical => Axis(0),
        SeamOrientation::Horizontal => Axis(1),
    };
    let len = a.len_of(along).min(b.len_of(along));
    (0..len)
        .map(|i| {
            let la = a.index_axis(along, i);
            let lb = b.index_axis(along, i);
            let n = la.len().min(lb.len());
            if n == 0 {
                return 0.0;
            }
            let sum: f32 = la.iter().zip(lb.iter()).map(|(x, y)| (x - y).abs()).sum();
            sum / n as f32
        })
        .collect()
}

/// Score of one seam between two accepted tiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeamRecord {
    /// Tiles sharing the seam
    pub pair: SeamPair,
    /// Weighted strip score
    pub score: f64,
    /// Per-position difference profile along the seam
    #[serde(skip)]
    pub profile: Vec<f32>,
}

/// Worst seams of a set of accepted tiles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeamSummary {
    /// Number of seams scored
    pub seam_count: usize,
    /// Mean seam score
    pub mean_score: f64,
    /// Highest scoring seams, worst first
    pub worst_seams: Vec<SeamRecord>,
}

/// Score every seam whose two tiles are both present
///
/// Seams are visited vertical first, each in row-major order. Returns all
/// records in visiting order.
pub fn score_seams(
    tiles: &HashMap<TileCoord, Array3<f32>>,
    coords: &[TileCoord],
    overlap_px: u32,
    weights: &ScoreWeights,
) -> Vec<SeamRecord> {
    let mut records = Vec::new();
    let orientations = [SeamOrientation::Vertical, SeamOrientation::Horizontal];
    for orientation in orientations {
        for &coord in coords {
            let pair = match orientation {
                SeamOrientation::Vertical => SeamPair::vertical(coord),
                SeamOrientation::Horizontal => SeamPair::horizontal(coord),
            };
            let (Some(a), Some(b)) = (tiles.get(&pair.first), tiles.get(&pair.second)) else {
                continue;
            };
            let (h, w, _) = a.dim();
            let op = match orientation {
                SeamOrientation::Vertical => (overlap_px as usize).clamp(1, w.max(1)),
                SeamOrientation::Horizontal => (overlap_px as usize).clamp(1, h.max(1)),
            };
            let (sa, sb) = match orientation {
                SeamOrientation::Vertical => (
                    cols(a.view(), w.saturating_sub(op)..),
                    cols(b.view(), ..op.min(b.len_of(Axis(1)))),
                ),
                SeamOrientation::Horizontal => (
                    rows(a.view(), h.saturating_sub(op)..),
                    rows(b.view(), ..op.min(b.len_of(Axis(0)))),
                ),
            };
            let (score, _) = score_pair(sa, sb, weights);
            records.push(SeamRecord {
                pair,
                score,
                profile: seam_profile(a, b, orientation, overlap_px),
            });
        }
    }
    records
}

/// Summarise seam records, keeping the `worst` highest scores
pub fn summarize(records: &[SeamRecord], worst: usize) -> SeamSummary {
    let mut sorted: Vec<SeamRecord> = records.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));
    sorted.truncate(worst);
    let mean_score = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| r.score).sum::<f64>() / records.len() as f64
    };
    SeamSummary {
        seam_count: records.len(),
        mean_score,
        worst_seams: sorted,
    }
}
