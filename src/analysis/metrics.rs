//! Pixel difference metrics used for seam and structure scoring
//!
//! All metrics operate on float RGB arrays of shape `(height, width, 3)` with
//! values in `[0, 1]`. Arrays of different shapes are compared over their
//! common top-left region.

use crate::io::configuration::{
    DEFAULT_RGB_L1_WEIGHT, DEFAULT_RGB_L2_WEIGHT, DEFAULT_SOBEL_L1_WEIGHT, LUMA_COEFFICIENTS,
};
use clap::ValueEnum;
use image::RgbImage;
use ndarray::{Array2, Array3, ArrayView3, Axis, Slice};
use serde::{Deserialize, Serialize};

/// Convert an 8-bit image to a float array in `[0, 1]`
pub fn to_float_rgb(img: &RgbImage) -> Array3<f32> {
    let (w, h) = img.dimensions();
    Array3::from_shape_fn((h as usize, w as usize, 3), |(y, x, c)| {
        img.get_pixel_checked(x as u32, y as u32)
            .and_then(|p| p.0.get(c).copied())
            .map_or(0.0, |v| f32::from(v) / 255.0)
    })
}

/// Restrict a view to its top `h` rows and left `w` columns
fn top_left<'a>(view: ArrayView3<'a, f32>, h: usize, w: usize) -> ArrayView3<'a, f32> {
    let h = h.min(view.len_of(Axis(0)));
    let w = w.min(view.len_of(Axis(1)));
    view.slice_axis_move(Axis(0), Slice::from(..h))
        .slice_axis_move(Axis(1), Slice::from(..w))
}

fn common<'a, 'b>(
    a: ArrayView3<'a, f32>,
    b: ArrayView3<'b, f32>,
) -> (ArrayView3<'a, f32>, ArrayView3<'b, f32>) {
    let h = a.len_of(Axis(0)).min(b.len_of(Axis(0)));
    let w = a.len_of(Axis(1)).min(b.len_of(Axis(1)));
    (top_left(a, h, w), top_left(b, h, w))
}

/// Mean absolute difference over all pixels and channels
pub fn rgb_l1(a: ArrayView3<'_, f32>, b: ArrayView3<'_, f32>) -> f64 {
    let (a, b) = common(a, b);
    let n = a.len();
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from((x - y).abs()))
        .sum();
    sum / n as f64
}

/// Mean squared difference over all pixels and channels
pub fn rgb_l2(a: ArrayView3<'_, f32>, b: ArrayView3<'_, f32>) -> f64 {
    let (a, b) = common(a, b);
    let n = a.len();
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = f64::from(x - y);
            d * d
        })
        .sum();
    sum / n as f64
}

/// BT.709 luminance of a float RGB array
pub fn luminance(rgb: ArrayView3<'_, f32>) -> Array2<f32> {
    let (h, w, _) = rgb.dim();
    let [kr, kg, kb] = LUMA_COEFFICIENTS;
    Array2::from_shape_fn((h, w), |(y, x)| {
        let at = |c: usize| rgb.get((y, x, c)).copied().unwrap_or(0.0);
        kr.mul_add(at(0), kg.mul_add(at(1), kb * at(2)))
    })
}

/// Sobel gradient magnitude with edge-replicated borders
///
/// Arrays smaller than 2 on either axis have zero magnitude everywhere.
pub fn sobel_magnitude(lum: &Array2<f32>) -> Array2<f32> {
    let (h, w) = lum.dim();
    if h < 2 || w < 2 {
        return Array2::zeros((h, w));
    }
    let at = |y: isize, x: isize| {
        let yy = y.clamp(0, h as isize - 1) as usize;
        let xx = x.clamp(0, w as isize - 1) as usize;
        lum.get((yy, xx)).copied().unwrap_or(0.0)
    };
    Array2::from_shape_fn((h, w), |(y, x)| {
        let (y, x) = (y as isize, x as isize);
        let gx = (at(y - 1, x - 1) + 2.0 * at(y, x - 1) + at(y + 1, x - 1))
            - (at(y - 1, x + 1) + 2.0 * at(y, x + 1) + at(y + 1, x + 1));
        let gy = (at(y - 1, x - 1) + 2.0 * at(y - 1, x) + at(y - 1, x + 1))
            - (at(y + 1, x - 1) + 2.0 * at(y + 1, x) + at(y + 1, x + 1));
        gx.hypot(gy)
    })
}

/// Mean absolute difference of Sobel magnitudes of the luminance
pub fn sobel_l1(a: ArrayView3<'_, f32>, b: ArrayView3<'_, f32>) -> f64 {
    let (a, b) = common(a, b);
    let ma = sobel_magnitude(&luminance(a));
    let mb = sobel_magnitude(&luminance(b));
    let n = ma.len();
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = ma
        .iter()
        .zip(mb.iter())
        .map(|(x, y)| f64::from((x - y).abs()))
        .sum();
    sum / n as f64
}

/// Weights of the three metrics in a combined score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Weight of [`rgb_l1`]
    pub rgb_l1: f64,
    /// Weight of [`rgb_l2`]
    pub rgb_l2: f64,
    /// Weight of [`sobel_l1`]
    pub sobel_l1: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            rgb_l1: DEFAULT_RGB_L1_WEIGHT,
            rgb_l2: DEFAULT_RGB_L2_WEIGHT,
            sobel_l1: DEFAULT_SOBEL_L1_WEIGHT,
        }
    }
}

/// Partially specified weights, typically parsed from JSON
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightOverrides {
    /// Optional weight of [`rgb_l1`]
    #[serde(default)]
    pub rgb_l1: Option<f64>,
    /// Optional weight of [`rgb_l2`]
    #[serde(default)]
    pub rgb_l2: Option<f64>,
    /// Optional weight of [`sobel_l1`]
    #[serde(default)]
    pub sobel_l1: Option<f64>,
}

impl WeightOverrides {
    /// Turn overrides into concrete weights
    ///
    /// Only finite values are kept and unspecified keys weigh 0. When no key
    /// survives, `defaults` is returned unchanged.
    pub fn resolve(&self, defaults: ScoreWeights) -> ScoreWeights {
        let keep = |v: Option<f64>| v.filter(|w| w.is_finite());
        let (l1, l2, sobel) = (keep(self.rgb_l1), keep(self.rgb_l2), keep(self.sobel_l1));
        if l1.is_none() && l2.is_none() && sobel.is_none() {
            return defaults;
        }
        ScoreWeights {
            rgb_l1: l1.unwrap_or(0.0),
            rgb_l2: l2.unwrap_or(0.0),
            sobel_l1: sobel.unwrap_or(0.0),
        }
    }
}

/// Raw metric values of one comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean absolute RGB difference
    pub rgb_l1: f64,
    /// Mean squared RGB difference
    pub rgb_l2: f64,
    /// Mean absolute gradient magnitude difference
    pub sobel_l1: f64,
}

impl Metrics {
    /// Weighted sum of the metrics
    pub fn weighted(&self, weights: &ScoreWeights) -> f64 {
        weights.rgb_l1.mul_add(
            self.rgb_l1,
            weights
                .rgb_l2
                .mul_add(self.rgb_l2, weights.sobel_l1 * self.sobel_l1),
        )
    }
}

/// Compare two arrays and return the weighted score with its metrics
pub fn score_pair(
    a: ArrayView3<'_, f32>,
    b: ArrayView3<'_, f32>,
    weights: &ScoreWeights,
) -> (f64, Metrics) {
    let metrics = Metrics {
        rgb_l1: rgb_l1(a.view(), b.view()),
        rgb_l2: rgb_l2(a.view(), b.view()),
        sobel_l1: if weights.sobel_l1 == 0.0 {
            0.0
        } else {
            sobel_l1(a, b)
        },
    };
    (metrics.weighted(weights), metrics)
}

/// Content profile deciding which structure metrics dominate
///
/// Chosen explicitly by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureProfile {
    /// Natural imagery: preserve edges and texture
    #[default]
    Photographic,
    /// Flat-shaded renders: preserve colour regions
    Whitebox,
}

impl StructureProfile {
    /// Default structure weights of the profile
    pub const fn weights(self) -> ScoreWeights {
        match self {
            Self::Photographic => ScoreWeights {
                rgb_l1: 0.15,
                rgb_l2: 0.0,
                sobel_l1: 1.0,
            },
            Self::Whitebox => ScoreWeights {
                rgb_l1: 1.0,
                rgb_l2: 0.0,
                sobel_l1: 0.5,
            },
        }
    }
}
