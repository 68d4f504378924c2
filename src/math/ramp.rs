//! Linear fades and radial masks used to weight overlapping contributions
//!
//! A fade-in of length `n` takes the values `i / n` for `i in 0..n` and a
//! fade-out takes `1 - i / n`, so a fade-in and a fade-out laid over the same
//! pixels sum to exactly 1.

use ndarray::{Array1, Array2};

/// Per-axis weights with optional fades at each end
///
/// Fade lengths are clamped to half the axis length. A zero length leaves
/// that end at full weight.
pub fn fade_axis(length: usize, fade_start: usize, fade_end: usize) -> Array1<f32> {
    let mut weights = Array1::<f32>::ones(length);
    let fade_in = fade_start.min(length / 2);
    let fade_out = fade_end.min(length / 2);

    for i in 0..fade_in {
        if let Some(w) = weights.get_mut(i) {
            *w *= i as f32 / fade_in as f32;
        }
    }
    for i in 0..fade_out {
        if let Some(w) = weights.get_mut(length - fade_out + i) {
            *w *= 1.0 - i as f32 / fade_out as f32;
        }
    }
    weights
}

/// Outer product of a vertical and a horizontal weight profile
///
/// The result has shape `(rows, cols)`.
pub fn outer(rows: &Array1<f32>, cols: &Array1<f32>) -> Array2<f32> {
    Array2::from_shape_fn((rows.len(), cols.len()), |(y, x)| {
        rows.get(y).copied().unwrap_or(0.0) * cols.get(x).copied().unwrap_or(0.0)
    })
}

/// Which sides of a rectangle border other content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sides {
    /// Content exists to the left
    pub left: bool,
    /// Content exists to the right
    pub right: bool,
    /// Content exists above
    pub top: bool,
    /// Content exists below
    pub bottom: bool,
}

/// Weight mask of a window that fades only toward bordered sides
///
/// The fade is clamped to half of each dimension.
pub fn window_weight(width: usize, height: usize, fade: usize, sides: Sides) -> Array2<f32> {
    let fade_x = fade.min(width / 2);
    let fade_y = fade.min(height / 2);
    let wx = fade_axis(
        width,
        if sides.left { fade_x } else { 0 },
        if sides.right { fade_x } else { 0 },
    );
    let wy = fade_axis(
        height,
        if sides.top { fade_y } else { 0 },
        if sides.bottom { fade_y } else { 0 },
    );
    outer(&wy, &wx)
}

/// Quadratic radial falloff centred in a `width x height` patch
///
/// `w = max(0, 1 - d / r)^2` with `r = max(1, min(width, height) / 2)`.
pub fn radial_mask(width: usize, height: usize) -> Array2<f32> {
    let cx = (width as f32 - 1.0) * 0.5;
    let cy = (height as f32 - 1.0) * 0.5;
    let radius = (0.5 * width.min(height) as f32).max(1.0);
    Array2::from_shape_fn((height, width), |(y, x)| {
        let d = (x as f32 - cx).hypot(y as f32 - cy);
        let t = (1.0 - d / radius).max(0.0);
        t * t
    })
}
