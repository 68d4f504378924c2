//! Window placement over a mosaic extent

use serde::{Deserialize, Serialize};

/// Start offsets of windows of side `size` covering `[0, extent)`
///
/// Consecutive starts are `max(1, size - overlap)` apart and the last window
/// ends flush with the extent, so the union covers every pixel without gaps.
/// When the extent fits in one window the only start is 0.
pub fn window_starts(extent: u32, size: u32, overlap: u32) -> Vec<u32> {
    if extent <= size || size == 0 {
        return vec![0];
    }
    let stride = size.saturating_sub(overlap).max(1);
    let last = extent - size;
    let mut starts: Vec<u32> = (0..last).step_by(stride as usize).collect();
    if starts.last() != Some(&last) {
        starts.push(last);
    }
    starts
}

/// Axis-aligned rectangle of the mosaic processed in one oracle call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Row-major index, used for seeding
    pub index: usize,
    /// Left edge
    pub x0: u32,
    /// Top edge
    pub y0: u32,
    /// Right edge (exclusive)
    pub x1: u32,
    /// Bottom edge (exclusive)
    pub y1: u32,
}

impl Window {
    /// Width in pixels
    pub const fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    /// Height in pixels
    pub const fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

/// Row-major windows clipped to a `width x height` mosaic
pub fn window_grid(width: u32, height: u32, size: u32, overlap: u32) -> Vec<Window> {
    let xs = window_starts(width, size, overlap);
    let ys = window_starts(height, size, overlap);
    let mut windows = Vec::with_capacity(xs.len() * ys.len());
    for &y0 in &ys {
        for &x0 in &xs {
            windows.push(Window {
                index: windows.len(),
                x0,
                y0,
                x1: (x0 + size).min(width),
                y1: (y0 + size).min(height),
            });
        }
    }
    windows
}
