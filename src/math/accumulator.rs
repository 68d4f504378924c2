//! Weighted overlap-add buffer for compositing RGB contributions

use crate::io::configuration::WEIGHT_EPSILON;
use image::{Rgb, RgbImage};
use ndarray::{Array2, Array3};

/// What an uncovered pixel resolves to
#[derive(Debug, Clone, Copy)]
pub enum Uncovered<'a> {
    /// Fill with a constant colour
    Background([u8; 3]),
    /// Keep the pixel of a reference image of the same size
    Original(&'a RgbImage),
}

/// Per-pixel weighted RGB sums plus weight sums
///
/// Every pixel that received a positive contribution has a positive weight
/// sum. Pixels below [`WEIGHT_EPSILON`] are holes.
#[derive(Debug, Clone)]
pub struct WeightBuffer {
    accum: Array3<f32>,
    weight: Array2<f32>,
    width: u32,
    height: u32,
}

impl WeightBuffer {
    /// Create an empty buffer
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self {
            accum: Array3::zeros((h, w, 3)),
            weight: Array2::zeros((h, w)),
            width,
            height,
        }
    }

    /// Buffer width
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Add `image` at `(x0, y0)` scaled by a weight mask of the image's shape
    ///
    /// Pixels outside the buffer and non-positive weights are ignored.
    pub fn add(&mut self, image: &RgbImage, x0: i64, y0: i64, mask: &Array2<f32>) {
        for (x, y, pixel) in image.enumerate_pixels() {
            let w = mask.get((y as usize, x as usize)).copied().unwrap_or(0.0);
            if w <= 0.0 {
                continue;
            }
            let (px, py) = (x0 + i64::from(x), y0 + i64::from(y));
            if px < 0 || py < 0 {
                continue;
            }
            let (bx, by) = (px as usize, py as usize);
            let Some(total) = self.weight.get_mut((by, bx)) else {
                continue;
            };
            *total += w;
            for (c, &value) in pixel.0.iter().enumerate() {
                if let Some(acc) = self.accum.get_mut((by, bx, c)) {
                    *acc += f32::from(value) * w;
                }
            }
        }
    }

    /// Accumulated weight at a pixel
    pub fn weight_at(&self, x: u32, y: u32) -> f32 {
        self.weight
            .get((y as usize, x as usize))
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether a pixel received a meaningful contribution
    pub fn is_covered(&self, x: u32, y: u32) -> bool {
        self.weight_at(x, y) >= WEIGHT_EPSILON
    }

    /// Normalise the buffer into an image
    ///
    /// Covered pixels become `accum / weight` rounded to the nearest value.
    pub fn resolve(&self, uncovered: Uncovered<'_>) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let (ux, uy) = (x as usize, y as usize);
            let w = self.weight.get((uy, ux)).copied().unwrap_or(0.0);
            if w < WEIGHT_EPSILON {
                return match uncovered {
                    Uncovered::Background(color) => Rgb(color),
                    Uncovered::Original(original) => original
                        .get_pixel_checked(x, y)
                        .copied()
                        .unwrap_or(Rgb([0, 0, 0])),
                };
            }
            let mut out = [0u8; 3];
            for (c, slot) in out.iter_mut().enumerate() {
                let acc = self.accum.get((uy, ux, c)).copied().unwrap_or(0.0);
                *slot = (acc / w).round().clamp(0.0, 255.0) as u8;
            }
            Rgb(out)
        })
    }
}
