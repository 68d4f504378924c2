//! Seam intensity heatmap rendered over the cropped mosaic layout

use crate::analysis::seams::SeamRecord;
use crate::spatial::grid::{SeamOrientation, TileCoord};
use crate::spatial::layout::TileGeometry;
use image::{Rgb, RgbImage};
use ndarray::Array2;

/// Black to red to yellow to white ramp for `t` in `[0, 1]`
pub fn colormap_hot(t: f32) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let channel = |v: f32| (255.0 * v).round().clamp(0.0, 255.0) as u8;
    if t < 0.5 {
        Rgb([channel(2.0 * t), 0, 0])
    } else if t < 0.85 {
        Rgb([255, channel((t - 0.5) / 0.35), 0])
    } else {
        Rgb([255, 255, channel((t - 0.85) / 0.15)])
    }
}

/// Raw seam intensities laid out on the mosaic
#[derive(Debug, Clone)]
pub struct SeamHeatmap {
    values: Array2<f32>,
    geometry: TileGeometry,
    origin: TileCoord,
}

impl SeamHeatmap {
    /// Empty heatmap for `columns x rows` tiles starting at `origin`
    pub fn new(geometry: TileGeometry, origin: TileCoord, columns: u32, rows: u32) -> Self {
        let width = (geometry.cropped_width() * columns) as usize;
        let height = (geometry.cropped_height() * rows) as usize;
        Self {
            values: Array2::zeros((height, width)),
            geometry,
            origin,
        }
    }

    /// Heatmap width in pixels
    pub fn width(&self) -> u32 {
        self.values.ncols() as u32
    }

    /// Heatmap height in pixels
    pub fn height(&self) -> u32 {
        self.values.nrows() as u32
    }

    fn mark(&mut self, x: i64, y: i64, value: f32) {
        if x < 0 || y < 0 {
            return;
        }
        if let Some(slot) = self.values.get_mut((y as usize, x as usize)) {
            *slot = slot.max(value);
        }
    }

    /// Paint the profile of a seam on the two pixel lines next to it
    ///
    /// Profile entries that fall in the overlap margins are dropped so the
    /// line matches the cropped layout.
    pub fn paint(&mut self, record: &SeamRecord) {
        let cw = i64::from(self.geometry.cropped_width());
        let ch = i64::from(self.geometry.cropped_height());
        let col = i64::from(record.pair.first.x - self.origin.x);
        let row = i64::from(record.pair.first.y - self.origin.y);
        match record.pair.orientation {
            SeamOrientation::Vertical => {
                let margin = self.geometry.margin_y as usize;
                let seam_x = (col + 1) * cw;
                let y0 = row * ch;
                let trimmed = trim(&record.profile, margin);
                for (i, &v) in trimmed.iter().take(ch as usize).enumerate() {
                    self.mark(seam_x - 1, y0 + i as i64, v);
                    self.mark(seam_x, y0 + i as i64, v);
                }
            }
            SeamOrientation::Horizontal => {
                let margin = self.geometry.margin_x as usize;
                let seam_y = (row + 1) * ch;
                let x0 = col * cw;
                let trimmed = trim(&record.profile, margin);
                for (i, &v) in trimmed.iter().take(cw as usize).enumerate() {
                    self.mark(x0 + i as i64, seam_y - 1, v);
                    self.mark(x0 + i as i64, seam_y, v);
                }
            }
        }
    }

    /// Normalise by the maximum intensity and apply [`colormap_hot`]
    ///
    /// Pixels with no seam stay black.
    pub fn render(&self) -> RgbImage {
        let max = self.values.iter().copied().fold(0.0f32, f32::max);
        let scale = if max > 0.0 { max } else { 1.0 };
        RgbImage::from_fn(self.width(), self.height(), |x, y| {
            let v = self
                .values
                .get((y as usize, x as usize))
                .copied()
                .unwrap_or(0.0);
            if v <= 0.0 {
                Rgb([0, 0, 0])
            } else {
                colormap_hot(v / scale)
            }
        })
    }
}

fn trim(profile: &[f32], margin: usize) -> &[f32] {
    if profile.len() > 2 * margin {
        profile.get(margin..profile.len() - margin).unwrap_or(profile)
    } else {
        profile
    }
}
