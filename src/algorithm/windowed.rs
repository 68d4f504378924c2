//! Global stylization of a tile grid through overlapping windows
//!
//! The grid is composited into one mosaic, stylized window by window with
//! overlap-add blending, repaired at tile crossings and split back into
//! tiles. Neighboring tiles therefore see the same stylized pixels along
//! their shared edges.

use crate::algorithm::junction::{JunctionConfig, JunctionStats, repair_junctions};
use crate::algorithm::mosaic::{Mosaic, assemble_blend};
use crate::algorithm::retry::RetryingOracle;
use crate::io::configuration::{
    DEFAULT_BACKGROUND, DEFAULT_GUIDANCE, DEFAULT_MOSAIC_FEATHER, DEFAULT_SEED, DEFAULT_STEPS,
    DEFAULT_STRENGTH, DEFAULT_WINDOW_FEATHER, DEFAULT_WINDOW_OVERLAP, DEFAULT_WINDOW_SIZE,
    MIN_WINDOW_SIZE,
};
use crate::io::error::{Result, invalid_parameter, structural_error};
use crate::io::progress::{NoProgress, Progress};
use crate::io::report::{GeometrySummary, GridSummary, UnitFailure};
use crate::math::accumulator::{Uncovered, WeightBuffer};
use crate::math::ramp::{Sides, window_weight};
use crate::oracle::interface::{OracleParams, StylizeRequest};
use crate::spatial::grid::TileGrid;
use crate::spatial::layout::TileGeometry;
use crate::spatial::tiles::{TileStore, load_sized};
use crate::spatial::windows::window_grid;
use image::{RgbImage, imageops};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Settings of a windowed pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowedConfig {
    /// Base generation parameters
    pub params: OracleParams,
    /// Base seed; window `i` uses `seed + i`, wrapping on overflow
    pub seed: u64,
    /// Window side length in pixels
    pub window_size: u32,
    /// Overlap between adjacent windows in pixels
    pub window_overlap: u32,
    /// Fade width at interior window edges, capped at the window overlap
    pub window_feather: u32,
    /// Feather used when compositing the input mosaic
    pub mosaic_feather: u32,
    /// Junction repair settings
    pub junctions: JunctionConfig,
    /// Overwrite existing output tiles
    pub force: bool,
    /// Colour of mosaic holes
    pub background: [u8; 3],
}

impl Default for WindowedConfig {
    fn default() -> Self {
        Self {
            params: OracleParams {
                prompt: String::new(),
                negative: None,
                strength: DEFAULT_STRENGTH,
                steps: DEFAULT_STEPS,
                guidance: DEFAULT_GUIDANCE,
            },
            seed: DEFAULT_SEED,
            window_size: DEFAULT_WINDOW_SIZE,
            window_overlap: DEFAULT_WINDOW_OVERLAP,
            window_feather: DEFAULT_WINDOW_FEATHER,
            mosaic_feather: DEFAULT_MOSAIC_FEATHER,
            junctions: JunctionConfig::default(),
            force: false,
            background: DEFAULT_BACKGROUND,
        }
    }
}

impl WindowedConfig {
    /// Check window and strength settings
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error for a window smaller than 64 px,
    /// an overlap not smaller than the window, or a strength outside `(0, 1]`
    pub fn validate(&self) -> Result<()> {
        if self.window_size < MIN_WINDOW_SIZE {
            return Err(invalid_parameter(
                "window_size",
                &self.window_size,
                &format!("must be at least {MIN_WINDOW_SIZE}"),
            ));
        }
        if self.window_overlap >= self.window_size {
            return Err(invalid_parameter(
                "window_overlap",
                &self.window_overlap,
                &"must be smaller than the window size",
            ));
        }
        if !(self.params.strength > 0.0 && self.params.strength <= 1.0) {
            return Err(invalid_parameter(
                "strength",
                &self.params.strength,
                &"must be in (0, 1]",
            ));
        }
        Ok(())
    }
}

/// Outcome of a windowed pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowedReport {
    /// Grid that was processed
    pub grid: GridSummary,
    /// Tile geometry
    pub geometry: GeometrySummary,
    /// Mosaic width and height
    pub mosaic_size: (u32, u32),
    /// Windows laid over the mosaic
    pub windows_total: usize,
    /// Windows stylized
    pub windows_processed: usize,
    /// Windows left unstylized
    pub windows_skipped: usize,
    /// Junction pass counters
    pub junctions: JunctionStats,
    /// Oracle failures of the window pass
    pub failures: Vec<UnitFailure>,
    /// Output tiles written
    pub tiles_written: usize,
    /// Output tiles that already existed and were kept
    pub tiles_kept: usize,
    /// Whether the whole pass was skipped because every output existed
    pub skipped_existing: bool,
}

/// Result of [`WindowedStylizer::run`]
#[derive(Debug, Clone)]
pub struct WindowedRun {
    /// Counters and failures
    pub report: WindowedReport,
    /// Input and output mosaics, absent when the pass was skipped
    pub mosaics: Option<(Mosaic, RgbImage)>,
}

/// Runs the windowed stylization pass against an oracle
pub struct WindowedStylizer<'a> {
    oracle: RetryingOracle<'a>,
    config: WindowedConfig,
    progress: Box<dyn Progress + 'a>,
}

impl<'a> WindowedStylizer<'a> {
    /// Create a stylizer without progress output
    pub fn new(oracle: RetryingOracle<'a>, config: WindowedConfig) -> Self {
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

    /// Stylize the mosaic of `input` and write tiles to `output`
    ///
    /// # Errors
    ///
    /// Returns an error for invalid settings, a grid with no readable tile,
    /// or tile I/O failures
    pub fn run(
        &mut self,
        input: &dyn TileStore,
        grid: &TileGrid,
        geometry: TileGeometry,
        overlap: f64,
        output: &mut dyn TileStore,
    ) -> Result<WindowedRun> {
        self.config.validate()?;
        let present = grid.present();
        let config = self.config.clone();

        let mut report = WindowedReport {
            grid: GridSummary::of(grid),
            geometry: GeometrySummary::of(geometry, overlap),
            mosaic_size: (
                geometry.cropped_width() * grid.columns(),
                geometry.cropped_height() * grid.rows(),
            ),
            windows_total: 0,
            windows_processed: 0,
            windows_skipped: 0,
            junctions: JunctionStats::default(),
            failures: Vec::new(),
            tiles_written: 0,
            tiles_kept: 0,
            skipped_existing: false,
        };

        if !config.force && present.iter().all(|&c| output.contains(c)) {
            info!(
                tiles = present.len(),
                "all output tiles exist, skipping windowed pass"
            );
            report.tiles_kept = present.len();
            report.skipped_existing = true;
            return Ok(WindowedRun {
                report,
                mosaics: None,
            });
        }

        let (mosaic, stats) = assemble_blend(
            input,
            grid,
            geometry,
            config.mosaic_feather,
            config.background,
        )?;
        if stats.placed == 0 {
            return Err(structural_error("<input>", &"no tiles copied into mosaic"));
        }

        let stylized = self.stylize_windows(&mosaic.image, &mut report);

        let mut repaired = stylized;
        report.junctions = repair_junctions(
            &mut repaired,
            (
                grid.columns(),
                grid.rows(),
                geometry.cropped_width(),
                geometry.cropped_height(),
            ),
            &config.junctions,
            &config.params,
            config.seed,
            &mut self.oracle,
            self.progress.as_mut(),
        );

        let output_mosaic = Mosaic {
            image: repaired,
            geometry: mosaic.geometry,
            origin: mosaic.origin,
            columns: mosaic.columns,
            rows: mosaic.rows,
        };
        for coord in present {
            if !config.force && output.contains(coord) {
                report.tiles_kept += 1;
                continue;
            }
            let Some(original) = load_sized(input, coord, geometry.width, geometry.height)? else {
                continue;
            };
            if let Some(tile) = output_mosaic.write_back(coord, &original) {
                output.save(coord, &tile)?;
                report.tiles_written += 1;
            }
        }

        info!(
            windows = report.windows_processed,
            windows_skipped = report.windows_skipped,
            junctions = report.junctions.processed,
            tiles = report.tiles_written,
            "windowed pass complete"
        );
        Ok(WindowedRun {
            report,
            mosaics: Some((mosaic, output_mosaic.image)),
        })
    }

    fn stylize_windows(&mut self, mosaic: &RgbImage, report: &mut WindowedReport) -> RgbImage {
        let (mw, mh) = mosaic.dimensions();
        let config = &self.config;
        let windows = window_grid(mw, mh, config.window_size, config.window_overlap);
        let fade = config.window_feather.min(config.window_overlap) as usize;
        report.windows_total = windows.len();
        let mut buffer = WeightBuffer::new(mw, mh);
        self.progress.start_phase("windows", windows.len());

        for window in &windows {
            self.progress.advance(&format!("window {}", window.index));
            let patch = imageops::crop_imm(
                mosaic,
                window.x0,
                window.y0,
                window.width(),
                window.height(),
            )
            .to_image();
            let seed = config.seed.wrapping_add(window.index as u64);
            let request = StylizeRequest::new(&patch, &config.params, seed);
            match self.oracle.stylize("window", &request) {
                Ok(stylized) => {
                    let sides = Sides {
                        left: window.x0 > 0,
                        right: window.x1 < mw,
                        top: window.y0 > 0,
                        bottom: window.y1 < mh,
                    };
                    let mask = window_weight(
                        window.width() as usize,
                        window.height() as usize,
                        fade,
                        sides,
                    );
                    buffer.add(
                        &stylized,
                        i64::from(window.x0),
                        i64::from(window.y0),
                        &mask,
                    );
                    report.windows_processed += 1;
                }
                Err(error) => {
                    warn!(window = window.index, error = %error, "window stylization failed");
                    report.windows_skipped += 1;
                    report.failures.push(UnitFailure {
                        unit: format!("window {}", window.index),
                        error,
                    });
                }
            }
        }

        self.progress.finish_phase();
        buffer.resolve(Uncovered::Original(mosaic))
    }
}
