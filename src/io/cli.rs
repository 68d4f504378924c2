//! Command-line interface for mosaic assembly and the three stylization passes

use crate::algorithm::cache::{CandidateCache, DiskStore};
use crate::algorithm::junction::JunctionConfig;
use crate::algorithm::mosaic::{MosaicMode, MosaicReport, assemble};
use crate::algorithm::retry::{RetryPolicy, RetryingOracle, ThreadSleeper};
use crate::algorithm::seam_repair::{SeamRepairConfig, SeamRepairEngine};
use crate::algorithm::seed::SeedMode;
use crate::algorithm::selection::{CandidateSelector, SelectionConfig, Subgrid};
use crate::algorithm::windowed::{WindowedConfig, WindowedStylizer};
use crate::analysis::metrics::{ScoreWeights, StructureProfile, WeightOverrides};
use crate::analysis::seams::NeighborMode;
use crate::io::configuration::{
    CACHE_DIR, DEFAULT_BACKGROUND, DEFAULT_BLEND_FEATHER, DEFAULT_CANDIDATES,
    DEFAULT_FALLBACK_PENALTY, DEFAULT_GUIDANCE, DEFAULT_HARMONIZE_HALF, DEFAULT_JUNCTION_HALF,
    DEFAULT_JUNCTION_STRENGTH_BOOST, DEFAULT_MASK_HALF, DEFAULT_MODEL, DEFAULT_MOSAIC_FEATHER,
    DEFAULT_OVERLAP_PX, DEFAULT_RETRY_BASE_MS, DEFAULT_RETRY_JITTER_MS, DEFAULT_RETRY_MAX,
    DEFAULT_RETRY_MAX_MS, DEFAULT_SEAM_STEPS, DEFAULT_SEAM_STRENGTH, DEFAULT_SEED, DEFAULT_STEPS,
    DEFAULT_STRENGTH, DEFAULT_STRUCTURE_DOWNSCALE, DEFAULT_STRUCTURE_WEIGHT, DEFAULT_TIMEOUT_MS,
    DEFAULT_TOKEN_ENV, DEFAULT_WINDOW_FEATHER, DEFAULT_WINDOW_OVERLAP, DEFAULT_WINDOW_SIZE,
    DEFAULT_WRITE_HALF, MOSAIC_INPUT_FILE, MOSAIC_OUTPUT_FILE, REPORT_FILE,
};
use crate::io::error::{Result, WithPath, invalid_parameter};
use crate::io::image::{load_rgb, save_png_atomic};
use crate::io::progress::{NoProgress, Progress, ProgressManager};
use crate::io::report::write_json;
use crate::oracle::http::{HttpOracle, HttpOracleConfig};
use crate::oracle::interface::{OracleParams, StylizationOracle};
use crate::oracle::stub::IdentityOracle;
use crate::spatial::grid::TileGrid;
use crate::spatial::layout::{LayoutMetadata, TileGeometry, resolve_geometry};
use crate::spatial::tiles::TileLayer;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "seamweave")]
#[command(
    author,
    version,
    about = "Stylize raster tile pyramids without visible seams"
)]
/// Command-line arguments shared by every subcommand
pub struct Cli {
    /// Operation to run
    #[command(subcommand)]
    pub command: Command,

    /// Suppress progress output and log warnings only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Overwrite existing outputs and ignore manifest mismatches
    #[arg(short, long, global = true)]
    pub force: bool,

    /// Where to write the JSON report
    #[arg(long, global = true, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }
}

/// Available operations
#[derive(Subcommand)]
pub enum Command {
    /// Composite a tile layer into one image
    Mosaic(MosaicArgs),
    /// Stylize the whole layer through overlapping windows
    Stylize(StylizeArgs),
    /// Repair seams between adjacent tiles by inpainting
    Seams(SeamsArgs),
    /// Generate several candidates per tile and keep the best fitting one
    Select(SelectArgs),
}

/// Input and output layers
#[derive(Args, Clone)]
pub struct LayerArgs {
    /// Input layer holding `0/<x>/<y>.png`
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output layer directory
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Overlap fraction, overriding the layout metadata
    #[arg(long)]
    pub overlap: Option<f64>,
}

/// Oracle backend and generation parameters
#[derive(Args, Clone)]
pub struct OracleArgs {
    /// HTTP endpoint of the oracle; without it tiles pass through unchanged
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Model name sent to the endpoint
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Endpoint tried when the primary fails
    #[arg(long)]
    pub fallback_endpoint: Option<String>,

    /// Model name sent to the fallback endpoint
    #[arg(long)]
    pub fallback_model: Option<String>,

    /// Environment variable holding the bearer token
    #[arg(long, default_value = DEFAULT_TOKEN_ENV)]
    pub token_env: String,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Positive prompt
    #[arg(long, default_value = "")]
    pub prompt: String,

    /// File holding the positive prompt
    #[arg(long, conflicts_with = "prompt")]
    pub prompt_file: Option<PathBuf>,

    /// Negative prompt
    #[arg(long)]
    pub negative: Option<String>,

    /// File holding the negative prompt
    #[arg(long, conflicts_with = "negative")]
    pub negative_file: Option<PathBuf>,

    /// Stylization strength in (0, 1]
    #[arg(long)]
    pub strength: Option<f64>,

    /// Oracle steps
    #[arg(long)]
    pub steps: Option<u32>,

    /// Guidance scale
    #[arg(long, default_value_t = DEFAULT_GUIDANCE)]
    pub guidance: f64,

    /// Base seed
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

impl OracleArgs {
    /// Generation parameters with per-command defaults for strength and steps
    ///
    /// # Errors
    ///
    /// Returns an error if a prompt file cannot be read
    pub fn params(&self, strength: f64, steps: u32) -> Result<OracleParams> {
        let prompt = match &self.prompt_file {
            Some(path) => read_text(path)?,
            None => self.prompt.clone(),
        };
        let negative = match &self.negative_file {
            Some(path) => Some(read_text(path)?),
            None => self.negative.clone(),
        };
        Ok(OracleParams {
            prompt,
            negative,
            strength: self.strength.unwrap_or(strength),
            steps: self.steps.unwrap_or(steps),
            guidance: self.guidance,
        })
    }

    /// Primary backend
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error when the HTTP client cannot be built
    pub fn primary(&self) -> Result<Box<dyn StylizationOracle>> {
        match &self.endpoint {
            Some(endpoint) => self.http(endpoint, &self.model),
            None => {
                info!("no endpoint given, running with the identity oracle");
                Ok(Box::new(IdentityOracle))
            }
        }
    }

    /// Fallback backend, if one is configured
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error when the HTTP client cannot be built
    pub fn fallback(&self) -> Result<Option<Box<dyn StylizationOracle>>> {
        self.fallback_endpoint
            .as_ref()
            .map(|endpoint| {
                let model = self.fallback_model.as_deref().unwrap_or(&self.model);
                self.http(endpoint, model)
            })
            .transpose()
    }

    fn http(&self, endpoint: &str, model: &str) -> Result<Box<dyn StylizationOracle>> {
        let token = std::env::var(&self.token_env).ok().filter(|t| !t.is_empty());
        if token.is_none() {
            warn!(variable = %self.token_env, "no oracle token set");
        }
        let oracle = HttpOracle::new(HttpOracleConfig {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            token,
            timeout: Duration::from_millis(self.timeout_ms),
        })
        .map_err(|err| invalid_parameter("endpoint", &endpoint, &err))?;
        Ok(Box::new(oracle))
    }
}

/// Retry budget and backoff
#[derive(Args, Clone)]
pub struct RetryArgs {
    /// Retries after the first attempt
    #[arg(long, default_value_t = DEFAULT_RETRY_MAX)]
    pub retry_max: u32,

    /// Base backoff in milliseconds
    #[arg(long, default_value_t = DEFAULT_RETRY_BASE_MS)]
    pub retry_base_ms: u64,

    /// Backoff cap in milliseconds
    #[arg(long, default_value_t = DEFAULT_RETRY_MAX_MS)]
    pub retry_max_ms: u64,

    /// Random jitter added to each backoff in milliseconds
    #[arg(long, default_value_t = DEFAULT_RETRY_JITTER_MS)]
    pub retry_jitter_ms: u64,
}

impl RetryArgs {
    /// Policy described by the flags
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_max,
            base_ms: self.retry_base_ms,
            max_ms: self.retry_max_ms,
            jitter_ms: self.retry_jitter_ms,
        }
    }
}

/// Arguments of `mosaic`
#[derive(Args, Clone)]
pub struct MosaicArgs {
    /// Input layer holding `0/<x>/<y>.png`
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output PNG file
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Overlap fraction, overriding the layout metadata
    #[arg(long)]
    pub overlap: Option<f64>,

    /// Compositing strategy
    #[arg(long, value_enum, default_value_t = MosaicMode::Crop)]
    pub mode: MosaicMode,

    /// Feather per side in blend mode
    #[arg(long, default_value_t = DEFAULT_BLEND_FEATHER)]
    pub feather: u32,
}

/// Arguments of `stylize`
#[derive(Args, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct StylizeArgs {
    /// Input and output layers
    #[command(flatten)]
    pub layer: LayerArgs,

    /// Oracle settings
    #[command(flatten)]
    pub oracle: OracleArgs,

    /// Retry settings
    #[command(flatten)]
    pub retry: RetryArgs,

    /// Window side in pixels
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    pub window_size: u32,

    /// Overlap between windows in pixels
    #[arg(long, default_value_t = DEFAULT_WINDOW_OVERLAP)]
    pub window_overlap: u32,

    /// Fade width at interior window edges
    #[arg(long, default_value_t = DEFAULT_WINDOW_FEATHER)]
    pub window_feather: u32,

    /// Feather used to composite the input mosaic
    #[arg(long, default_value_t = DEFAULT_MOSAIC_FEATHER)]
    pub mosaic_feather: u32,

    /// Skip the junction repair pass
    #[arg(long)]
    pub no_junctions: bool,

    /// Half side of junction patches
    #[arg(long, default_value_t = DEFAULT_JUNCTION_HALF)]
    pub junction_half: u32,

    /// Strength added for junction repair
    #[arg(long, default_value_t = DEFAULT_JUNCTION_STRENGTH_BOOST)]
    pub junction_strength_boost: f64,

    /// Junction steps; 0 uses max(steps, 14)
    #[arg(long, default_value_t = 0)]
    pub junction_steps: u32,

    /// Repair at most this many junctions; 0 means all
    #[arg(long, default_value_t = 0)]
    pub max_junctions: usize,

    /// Write input and output mosaic previews
    #[arg(long)]
    pub save_mosaics: bool,
}

/// Arguments of `seams`
#[derive(Args, Clone)]
pub struct SeamsArgs {
    /// Input and output layers
    #[command(flatten)]
    pub layer: LayerArgs,

    /// Oracle settings
    #[command(flatten)]
    pub oracle: OracleArgs,

    /// Retry settings
    #[command(flatten)]
    pub retry: RetryArgs,

    /// Half-width of the inpaint mask band
    #[arg(long, default_value_t = DEFAULT_MASK_HALF)]
    pub mask_half: u32,

    /// Half-width of the write-back band
    #[arg(long, default_value_t = DEFAULT_WRITE_HALF)]
    pub write_half: u32,

    /// Half-width of the harmonization band
    #[arg(long, default_value_t = DEFAULT_HARMONIZE_HALF)]
    pub harmonize_half: u32,

    /// Context strip width per side; 0 derives it from the margins
    #[arg(long, default_value_t = 0)]
    pub seam_context: u32,

    /// Attempt at most this many seams; 0 means all
    #[arg(long, default_value_t = 0)]
    pub max_seams: usize,
}

/// Arguments of `select`
#[derive(Args, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct SelectArgs {
    /// Input and output layers
    #[command(flatten)]
    pub layer: LayerArgs,

    /// Oracle settings
    #[command(flatten)]
    pub oracle: OracleArgs,

    /// Retry settings
    #[command(flatten)]
    pub retry: RetryArgs,

    /// Candidates per tile
    #[arg(short = 'k', long, default_value_t = DEFAULT_CANDIDATES)]
    pub candidates: u32,

    /// Candidate seed derivation
    #[arg(long, value_enum, default_value_t = SeedMode::TileHash)]
    pub seed_mode: SeedMode,

    /// Width of the neighbor strips compared
    #[arg(long, default_value_t = DEFAULT_OVERLAP_PX)]
    pub overlap_px: u32,

    /// Neighbors used, such as `left+top` or `left+top+tl`
    #[arg(long, default_value = "left+top")]
    pub neighbors: NeighborMode,

    /// Send accepted neighbors along with each request
    #[arg(long)]
    pub neighbors_in_prompt: bool,

    /// JSON seam weights, such as `{"rgb_l1": 1.0}`
    #[arg(long)]
    pub seam_weights: Option<String>,

    /// Content profile for structure scoring
    #[arg(long, value_enum, default_value_t = StructureProfile::Photographic)]
    pub structure_profile: StructureProfile,

    /// JSON structure weights overriding the profile
    #[arg(long)]
    pub structure_weights: Option<String>,

    /// Weight of the structure score; 0 disables it
    #[arg(long, default_value_t = DEFAULT_STRUCTURE_WEIGHT)]
    pub structure_weight: f64,

    /// Side both images are resized to for structure scoring
    #[arg(long, default_value_t = DEFAULT_STRUCTURE_DOWNSCALE)]
    pub structure_downscale: u32,

    /// Penalty added to fallback candidates
    #[arg(long, default_value_t = DEFAULT_FALLBACK_PENALTY)]
    pub fallback_penalty: f64,

    /// Process only `x0,y0,width,height` tiles
    #[arg(long, value_parser = parse_subgrid)]
    pub subgrid: Option<Subgrid>,

    /// Style anchor images sent with every request
    #[arg(long = "anchor")]
    pub anchors: Vec<PathBuf>,

    /// Keep every candidate under `candidates/`
    #[arg(long)]
    pub archive_candidates: bool,

    /// Cache directory, defaults to `<OUTPUT>/cache`
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Ignore cached outputs but keep writing new ones
    #[arg(long)]
    pub no_cache_read: bool,
}

/// Parse `x0,y0,width,height`
///
/// # Errors
///
/// Returns a message when the text does not hold four integers
pub fn parse_subgrid(text: &str) -> std::result::Result<Subgrid, String> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let [x0, y0, width, height] = parts.as_slice() else {
        return Err(format!("expected x0,y0,width,height, got '{text}'"));
    };
    let int = |s: &str| s.parse::<i64>().map_err(|e| format!("'{s}': {e}"));
    let (x0, y0, width, height) = (int(x0)?, int(y0)?, int(width)?, int(height)?);
    Ok(Subgrid {
        x0: i32::try_from(x0).map_err(|e| e.to_string())?,
        y0: i32::try_from(y0).map_err(|e| e.to_string())?,
        width: u32::try_from(width).map_err(|e| e.to_string())?,
        height: u32::try_from(height).map_err(|e| e.to_string())?,
    })
}

/// Parse JSON weight overrides on top of `defaults`
///
/// # Errors
///
/// Returns an invalid parameter error for malformed JSON
pub fn parse_weights(
    name: &'static str,
    text: Option<&str>,
    defaults: ScoreWeights,
) -> Result<ScoreWeights> {
    let Some(text) = text else {
        return Ok(defaults);
    };
    let overrides: WeightOverrides =
        serde_json::from_str(text).map_err(|err| invalid_parameter(name, &text, &err))?;
    Ok(overrides.resolve(defaults))
}

fn read_text(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)
        .with_path(path, "read")?
        .trim()
        .to_string())
}

/// Grid, geometry and store of an input layer
pub struct InputLayer {
    /// Tiles on disk
    pub store: TileLayer,
    /// Present coordinates
    pub grid: TileGrid,
    /// Tile size and margins
    pub geometry: TileGeometry,
    /// Overlap fraction in effect
    pub overlap: f64,
}

impl InputLayer {
    /// Scan a layer and resolve its geometry
    ///
    /// # Errors
    ///
    /// Returns a structural error for a malformed tree and an invalid
    /// parameter error for an out of range overlap
    pub fn open(root: &Path, overlap: Option<f64>) -> Result<Self> {
        let grid = TileGrid::scan(root)?;
        let store = TileLayer::new(root);
        let metadata = LayoutMetadata::load(root)?;
        let (geometry, overlap) = resolve_geometry(metadata.as_ref(), overlap, &store, &grid)?;
        let gaps = grid.gaps();
        if !gaps.is_empty() {
            warn!(x = ?gaps.x, y = ?gaps.y, "tile indices have gaps");
        }
        info!(
            tiles = grid.len(),
            columns = grid.columns(),
            rows = grid.rows(),
            width = geometry.width,
            height = geometry.height,
            margin_x = geometry.margin_x,
            margin_y = geometry.margin_y,
            "opened tile layer"
        );
        Ok(Self {
            store,
            grid,
            geometry,
            overlap,
        })
    }
}

/// Dispatches a parsed command line to the matching pass
pub struct CommandRunner {
    cli: Cli,
}

impl CommandRunner {
    /// Create a runner for the given arguments
    pub const fn new(cli: Cli) -> Self {
        Self { cli }
    }

    fn progress(&self) -> Box<dyn Progress> {
        if self.cli.should_show_progress() {
            Box::new(ProgressManager::new())
        } else {
            Box::new(NoProgress)
        }
    }

    fn report_path(&self, default: PathBuf) -> PathBuf {
        self.cli.report.clone().unwrap_or(default)
    }

    /// Run the selected command and write its report
    ///
    /// # Errors
    ///
    /// Returns run-level errors of the selected pass
    pub fn run(&mut self) -> Result<()> {
        match &self.cli.command {
            Command::Mosaic(args) => self.mosaic(args),
            Command::Stylize(args) => self.stylize(args),
            Command::Seams(args) => self.seams(args),
            Command::Select(args) => self.select(args),
        }
    }

    fn mosaic(&self, args: &MosaicArgs) -> Result<()> {
        let layer = InputLayer::open(&args.input, args.overlap)?;
        let (mosaic, stats) = assemble(
            args.mode,
            &layer.store,
            &layer.grid,
            layer.geometry,
            args.feather,
            DEFAULT_BACKGROUND,
        )?;
        save_png_atomic(&mosaic.image, &args.output)?;
        let report = MosaicReport::new(args.mode, &layer.grid, layer.overlap, &mosaic, stats);
        write_json(
            &self.report_path(args.output.with_extension("json")),
            &report,
        )?;
        info!(
            width = report.mosaic_size.0,
            height = report.mosaic_size.1,
            missing = stats.missing,
            "mosaic written"
        );
        Ok(())
    }

    fn stylize(&self, args: &StylizeArgs) -> Result<()> {
        let layer = InputLayer::open(&args.layer.input, args.layer.overlap)?;
        let config = WindowedConfig {
            params: args.oracle.params(DEFAULT_STRENGTH, DEFAULT_STEPS)?,
            seed: args.oracle.seed,
            window_size: args.window_size,
            window_overlap: args.window_overlap,
            window_feather: args.window_feather,
            mosaic_feather: args.mosaic_feather,
            junctions: JunctionConfig {
                enabled: !args.no_junctions,
                half: args.junction_half,
                strength_boost: args.junction_strength_boost,
                steps: args.junction_steps,
                max_junctions: args.max_junctions,
            },
            force: self.cli.force,
            background: DEFAULT_BACKGROUND,
        };
        let primary = args.oracle.primary()?;
        let oracle = RetryingOracle::new(primary.as_ref())
            .with_policy(args.retry.policy(), Box::new(ThreadSleeper));
        let mut stylizer = WindowedStylizer::new(oracle, config).with_progress(self.progress());
        let mut output = TileLayer::new(&args.layer.output);
        let run = stylizer.run(
            &layer.store,
            &layer.grid,
            layer.geometry,
            layer.overlap,
            &mut output,
        )?;
        if let (true, Some((input_mosaic, output_mosaic))) = (args.save_mosaics, &run.mosaics) {
            save_png_atomic(
                &input_mosaic.image,
                &args.layer.output.join(MOSAIC_INPUT_FILE),
            )?;
            save_png_atomic(output_mosaic, &args.layer.output.join(MOSAIC_OUTPUT_FILE))?;
        }
        write_json(
            &self.report_path(args.layer.output.join(REPORT_FILE)),
            &run.report,
        )
    }

    fn seams(&self, args: &SeamsArgs) -> Result<()> {
        let layer = InputLayer::open(&args.layer.input, args.layer.overlap)?;
        let config = SeamRepairConfig {
            params: args
                .oracle
                .params(DEFAULT_SEAM_STRENGTH, DEFAULT_SEAM_STEPS)?,
            seed: args.oracle.seed,
            mask_half: args.mask_half,
            write_half: args.write_half,
            harmonize_half: args.harmonize_half,
            seam_context: args.seam_context,
            max_seams: args.max_seams,
            force: self.cli.force,
        };
        let primary = args.oracle.primary()?;
        let oracle = RetryingOracle::new(primary.as_ref())
            .with_policy(args.retry.policy(), Box::new(ThreadSleeper));
        let mut engine = SeamRepairEngine::new(oracle, config).with_progress(self.progress());
        let report = engine.run(
            &args.layer.input,
            &args.layer.output,
            &layer.grid,
            layer.geometry,
            layer.overlap,
        )?;
        write_json(
            &self.report_path(args.layer.output.join(REPORT_FILE)),
            &report,
        )
    }

    fn select(&self, args: &SelectArgs) -> Result<()> {
        let layer = InputLayer::open(&args.layer.input, args.layer.overlap)?;
        let structure_weights = args
            .structure_weights
            .as_deref()
            .map(|text| {
                parse_weights(
                    "structure_weights",
                    Some(text),
                    args.structure_profile.weights(),
                )
            })
            .transpose()?;
        let config = SelectionConfig {
            params: args.oracle.params(DEFAULT_STRENGTH, DEFAULT_STEPS)?,
            candidates: args.candidates,
            seed_mode: args.seed_mode,
            seed: args.oracle.seed,
            overlap_px: args.overlap_px,
            neighbor_mode: args.neighbors,
            neighbors_in_prompt: args.neighbors_in_prompt,
            seam_weights: parse_weights(
                "seam_weights",
                args.seam_weights.as_deref(),
                ScoreWeights::default(),
            )?,
            structure_profile: args.structure_profile,
            structure_weights,
            structure_weight: args.structure_weight,
            structure_downscale: args.structure_downscale,
            fallback_penalty: args.fallback_penalty,
            force: self.cli.force,
            subgrid: args.subgrid,
            archive_candidates: args.archive_candidates,
        };

        let anchors = args
            .anchors
            .iter()
            .map(|path| load_rgb(path))
            .collect::<Result<Vec<_>>>()?;
        let cache_dir = args
            .cache_dir
            .clone()
            .unwrap_or_else(|| args.layer.output.join(CACHE_DIR));
        let cache = CandidateCache::new(Box::new(DiskStore::open(&cache_dir)?), !args.no_cache_read);

        let primary = args.oracle.primary()?;
        let fallback = args.oracle.fallback()?;
        let policy = args.retry.policy();
        let mut selector = CandidateSelector::new(
            RetryingOracle::new(primary.as_ref()).with_policy(policy, Box::new(ThreadSleeper)),
            config,
        )
        .with_cache(cache)
        .with_anchors(anchors)
        .with_progress(self.progress());
        if let Some(fallback) = &fallback {
            selector = selector.with_fallback(
                RetryingOracle::new(fallback.as_ref()).with_policy(policy, Box::new(ThreadSleeper)),
            );
        }

        let run = selector.run(
            &layer.store,
            &layer.grid,
            layer.geometry,
            layer.overlap,
            &args.layer.output,
        )?;
        write_json(
            &self.report_path(args.layer.output.join(REPORT_FILE)),
            &run.report,
        )
    }
}
