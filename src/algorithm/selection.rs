//! Multi-candidate stylization with seam-aware selection
//!
//! Tiles are visited in row-major order so the left, top and top-left
//! neighbors of a tile are final before it is scored. Each tile gets `K`
//! candidates; each candidate is scored against the accepted neighbors and
//! against its own input, and the lowest total wins.

use crate::algorithm::cache::{CacheKeyMaterial, CacheStats, CandidateCache, image_hash, sha256_hex};
use crate::algorithm::retry::RetryingOracle;
use crate::algorithm::seed::{SeedMode, pick_seed};
use crate::analysis::metrics::{ScoreWeights, StructureProfile, score_pair, to_float_rgb};
use crate::analysis::seams::{
    NeighborMode, Neighbors, SeamSummary, score_candidate_against_neighbors, score_seams,
    summarize,
};
use crate::io::configuration::{
    CANDIDATES_DIR, DEFAULT_CANDIDATES, DEFAULT_FALLBACK_PENALTY, DEFAULT_GUIDANCE,
    DEFAULT_OVERLAP_PX, DEFAULT_SEED, DEFAULT_STEPS, DEFAULT_STRENGTH,
    DEFAULT_STRUCTURE_DOWNSCALE, DEFAULT_STRUCTURE_WEIGHT, HEATMAP_FILE, MANIFEST_FILE,
    SEAM_SUMMARY_WORST, TILE_EXTENSION,
};
use crate::io::error::{Result, SeamweaveError, invalid_parameter};
use crate::io::heatmap::SeamHeatmap;
use crate::io::image::save_png_atomic;
use crate::io::progress::{NoProgress, Progress};
use crate::io::report::{GeometrySummary, GridSummary, read_json, write_json};
use crate::oracle::error::OracleError;
use crate::oracle::interface::{Conditioning, OracleParams, StylizeRequest};
use crate::spatial::grid::{TileCoord, TileGrid};
use crate::spatial::layout::TileGeometry;
use crate::spatial::tiles::{TileLayer, TileStore, load_sized};
use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rectangle of tiles to process, in absolute tile indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subgrid {
    /// First column
    pub x0: i32,
    /// First row
    pub y0: i32,
    /// Columns
    pub width: u32,
    /// Rows
    pub height: u32,
}

/// Settings of a selection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Generation parameters
    pub params: OracleParams,
    /// Candidates per tile
    pub candidates: u32,
    /// How candidate seeds are derived
    pub seed_mode: SeedMode,
    /// Base seed
    pub seed: u64,
    /// Width of the neighbor overlap strips
    pub overlap_px: u32,
    /// Neighbors used for scoring and conditioning
    pub neighbor_mode: NeighborMode,
    /// Send accepted neighbors along with each request
    pub neighbors_in_prompt: bool,
    /// Seam metric weights
    pub seam_weights: ScoreWeights,
    /// Content profile providing the default structure weights
    pub structure_profile: StructureProfile,
    /// Explicit structure weights overriding the profile
    pub structure_weights: Option<ScoreWeights>,
    /// Weight of the structure score in the total; 0 disables it
    pub structure_weight: f64,
    /// Side both images are resized to for structure scoring
    pub structure_downscale: u32,
    /// Added to the total of candidates from the fallback backend
    pub fallback_penalty: f64,
    /// Regenerate tiles already present in the output
    pub force: bool,
    /// Restrict the run to a rectangle of tiles
    pub subgrid: Option<Subgrid>,
    /// Save every candidate image under the output tree
    pub archive_candidates: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            params: OracleParams {
                prompt: String::new(),
                negative: None,
                strength: DEFAULT_STRENGTH,
                steps: DEFAULT_STEPS,
                guidance: DEFAULT_GUIDANCE,
            },
            candidates: DEFAULT_CANDIDATES,
            seed_mode: SeedMode::default(),
            seed: DEFAULT_SEED,
            overlap_px: DEFAULT_OVERLAP_PX,
            neighbor_mode: NeighborMode::default(),
            neighbors_in_prompt: false,
            seam_weights: ScoreWeights::default(),
            structure_profile: StructureProfile::default(),
            structure_weights: None,
            structure_weight: DEFAULT_STRUCTURE_WEIGHT,
            structure_downscale: DEFAULT_STRUCTURE_DOWNSCALE,
            fallback_penalty: DEFAULT_FALLBACK_PENALTY,
            force: false,
            subgrid: None,
            archive_candidates: false,
        }
    }
}

impl SelectionConfig {
    /// Check counts, weights and penalty
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error for zero candidates, a strength
    /// outside `(0, 1]`, or a negative or non-finite weight or penalty
    pub fn validate(&self) -> Result<()> {
        if self.candidates == 0 {
            return Err(invalid_parameter("candidates", &0, &"must be at least 1"));
        }
        if !(self.params.strength > 0.0 && self.params.strength <= 1.0) {
            return Err(invalid_parameter(
                "strength",
                &self.params.strength,
                &"must be in (0, 1]",
            ));
        }
        if !self.fallback_penalty.is_finite() || self.fallback_penalty < 0.0 {
            return Err(invalid_parameter(
                "fallback_penalty",
                &self.fallback_penalty,
                &"must be finite and non-negative",
            ));
        }
        if !self.structure_weight.is_finite() || self.structure_weight < 0.0 {
            return Err(invalid_parameter(
                "structure_weight",
                &self.structure_weight,
                &"must be finite and non-negative",
            ));
        }
        if self.structure_downscale == 0 {
            return Err(invalid_parameter(
                "structure_downscale",
                &0,
                &"must be positive",
            ));
        }
        Ok(())
    }

    /// Structure weights in effect
    pub fn effective_structure_weights(&self) -> ScoreWeights {
        self.structure_weights
            .unwrap_or_else(|| self.structure_profile.weights())
    }

    /// Digest identifying the settings that shape outputs
    ///
    /// `force` and `subgrid` only steer which tiles are processed and are
    /// left out.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the settings cannot be encoded
    pub fn config_hash(&self) -> Result<String> {
        let identity = Self {
            force: false,
            subgrid: None,
            ..self.clone()
        };
        let canonical = serde_json::to_value(&identity)?;
        Ok(sha256_hex(serde_json::to_string(&canonical)?.as_bytes()))
    }
}

/// Run manifest stored in a selection output directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Digest of the settings
    pub config_hash: String,
    /// Identity of the primary backend
    pub model: String,
    /// Settings of the run that wrote the manifest
    pub config: SelectionConfig,
}

/// One attempt at a tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Candidate index
    pub variant: u32,
    /// Seed passed to the backend
    pub seed: u64,
    /// Backend that produced the image
    pub backend: String,
    /// Whether the image came from the cache
    pub cached: bool,
    /// Wall time spent producing the image
    pub latency_ms: u64,
    /// Seam score against accepted neighbors
    pub seam_score: Option<f64>,
    /// Structure score against the input tile
    pub structure_score: Option<f64>,
    /// Penalty for fallback output
    pub fallback_penalty: f64,
    /// Total score; `None` when the candidate failed
    pub total: Option<f64>,
    /// Failure of the last backend tried
    pub error: Option<OracleError>,
    /// Archived image path
    pub archive: Option<PathBuf>,
}

/// What happened to a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileStatus {
    /// A candidate was selected and written
    Selected,
    /// The output already existed and was reused
    Resumed,
    /// No input tile at this position
    MissingInput,
    /// Every candidate failed
    Failed,
}

/// Report entry of one tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    /// Tile coordinate
    pub coord: TileCoord,
    /// Outcome
    pub status: TileStatus,
    /// Index of the winning candidate
    pub selected: Option<u32>,
    /// Every candidate attempted
    pub candidates: Vec<CandidateRecord>,
    /// Failure description
    pub error: Option<String>,
}

/// Outcome of a selection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    /// Grid that was processed
    pub grid: GridSummary,
    /// Tile geometry
    pub geometry: GeometrySummary,
    /// Digest of the settings
    pub config_hash: String,
    /// Tiles selected in this run
    pub selected: usize,
    /// Tiles reused from a previous run
    pub resumed: usize,
    /// Tiles whose candidates all failed
    pub failed: usize,
    /// Span positions without input
    pub missing: usize,
    /// Cache effectiveness
    pub cache: CacheStats,
    /// Seams between accepted tiles
    pub seam_summary: SeamSummary,
    /// Per-tile records in processing order
    pub tiles: Vec<TileRecord>,
}

/// Result of [`CandidateSelector::select`]
#[derive(Debug, Clone)]
pub struct SelectionRun {
    /// Counters and records
    pub report: SelectionReport,
    /// Seam intensity heatmap over the processed span
    pub heatmap: RgbImage,
}

/// Index of the lowest total, first on ties
///
/// Failed candidates (`None`) and non-finite totals never win.
pub fn pick_best(totals: &[Option<f64>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, total) in totals.iter().enumerate() {
        let Some(total) = total.filter(|t| t.is_finite()) else {
            continue;
        };
        match best {
            Some((_, current)) if total >= current => {}
            _ => best = Some((index, total)),
        }
    }
    best.map(|(index, _)| index)
}

/// Archive location of a candidate relative to the output root
pub fn candidate_path(root: &Path, coord: TileCoord, variant: u32, seed: u64) -> PathBuf {
    root.join(CANDIDATES_DIR)
        .join(format!("{}_{}", coord.x, coord.y))
        .join(format!("v{variant:02}-seed{seed}.{TILE_EXTENSION}"))
}

struct Accepted {
    image: RgbImage,
    array: Array3<f32>,
}

impl Accepted {
    fn new(image: RgbImage) -> Self {
        let array = to_float_rgb(&image);
        Self { image, array }
    }
}

fn active_neighbors(
    accepted: &HashMap<TileCoord, Accepted>,
    mode: NeighborMode,
    coord: TileCoord,
) -> [(&'static str, Option<&Accepted>); 3] {
    let pick = |on: bool, c: TileCoord| if on { accepted.get(&c) } else { None };
    [
        ("left", pick(mode.left, coord.left())),
        ("top", pick(mode.top, coord.top())),
        ("top_left", pick(mode.top_left, coord.top_left())),
    ]
}

struct Produced {
    image: RgbImage,
    backend: String,
    cached: bool,
    penalty: f64,
}

/// Generates, scores and selects candidates for every tile of a grid
pub struct CandidateSelector<'a> {
    primary: RetryingOracle<'a>,
    fallback: Option<RetryingOracle<'a>>,
    config: SelectionConfig,
    cache: CandidateCache,
    anchors: Vec<RgbImage>,
    archive_root: Option<PathBuf>,
    progress: Box<dyn Progress + 'a>,
    accepted: HashMap<TileCoord, Accepted>,
}

impl<'a> CandidateSelector<'a> {
    /// Create a selector with an in-memory cache and no fallback
    pub fn new(primary: RetryingOracle<'a>, config: SelectionConfig) -> Self {
        Self {
            primary,
            fallback: None,
            config,
            cache: CandidateCache::in_memory(),
            anchors: Vec::new(),
            archive_root: None,
            progress: Box::new(NoProgress),
            accepted: HashMap::new(),
        }
    }

    /// Consult `fallback` when the primary fails for a non-policy reason
    ///
    /// A fallback with the same identity as the primary is ignored.
    #[must_use]
    pub fn with_fallback(mut self, fallback: RetryingOracle<'a>) -> Self {
        if fallback.identity() == self.primary.identity() {
            warn!(
                identity = fallback.identity(),
                "fallback backend matches the primary, ignoring it"
            );
        } else {
            self.fallback = Some(fallback);
        }
        self
    }

    /// Use a specific cache
    #[must_use]
    pub fn with_cache(mut self, cache: CandidateCache) -> Self {
        self.cache = cache;
        self
    }

    /// Style anchor images sent with every request
    #[must_use]
    pub fn with_anchors(mut self, anchors: Vec<RgbImage>) -> Self {
        self.anchors = anchors;
        self
    }

    /// Report progress to the given sink
    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn Progress + 'a>) -> Self {
        self.progress = progress;
        self
    }

    /// Cache statistics so far
    pub const fn cache_stats(&self) -> CacheStats {
        self.cache.stats
    }

    /// Select tiles from `input` into the layer at `output_dir`
    ///
    /// Writes the run manifest, the optional candidate archive and the seam
    /// heatmap next to the tiles.
    ///
    /// # Errors
    ///
    /// Returns a configuration mismatch when `output_dir` holds a manifest
    /// with another configuration hash and `force` is not set, and I/O
    /// errors from tiles, manifest or heatmap
    pub fn run(
        &mut self,
        input: &dyn TileStore,
        grid: &TileGrid,
        geometry: TileGeometry,
        overlap: f64,
        output_dir: &Path,
    ) -> Result<SelectionRun> {
        self.config.validate()?;
        let current = self.config.config_hash()?;
        let manifest_path = output_dir.join(MANIFEST_FILE);
        if manifest_path.is_file() {
            let existing: Manifest = read_json(&manifest_path)?;
            if existing.config_hash != current && !self.config.force {
                return Err(SeamweaveError::ConfigMismatch {
                    path: output_dir.to_path_buf(),
                    existing: existing.config_hash,
                    current,
                });
            }
        }
        write_json(
            &manifest_path,
            &Manifest {
                config_hash: current,
                model: self.primary.identity().to_string(),
                config: self.config.clone(),
            },
        )?;

        if self.config.archive_candidates {
            self.archive_root = Some(output_dir.to_path_buf());
        }
        let mut layer = TileLayer::new(output_dir);
        let run = self.select(input, grid, geometry, overlap, &mut layer)?;
        save_png_atomic(&run.heatmap, &output_dir.join(HEATMAP_FILE))?;
        Ok(run)
    }

    /// Select a candidate for every tile of the processed span
    ///
    /// # Errors
    ///
    /// Returns an error for invalid settings and for tile I/O failures
    pub fn select(
        &mut self,
        input: &dyn TileStore,
        grid: &TileGrid,
        geometry: TileGeometry,
        overlap: f64,
        output: &mut dyn TileStore,
    ) -> Result<SelectionRun> {
        self.config.validate()?;
        let coords = match self.config.subgrid {
            Some(sub) => grid.window(sub.x0, sub.y0, sub.width, sub.height),
            None => grid.span(),
        };

        let mut report = SelectionReport {
            grid: GridSummary::of(grid),
            geometry: GeometrySummary::of(geometry, overlap),
            config_hash: self.config.config_hash()?,
            selected: 0,
            resumed: 0,
            failed: 0,
            missing: 0,
            cache: CacheStats::default(),
            seam_summary: SeamSummary::default(),
            tiles: Vec::with_capacity(coords.len()),
        };
        self.progress.start_phase("select", coords.len());

        for &coord in &coords {
            self.progress.advance(&coord.to_string());
            let record = self.process_tile(input, geometry, output, coord)?;
            match record.status {
                TileStatus::Selected => report.selected += 1,
                TileStatus::Resumed => report.resumed += 1,
                TileStatus::MissingInput => report.missing += 1,
                TileStatus::Failed => report.failed += 1,
            }
            report.tiles.push(record);
        }
        self.progress.finish_phase();

        let arrays: HashMap<TileCoord, Array3<f32>> = coords
            .iter()
            .filter_map(|c| self.accepted.get(c).map(|a| (*c, a.array.clone())))
            .collect();
        let seams = score_seams(
            &arrays,
            &coords,
            self.config.overlap_px,
            &self.config.seam_weights,
        );
        report.seam_summary = summarize(&seams, SEAM_SUMMARY_WORST);
        report.cache = self.cache.stats;

        let (columns, rows, origin) = span_of(&coords, grid);
        let mut heatmap = SeamHeatmap::new(geometry, origin, columns, rows);
        for record in &seams {
            heatmap.paint(record);
        }

        info!(
            selected = report.selected,
            resumed = report.resumed,
            failed = report.failed,
            cache_hits = report.cache.hits,
            mean_seam = report.seam_summary.mean_score,
            "selection complete"
        );
        Ok(SelectionRun {
            report,
            heatmap: heatmap.render(),
        })
    }

    fn process_tile(
        &mut self,
        input: &dyn TileStore,
        geometry: TileGeometry,
        output: &mut dyn TileStore,
        coord: TileCoord,
    ) -> Result<TileRecord> {
        let mut record = TileRecord {
            coord,
            status: TileStatus::MissingInput,
            selected: None,
            candidates: Vec::new(),
            error: None,
        };

        if !self.config.force {
            if let Some(existing) = output.load(coord)? {
                debug!(%coord, "resuming existing output tile");
                self.accepted.insert(coord, Accepted::new(existing));
                record.status = TileStatus::Resumed;
                return Ok(record);
            }
        }
        let Some(source) = load_sized(input, coord, geometry.width, geometry.height)? else {
            return Ok(record);
        };

        for direction in [coord.left(), coord.top(), coord.top_left()] {
            self.ensure_neighbor(output, direction)?;
        }

        let source_small = self.structure_reference(&source);
        let mut images: Vec<Option<RgbImage>> = Vec::new();
        for variant in 0..self.config.candidates {
            let (candidate, image) =
                self.candidate(coord, &source, source_small.as_ref(), variant)?;
            record.candidates.push(candidate);
            images.push(image);
        }

        let totals: Vec<Option<f64>> = record.candidates.iter().map(|c| c.total).collect();
        let winner = pick_best(&totals)
            .and_then(|i| images.get_mut(i).and_then(Option::take).map(|img| (i, img)));
        match winner {
            Some((index, image)) => {
                output.save(coord, &image)?;
                self.accepted.insert(coord, Accepted::new(image));
                record.selected = u32::try_from(index).ok();
                record.status = TileStatus::Selected;
            }
            None => {
                warn!(%coord, "all candidates failed");
                record.status = TileStatus::Failed;
                record.error = Some("all candidates failed".to_string());
            }
        }
        Ok(record)
    }

    fn ensure_neighbor(&mut self, output: &dyn TileStore, coord: TileCoord) -> Result<()> {
        if self.accepted.contains_key(&coord) {
            return Ok(());
        }
        if let Some(tile) = output.load(coord)? {
            self.accepted.insert(coord, Accepted::new(tile));
        }
        Ok(())
    }

    fn structure_reference(&self, source: &RgbImage) -> Option<Array3<f32>> {
        (self.config.structure_weight > 0.0).then(|| {
            let side = self.config.structure_downscale;
            to_float_rgb(&imageops::resize(source, side, side, FilterType::Lanczos3))
        })
    }

    fn key_material(&self, coord: TileCoord, source: &RgbImage, seed: u64) -> CacheKeyMaterial {
        let params = &self.config.params;
        CacheKeyMaterial {
            version: CacheKeyMaterial::VERSION,
            model: self.primary.identity().to_string(),
            prompt_hash: sha256_hex(params.prompt.as_bytes()),
            negative_hash: sha256_hex(params.negative.as_deref().unwrap_or("").as_bytes()),
            anchors: self.anchors.iter().map(image_hash).collect(),
            neighbors: active_neighbors(&self.accepted, self.config.neighbor_mode, coord)
                .iter()
                .filter_map(|(_, n)| n.map(|a| image_hash(&a.image)))
                .collect(),
            x: coord.x,
            y: coord.y,
            input_hash: image_hash(source),
            seed,
            strength: params.strength,
            steps: params.steps,
            guidance: params.guidance,
            neighbor_mode: self.config.neighbor_mode.to_string(),
            neighbors_in_prompt: self.config.neighbors_in_prompt,
        }
    }

    fn produce(
        &mut self,
        coord: TileCoord,
        source: &RgbImage,
        seed: u64,
    ) -> Result<std::result::Result<Produced, OracleError>> {
        let material = self.key_material(coord, source, seed);
        let key = material.key()?;
        let primary_id = self.primary.identity().to_string();
        if let Some(image) = self.cache.lookup(&key) {
            return Ok(Ok(Produced {
                image,
                backend: primary_id,
                cached: true,
                penalty: 0.0,
            }));
        }

        let params = self.config.params.clone();
        let mut conditioning: Vec<Conditioning<'_>> = self
            .anchors
            .iter()
            .map(|image| Conditioning {
                label: "anchor",
                image,
            })
            .collect();
        if self.config.neighbors_in_prompt {
            for (label, neighbor) in
                active_neighbors(&self.accepted, self.config.neighbor_mode, coord)
            {
                if let Some(accepted) = neighbor {
                    conditioning.push(Conditioning {
                        label,
                        image: &accepted.image,
                    });
                }
            }
        }
        let request = StylizeRequest::new(source, &params, seed).with_conditioning(conditioning);

        let primary_error = match self.primary.stylize("candidate", &request) {
            Ok(image) => {
                self.cache.store(&key, &image);
                return Ok(Ok(Produced {
                    image,
                    backend: primary_id,
                    cached: false,
                    penalty: 0.0,
                }));
            }
            Err(error) => error,
        };

        let Some(fallback) = self.fallback.as_mut() else {
            return Ok(Err(primary_error));
        };
        if !primary_error.allows_fallback() {
            return Ok(Err(primary_error));
        }
        warn!(%coord, seed, error = %primary_error, "primary backend failed, trying fallback");
        let fallback_id = fallback.identity().to_string();
        let fallback_key = material.for_model(&fallback_id).key()?;
        let penalty = self.config.fallback_penalty;
        if let Some(image) = self.cache.lookup(&fallback_key) {
            return Ok(Ok(Produced {
                image,
                backend: fallback_id,
                cached: true,
                penalty,
            }));
        }
        match fallback.stylize("fallback candidate", &request) {
            Ok(image) => {
                self.cache.store(&fallback_key, &image);
                Ok(Ok(Produced {
                    image,
                    backend: fallback_id,
                    cached: false,
                    penalty,
                }))
            }
            Err(error) => Ok(Err(error)),
        }
    }

    fn candidate(
        &mut self,
        coord: TileCoord,
        source: &RgbImage,
        source_small: Option<&Array3<f32>>,
        variant: u32,
    ) -> Result<(CandidateRecord, Option<RgbImage>)> {
        let seed = pick_seed(self.config.seed_mode, self.config.seed, coord.x, coord.y, variant);
        let started = Instant::now();
        let produced = self.produce(coord, source, seed)?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut record = CandidateRecord {
            variant,
            seed,
            backend: self.primary.identity().to_string(),
            cached: false,
            latency_ms,
            seam_score: None,
            structure_score: None,
            fallback_penalty: 0.0,
            total: None,
            error: None,
            archive: None,
        };
        let produced = match produced {
            Ok(produced) => produced,
            Err(error) => {
                warn!(%coord, variant, seed, %error, "candidate failed");
                record.error = Some(error);
                return Ok((record, None));
            }
        };

        let array = to_float_rgb(&produced.image);
        let [left, top, top_left] =
            active_neighbors(&self.accepted, self.config.neighbor_mode, coord);
        let neighbors = Neighbors {
            left: left.1.map(|a| &a.array),
            top: top.1.map(|a| &a.array),
            top_left: top_left.1.map(|a| &a.array),
        };
        let seam = score_candidate_against_neighbors(
            &array,
            neighbors,
            self.config.overlap_px,
            &self.config.seam_weights,
            self.config.neighbor_mode,
        )
        .total;
        let structure = source_small.map_or(0.0, |reference| {
            let side = self.config.structure_downscale;
            let small = to_float_rgb(&imageops::resize(
                &produced.image,
                side,
                side,
                FilterType::Lanczos3,
            ));
            score_pair(
                small.view(),
                reference.view(),
                &self.config.effective_structure_weights(),
            )
            .0
        });
        let total = self
            .config
            .structure_weight
            .mul_add(structure, seam + produced.penalty);

        if let Some(root) = &self.archive_root {
            let path = candidate_path(root, coord, variant, seed);
            match save_png_atomic(&produced.image, &path) {
                Ok(()) => record.archive = Some(path),
                Err(err) => warn!(path = %path.display(), error = %err, "failed to archive candidate"),
            }
        }

        debug!(%coord, variant, seed, seam, structure, total, cached = produced.cached, "scored candidate");
        record.backend = produced.backend;
        record.cached = produced.cached;
        record.seam_score = Some(seam);
        record.structure_score = source_small.map(|_| structure);
        record.fallback_penalty = produced.penalty;
        record.total = Some(total);
        Ok((record, Some(produced.image)))
    }
}

fn span_of(coords: &[TileCoord], grid: &TileGrid) -> (u32, u32, TileCoord) {
    let min_x = coords.iter().map(|c| c.x).min().unwrap_or_else(|| grid.min_x());
    let max_x = coords.iter().map(|c| c.x).max().unwrap_or_else(|| grid.min_x());
    let min_y = coords.iter().map(|c| c.y).min().unwrap_or_else(|| grid.min_y());
    let max_y = coords.iter().map(|c| c.y).max().unwrap_or_else(|| grid.min_y());
    let columns = u32::try_from(max_x - min_x + 1).unwrap_or(1);
    let rows = u32::try_from(max_y - min_y + 1).unwrap_or(1);
    (columns, rows, TileCoord::new(min_x, min_y))
}
