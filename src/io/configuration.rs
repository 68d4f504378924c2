//! Pipeline constants and runtime configuration defaults

// Tile tree layout
/// Zoom level directory holding the tiles of a layer
pub const ZOOM_DIR: &str = "0";
/// Optional layout metadata file at the root of a layer
pub const LAYOUT_FILE: &str = "tilejson.json";
/// Extension of tile files
pub const TILE_EXTENSION: &str = "png";

/// Upper bound (exclusive) of the overlap fraction
pub const MAX_OVERLAP: f64 = 0.49;

// Compositing
/// Weight sums below this value are treated as uncovered pixels
pub const WEIGHT_EPSILON: f32 = 1e-6;
/// Default mosaic background colour
pub const DEFAULT_BACKGROUND: [u8; 3] = [255, 255, 255];
/// Default feather used by blend compositing (pixels per side)
pub const DEFAULT_BLEND_FEATHER: u32 = 64;

// Windowed stylization
/// Default window side length in pixels
pub const DEFAULT_WINDOW_SIZE: u32 = 1024;
/// Default overlap between adjacent windows in pixels
pub const DEFAULT_WINDOW_OVERLAP: u32 = 256;
/// Default fade width at interior window edges in pixels
pub const DEFAULT_WINDOW_FEATHER: u32 = 128;
/// Default feather used to build the input mosaic for windowed stylization
pub const DEFAULT_MOSAIC_FEATHER: u32 = 64;
/// Default half-size of a junction repair patch
pub const DEFAULT_JUNCTION_HALF: u32 = 64;
/// Minimum half-size of a junction repair patch
pub const MIN_JUNCTION_HALF: u32 = 8;
/// Junction patches narrower than this on either axis are skipped
pub const MIN_JUNCTION_PATCH: u32 = 16;
/// Default strength added to the base strength for junction repair
pub const DEFAULT_JUNCTION_STRENGTH_BOOST: f64 = 0.05;
/// Minimum step count for junction repair when no explicit count is given
pub const MIN_JUNCTION_STEPS: u32 = 14;
/// Seed offset separating junction seeds from window seeds
pub const JUNCTION_SEED_OFFSET: u64 = 100_000;

// Seam repair
/// Default half-width of the inpaint mask band
pub const DEFAULT_MASK_HALF: u32 = 16;
/// Default half-width of the feathered write-back band
pub const DEFAULT_WRITE_HALF: u32 = 20;
/// Default half-width of the harmonization band
pub const DEFAULT_HARMONIZE_HALF: u32 = 4;
/// Minimum automatically derived seam context width
pub const MIN_SEAM_CONTEXT: u32 = 8;
/// Maximum automatically derived seam context width
pub const MAX_AUTO_SEAM_CONTEXT: u32 = 64;
/// Default inpaint strength for seam repair
pub const DEFAULT_SEAM_STRENGTH: f64 = 0.2;
/// Default step count for seam repair
pub const DEFAULT_SEAM_STEPS: u32 = 16;

// Oracle generation
/// Default stylization strength
pub const DEFAULT_STRENGTH: f64 = 0.35;
/// Default number of oracle steps
pub const DEFAULT_STEPS: u32 = 30;
/// Default guidance scale
pub const DEFAULT_GUIDANCE: f64 = 4.5;
/// Fixed seed for reproducible runs
pub const DEFAULT_SEED: u64 = 42;
/// Default oracle request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Environment variable holding the oracle bearer token
pub const DEFAULT_TOKEN_ENV: &str = "SEAMWEAVE_TOKEN";

// Retry policy
/// Default number of retries after the first attempt
pub const DEFAULT_RETRY_MAX: u32 = 2;
/// Default base backoff in milliseconds
pub const DEFAULT_RETRY_BASE_MS: u64 = 800;
/// Default backoff cap in milliseconds
pub const DEFAULT_RETRY_MAX_MS: u64 = 8_000;
/// Default random jitter added to each backoff in milliseconds
pub const DEFAULT_RETRY_JITTER_MS: u64 = 300;
/// HTTP status codes that are worth retrying
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];
/// Message fragments that mark a transient failure
pub const RETRYABLE_MESSAGE_TOKENS: [&str; 11] = [
    "429",
    "rate",
    "resource exhausted",
    "unavailable",
    "internal",
    "server error",
    "timeout",
    "temporar",
    "502",
    "503",
    "504",
];

// Candidate selection
/// Default number of candidates generated per tile
pub const DEFAULT_CANDIDATES: u32 = 4;
/// Default width of the neighbor overlap strips in pixels
pub const DEFAULT_OVERLAP_PX: u32 = 48;
/// Default weight of the structure score in the total
pub const DEFAULT_STRUCTURE_WEIGHT: f64 = 0.75;
/// Default side length both images are downscaled to for structure scoring
pub const DEFAULT_STRUCTURE_DOWNSCALE: u32 = 128;
/// Default penalty added to candidates produced by the fallback backend
pub const DEFAULT_FALLBACK_PENALTY: f64 = 0.05;
/// Seeds are masked to 31 bits
pub const SEED_MASK: u64 = 0x7FFF_FFFF;
/// Number of worst seams listed in the seam summary
pub const SEAM_SUMMARY_WORST: usize = 10;
/// Run manifest written to a selection output directory
pub const MANIFEST_FILE: &str = "config.json";
/// Directory under the output root where candidate images are archived
pub const CANDIDATES_DIR: &str = "candidates";
/// Version tag mixed into cache keys when the request layout changes
pub const CACHE_KEY_VERSION: u32 = 1;

// Seam scoring defaults
/// Default weight of the RGB L1 metric
pub const DEFAULT_RGB_L1_WEIGHT: f64 = 1.0;
/// Default weight of the RGB L2 metric
pub const DEFAULT_RGB_L2_WEIGHT: f64 = 0.25;
/// Default weight of the Sobel gradient metric
pub const DEFAULT_SOBEL_L1_WEIGHT: f64 = 0.5;
/// BT.709 luminance coefficients
pub const LUMA_COEFFICIENTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

// Output settings
/// Default report file name written to the output root
pub const REPORT_FILE: &str = "report.json";
/// Default heatmap file name written to the output root
pub const HEATMAP_FILE: &str = "seam_heatmap.png";
/// Suffix of temporary files used for atomic writes
pub const TEMP_SUFFIX: &str = "tmp";
/// Input mosaic preview written by the windowed pass
pub const MOSAIC_INPUT_FILE: &str = "mosaic_input.png";
/// Output mosaic preview written by the windowed pass
pub const MOSAIC_OUTPUT_FILE: &str = "mosaic_output.png";
/// Cache directory created under a selection output root
pub const CACHE_DIR: &str = "cache";
/// Backend name used when no model is given
pub const DEFAULT_MODEL: &str = "default";
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;
/// Minimum window side length accepted for windowed stylization
pub const MIN_WINDOW_SIZE: u32 = 64;
