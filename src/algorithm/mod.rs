/// Content-addressed cache of oracle outputs
pub mod cache;
/// Radial repair of four-tile crossings
pub mod junction;
/// Crop and blend compositing of a tile grid
pub mod mosaic;
/// Backoff and retry around oracle calls
pub mod retry;
/// Pairwise seam inpainting with feathered write-back
pub mod seam_repair;
/// Per-candidate seed derivation
pub mod seed;
/// Multi-candidate generation and seam-aware selection
pub mod selection;
/// Overlapping window stylization of the whole mosaic
pub mod windowed;
