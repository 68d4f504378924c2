//! Seam-consistent stylization of raster tile pyramids
//!
//! Tiles rendered independently are stitched into one mosaic, stylized through
//! an opaque per-unit oracle and split back so that neighbors agree along
//! their shared edges. Three strategies are provided: windowed stylization of
//! the whole mosaic, pairwise seam repair and seam-aware candidate selection.

#![forbid(unsafe_code)]

/// Mosaic assembly, windowed stylization, seam repair and candidate selection
pub mod algorithm;
/// Difference metrics and seam scoring
pub mod analysis;
/// Input/output operations and error handling
pub mod io;
/// Fades, masks and weighted accumulation
pub mod math;
/// Stylization oracle interface and backends
pub mod oracle;
/// Tile coordinates, geometry and storage
pub mod spatial;

pub use io::error::{Result, SeamweaveError};
