//! Image comparison used to score candidates and seams

/// Pixel and gradient difference metrics
pub mod metrics;
/// Neighbor strip scoring and seam summaries
pub mod seams;
