//! Numeric building blocks for compositing

/// Weighted accumulation of overlapping contributions
pub mod accumulator;
/// Linear fades, window weights and radial masks
pub mod ramp;
