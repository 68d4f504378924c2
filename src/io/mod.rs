//! Input/output, configuration and error handling

/// Command-line interface and run orchestration
pub mod cli;
/// Named defaults and constants
pub mod configuration;
/// Error type and helpers
pub mod error;
/// Seam intensity heatmap rendering
pub mod heatmap;
/// PNG decoding and atomic export
pub mod image;
/// Tracing subscriber setup
pub mod logging;
/// Terminal progress bars
pub mod progress;
/// Run reports written as JSON
pub mod report;
