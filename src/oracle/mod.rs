//! Stylization oracle interface and backends

/// Classified oracle failures
pub mod error;
/// Blocking HTTP backend
pub mod http;
/// Request types and the oracle trait
pub mod interface;
/// Deterministic in-process backends
pub mod stub;

pub use error::{OracleError, OracleErrorKind};
pub use interface::{Conditioning, OracleParams, StylizationOracle, StylizeRequest};
