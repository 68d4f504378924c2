//! Deterministic in-process oracles for dry runs and tests

use crate::oracle::error::OracleError;
use crate::oracle::interface::{StylizationOracle, StylizeRequest};
use image::RgbImage;
use std::cell::Cell;

/// Returns the request image unchanged
#[derive(Debug, Clone, Default)]
pub struct IdentityOracle;

impl StylizationOracle for IdentityOracle {
    fn identity(&self) -> &str {
        "identity"
    }

    fn stylize(&self, request: &StylizeRequest<'_>) -> Result<RgbImage, OracleError> {
        Ok(request.image.clone())
    }
}

/// Oracle backed by a closure, counting its invocations
pub struct FnOracle<F>
where
    F: Fn(&StylizeRequest<'_>) -> Result<RgbImage, OracleError>,
{
    name: String,
    transform: F,
    calls: Cell<usize>,
}

impl<F> FnOracle<F>
where
    F: Fn(&StylizeRequest<'_>) -> Result<RgbImage, OracleError>,
{
    /// Wrap a closure under a backend name
    pub fn new(name: impl Into<String>, transform: F) -> Self {
        Self {
            name: name.into(),
            transform,
            calls: Cell::new(0),
        }
    }

    /// Number of calls made so far
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl<F> StylizationOracle for FnOracle<F>
where
    F: Fn(&StylizeRequest<'_>) -> Result<RgbImage, OracleError>,
{
    fn identity(&self) -> &str {
        &self.name
    }

    fn stylize(&self, request: &StylizeRequest<'_>) -> Result<RgbImage, OracleError> {
        self.calls.set(self.calls.get() + 1);
        (self.transform)(request)
    }
}
