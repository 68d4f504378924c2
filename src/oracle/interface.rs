//! Request types and the stylization oracle trait
//!
//! The oracle is an opaque image-to-image transform. Everything above it only
//! relies on this trait, so backends can be swapped or stubbed in tests.

use crate::io::image::conform_size;
use crate::oracle::error::OracleError;
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Generation parameters shared by every call of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleParams {
    /// Positive prompt
    pub prompt: String,
    /// Optional negative prompt
    pub negative: Option<String>,
    /// Fraction of the input that may change, in `(0, 1]`
    pub strength: f64,
    /// Number of denoising steps
    pub steps: u32,
    /// Guidance scale
    pub guidance: f64,
}

impl OracleParams {
    /// Copy with a different strength and step count
    #[must_use]
    pub fn with_strength(&self, strength: f64, steps: u32) -> Self {
        Self {
            strength,
            steps,
            ..self.clone()
        }
    }
}

/// Steps needed so that `strength * steps` performs at least one step
///
/// When `floor(strength * steps) < 1` the count is raised to `ceil(1 / strength)`.
pub fn effective_steps(strength: f64, steps: u32) -> u32 {
    if strength <= 0.0 || !strength.is_finite() {
        return steps;
    }
    if (strength * f64::from(steps)).floor() < 1.0 {
        (1.0 / strength).ceil() as u32
    } else {
        steps
    }
}

/// Labelled extra image sent along with a request
#[derive(Debug, Clone, Copy)]
pub struct Conditioning<'a> {
    /// Role of the image, such as `left` or `anchor`
    pub label: &'a str,
    /// Image content
    pub image: &'a RgbImage,
}

/// One oracle invocation
#[derive(Debug, Clone)]
pub struct StylizeRequest<'a> {
    /// Image to transform
    pub image: &'a RgbImage,
    /// Inpaint mask; white pixels may change
    pub mask: Option<&'a GrayImage>,
    /// Generation parameters
    pub params: &'a OracleParams,
    /// Deterministic seed
    pub seed: u64,
    /// Extra conditioning images
    pub conditioning: Vec<Conditioning<'a>>,
}

impl<'a> StylizeRequest<'a> {
    /// Plain image-to-image request
    pub const fn new(image: &'a RgbImage, params: &'a OracleParams, seed: u64) -> Self {
        Self {
            image,
            mask: None,
            params,
            seed,
            conditioning: Vec::new(),
        }
    }

    /// Attach an inpaint mask
    #[must_use]
    pub const fn with_mask(mut self, mask: &'a GrayImage) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Attach conditioning images
    #[must_use]
    pub fn with_conditioning(mut self, conditioning: Vec<Conditioning<'a>>) -> Self {
        self.conditioning = conditioning;
        self
    }
}

/// External per-unit image transform
pub trait StylizationOracle {
    /// Stable name of the backend, mixed into cache keys
    fn identity(&self) -> &str;

    /// Transform the request image
    ///
    /// # Errors
    ///
    /// Returns a classified [`OracleError`] when the backend fails
    fn stylize(&self, request: &StylizeRequest<'_>) -> Result<RgbImage, OracleError>;

    /// Inpaint the white pixels of `mask`, resized back to the image size
    ///
    /// # Errors
    ///
    /// Propagates the backend error
    fn inpaint(
        &self,
        image: &RgbImage,
        mask: &GrayImage,
        params: &OracleParams,
        seed: u64,
    ) -> Result<RgbImage, OracleError> {
        let request = StylizeRequest::new(image, params, seed).with_mask(mask);
        self.stylize_conformed(&request)
    }

    /// Transform and resize the output back to the request size
    ///
    /// # Errors
    ///
    /// Propagates the backend error
    fn stylize_conformed(&self, request: &StylizeRequest<'_>) -> Result<RgbImage, OracleError> {
        let (w, h) = request.image.dimensions();
        self.stylize(request).map(|out| conform_size(out, w, h))
    }
}
