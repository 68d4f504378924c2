//! Bounded exponential backoff around oracle calls

use crate::io::configuration::{
    DEFAULT_RETRY_BASE_MS, DEFAULT_RETRY_JITTER_MS, DEFAULT_RETRY_MAX, DEFAULT_RETRY_MAX_MS,
};
use crate::oracle::error::OracleError;
use crate::oracle::interface::{OracleParams, StylizationOracle, StylizeRequest};
use image::{GrayImage, RgbImage};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Blocks the caller between attempts
pub trait Sleeper {
    /// Wait for `delay`
    fn sleep(&mut self, delay: Duration);
}

/// Sleeps on the current thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Records requested delays without waiting
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    /// Delays requested so far
    pub delays: Vec<Duration>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, delay: Duration) {
        self.delays.push(delay);
    }
}

/// Retry budget and backoff shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds
    pub base_ms: u64,
    /// Upper bound of the exponential part in milliseconds
    pub max_ms: u64,
    /// Upper bound of the uniform jitter in milliseconds
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_RETRY_MAX,
            base_ms: DEFAULT_RETRY_BASE_MS,
            max_ms: DEFAULT_RETRY_MAX_MS,
            jitter_ms: DEFAULT_RETRY_JITTER_MS,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_ms: 0,
            max_ms: 0,
            jitter_ms: 0,
        }
    }

    /// Delay before retry number `attempt + 1`
    ///
    /// `min(base * 2^attempt, max(base, cap)) + unit * jitter` where `unit` is a
    /// sample from `[0, 1)`.
    pub fn backoff(&self, attempt: u32, unit: f64) -> Duration {
        let base = self.base_ms as f64;
        let cap = base.max(self.max_ms as f64);
        let exponential = (base * 2f64.powi(attempt.min(62) as i32)).min(cap);
        let jitter = unit.clamp(0.0, 1.0) * self.jitter_ms as f64;
        Duration::from_secs_f64((exponential + jitter) / 1000.0)
    }

    /// Run `op` until it succeeds, fails fatally or exhausts the budget
    ///
    /// Only errors reporting [`OracleError::is_retryable`] are retried.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `op`
    pub fn run<T, F>(&self, purpose: &str, sleeper: &mut dyn Sleeper, mut op: F) -> Result<T, OracleError>
    where
        F: FnMut() -> Result<T, OracleError>,
    {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries && err.is_retryable() => {
                    let delay = self.backoff(attempt, rand::rng().random::<f64>());
                    warn!(
                        purpose,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after transient oracle failure"
                    );
                    sleeper.sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Oracle bundled with the retry policy applied to each of its calls
pub struct RetryingOracle<'a> {
    oracle: &'a dyn StylizationOracle,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper + 'a>,
}

impl<'a> RetryingOracle<'a> {
    /// Wrap an oracle with the default policy, sleeping on the current thread
    pub fn new(oracle: &'a dyn StylizationOracle) -> Self {
        Self {
            oracle,
            policy: RetryPolicy::default(),
            sleeper: Box::new(ThreadSleeper),
        }
    }

    /// Replace the policy and the sleeper
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy, sleeper: Box<dyn Sleeper + 'a>) -> Self {
        self.policy = policy;
        self.sleeper = sleeper;
        self
    }

    /// Identity of the wrapped backend
    pub fn identity(&self) -> &str {
        self.oracle.identity()
    }

    /// Policy applied to each call
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Stylize with retries, conforming the output to the request size
    ///
    /// # Errors
    ///
    /// Returns the last oracle error once retries are exhausted
    pub fn stylize(
        &mut self,
        purpose: &str,
        request: &StylizeRequest<'_>,
    ) -> Result<RgbImage, OracleError> {
        let oracle = self.oracle;
        self.policy
            .run(purpose, self.sleeper.as_mut(), || oracle.stylize_conformed(request))
    }

    /// Inpaint with retries
    ///
    /// # Errors
    ///
    /// Returns the last oracle error once retries are exhausted
    pub fn inpaint(
        &mut self,
        purpose: &str,
        image: &RgbImage,
        mask: &GrayImage,
        params: &OracleParams,
        seed: u64,
    ) -> Result<RgbImage, OracleError> {
        let oracle = self.oracle;
        self.policy.run(purpose, self.sleeper.as_mut(), || {
            oracle.inpaint(image, mask, params, seed)
        })
    }
}
