//! Oracle backend reached over HTTP with JSON payloads
//!
//! Images travel as base64 PNG. The response may either carry a top-level
//! `image` field or a list of `candidates` whose content parts hold
//! `inlineData`. A `promptFeedback.blockReason` is reported as a policy block.

use crate::io::image::{decode_rgb, encode_png};
use crate::oracle::error::{OracleError, OracleErrorKind};
use crate::oracle::interface::{StylizationOracle, StylizeRequest};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use serde::Serialize;
use serde_json::Value;
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, trace};

/// Longest response excerpt kept in error messages
const ERROR_BODY_LIMIT: usize = 300;

/// Inline image part of a request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
struct ConditioningPart {
    label: String,
    image: InlineData,
}

#[derive(Debug, Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    strength: f64,
    steps: u32,
    guidance: f64,
    seed: u64,
    image: InlineData,
    #[serde(skip_serializing_if = "Option::is_none")]
    mask: Option<InlineData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    conditioning: Vec<ConditioningPart>,
}

/// Connection settings of an HTTP oracle
#[derive(Debug, Clone)]
pub struct HttpOracleConfig {
    /// URL receiving the POST requests
    pub endpoint: String,
    /// Model name sent with each request and used as backend identity
    pub model: String,
    /// Optional bearer token
    pub token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

/// Blocking HTTP oracle client
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::blocking::Client,
    config: HttpOracleConfig,
    identity: String,
}

impl HttpOracle {
    /// Build a client with the configured timeout
    ///
    /// # Errors
    ///
    /// Returns a network error if the HTTP client cannot be constructed
    pub fn new(config: HttpOracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("seamweave/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                OracleError::new(
                    OracleErrorKind::Network,
                    format!("Failed to create HTTP client: {e}"),
                )
            })?;
        let identity = format!("{}@{}", config.model, config.endpoint);
        Ok(Self {
            client,
            config,
            identity,
        })
    }

    fn body(&self, request: &StylizeRequest<'_>) -> Result<String, OracleError> {
        let params = request.params;
        let body = RequestBody {
            model: &self.config.model,
            prompt: &params.prompt,
            negative_prompt: params.negative.as_deref(),
            strength: params.strength,
            steps: params.steps,
            guidance: params.guidance,
            seed: request.seed,
            image: inline_rgb(request.image)?,
            mask: request.mask.map(inline_gray).transpose()?,
            conditioning: request
                .conditioning
                .iter()
                .map(|c| {
                    Ok(ConditioningPart {
                        label: c.label.to_string(),
                        image: inline_rgb(c.image)?,
                    })
                })
                .collect::<Result<_, OracleError>>()?,
        };
        serde_json::to_string(&body).map_err(|e| {
            OracleError::new(
                OracleErrorKind::Rejected,
                format!("Failed to encode request: {e}"),
            )
        })
    }
}

impl StylizationOracle for HttpOracle {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn stylize(&self, request: &StylizeRequest<'_>) -> Result<RgbImage, OracleError> {
        let body = self.body(request)?;
        trace!(bytes = body.len(), seed = request.seed, "posting oracle request");

        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json")
            .body(body);
        if let Some(token) = &self.config.token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let response = builder.send().map_err(|e| {
            let kind = if e.is_timeout() {
                OracleErrorKind::Timeout
            } else {
                OracleErrorKind::Network
            };
            OracleError::new(kind, format!("Request failed: {e}"))
        })?;

        let status = response.status();
        let bytes = response.bytes().map_err(|e| {
            OracleError::new(
                OracleErrorKind::Network,
                format!("Failed to read response: {e}"),
            )
        })?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            let excerpt: String = text.chars().take(ERROR_BODY_LIMIT).collect();
            debug!(status = status.as_u16(), "oracle returned an error status");
            return Err(OracleError::from_status(
                status.as_u16(),
                format!("HTTP {}: {excerpt}", status.as_u16()),
            ));
        }
        parse_response(&bytes)
    }
}

fn inline_rgb(img: &RgbImage) -> Result<InlineData, OracleError> {
    let png = encode_png(img)
        .map_err(|e| OracleError::new(OracleErrorKind::Rejected, e.to_string()))?;
    Ok(InlineData {
        mime_type: "image/png",
        data: BASE64.encode(png),
    })
}

fn inline_gray(mask: &GrayImage) -> Result<InlineData, OracleError> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(mask.clone())
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| OracleError::new(OracleErrorKind::Rejected, e.to_string()))?;
    Ok(InlineData {
        mime_type: "image/png",
        data: BASE64.encode(buffer.into_inner()),
    })
}

fn malformed(message: &str) -> OracleError {
    OracleError::new(OracleErrorKind::MalformedResponse, message)
}

/// Extract the output image from a JSON response body
///
/// # Errors
///
/// Returns a policy error for blocked prompts and a malformed-response error
/// when no decodable image is present
pub fn parse_response(body: &[u8]) -> Result<RgbImage, OracleError> {
    let data: Value = serde_json::from_slice(body)
        .map_err(|e| malformed(&format!("Response is not JSON: {e}")))?;

    let feedback = data
        .get("promptFeedback")
        .or_else(|| data.get("prompt_feedback"));
    if let Some(reason) = feedback.and_then(|f| f.get("blockReason")) {
        let reason = reason
            .as_str()
            .map_or_else(|| reason.to_string(), str::to_string);
        return Err(OracleError::new(
            OracleErrorKind::PolicyBlocked,
            format!("Prompt blocked: {reason}"),
        ));
    }

    let encoded = data
        .get("image")
        .and_then(Value::as_str)
        .or_else(|| first_inline_data(&data))
        .ok_or_else(|| malformed("No image data in response"))?;

    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| malformed(&format!("Invalid base64 image: {e}")))?;
    decode_rgb(&bytes).map_err(|e| malformed(&format!("Undecodable image: {e}")))
}

fn first_inline_data(data: &Value) -> Option<&str> {
    data.get("candidates")?
        .as_array()?
        .iter()
        .filter_map(|c| c.get("content")?.get("parts")?.as_array())
        .flatten()
        .find_map(|part| {
            part.get("inlineData")
                .or_else(|| part.get("inline_data"))?
                .get("data")?
                .as_str()
        })
}
