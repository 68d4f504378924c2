//! Classified failures of a stylization oracle call

use crate::io::configuration::{RETRYABLE_MESSAGE_TOKENS, RETRYABLE_STATUS_CODES};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad category of an oracle failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleErrorKind {
    /// Backend asked the caller to slow down
    RateLimited,
    /// Backend reported a transient server-side failure
    ServerError,
    /// Call did not complete within the timeout
    Timeout,
    /// Connection-level failure
    Network,
    /// Request was refused by a content policy
    PolicyBlocked,
    /// Backend answered with something that is not an image
    MalformedResponse,
    /// Any other refusal
    Rejected,
}

/// Failure of a single oracle call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleError {
    /// Category
    pub kind: OracleErrorKind,
    /// HTTP status, when the backend is HTTP based
    pub status: Option<u16>,
    /// Human readable description
    pub message: String,
}

impl OracleError {
    /// Create an error of a given kind
    pub fn new(kind: OracleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Classify an HTTP status code
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            429 => OracleErrorKind::RateLimited,
            s if RETRYABLE_STATUS_CODES.contains(&s) => OracleErrorKind::ServerError,
            408 => OracleErrorKind::Timeout,
            _ => OracleErrorKind::Rejected,
        };
        Self {
            kind,
            status: Some(status),
            message: message.into(),
        }
    }

    /// Classify a free-form failure message
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let kind = if lower.contains("prompt blocked") {
            OracleErrorKind::PolicyBlocked
        } else if lower.contains("timeout") || lower.contains("timed out") {
            OracleErrorKind::Timeout
        } else if ["429", "rate", "resource exhausted"]
            .iter()
            .any(|t| lower.contains(t))
        {
            OracleErrorKind::RateLimited
        } else if RETRYABLE_MESSAGE_TOKENS.iter().any(|t| lower.contains(t)) {
            OracleErrorKind::ServerError
        } else {
            OracleErrorKind::Rejected
        };
        Self::new(kind, message)
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            OracleErrorKind::RateLimited
            | OracleErrorKind::ServerError
            | OracleErrorKind::Timeout
            | OracleErrorKind::Network => true,
            OracleErrorKind::PolicyBlocked | OracleErrorKind::MalformedResponse => false,
            OracleErrorKind::Rejected => {
                self.status
                    .is_some_and(|s| RETRYABLE_STATUS_CODES.contains(&s))
                    || {
                        let lower = self.message.to_lowercase();
                        RETRYABLE_MESSAGE_TOKENS.iter().any(|t| lower.contains(t))
                    }
            }
        }
    }

    /// Whether a different backend may be tried after this failure
    pub fn allows_fallback(&self) -> bool {
        self.kind != OracleErrorKind::PolicyBlocked
    }
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?} (HTTP {status}): {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for OracleError {}
