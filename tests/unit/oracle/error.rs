//! Tests for oracle failure classification and retry eligibility

#[cfg(test)]
mod tests {
    use seamweave::oracle::error::{OracleError, OracleErrorKind};

    // Tests HTTP statuses map to kinds
    // Verified by treating 429 as a server error
    #[test]
    fn test_from_status() {
        assert_eq!(OracleError::from_status(429, "slow").kind, OracleErrorKind::RateLimited);
        assert_eq!(OracleError::from_status(503, "down").kind, OracleErrorKind::ServerError);
        assert_eq!(OracleError::from_status(408, "late").kind, OracleErrorKind::Timeout);
        let rejected = OracleError::from_status(400, "bad");
        assert_eq!(rejected.kind, OracleErrorKind::Rejected);
        assert_eq!(rejected.status, Some(400));
    }

    // Tests message tokens classify free-form failures
    // Verified by matching case-sensitively
    #[test]
    fn test_from_message() {
        assert_eq!(
            OracleError::from_message("Prompt blocked: SAFETY").kind,
            OracleErrorKind::PolicyBlocked
        );
        assert_eq!(
            OracleError::from_message("Request Timed Out").kind,
            OracleErrorKind::Timeout
        );
        assert_eq!(
            OracleError::from_message("RESOURCE EXHAUSTED").kind,
            OracleErrorKind::RateLimited
        );
        assert_eq!(
            OracleError::from_message("Service Unavailable").kind,
            OracleErrorKind::ServerError
        );
        assert_eq!(
            OracleError::from_message("invalid argument").kind,
            OracleErrorKind::Rejected
        );
    }

    // Tests retry eligibility per kind
    // Verified by retrying policy blocks
    #[test]
    fn test_is_retryable() {
        assert!(OracleError::new(OracleErrorKind::Network, "reset").is_retryable());
        assert!(OracleError::new(OracleErrorKind::Timeout, "slow").is_retryable());
        assert!(!OracleError::new(OracleErrorKind::PolicyBlocked, "no").is_retryable());
        assert!(!OracleError::new(OracleErrorKind::MalformedResponse, "junk").is_retryable());
        assert!(!OracleError::new(OracleErrorKind::Rejected, "bad request").is_retryable());
    }

    // Tests policy blocks never fall back to another backend
    // Verified by allowing fallback for every kind
    #[test]
    fn test_allows_fallback() {
        assert!(!OracleError::new(OracleErrorKind::PolicyBlocked, "x").allows_fallback());
        assert!(OracleError::new(OracleErrorKind::ServerError, "x").allows_fallback());
        assert!(OracleError::new(OracleErrorKind::Rejected, "x").allows_fallback());
    }

    // Tests display includes the status when present
    // Verified by omitting the status
    #[test]
    fn test_display() {
        let text = OracleError::from_status(502, "bad gateway").to_string();
        assert!(text.contains("502"));
        assert!(text.contains("bad gateway"));
    }
}
