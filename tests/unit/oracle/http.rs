//! Tests for HTTP response parsing and client failures

#[cfg(test)]
mod tests {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use image::{Rgb, RgbImage};
    use seamweave::io::image::encode_png;
    use seamweave::oracle::error::OracleErrorKind;
    use seamweave::oracle::http::{HttpOracle, HttpOracleConfig, parse_response};
    use seamweave::oracle::interface::{OracleParams, StylizationOracle, StylizeRequest};
    use std::time::Duration;

    fn encoded() -> (RgbImage, String) {
        let img = RgbImage::from_pixel(3, 3, Rgb([12, 34, 56]));
        let data = BASE64.encode(encode_png(&img).expect("png"));
        (img, data)
    }

    // Tests top-level image field decoding
    // Verified by reading only candidates
    #[test]
    fn test_parse_top_level_image() {
        let (img, data) = encoded();
        let body = format!(r#"{{"image": "{data}"}}"#);
        assert_eq!(parse_response(body.as_bytes()).expect("image"), img);
    }

    // Tests candidate inline data decoding
    // Verified by looking for snake_case keys only
    #[test]
    fn test_parse_candidate_inline_data() {
        let (img, data) = encoded();
        let body = format!(
            r#"{{"candidates": [{{"content": {{"parts": [{{"text": "ok"}}, {{"inlineData": {{"mimeType": "image/png", "data": "{data}"}}}}]}}}}]}}"#
        );
        assert_eq!(parse_response(body.as_bytes()).expect("image"), img);
    }

    // Tests block reasons become policy errors
    // Verified by ignoring prompt feedback
    #[test]
    fn test_parse_blocked_prompt() {
        let body = br#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = parse_response(body).unwrap_err();
        assert_eq!(err.kind, OracleErrorKind::PolicyBlocked);
        assert!(err.message.contains("SAFETY"));
    }

    // Tests malformed bodies are classified as such
    // Verified by mapping every failure to rejected
    #[test]
    fn test_parse_malformed() {
        for body in [&b"<html>"[..], br#"{"text": "no image"}"#, br#"{"image": "@@@"}"#] {
            let err = parse_response(body).unwrap_err();
            assert_eq!(err.kind, OracleErrorKind::MalformedResponse);
        }
    }

    // Tests identity combines model and endpoint and refused connections are network errors
    // Verified by reporting connection failures as rejected
    #[test]
    fn test_unreachable_endpoint() {
        let oracle = HttpOracle::new(HttpOracleConfig {
            endpoint: "http://127.0.0.1:9/stylize".to_string(),
            model: "toon".to_string(),
            token: Some("secret".to_string()),
            timeout: Duration::from_secs(2),
        })
        .expect("client");
        assert_eq!(oracle.identity(), "toon@http://127.0.0.1:9/stylize");
        let image = RgbImage::new(2, 2);
        let params = OracleParams {
            prompt: String::new(),
            negative: None,
            strength: 0.5,
            steps: 10,
            guidance: 3.0,
        };
        let err = oracle
            .stylize(&StylizeRequest::new(&image, &params, 1))
            .unwrap_err();
        assert!(matches!(
            err.kind,
            OracleErrorKind::Network | OracleErrorKind::Timeout
        ));
        assert!(err.is_retryable());
    }
}
