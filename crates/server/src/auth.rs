use actix_web::HttpRequest;
use transcribe_common::TranscribeError;

use crate::error::ApiError;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// Require `x-api-key` to equal the configured key
pub fn require_api_key(req: &HttpRequest, expected: &str) -> Result<(), ApiError> {
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if key == expected => Ok(()),
        _ => Err(TranscribeError::unauthorized("Unauthorized").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_require_api_key() {
        let req = TestRequest::default()
            .insert_header((API_KEY_HEADER, "secret"))
            .to_http_request();
        assert!(require_api_key(&req, "secret").is_ok());
        assert!(require_api_key(&req, "other").is_err());

        let req = TestRequest::default().to_http_request();
        let err = require_api_key(&req, "secret").unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized");
    }
}
