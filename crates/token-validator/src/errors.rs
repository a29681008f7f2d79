//! Request-level error type for the validation endpoint.
//!
//! The endpoint contract is status-only, so responses carry no body. The
//! reason string is for server-side logs and never reaches the client.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Value of `WWW-Authenticate` on 401 responses.
pub const WWW_AUTHENTICATE_INVALID_TOKEN: &str = "Bearer error=\"invalid_token\"";

/// Endpoint error type.
///
/// Maps to HTTP status codes:
/// - BadRequest: 400 (bad method, missing/malformed Authorization, malformed
///   token, unresolvable key, missing mandatory claim)
/// - Unauthorized: 401 (well-formed token rejected on signature or expiry)
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("Bad request: {0}")]
    BadRequest(&'static str),

    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),
}

impl ValidatorError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ValidatorError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ValidatorError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ValidatorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(target: "tv.endpoint", status = status.as_u16(), reason = %self, "Request rejected");

        let mut response = status.into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(WWW_AUTHENTICATE_INVALID_TOKEN),
            );
        }

        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_display_bad_request() {
        let error = ValidatorError::BadRequest("method not allowed");
        assert_eq!(format!("{}", error), "Bad request: method not allowed");
    }

    #[test]
    fn test_display_unauthorized() {
        let error = ValidatorError::Unauthorized("token expired");
        assert_eq!(format!("{}", error), "Unauthorized: token expired");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ValidatorError::BadRequest("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ValidatorError::Unauthorized("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_into_response_bad_request_has_no_body() {
        let response = ValidatorError::BadRequest("missing authorization header").into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_into_response_unauthorized() {
        let response = ValidatorError::Unauthorized("signature invalid").into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(www_auth, "Bearer error=\"invalid_token\"");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty(), "reason must not leak into the body");
    }
}
