//! Token validation endpoint.
//!
//! `GET /v1/Validate` with `Authorization: Bearer <token>`. The answer is
//! the status code alone:
//!
//! | Outcome | Status |
//! |---------|--------|
//! | Valid | 204 No Content |
//! | wrong method, missing/non-Bearer header | 400 |
//! | Malformed, KeyNotFound, ClaimMissing | 400 |
//! | SignatureInvalid, ClaimExpired | 401 |

use crate::auth::{TokenValidator, ValidationOutcome};
use crate::errors::ValidatorError;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

/// Route path of the validation endpoint.
pub const VALIDATE_PATH: &str = "/v1/Validate";

const BEARER_PREFIX: &str = "Bearer ";

/// Handler for `/v1/Validate`, mounted for every method.
#[instrument(skip_all, name = "tv.endpoint.validate")]
pub async fn validate_token(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
) -> Result<StatusCode, ValidatorError> {
    let now = Utc::now().timestamp();
    authorize(&method, &headers, &state.validator, now)
}

/// Decide the response status for one request.
///
/// Method and header checks happen before the validator is consulted.
///
/// # Errors
///
/// Returns `ValidatorError::BadRequest` or `ValidatorError::Unauthorized`
/// per the table in the module docs.
pub fn authorize(
    method: &Method,
    headers: &HeaderMap,
    validator: &TokenValidator,
    now: i64,
) -> Result<StatusCode, ValidatorError> {
    if method != Method::GET {
        return Err(ValidatorError::BadRequest("method not allowed"));
    }

    let token = bearer_token(headers)?;

    match validator.validate(token, now) {
        ValidationOutcome::Valid => Ok(StatusCode::NO_CONTENT),
        ValidationOutcome::Malformed => Err(ValidatorError::BadRequest("malformed token")),
        ValidationOutcome::KeyNotFound => Err(ValidatorError::BadRequest("unresolvable signing key")),
        ValidationOutcome::ClaimMissing(_) => {
            Err(ValidatorError::BadRequest("missing required claim"))
        }
        ValidationOutcome::SignatureInvalid => Err(ValidatorError::Unauthorized("invalid signature")),
        ValidationOutcome::ClaimExpired => Err(ValidatorError::Unauthorized("token expired")),
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme match is exact and case-sensitive.
///
/// # Errors
///
/// Returns `ValidatorError::BadRequest` if the header is absent, not
/// visible ASCII, or uses another scheme.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ValidatorError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(ValidatorError::BadRequest("missing authorization header"))?;

    let value = value
        .to_str()
        .map_err(|_| ValidatorError::BadRequest("authorization header is not ASCII"))?;

    value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(ValidatorError::BadRequest("authorization scheme is not Bearer"))
}
