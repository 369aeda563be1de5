//! `Authorization: Bearer <token>` handling shared by both gates and providers.

use crate::domain::error::AuthError;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};

const BEARER: &str = "bearer ";

/// Extract the bearer token from request headers.
///
/// A missing header, a non-bearer scheme, or an empty token all count as no
/// credential. A header that is not visible ASCII is malformed.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::NoCredentialPresented)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedToken)?;

    // Scheme is case-insensitive (RFC 7235)
    if value.len() < BEARER.len() || !value[..BEARER.len()].eq_ignore_ascii_case(BEARER) {
        return Err(AuthError::NoCredentialPresented);
    }

    let token = value[BEARER.len()..].trim();
    if token.is_empty() {
        return Err(AuthError::NoCredentialPresented);
    }
    Ok(token)
}

/// Replace any existing `Authorization` header with `Bearer <token>`.
pub fn set_bearer(headers: &mut HeaderMap, token: &str) -> Result<(), http::header::InvalidHeaderValue> {
    let value = HeaderValue::from_str(&format!("Bearer {}", token))?;
    headers.insert(AUTHORIZATION, value);
    Ok(())
}
