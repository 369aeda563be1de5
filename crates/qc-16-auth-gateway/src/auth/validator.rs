//! Token validation.
//!
//! Order of checks:
//! 1. structure (`MalformedToken`)
//! 2. algorithm allow-list (`AlgorithmNotAllowed`), before any signature work
//! 3. HS256 signature (`BadSignature`)
//! 4. `iat` present (`MissingClaim`) and within tolerance of `now`
//!    (`ClockSkewExceeded`, boundary inclusive)
//!
//! Tolerance is measured against the server clock at receipt. A token signed
//! within tolerance may still be refused if it spent too long in flight.

use crate::auth::jwt::{self, Claims, HS256};
use crate::domain::error::{AuthDecision, AuthError};
use crate::domain::secret::JwtSecret;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Validate `token` against `secret` at time `now`.
///
/// Pure: no I/O, no shared state.
pub fn validate(
    secret: &JwtSecret,
    token: &str,
    now: SystemTime,
    tolerance: Duration,
) -> Result<Claims, AuthError> {
    let decoded = jwt::decode(token)?;

    if decoded.header.alg != HS256 {
        return Err(AuthError::AlgorithmNotAllowed);
    }

    jwt::verify_hs256(secret, decoded.signing_input, &decoded.signature)?;

    let iat = decoded.claims.iat.ok_or(AuthError::MissingClaim)?;
    check_freshness(iat, now, tolerance)?;

    Ok(decoded.claims)
}

fn check_freshness(iat: i64, now: SystemTime, tolerance: Duration) -> Result<(), AuthError> {
    let issued = if iat >= 0 {
        UNIX_EPOCH.checked_add(Duration::from_secs(iat as u64))
    } else {
        UNIX_EPOCH.checked_sub(Duration::from_secs(iat.unsigned_abs()))
    }
    .ok_or(AuthError::ClockSkewExceeded)?;

    let skew = match now.duration_since(issued) {
        Ok(elapsed) => elapsed,
        Err(ahead) => ahead.duration(),
    };

    if skew > tolerance {
        return Err(AuthError::ClockSkewExceeded);
    }
    Ok(())
}

/// Validator bound to the node's secret and tolerance.
#[derive(Debug, Clone)]
pub struct JwtValidator {
    secret: JwtSecret,
    tolerance: Duration,
}

impl JwtValidator {
    pub fn new(secret: JwtSecret, tolerance: Duration) -> Self {
        Self { secret, tolerance }
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    pub fn validate(&self, token: &str, now: SystemTime) -> Result<Claims, AuthError> {
        validate(&self.secret, token, now, self.tolerance)
    }

    pub fn decide(&self, token: &str, now: SystemTime) -> AuthDecision {
        self.validate(token, now).into()
    }
}
