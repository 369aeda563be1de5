//! Client-side credential providers.
//!
//! A provider is invoked once per authentication opportunity: once while
//! dialing a WebSocket, once per request over HTTP. The secret is passed in at
//! construction; nothing here reads global state.

use crate::auth::header::set_bearer;
use crate::auth::jwt::{self, Claims};
use crate::domain::clock::{unix_seconds, Clock, SystemClock};
use crate::domain::secret::JwtSecret;
use http::HeaderMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Provider failures
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to encode token: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("token is not a valid header value")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
    #[error("provider sequence is empty")]
    EmptySequence,
}

/// Attaches a credential to an outgoing request.
pub trait AuthHeaderProvider: Send + Sync {
    fn add_auth_header(&self, headers: &mut HeaderMap) -> Result<(), ProviderError>;
}

impl<F> AuthHeaderProvider for F
where
    F: Fn(&mut HeaderMap) -> Result<(), ProviderError> + Send + Sync,
{
    fn add_auth_header(&self, headers: &mut HeaderMap) -> Result<(), ProviderError> {
        self(headers)
    }
}

/// Signs an HS256 token with `iat = now` on every call.
///
/// Constructed with a secret the node does not know, this is the
/// wrong-secret provider.
pub struct JwtAuthProvider {
    secret: JwtSecret,
    clock: Arc<dyn Clock>,
}

impl JwtAuthProvider {
    pub fn new(secret: JwtSecret) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: JwtSecret, clock: Arc<dyn Clock>) -> Self {
        Self { secret, clock }
    }
}

impl AuthHeaderProvider for JwtAuthProvider {
    fn add_auth_header(&self, headers: &mut HeaderMap) -> Result<(), ProviderError> {
        let claims = Claims::issued_at(unix_seconds(self.clock.now()));
        let token = jwt::encode_hs256(&self.secret, &claims)?;
        set_bearer(headers, &token)?;
        Ok(())
    }
}

/// Correctly signed, but `iat` is shifted by `offset_secs` from the clock.
pub struct SkewedAuthProvider {
    secret: JwtSecret,
    clock: Arc<dyn Clock>,
    offset_secs: i64,
}

impl SkewedAuthProvider {
    pub fn new(secret: JwtSecret, offset_secs: i64) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock), offset_secs)
    }

    pub fn with_clock(secret: JwtSecret, clock: Arc<dyn Clock>, offset_secs: i64) -> Self {
        Self {
            secret,
            clock,
            offset_secs,
        }
    }
}

impl AuthHeaderProvider for SkewedAuthProvider {
    fn add_auth_header(&self, headers: &mut HeaderMap) -> Result<(), ProviderError> {
        let iat = unix_seconds(self.clock.now()).saturating_add(self.offset_secs);
        let token = jwt::encode_hs256(&self.secret, &Claims::issued_at(iat))?;
        set_bearer(headers, &token)?;
        Ok(())
    }
}

/// Forged token declaring `alg: none` with a current `iat`.
pub struct UnsignedAuthProvider {
    clock: Arc<dyn Clock>,
}

impl UnsignedAuthProvider {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for UnsignedAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthHeaderProvider for UnsignedAuthProvider {
    fn add_auth_header(&self, headers: &mut HeaderMap) -> Result<(), ProviderError> {
        let claims = Claims::issued_at(unix_seconds(self.clock.now()));
        let token = jwt::encode_unsigned(&claims)?;
        set_bearer(headers, &token)?;
        Ok(())
    }
}

/// Delegates the n-th invocation to the n-th provider, sticking to the last
/// one once the list is exhausted.
pub struct ProviderSequence {
    providers: Vec<Arc<dyn AuthHeaderProvider>>,
    next: AtomicUsize,
}

impl ProviderSequence {
    pub fn new(providers: Vec<Arc<dyn AuthHeaderProvider>>) -> Result<Self, ProviderError> {
        if providers.is_empty() {
            return Err(ProviderError::EmptySequence);
        }
        Ok(Self {
            providers,
            next: AtomicUsize::new(0),
        })
    }

    /// Index of the provider the next invocation will use.
    pub fn position(&self) -> usize {
        self.next.load(Ordering::Acquire)
    }

    fn advance(&self) -> usize {
        let last = self.providers.len() - 1;
        match self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| {
                (i < last).then_some(i + 1)
            }) {
            Ok(previous) => previous,
            Err(clamped) => clamped,
        }
    }
}

impl AuthHeaderProvider for ProviderSequence {
    fn add_auth_header(&self, headers: &mut HeaderMap) -> Result<(), ProviderError> {
        let index = self.advance();
        self.providers[index].add_auth_header(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::header::bearer_token;
    use crate::auth::validator::JwtValidator;
    use crate::domain::clock::FixedClock;
    use crate::domain::error::AuthError;
    use std::time::Duration;

    const NOW: u64 = 1_700_000_000;

    fn fixture() -> (JwtSecret, Arc<FixedClock>, JwtValidator) {
        let secret = JwtSecret::random();
        let clock = Arc::new(FixedClock::at_unix(NOW));
        let validator = JwtValidator::new(secret.clone(), Duration::from_secs(5));
        (secret, clock, validator)
    }

    fn check(
        provider: &dyn AuthHeaderProvider,
        validator: &JwtValidator,
        clock: &FixedClock,
    ) -> Result<(), AuthError> {
        let mut headers = HeaderMap::new();
        provider.add_auth_header(&mut headers).unwrap();
        let token = bearer_token(&headers)?;
        validator.validate(token, clock.now()).map(|_| ())
    }

    #[test]
    fn test_good_provider() {
        let (secret, clock, validator) = fixture();
        let provider = JwtAuthProvider::with_clock(secret, clock.clone());
        assert_eq!(check(&provider, &validator, &clock), Ok(()));
    }

    #[test]
    fn test_wrong_secret_provider() {
        let (_, clock, validator) = fixture();
        let provider = JwtAuthProvider::with_clock(JwtSecret::random(), clock.clone());
        assert_eq!(
            check(&provider, &validator, &clock),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn test_unsigned_provider() {
        let (_, clock, validator) = fixture();
        let provider = UnsignedAuthProvider::with_clock(clock.clone());
        assert_eq!(
            check(&provider, &validator, &clock),
            Err(AuthError::AlgorithmNotAllowed)
        );
    }

    #[test]
    fn test_skewed_provider_boundary() {
        let (secret, clock, validator) = fixture();
        for (offset, expected) in [
            (-3, Ok(())),
            (3, Ok(())),
            (5, Ok(())),
            (-6, Err(AuthError::ClockSkewExceeded)),
            (6, Err(AuthError::ClockSkewExceeded)),
        ] {
            let provider = SkewedAuthProvider::with_clock(secret.clone(), clock.clone(), offset);
            assert_eq!(check(&provider, &validator, &clock), expected, "offset {offset}");
        }
    }

    #[test]
    fn test_closure_provider() {
        let (_, clock, validator) = fixture();
        let provider = |headers: &mut HeaderMap| -> Result<(), ProviderError> {
            set_bearer(headers, "not-a-jwt")?;
            Ok(())
        };
        assert_eq!(
            check(&provider, &validator, &clock),
            Err(AuthError::MalformedToken)
        );
    }

    #[test]
    fn test_sequence_advances_and_clamps() {
        let (secret, clock, validator) = fixture();
        let good: Arc<dyn AuthHeaderProvider> =
            Arc::new(JwtAuthProvider::with_clock(secret, clock.clone()));
        let bad: Arc<dyn AuthHeaderProvider> =
            Arc::new(JwtAuthProvider::with_clock(JwtSecret::random(), clock.clone()));
        let sequence = ProviderSequence::new(vec![good, bad]).unwrap();

        assert_eq!(check(&sequence, &validator, &clock), Ok(()));
        assert_eq!(
            check(&sequence, &validator, &clock),
            Err(AuthError::BadSignature)
        );
        assert_eq!(
            check(&sequence, &validator, &clock),
            Err(AuthError::BadSignature)
        );
        assert_eq!(sequence.position(), 1);
    }

    #[test]
    fn test_empty_sequence_rejected() {
        assert!(matches!(
            ProviderSequence::new(Vec::new()),
            Err(ProviderError::EmptySequence)
        ));
    }

    #[test]
    fn test_provider_tracks_clock() {
        let (secret, clock, validator) = fixture();
        let provider = JwtAuthProvider::with_clock(secret, clock.clone());
        let mut headers = HeaderMap::new();
        provider.add_auth_header(&mut headers).unwrap();
        let stale = bearer_token(&headers).unwrap().to_string();

        clock.advance(Duration::from_secs(30));
        assert_eq!(
            validator.validate(&stale, clock.now()).unwrap_err(),
            AuthError::ClockSkewExceeded
        );
        assert_eq!(check(&provider, &validator, &clock), Ok(()));
    }
}
