//! Gateway error types.
//!
//! `AuthError` is the authentication taxonomy produced by the validator and the
//! gates. It is internal: callers only ever see a generic unauthorized error.
//! `ApiError` carries JSON-RPC error codes onto the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard JSON-RPC 2.0 error codes
pub mod codes {
    // JSON-RPC 2.0 standard errors (-32700 to -32600)
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // Server errors (-32000 to -32099)
    pub const SERVER_ERROR: i32 = -32000;
    pub const LIMIT_EXCEEDED: i32 = -32005;

    // Ethereum specific errors (-32000 range, per EIP-1474)
    pub const UNAUTHORIZED: i32 = -32010;
}

/// Reason an authentication attempt was refused.
///
/// All variants are terminal for the attempt; the gateway never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum AuthError {
    /// Token is not a well-formed `header.claims.signature` triple
    #[error("malformed token")]
    MalformedToken,
    /// Header declares an algorithm other than the pinned one
    #[error("signing algorithm not allowed")]
    AlgorithmNotAllowed,
    /// Signature does not match the shared secret
    #[error("signature mismatch")]
    BadSignature,
    /// Required `iat` claim is absent
    #[error("missing iat claim")]
    MissingClaim,
    /// `iat` is outside the tolerance window around the server clock
    #[error("token issued outside clock skew tolerance")]
    ClockSkewExceeded,
    /// No bearer credential attached to the request
    #[error("no credential presented")]
    NoCredentialPresented,
}

impl AuthError {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthError::MalformedToken => "malformed_token",
            AuthError::AlgorithmNotAllowed => "algorithm_not_allowed",
            AuthError::BadSignature => "bad_signature",
            AuthError::MissingClaim => "missing_claim",
            AuthError::ClockSkewExceeded => "clock_skew_exceeded",
            AuthError::NoCredentialPresented => "no_credential_presented",
        }
    }
}

/// Outcome of a single validation. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthDecision {
    pub accepted: bool,
    pub reason: Option<AuthError>,
}

impl AuthDecision {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn reject(reason: AuthError) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
        }
    }
}

impl<T> From<Result<T, AuthError>> for AuthDecision {
    fn from(result: Result<T, AuthError>) -> Self {
        match result {
            Ok(_) => AuthDecision::accept(),
            Err(reason) => AuthDecision::reject(reason),
        }
    }
}

/// API Gateway error with JSON-RPC code
#[derive(Debug, Clone)]
pub struct ApiError {
    /// JSON-RPC error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Optional additional data
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Parse error - invalid JSON
    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(
            codes::PARSE_ERROR,
            format!("Parse error: {}", details.into()),
        )
    }

    /// Invalid request - not a valid JSON-RPC request
    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_REQUEST,
            format!("Invalid request: {}", details.into()),
        )
    }

    /// Method not found
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    /// Invalid parameters
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_PARAMS,
            format!("Invalid params: {}", details.into()),
        )
    }

    /// Internal error
    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            codes::INTERNAL_ERROR,
            format!("Internal error: {}", details.into()),
        )
    }

    /// Limit exceeded (message size, batch size, etc.)
    pub fn limit_exceeded(limit: impl Into<String>) -> Self {
        Self::new(
            codes::LIMIT_EXCEEDED,
            format!("Limit exceeded: {}", limit.into()),
        )
    }

    /// Unauthorized - missing or invalid auth.
    ///
    /// The message is deliberately generic; the concrete `AuthError` stays in
    /// the server logs.
    pub fn unauthorized() -> Self {
        Self::new(codes::UNAUTHORIZED, "Unauthorized: missing or invalid token")
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ApiError", 3)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(ref data) = self.data {
            state.serialize_field("data", data)?;
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for ApiError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ErrorHelper {
            code: i32,
            message: String,
            data: Option<serde_json::Value>,
        }

        let helper = ErrorHelper::deserialize(deserializer)?;
        Ok(ApiError {
            code: helper.code,
            message: helper.message,
            data: helper.data,
        })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_syntax() || e.is_eof() {
            ApiError::parse_error(e.to_string())
        } else {
            ApiError::invalid_params(e.to_string())
        }
    }
}

impl From<hex::FromHexError> for ApiError {
    fn from(e: hex::FromHexError) -> Self {
        ApiError::invalid_params(format!("invalid hex: {}", e))
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Gateway-level errors (not JSON-RPC, internal use)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::domain::config::ConfigError),

    /// JWT secret could not be loaded
    #[error("jwt secret error: {0}")]
    Secret(#[from] crate::domain::secret::SecretError),

    /// Server socket bind error
    #[error("server bind error on {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// An authenticated listener resolved to the same address as a plain one
    #[error("{transport} endpoint collision: {endpoint}")]
    EndpointCollision {
        transport: &'static str,
        endpoint: String,
    },

    /// Namespace registered twice
    #[error("namespace already registered: {0}")]
    DuplicateNamespace(String),

    /// APIs must be registered before the node starts
    #[error("node already started")]
    AlreadyStarted,

    /// Endpoint queried before the node started
    #[error("node not started")]
    NotStarted,

    /// Endpoint queried for a listener disabled in the configuration
    #[error("{0} listener is disabled")]
    ListenerDisabled(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = ApiError::method_not_found("engine_foo");
        assert_eq!(err.code, codes::METHOD_NOT_FOUND);
        assert!(err.message.contains("engine_foo"));
    }

    #[test]
    fn test_unauthorized_does_not_leak_reason() {
        let err = ApiError::unauthorized();
        assert_eq!(err.code, codes::UNAUTHORIZED);
        for reason in [
            AuthError::MalformedToken,
            AuthError::AlgorithmNotAllowed,
            AuthError::BadSignature,
            AuthError::MissingClaim,
            AuthError::ClockSkewExceeded,
            AuthError::NoCredentialPresented,
        ] {
            assert!(!err.message.contains(&reason.to_string()));
        }
    }

    #[test]
    fn test_error_serialization() {
        let err = ApiError::invalid_params("expected array");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("-32602"));
        assert!(json.contains("expected array"));
        assert!(!json.contains("data"));
    }

    #[test]
    fn test_decision_from_result() {
        let ok: Result<(), AuthError> = Ok(());
        assert_eq!(AuthDecision::from(ok), AuthDecision::accept());

        let err: Result<(), AuthError> = Err(AuthError::BadSignature);
        let decision = AuthDecision::from(err);
        assert!(!decision.accepted);
        assert_eq!(decision.reason, Some(AuthError::BadSignature));
    }

    #[test]
    fn test_from_serde_error() {
        let json_err: Result<serde_json::Value, _> = serde_json::from_str("invalid json");
        let api_err: ApiError = json_err.unwrap_err().into();
        assert_eq!(api_err.code, codes::PARSE_ERROR);
    }
}
