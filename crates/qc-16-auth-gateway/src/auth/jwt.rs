//! Compact JWS codec: `b64url(header).b64url(claims).b64url(signature)`.
//!
//! Decoding is purely structural. Whether the declared algorithm is
//! acceptable is decided by the validator, not here.

use crate::domain::error::AuthError;
use crate::domain::secret::JwtSecret;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The only algorithm the gateway signs or accepts
pub const HS256: &str = "HS256";

/// The unsigned JWS algorithm
pub const NONE: &str = "none";

/// JOSE header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl JwtHeader {
    pub fn new(alg: impl Into<String>) -> Self {
        Self {
            alg: alg.into(),
            typ: Some("JWT".to_string()),
        }
    }
}

/// Token claims. Only `iat` is interpreted; everything else is carried through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Issued-at, integer seconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    pub fn issued_at(iat: i64) -> Self {
        Self {
            iat: Some(iat),
            extra: serde_json::Map::new(),
        }
    }
}

/// A structurally valid token, not yet verified.
#[derive(Debug, Clone)]
pub struct DecodedToken<'a> {
    pub header: JwtHeader,
    pub claims: Claims,
    /// `header.claims` exactly as presented; this is what was signed
    pub signing_input: &'a str,
    pub signature: Vec<u8>,
}

/// Split and decode a compact token.
///
/// Any structural problem maps to [`AuthError::MalformedToken`].
pub fn decode(token: &str) -> Result<DecodedToken<'_>, AuthError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::MalformedToken);
    };

    let header: JwtHeader = decode_segment(header_b64)?;
    let claims: Claims = decode_segment(claims_b64)?;
    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AuthError::MalformedToken)?;

    Ok(DecodedToken {
        header,
        claims,
        signing_input: &token[..header_b64.len() + 1 + claims_b64.len()],
        signature,
    })
}

/// Segments must be JSON objects; arrays and scalars are rejected even where
/// serde would accept them for a struct.
fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::MalformedToken)?;
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)?;
    serde_json::from_value(serde_json::Value::Object(object)).map_err(|_| AuthError::MalformedToken)
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(value)?))
}

fn mac(secret: &JwtSecret, signing_input: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key size is always valid");
    mac.update(signing_input.as_bytes());
    mac
}

/// Constant-time HS256 signature check.
pub fn verify_hs256(
    secret: &JwtSecret,
    signing_input: &str,
    signature: &[u8],
) -> Result<(), AuthError> {
    mac(secret, signing_input)
        .verify_slice(signature)
        .map_err(|_| AuthError::BadSignature)
}

/// Sign `claims` with HS256.
pub fn encode_hs256(secret: &JwtSecret, claims: &Claims) -> Result<String, serde_json::Error> {
    let signing_input = format!(
        "{}.{}",
        encode_segment(&JwtHeader::new(HS256))?,
        encode_segment(claims)?
    );
    let signature = mac(secret, &signing_input).finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        signing_input,
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Produce an `alg: none` token with an empty signature segment.
pub fn encode_unsigned(claims: &Claims) -> Result<String, serde_json::Error> {
    Ok(format!(
        "{}.{}.",
        encode_segment(&JwtHeader::new(NONE))?,
        encode_segment(claims)?
    ))
}
