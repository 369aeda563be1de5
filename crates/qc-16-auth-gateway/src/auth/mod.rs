//! Bearer-token authentication.
//!
//! - `jwt`: compact JWS codec (HS256 only on the signing side)
//! - `validator`: the pure accept/reject decision
//! - `header`: `Authorization: Bearer` extraction and formatting
//! - `provider`: client-side capabilities that attach a token to a request

pub mod header;
pub mod jwt;
pub mod provider;
pub mod validator;

pub use header::{bearer_token, set_bearer};
pub use jwt::{Claims, JwtHeader, HS256};
pub use provider::{
    AuthHeaderProvider, JwtAuthProvider, ProviderError, ProviderSequence, SkewedAuthProvider,
    UnsignedAuthProvider,
};
pub use validator::{validate, JwtValidator};
