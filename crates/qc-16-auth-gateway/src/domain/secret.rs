//! Shared JWT secret.
//!
//! The secret is provisioned through a file containing 32 hex-encoded bytes
//! (optionally `0x`-prefixed). It is read once at startup and then passed
//! explicitly to the validator and to client-side providers.

use rand::RngCore;
use std::fmt;
use std::path::Path;
use subtle::ConstantTimeEq;
use tracing::info;

/// Length of the HS256 secret in bytes
pub const SECRET_LEN: usize = 32;

/// Errors loading or parsing a secret
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("failed to access secret file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("secret is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("secret must be {SECRET_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// 32-byte symmetric key shared by the node and its authenticated callers.
#[derive(Clone)]
pub struct JwtSecret([u8; SECRET_LEN]);

impl JwtSecret {
    pub fn from_bytes(bytes: [u8; SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Fresh secret from the OS RNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; SECRET_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse a hex string, tolerating surrounding whitespace and a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, SecretError> {
        let s = s.trim();
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let decoded = hex::decode(s)?;
        let bytes: [u8; SECRET_LEN] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| SecretError::InvalidLength(decoded.len()))?;
        Ok(Self(bytes))
    }

    /// Read the secret from a file. The file is read exactly once.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SecretError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SecretError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_hex(&contents)
    }

    /// Read the secret from `path`, or generate and persist a new one if the
    /// file does not exist yet.
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<Self, SecretError> {
        let path = path.as_ref();
        if path.exists() {
            let secret = Self::from_file(path)?;
            info!(path = %path.display(), "Loaded JWT secret file");
            return Ok(secret);
        }

        let secret = Self::random();
        secret.write_to(path)?;
        info!(path = %path.display(), "Generated JWT secret");
        Ok(secret)
    }

    /// Persist as `0x`-prefixed hex, owner read/write only.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), SecretError> {
        let path = path.as_ref();
        let io_err = |source| SecretError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.to_hex()).map_err(io_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }

        Ok(())
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }
}

impl PartialEq for JwtSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for JwtSecret {}

impl fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JwtSecret(<redacted>)")
    }
}
