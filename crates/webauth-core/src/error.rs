//! Error taxonomy for the token codec and keyring subsystem.
//!
//! Every fallible operation in this crate returns [`WebauthError`], which
//! carries both the failure kind and a human-readable detail string. Lower
//! layers (attribute codec, envelope) report the root cause; higher layers
//! wrap with context (which field, which token type) without changing the
//! kind. Nothing in the core retries or unwinds; failures are plain values.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WebauthError>;

/// Errors produced by token, keyring, and codec operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WebauthError {
    /// Structural or semantic inconsistency in token or attribute data:
    /// a missing or forbidden field, a malformed attribute stream, an
    /// unknown enumerated value, or a token type mismatch.
    #[error("corrupt data: {detail}")]
    Corrupt {
        /// What was wrong with the data.
        detail: String,
    },

    /// Envelope authentication failed under every candidate key.
    #[error("HMAC verification failed")]
    BadHmac,

    /// Key material is unusable, or the keyring has no key at all for the
    /// requested usage.
    #[error("unusable key: {detail}")]
    BadKey {
        /// Why the key material could not be used.
        detail: String,
    },

    /// The token's expiration time is in the past. Only raised while
    /// decoding; encoding an already-expired token is allowed.
    #[error("token expired at {expiration}")]
    TokenExpired {
        /// Expiration timestamp in seconds since the epoch.
        expiration: u64,
    },

    /// The token is too old to be trusted for request freshness. Reserved
    /// for WebKDC-layer consumers; the core never raises it.
    #[error("stale token: {detail}")]
    TokenStale {
        /// Why the token was considered stale.
        detail: String,
    },

    /// The keyring file does not exist.
    #[error("keyring file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The keyring file could not be opened for reading.
    #[error("cannot open {path} for reading: {source}")]
    FileOpenRead {
        /// Path that was requested.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The keyring file could not be read.
    #[error("cannot read {path}: {source}")]
    FileRead {
        /// Path that was requested.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A temporary file for the new keyring could not be created.
    #[error("cannot open temporary keyring file for {path}: {source}")]
    FileOpenWrite {
        /// Destination path of the write.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The keyring file could not be written or renamed into place.
    #[error("cannot write {path}: {source}")]
    FileWrite {
        /// Destination path of the write.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The keyring file carries an unsupported format version.
    #[error("unsupported keyring data version {version}")]
    FileVersion {
        /// The version found in the file.
        version: u32,
    },

    /// A keyring index was out of range, or no key qualified for the
    /// requested usage.
    #[error("not found: {detail}")]
    NotFound {
        /// What was looked up.
        detail: String,
    },

    /// Programmer error: an argument that can never be valid.
    #[error("invalid argument: {detail}")]
    Invalid {
        /// Which argument and why.
        detail: String,
    },
}

impl WebauthError {
    /// Builds a [`WebauthError::Corrupt`] from any displayable detail.
    pub(crate) fn corrupt(detail: impl Into<String>) -> Self {
        Self::Corrupt {
            detail: detail.into(),
        }
    }

    /// Builds a [`WebauthError::BadKey`] from any displayable detail.
    pub(crate) fn bad_key(detail: impl Into<String>) -> Self {
        Self::BadKey {
            detail: detail.into(),
        }
    }

    /// Builds a [`WebauthError::NotFound`] from any displayable detail.
    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound {
            detail: detail.into(),
        }
    }
}
