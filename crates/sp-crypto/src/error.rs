//! Error type for cryptographic operations.

use thiserror::Error;

/// Error type for cryptographic operations.
///
/// Messages never carry key material or plaintext.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Private or public key could not be decoded.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// X.509 certificate could not be parsed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Algorithm or parameter combination not supported.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),

    /// Content key could not be recovered from its wrapped form.
    #[error("key unwrap failed")]
    KeyUnwrap,

    /// Content decryption failed.
    #[error("decryption failed: {0}")]
    Decryption(String),
}

/// Result alias for this crate.
pub type CryptoResult<T> = Result<T, CryptoError>;
