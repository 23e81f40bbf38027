//! SAML error types.
//!
//! A failed signature check is not an error; it is reported as
//! [`SignatureVerdict::Invalid`](crate::response::SignatureVerdict). The
//! variants here are hard failures: bad input, unknown peers, malformed
//! signatures and undecryptable content.

use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Metadata or key material unusable at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Required input field missing or empty.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No descriptor for the referenced or asserted entityId.
    #[error("unknown identity provider: {0}")]
    UnknownIdp(String),

    /// Neither the response nor its assertion carries a signature.
    #[error("no signature found on response or assertion")]
    MissingSignature,

    /// Signature violates the SAML signature profile.
    #[error("invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    /// Zero or more than one `EncryptedAssertion` present.
    #[error("expected exactly one EncryptedAssertion, found {0}")]
    MissingEncryptedAssertion(usize),

    /// No key configured, or the encrypted content could not be recovered.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Action name not recognised.
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),

    /// Caller-supplied XML is not well-formed or is refused by the parser.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Base64 or DEFLATE decoding failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl SamlError {
    /// Stable machine-readable code for replies.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::InvalidRequest(_) => "invalid_request",
            Self::UnknownIdp(_) => "unknown_idp",
            Self::MissingSignature => "missing_signature",
            Self::InvalidSignatureFormat(_) => "invalid_signature_format",
            Self::MissingEncryptedAssertion(_) => "missing_encrypted_assertion",
            Self::DecryptionFailed(_) => "decryption_failed",
            Self::UnsupportedAction(_) => "unsupported_action",
            Self::XmlParse(_) => "xml_parse_error",
            Self::Encoding(_) => "encoding_error",
            Self::Crypto(_) => "crypto_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::UnsupportedAction(_)
            | Self::XmlParse(_)
            | Self::Encoding(_)
            | Self::MissingSignature
            | Self::InvalidSignatureFormat(_)
            | Self::MissingEncryptedAssertion(_) => 400,
            Self::UnknownIdp(_) => 404,
            Self::DecryptionFailed(_) => 422,
            Self::Config(_) | Self::Crypto(_) => 500,
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Encoding(format!("base64: {err}"))
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::Encoding(format!("deflate: {err}"))
    }
}

impl From<sp_crypto::CryptoError> for SamlError {
    fn from(err: sp_crypto::CryptoError) -> Self {
        Self::Crypto(err.to_string())
    }
}
