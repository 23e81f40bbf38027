//! XML Signature support for SAML.
//!
//! Enveloped signatures on a Response or an Assertion are checked in two
//! stages. [`SignedObject::locate`] applies the SAML signature profile to the
//! `ds:Signature` structure and refuses anything outside it. Only then does
//! [`SignatureValidator`] canonicalize, digest and verify against the keys in
//! the issuer's metadata.
//!
//! # Algorithms
//!
//! - RSA-SHA256, RSA-SHA384, RSA-SHA512
//! - ECDSA-SHA256, ECDSA-SHA384
//! - RSA-SHA1 and SHA-1 digests, only when [`SignaturePolicy::allow_sha1`]
//!   is set

mod profile;
mod validator;

pub use profile::SignedObject;
pub use validator::SignatureValidator;

use sp_crypto::{HashAlgorithm, SignatureAlgorithm};

use crate::types::{digest_algorithms, signature_algorithms, transform_algorithms};

/// Which algorithms a signature may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignaturePolicy {
    /// Accept RSA-SHA1 signatures and SHA-1 digests.
    pub allow_sha1: bool,
}

impl SignaturePolicy {
    /// Policy that also accepts SHA-1.
    #[must_use]
    pub const fn legacy() -> Self {
        Self { allow_sha1: true }
    }

    pub(crate) const fn permits_signature(self, algorithm: SignatureAlgorithm) -> bool {
        self.allow_sha1 || !algorithm.is_legacy()
    }

    pub(crate) const fn permits_digest(self, algorithm: HashAlgorithm) -> bool {
        self.allow_sha1 || !algorithm.is_legacy()
    }
}

/// Maps a `SignatureMethod` URI.
#[must_use]
pub fn signature_algorithm_from_uri(uri: &str) -> Option<SignatureAlgorithm> {
    match uri {
        signature_algorithms::RSA_SHA256 => Some(SignatureAlgorithm::RsaSha256),
        signature_algorithms::RSA_SHA384 => Some(SignatureAlgorithm::RsaSha384),
        signature_algorithms::RSA_SHA512 => Some(SignatureAlgorithm::RsaSha512),
        signature_algorithms::ECDSA_SHA256 => Some(SignatureAlgorithm::EcdsaP256Sha256),
        signature_algorithms::ECDSA_SHA384 => Some(SignatureAlgorithm::EcdsaP384Sha384),
        signature_algorithms::RSA_SHA1 => Some(SignatureAlgorithm::RsaSha1),
        _ => None,
    }
}

/// Returns the `SignatureMethod` URI of an algorithm.
#[must_use]
pub const fn signature_algorithm_uri(algorithm: SignatureAlgorithm) -> &'static str {
    match algorithm {
        SignatureAlgorithm::RsaSha1 => signature_algorithms::RSA_SHA1,
        SignatureAlgorithm::RsaSha256 => signature_algorithms::RSA_SHA256,
        SignatureAlgorithm::RsaSha384 => signature_algorithms::RSA_SHA384,
        SignatureAlgorithm::RsaSha512 => signature_algorithms::RSA_SHA512,
        SignatureAlgorithm::EcdsaP256Sha256 => signature_algorithms::ECDSA_SHA256,
        SignatureAlgorithm::EcdsaP384Sha384 => signature_algorithms::ECDSA_SHA384,
    }
}

/// Maps a `DigestMethod` URI.
#[must_use]
pub fn digest_algorithm_from_uri(uri: &str) -> Option<HashAlgorithm> {
    match uri {
        digest_algorithms::SHA256 => Some(HashAlgorithm::Sha256),
        digest_algorithms::SHA384 => Some(HashAlgorithm::Sha384),
        digest_algorithms::SHA512 => Some(HashAlgorithm::Sha512),
        digest_algorithms::SHA1 => Some(HashAlgorithm::Sha1),
        _ => None,
    }
}

/// Returns the `DigestMethod` URI of a hash algorithm.
#[must_use]
pub const fn digest_algorithm_uri(algorithm: HashAlgorithm) -> &'static str {
    match algorithm {
        HashAlgorithm::Sha1 => digest_algorithms::SHA1,
        HashAlgorithm::Sha256 => digest_algorithms::SHA256,
        HashAlgorithm::Sha384 => digest_algorithms::SHA384,
        HashAlgorithm::Sha512 => digest_algorithms::SHA512,
    }
}

/// Returns `Some(with_comments)` for the exclusive C14N URIs.
pub(crate) fn exclusive_c14n(uri: &str) -> Option<bool> {
    match uri {
        transform_algorithms::EXCLUSIVE_C14N => Some(false),
        transform_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS => Some(true),
        _ => None,
    }
}
