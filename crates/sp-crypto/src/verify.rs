//! Signature verification.

use aws_lc_rs::signature::{
    self, UnparsedPublicKey, ECDSA_P256_SHA256_FIXED, ECDSA_P384_SHA384_FIXED,
    RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY, RSA_PKCS1_2048_8192_SHA256,
    RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512,
};

use crate::algorithm::SignatureAlgorithm;
use crate::error::CryptoResult;
use crate::keys::{KeyKind, VerificationKey};

/// Verifies `sig` over `data` with the given public key.
///
/// ECDSA signatures are expected in the fixed-width `r || s` form used by
/// XML-DSig. A key whose family does not match the algorithm simply fails
/// verification.
///
/// # Errors
///
/// Currently infallible; the `Result` leaves room for algorithms that need
/// key parsing up front.
pub fn verify_signature(
    key: &VerificationKey,
    algorithm: SignatureAlgorithm,
    data: &[u8],
    sig: &[u8],
) -> CryptoResult<bool> {
    let expected_kind = if algorithm.is_rsa() {
        KeyKind::Rsa
    } else {
        KeyKind::Ec
    };
    if key.kind() != expected_kind {
        tracing::debug!(key_id = key.key_id(), ?algorithm, "key family does not match algorithm");
        return Ok(false);
    }

    let verification_alg: &dyn signature::VerificationAlgorithm = match algorithm {
        SignatureAlgorithm::RsaSha1 => &RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
        SignatureAlgorithm::RsaSha256 => &RSA_PKCS1_2048_8192_SHA256,
        SignatureAlgorithm::RsaSha384 => &RSA_PKCS1_2048_8192_SHA384,
        SignatureAlgorithm::RsaSha512 => &RSA_PKCS1_2048_8192_SHA512,
        SignatureAlgorithm::EcdsaP256Sha256 => &ECDSA_P256_SHA256_FIXED,
        SignatureAlgorithm::EcdsaP384Sha384 => &ECDSA_P384_SHA384_FIXED,
    };

    let public_key = UnparsedPublicKey::new(verification_alg, key.key_bytes());
    Ok(public_key.verify(data, sig).is_ok())
}
