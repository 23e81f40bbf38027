//! Hash functions.

use crate::algorithm::HashAlgorithm;
use aws_lc_rs::{constant_time, digest};

/// Computes a digest of the input data.
#[must_use]
pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    let alg = match algorithm {
        HashAlgorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
        HashAlgorithm::Sha256 => &digest::SHA256,
        HashAlgorithm::Sha384 => &digest::SHA384,
        HashAlgorithm::Sha512 => &digest::SHA512,
    };

    digest::digest(alg, data).as_ref().to_vec()
}

/// Computes a SHA-256 digest of the input data.
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest(HashAlgorithm::Sha256, data)
}

/// Returns true if `expected` is the digest of `data`.
///
/// The comparison runs in constant time.
#[must_use]
pub fn digest_matches(algorithm: HashAlgorithm, data: &[u8], expected: &[u8]) -> bool {
    constant_time::verify_slices_are_equal(&digest(algorithm, data), expected).is_ok()
}
