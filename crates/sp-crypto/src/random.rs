//! Cryptographically secure random generation.
//!
//! Used for protocol message identifiers, which must be unpredictable so a
//! response cannot be correlated with a guessed request.

use rand::Rng;

/// Generates a cryptographically secure random byte array.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates `len` random bytes and returns them as lowercase hex.
///
/// The returned string is `2 * len` characters long.
#[must_use]
pub fn random_hex(len: usize) -> String {
    hex::encode(random_bytes(len))
}
