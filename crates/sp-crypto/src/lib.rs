//! # sp-crypto
//!
//! Cryptographic operations for the SAML service provider.
//!
//! Digests and signature verification go through aws-lc-rs. Key transport
//! and content decryption for XML Encryption use the RustCrypto `rsa`,
//! `aes`, `cbc` and `aes-gcm` crates.
//!
//! ## Legacy algorithms
//!
//! SHA-1 and RSA-SHA1 are supported for interoperability with older
//! identity providers. Whether they are accepted is a policy decision made
//! by the protocol layer, not by this crate.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod cipher;
pub mod error;
pub mod hash;
pub mod keys;
pub mod random;
pub mod verify;

pub use algorithm::{ContentCipher, HashAlgorithm, KeyTransportAlgorithm, SignatureAlgorithm};
pub use cipher::decrypt_content;
pub use error::{CryptoError, CryptoResult};
pub use hash::{digest, digest_matches, sha256};
pub use keys::{certificate_der_from_pem, DecryptionKey, KeyKind, VerificationKey};
pub use random::{random_bytes, random_hex};
pub use verify::verify_signature;
