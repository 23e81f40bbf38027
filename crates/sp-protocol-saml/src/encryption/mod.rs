//! XML Encryption support for SAML.
//!
//! Assertions, identifiers and attributes arrive as `xenc:EncryptedData`
//! whose content key is wrapped under the SP's RSA key in an
//! `xenc:EncryptedKey`. Only the SP private key is ever used to unwrap.
//!
//! # Algorithms
//!
//! Key transport: `rsa-oaep-mgf1p`, xmlenc 1.1 `rsa-oaep` and `rsa-1_5`.
//! Content: AES-CBC (128/192/256) and AES-GCM (128/256).

mod decrypter;

pub use decrypter::AssertionDecryptor;

use sp_crypto::{ContentCipher, HashAlgorithm, KeyTransportAlgorithm};

use crate::error::{SamlError, SamlResult};
use crate::signature::digest_algorithm_from_uri;
use crate::types::{encryption_algorithms, XMLDSIG_NS, XMLENC11_NS, XMLENC_NS};
use crate::xml::Element;

/// Maps a content `EncryptionMethod` URI.
#[must_use]
pub fn content_cipher_from_uri(uri: &str) -> Option<ContentCipher> {
    match uri {
        encryption_algorithms::AES128_CBC => Some(ContentCipher::Aes128Cbc),
        encryption_algorithms::AES192_CBC => Some(ContentCipher::Aes192Cbc),
        encryption_algorithms::AES256_CBC => Some(ContentCipher::Aes256Cbc),
        encryption_algorithms::AES128_GCM => Some(ContentCipher::Aes128Gcm),
        encryption_algorithms::AES256_GCM => Some(ContentCipher::Aes256Gcm),
        _ => None,
    }
}

/// Reads the key transport algorithm from an `EncryptedKey/EncryptionMethod`.
///
/// For RSA-OAEP the digest defaults to SHA-1 and, for the xmlenc 1.1 form,
/// the MGF to MGF1-SHA1.
///
/// # Errors
///
/// Returns [`SamlError::DecryptionFailed`] for unknown algorithms and for
/// non-empty `OAEPparams`.
pub fn key_transport_from_method(method: &Element) -> SamlResult<KeyTransportAlgorithm> {
    let uri = method
        .attr("Algorithm")
        .ok_or_else(|| unsupported("EncryptionMethod without Algorithm"))?;

    if uri == encryption_algorithms::RSA_1_5 {
        return Ok(KeyTransportAlgorithm::RsaPkcs1v15);
    }

    let mgf = match uri {
        encryption_algorithms::RSA_OAEP_MGF1P => HashAlgorithm::Sha1,
        encryption_algorithms::RSA_OAEP => match method
            .child(XMLENC11_NS, "MGF")
            .and_then(|m| m.attr("Algorithm"))
        {
            None | Some(encryption_algorithms::MGF1_SHA1) => HashAlgorithm::Sha1,
            Some(encryption_algorithms::MGF1_SHA256) => HashAlgorithm::Sha256,
            Some(other) => return Err(unsupported(&format!("MGF {other}"))),
        },
        other => return Err(unsupported(&format!("key transport {other}"))),
    };

    if method
        .child(XMLENC_NS, "OAEPparams")
        .is_some_and(|p| !p.text().trim().is_empty())
    {
        return Err(unsupported("OAEPparams"));
    }

    let digest = match method
        .child(XMLDSIG_NS, "DigestMethod")
        .and_then(|d| d.attr("Algorithm"))
    {
        None => HashAlgorithm::Sha1,
        Some(uri) => digest_algorithm_from_uri(uri)
            .ok_or_else(|| unsupported(&format!("OAEP digest {uri}")))?,
    };

    Ok(KeyTransportAlgorithm::RsaOaep { digest, mgf })
}

fn unsupported(what: &str) -> SamlError {
    SamlError::DecryptionFailed(format!("unsupported {what}"))
}
