//! Content decryption for XML Encryption.
//!
//! Cipher data is laid out as `IV || ciphertext` for CBC and
//! `nonce || ciphertext || tag` for GCM.

use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockCipher, BlockDecryptMut, KeyIvInit};

use crate::algorithm::ContentCipher;
use crate::error::{CryptoError, CryptoResult};

const AES_BLOCK: usize = 16;
const GCM_TAG: usize = 16;

/// Decrypts XML-Enc cipher data with the given content key.
///
/// # Errors
///
/// Returns an error if the key length is wrong for the cipher, the data is
/// too short or misaligned, the padding is invalid, or the GCM tag does not
/// authenticate.
pub fn decrypt_content(cipher: ContentCipher, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    if key.len() != cipher.key_len() {
        return Err(CryptoError::InvalidKey(format!(
            "{cipher:?} needs a {}-byte key, got {}",
            cipher.key_len(),
            key.len()
        )));
    }

    let iv_len = cipher.iv_len();
    if data.len() < iv_len {
        return Err(CryptoError::Decryption("cipher data shorter than IV".to_string()));
    }
    let (iv, ciphertext) = data.split_at(iv_len);

    match cipher {
        ContentCipher::Aes128Cbc => cbc_decrypt::<Aes128>(key, iv, ciphertext),
        ContentCipher::Aes192Cbc => cbc_decrypt::<Aes192>(key, iv, ciphertext),
        ContentCipher::Aes256Cbc => cbc_decrypt::<Aes256>(key, iv, ciphertext),
        ContentCipher::Aes128Gcm => {
            let aead = Aes128Gcm::new_from_slice(key)
                .map_err(|_| CryptoError::InvalidKey("AES-128-GCM key".to_string()))?;
            gcm_open(&aead, iv, ciphertext)
        }
        ContentCipher::Aes256Gcm => {
            let aead = Aes256Gcm::new_from_slice(key)
                .map_err(|_| CryptoError::InvalidKey("AES-256-GCM key".to_string()))?;
            gcm_open(&aead, iv, ciphertext)
        }
    }
}

fn gcm_open<A: Aead>(aead: &A, nonce: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    if ciphertext.len() < GCM_TAG {
        return Err(CryptoError::Decryption("cipher data shorter than tag".to_string()));
    }
    aead.decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption("authentication tag mismatch".to_string()))
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>>
where
    C: BlockCipher + BlockDecryptMut,
    cbc::Decryptor<C>: KeyIvInit + BlockDecryptMut,
{
    if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK != 0 {
        return Err(CryptoError::Decryption(
            "ciphertext is not a whole number of blocks".to_string(),
        ));
    }

    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| CryptoError::InvalidKey("CBC key or IV length".to_string()))?;
    let mut buf = ciphertext.to_vec();
    let len = decryptor
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| CryptoError::Decryption("block decryption".to_string()))?
        .len();
    buf.truncate(len);

    strip_padding(buf)
}

// XML-Enc padding: the last octet gives the pad length, the others are arbitrary.
fn strip_padding(mut buf: Vec<u8>) -> CryptoResult<Vec<u8>> {
    let pad = usize::from(buf.last().copied().unwrap_or(0));
    if pad == 0 || pad > AES_BLOCK || pad > buf.len() {
        return Err(CryptoError::Decryption("invalid padding".to_string()));
    }
    buf.truncate(buf.len() - pad);
    Ok(buf)
}
