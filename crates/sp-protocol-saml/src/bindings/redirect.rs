//! HTTP-Redirect binding.
//!
//! Encoding is raw DEFLATE (no zlib header), then base64 without line
//! breaks, then URL-encoding of the query value.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{SamlError, SamlResult};

use super::{DecodedMessage, SamlMessageType};

/// Upper bound on an inflated message.
const MAX_INFLATED_LEN: u64 = 1024 * 1024;

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Deflates and base64-encodes a message. The result is not yet
    /// URL-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Encoding`] if compression fails.
    pub fn encode_message(message: &[u8]) -> SamlResult<String> {
        let compressed = deflate_compress(message)?;
        Ok(STANDARD.encode(compressed))
    }

    /// Reverses [`HttpRedirectBinding::encode_message`].
    ///
    /// Whitespace inside the base64 text is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Encoding`] if the value is not base64 or not a
    /// raw DEFLATE stream.
    pub fn decode_message(encoded: &str) -> SamlResult<Vec<u8>> {
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let compressed = STANDARD.decode(compact)?;
        deflate_decompress(&compressed)
    }

    /// Builds the redirect URL carrying a SAML request.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Encoding`] if compression fails.
    pub fn encode_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        let encoded = Self::encode_message(xml.as_bytes())?;

        let param_name = SamlMessageType::Request.query_param();
        let separator = if destination.contains('?') { '&' } else { '?' };

        let mut url = format!(
            "{destination}{separator}{param_name}={}",
            urlencoding::encode(&encoded)
        );

        if let Some(rs) = relay_state {
            url.push_str("&RelayState=");
            url.push_str(&urlencoding::encode(rs));
        }

        Ok(url)
    }

    /// Recovers the message and RelayState from a redirect URL.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidRequest`] if the URL is malformed or carries
    /// no SAML parameter, and [`SamlError::Encoding`] if the parameter does not
    /// decode to UTF-8 XML text.
    pub fn decode_url(url: &str) -> SamlResult<DecodedMessage> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SamlError::InvalidRequest(format!("invalid URL: {e}")))?;

        let mut message = None;
        let mut relay_state = None;

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "SAMLRequest" => message = Some((SamlMessageType::Request, value.into_owned())),
                "SAMLResponse" => message = Some((SamlMessageType::Response, value.into_owned())),
                "RelayState" => relay_state = Some(value.into_owned()),
                _ => {}
            }
        }

        let (message_type, encoded) = message.ok_or_else(|| {
            SamlError::InvalidRequest("no SAMLRequest or SAMLResponse parameter".to_string())
        })?;

        let xml = String::from_utf8(Self::decode_message(&encoded)?)
            .map_err(|e| SamlError::Encoding(format!("message is not UTF-8: {e}")))?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state,
        })
    }
}

/// Compresses data using DEFLATE (raw, no zlib header).
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompresses raw DEFLATE data, refusing oversized output.
fn deflate_decompress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data).take(MAX_INFLATED_LEN + 1);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    if decompressed.len() as u64 > MAX_INFLATED_LEN {
        return Err(SamlError::Encoding("inflated message too large".to_string()));
    }
    Ok(decompressed)
}
