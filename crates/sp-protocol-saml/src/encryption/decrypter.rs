//! Decryption of encrypted assertions, identifiers and attributes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sp_crypto::{decrypt_content, DecryptionKey};

use super::{content_cipher_from_uri, key_transport_from_method};
use crate::error::{SamlError, SamlResult};
use crate::metadata::strip_whitespace;
use crate::types::{encryption_algorithms, SAML_NS, XMLDSIG_NS, XMLENC_NS};
use crate::xml::{self, Element, Node, NsDecl};

/// Decrypts `EncryptedAssertion` elements with the SP private key.
#[derive(Debug, Clone, Copy)]
pub struct AssertionDecryptor<'k> {
    key: Option<&'k DecryptionKey>,
}

impl<'k> AssertionDecryptor<'k> {
    /// Creates a decryptor. Without a key every decryption fails.
    #[must_use]
    pub const fn new(key: Option<&'k DecryptionKey>) -> Self {
        Self { key }
    }

    /// Decrypts the single `EncryptedAssertion` of `response` and replaces
    /// any `EncryptedID` and `EncryptedAttribute` inside it with their
    /// plaintext.
    ///
    /// `response` must be the document root.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MissingEncryptedAssertion`] unless exactly one
    /// `EncryptedAssertion` is present, and [`SamlError::DecryptionFailed`]
    /// if no key is configured or anything cannot be decrypted.
    pub fn decrypt(&self, response: &Element) -> SamlResult<Element> {
        let mut assertion = self.decrypt_assertion(response)?;
        self.normalize(&mut assertion)?;
        Ok(assertion)
    }

    /// Decrypts the single `EncryptedAssertion` of `response` without
    /// touching its contents.
    ///
    /// The result is self-contained: the namespace bindings in scope at the
    /// encrypted element are declared on it.
    ///
    /// # Errors
    ///
    /// Same as [`decrypt`](Self::decrypt).
    pub fn decrypt_assertion(&self, response: &Element) -> SamlResult<Element> {
        let encrypted: Vec<&Element> = response
            .children_named(SAML_NS, "EncryptedAssertion")
            .collect();
        let [container] = encrypted.as_slice() else {
            tracing::warn!(
                count = encrypted.len(),
                "response must carry exactly one EncryptedAssertion"
            );
            return Err(SamlError::MissingEncryptedAssertion(encrypted.len()));
        };

        let scope = response.scope_of(container).unwrap_or_default();
        self.decrypt_element(container, &scope, &["Assertion"])
    }

    /// Replaces `Subject/EncryptedID` with the decrypted `NameID` or `BaseID`
    /// in place, and moves decrypted attributes of every `AttributeStatement`
    /// after its plaintext ones.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::DecryptionFailed`] if any part cannot be
    /// decrypted.
    pub fn normalize(&self, assertion: &mut Element) -> SamlResult<()> {
        let assertion_scope = assertion.ns_decls.clone();

        if let Some(subject) = assertion.child_mut(SAML_NS, "Subject") {
            let mut scope = assertion_scope.clone();
            scope.extend(subject.ns_decls.iter().cloned());
            for node in &mut subject.children {
                if let Node::Element(encrypted_id) = node {
                    if encrypted_id.is(SAML_NS, "EncryptedID") {
                        let mut inner = scope.clone();
                        inner.extend(encrypted_id.ns_decls.iter().cloned());
                        let decrypted =
                            self.decrypt_element(encrypted_id, &inner, &["NameID", "BaseID"])?;
                        *node = Node::Element(decrypted);
                        break;
                    }
                }
            }
        }

        for statement in assertion
            .child_elements_mut()
            .filter(|e| e.is(SAML_NS, "AttributeStatement"))
        {
            let mut scope = assertion_scope.clone();
            scope.extend(statement.ns_decls.iter().cloned());

            let mut decrypted = Vec::new();
            let mut kept = Vec::with_capacity(statement.children.len());
            for node in std::mem::take(&mut statement.children) {
                match node {
                    Node::Element(e) if e.is(SAML_NS, "EncryptedAttribute") => {
                        let mut inner = scope.clone();
                        inner.extend(e.ns_decls.iter().cloned());
                        decrypted.push(self.decrypt_element(&e, &inner, &["Attribute"])?);
                    }
                    other => kept.push(other),
                }
            }
            kept.extend(decrypted.into_iter().map(Node::Element));
            statement.children = kept;
        }
        Ok(())
    }

    /// Decrypts the `EncryptedData` inside `container` and checks that the
    /// result is a SAML assertion-namespace element named one of `expected`.
    ///
    /// `scope` holds the namespace bindings in scope at `container`.
    fn decrypt_element(
        &self,
        container: &Element,
        scope: &[NsDecl],
        expected: &[&str],
    ) -> SamlResult<Element> {
        let key = self.key.ok_or_else(|| {
            SamlError::DecryptionFailed("no SP private key configured".to_string())
        })?;

        let data = container
            .child(XMLENC_NS, "EncryptedData")
            .ok_or_else(|| failed(&format!("{} has no EncryptedData", container.local)))?;
        if let Some(kind) = data.attr("Type") {
            if kind != encryption_algorithms::TYPE_ELEMENT {
                return Err(failed(&format!("EncryptedData Type {kind} not supported")));
            }
        }

        let cipher_uri = data
            .child(XMLENC_NS, "EncryptionMethod")
            .and_then(|m| m.attr("Algorithm"))
            .ok_or_else(|| failed("EncryptedData has no EncryptionMethod"))?;
        let cipher = content_cipher_from_uri(cipher_uri)
            .ok_or_else(|| failed(&format!("content encryption {cipher_uri} not supported")))?;
        let cipher_data = cipher_value(data)?;

        let inline_keys = data
            .child(XMLDSIG_NS, "KeyInfo")
            .into_iter()
            .flat_map(|ki| ki.children_named(XMLENC_NS, "EncryptedKey"));
        let sibling_keys = container.children_named(XMLENC_NS, "EncryptedKey");

        let mut plaintext = None;
        for encrypted_key in inline_keys.chain(sibling_keys) {
            match unwrap_and_decrypt(key, encrypted_key, cipher, &cipher_data) {
                Ok(bytes) => {
                    plaintext = Some(bytes);
                    break;
                }
                Err(e) => tracing::debug!(error = %e, "EncryptedKey did not decrypt"),
            }
        }
        let plaintext = plaintext.ok_or_else(|| failed("no EncryptedKey could be decrypted"))?;

        let text = String::from_utf8(plaintext)
            .map_err(|_| failed("decrypted content is not UTF-8"))?;
        let mut inherited = scope.to_vec();
        inherited.extend(data.ns_decls.iter().cloned());
        let element = xml::parse_fragment(&text, &inherited)
            .map_err(|e| failed(&format!("decrypted content: {e}")))?;

        if !expected.iter().any(|local| element.is(SAML_NS, local)) {
            return Err(failed(&format!(
                "decrypted {} where {} was expected",
                element.qname(),
                expected.join(" or ")
            )));
        }
        Ok(element)
    }
}

fn unwrap_and_decrypt(
    key: &DecryptionKey,
    encrypted_key: &Element,
    cipher: sp_crypto::ContentCipher,
    cipher_data: &[u8],
) -> SamlResult<Vec<u8>> {
    let method = encrypted_key
        .child(XMLENC_NS, "EncryptionMethod")
        .ok_or_else(|| failed("EncryptedKey has no EncryptionMethod"))?;
    let transport = key_transport_from_method(method)?;
    let wrapped = cipher_value(encrypted_key)?;
    let content_key = key
        .unwrap_key(transport, &wrapped)
        .map_err(|e| failed(&e.to_string()))?;
    decrypt_content(cipher, &content_key, cipher_data).map_err(|e| failed(&e.to_string()))
}

fn cipher_value(el: &Element) -> SamlResult<Vec<u8>> {
    let value = el
        .child(XMLENC_NS, "CipherData")
        .and_then(|d| d.child(XMLENC_NS, "CipherValue"))
        .ok_or_else(|| failed(&format!("{} has no CipherValue", el.local)))?;
    STANDARD
        .decode(strip_whitespace(&value.text()))
        .map_err(|e| failed(&format!("CipherValue: {e}")))
}

fn failed(msg: &str) -> SamlError {
    SamlError::DecryptionFailed(msg.to_string())
}
