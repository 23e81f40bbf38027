//! SAML Response validation.
//!
//! A response is checked in a fixed order: parse, locate the signature,
//! check it against the signature profile, resolve the issuer's trust
//! anchor, verify. Only the last step can produce a negative verdict; every
//! earlier failure is an error.
//!
//! The signature is taken from the first place that has one:
//!
//! 1. the `Response` itself,
//! 2. its plaintext `Assertion`,
//! 3. the decrypted `EncryptedAssertion`, when there is no plaintext one.
//!
//! Without a Response signature, a signed assertion covers only itself, so
//! the response must carry exactly one assertion, plaintext or encrypted.

use std::sync::Arc;

use crate::encryption::AssertionDecryptor;
use crate::error::{SamlError, SamlResult};
use crate::metadata::MetadataStore;
use crate::signature::{SignaturePolicy, SignatureValidator, SignedObject};
use crate::types::{ServiceProviderIdentity, SAMLP_NS, SAML_NS};
use crate::xml::{self, Element};

/// Outcome of cryptographic signature verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureVerdict {
    /// The signature verifies with a signing key of the issuer.
    Valid,
    /// Well-formed, but does not verify.
    Invalid,
}

impl SignatureVerdict {
    /// `true` for [`SignatureVerdict::Valid`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl From<bool> for SignatureVerdict {
    fn from(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }
}

/// Result of [`ResponseValidator::validate_and_decrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedResponse {
    /// Signature verdict.
    pub verdict: SignatureVerdict,
    /// The decrypted assertion, only when the verdict is valid.
    pub assertion: Option<String>,
}

/// Validates signed responses against IdP metadata and decrypts their
/// assertions with the SP key.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    metadata: Arc<MetadataStore>,
    sp: ServiceProviderIdentity,
    signatures: SignatureValidator,
}

/// Where the signature was found.
enum Located {
    Response,
    Assertion,
    Decrypted(Element),
}

impl ResponseValidator {
    /// Creates a validator.
    #[must_use]
    pub fn new(
        metadata: Arc<MetadataStore>,
        sp: ServiceProviderIdentity,
        policy: SignaturePolicy,
    ) -> Self {
        Self {
            metadata,
            sp,
            signatures: SignatureValidator::new(policy),
        }
    }

    /// The metadata this validator trusts.
    #[must_use]
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    fn decryptor(&self) -> AssertionDecryptor<'_> {
        AssertionDecryptor::new(self.sp.decryption_key())
    }

    /// Verifies the signature of a SAML Response.
    ///
    /// # Errors
    ///
    /// - [`SamlError::XmlParse`] if the document does not parse.
    /// - [`SamlError::InvalidRequest`] if the root is not a `samlp:Response`,
    ///   or an unsigned response carries more than one assertion.
    /// - [`SamlError::MissingSignature`] if no signature can be located.
    /// - [`SamlError::InvalidSignatureFormat`] for profile violations.
    /// - [`SamlError::UnknownIdp`] if the issuer has no metadata.
    /// - Decryption errors if the signature sits inside an encrypted
    ///   assertion that cannot be decrypted.
    ///
    /// A signature that does not verify is `Ok(SignatureVerdict::Invalid)`.
    pub fn validate_signature(&self, response_xml: &str) -> SamlResult<SignatureVerdict> {
        let root = xml::parse(response_xml)?;
        self.check(&root).map(|(verdict, _)| verdict)
    }

    /// Verifies the signature and, when valid, decrypts the assertion.
    ///
    /// An invalid verdict carries no assertion and nothing is decrypted.
    ///
    /// # Errors
    ///
    /// Everything [`validate_signature`](Self::validate_signature) returns,
    /// plus [`SamlError::MissingEncryptedAssertion`] and
    /// [`SamlError::DecryptionFailed`] from the decryption step.
    pub fn validate_and_decrypt(&self, response_xml: &str) -> SamlResult<ValidatedResponse> {
        let root = xml::parse(response_xml)?;
        let (verdict, located) = self.check(&root)?;
        if !verdict.is_valid() {
            return Ok(ValidatedResponse {
                verdict,
                assertion: None,
            });
        }

        let assertion = match located {
            Located::Response => self.decryptor().decrypt(&root)?,
            // The signed assertion is the only one and it is plaintext.
            Located::Assertion => return Err(SamlError::MissingEncryptedAssertion(0)),
            Located::Decrypted(mut assertion) => {
                self.decryptor().normalize(&mut assertion)?;
                assertion
            }
        };
        Ok(ValidatedResponse {
            verdict,
            assertion: Some(assertion.to_xml()),
        })
    }

    /// Decrypts the single encrypted assertion of a response without
    /// checking any signature.
    ///
    /// # Errors
    ///
    /// [`SamlError::XmlParse`], [`SamlError::MissingEncryptedAssertion`] or
    /// [`SamlError::DecryptionFailed`].
    pub fn decrypt(&self, response_xml: &str) -> SamlResult<String> {
        let root = xml::parse(response_xml)?;
        Ok(self.decryptor().decrypt(&root)?.to_xml())
    }

    fn check(&self, root: &Element) -> SamlResult<(SignatureVerdict, Located)> {
        if !root.is(SAMLP_NS, "Response") {
            return Err(SamlError::InvalidRequest(format!(
                "expected samlp:Response, found {}",
                root.qname()
            )));
        }

        if SignedObject::signature_of(root).is_some() {
            tracing::debug!(id = root.id(), "verifying Response signature");
            let verdict = self.verify(root, root, true, asserting_issuer(root, None))?;
            return Ok((verdict, Located::Response));
        }

        let mut assertions = root.children_named(SAML_NS, "Assertion");
        let plaintext = assertions.next();
        let encrypted = root.children_named(SAML_NS, "EncryptedAssertion").count();
        if assertions.next().is_some() || (plaintext.is_some() && encrypted > 0) {
            tracing::warn!(id = root.id(), "unsigned response with several assertions");
            return Err(SamlError::InvalidRequest(
                "unsigned response carries more than one assertion".to_string(),
            ));
        }

        if let Some(assertion) = plaintext {
            tracing::debug!(id = assertion.id(), "verifying Assertion signature");
            let issuer = asserting_issuer(root, Some(assertion));
            let verdict = self.verify(root, assertion, false, issuer)?;
            return Ok((verdict, Located::Assertion));
        }

        if encrypted > 0 {
            let assertion = self.decryptor().decrypt_assertion(root)?;
            tracing::debug!(id = assertion.id(), "verifying decrypted Assertion signature");
            let issuer = asserting_issuer(root, Some(&assertion));
            let verdict = self.verify(&assertion, &assertion, true, issuer)?;
            return Ok((verdict, Located::Decrypted(assertion)));
        }

        Err(SamlError::MissingSignature)
    }

    fn verify(
        &self,
        document: &Element,
        object: &Element,
        is_document_root: bool,
        issuer: Option<String>,
    ) -> SamlResult<SignatureVerdict> {
        let signed = SignedObject::locate(object, is_document_root, self.signatures.policy())
            .inspect_err(|e| tracing::warn!(error = %e, "signature rejected"))?;

        let issuer = issuer
            .ok_or_else(|| SamlError::UnknownIdp("response carries no Issuer".to_string()))?;
        let descriptor = self.metadata.lookup(&issuer).inspect_err(|_| {
            tracing::warn!(issuer = %issuer, "response from issuer without metadata");
        })?;

        let valid = self.signatures.verify(document, &signed, &descriptor.trust)?;
        Ok(valid.into())
    }
}

/// The Response's Issuer, falling back to the Assertion's.
fn asserting_issuer(response: &Element, assertion: Option<&Element>) -> Option<String> {
    let issuer_of = |e: &Element| {
        e.child(SAML_NS, "Issuer")
            .map(|i| i.text().trim().to_string())
            .filter(|s| !s.is_empty())
    };
    issuer_of(response).or_else(|| assertion.and_then(issuer_of))
}
