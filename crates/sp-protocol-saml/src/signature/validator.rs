//! XML Signature verification.
//!
//! Verifies a profile-checked [`SignedObject`] against the signing keys of a
//! [`TrustAnchor`]. The outcome is a plain boolean: a signature that does not
//! verify is a normal negative result, not an error.

use sp_crypto::{digest_matches, verify_signature};

use super::{SignaturePolicy, SignedObject};
use crate::error::{SamlError, SamlResult};
use crate::metadata::TrustAnchor;
use crate::xml::{Element, ExclusiveC14n, NsDecl};

/// XML signature validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureValidator {
    policy: SignaturePolicy,
}

impl SignatureValidator {
    /// Creates a validator with the given algorithm policy.
    #[must_use]
    pub const fn new(policy: SignaturePolicy) -> Self {
        Self { policy }
    }

    /// The algorithm policy applied by [`SignedObject::locate`].
    #[must_use]
    pub const fn policy(&self) -> SignaturePolicy {
        self.policy
    }

    /// Verifies `signed`, an object inside the document rooted at `document`.
    ///
    /// The reference digest is recomputed over the object with its signature
    /// left out, then `SignedInfo` is verified against each signing key of
    /// `trust` in turn.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidSignatureFormat`] if `signed` does not
    /// belong to `document`. A signature that fails to verify yields
    /// `Ok(false)`.
    pub fn verify(
        &self,
        document: &Element,
        signed: &SignedObject<'_>,
        trust: &TrustAnchor,
    ) -> SamlResult<bool> {
        let object_scope = scope_in(document, signed.object)?;
        let referenced = ExclusiveC14n::new()
            .inclusive_prefixes(signed.reference_prefixes.iter().cloned())
            .excluding(signed.signature)
            .canonicalize(signed.object, &object_scope);

        if !digest_matches(
            signed.digest_algorithm,
            referenced.as_bytes(),
            &signed.digest_value,
        ) {
            tracing::info!(
                issuer = trust.entity_id(),
                element = %signed.object.local,
                "reference digest mismatch"
            );
            return Ok(false);
        }

        let signed_info_scope = scope_in(document, signed.signed_info)?;
        let signed_info = ExclusiveC14n::new()
            .with_comments(signed.c14n_with_comments)
            .inclusive_prefixes(signed.c14n_prefixes.iter().cloned())
            .canonicalize(signed.signed_info, &signed_info_scope);

        let mut tried = 0usize;
        for key in trust.signing_keys() {
            tried += 1;
            if verify_signature(
                key,
                signed.signature_algorithm,
                signed_info.as_bytes(),
                &signed.signature_value,
            )? {
                tracing::debug!(
                    issuer = trust.entity_id(),
                    key_id = key.key_id(),
                    "signature verified"
                );
                return Ok(true);
            }
        }

        if tried == 0 {
            tracing::warn!(
                issuer = trust.entity_id(),
                "no signing keys in metadata; signature cannot verify"
            );
        } else {
            tracing::info!(
                issuer = trust.entity_id(),
                keys = tried,
                "signature did not verify with any metadata key"
            );
        }
        Ok(false)
    }
}

fn scope_in(document: &Element, node: &Element) -> SamlResult<Vec<NsDecl>> {
    document.scope_of(node).ok_or_else(|| {
        SamlError::InvalidSignatureFormat("signed element is not part of the document".to_string())
    })
}
