//! SAML signature profile checks.
//!
//! A signature is usable only if it is an enveloped signature over its
//! parent with exactly one same-document reference, exclusive C14N, and
//! algorithms allowed by the policy. Everything else is refused before any
//! key is touched.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sp_crypto::{HashAlgorithm, SignatureAlgorithm};

use super::{digest_algorithm_from_uri, exclusive_c14n, signature_algorithm_from_uri, SignaturePolicy};
use crate::error::{SamlError, SamlResult};
use crate::metadata::strip_whitespace;
use crate::types::{transform_algorithms, EXC_C14N_NS, XMLDSIG_NS};
use crate::xml::Element;

/// A SAML object together with its checked enveloped signature.
#[derive(Debug, Clone)]
pub struct SignedObject<'a> {
    /// The signed Response or Assertion.
    pub object: &'a Element,
    /// Its `ds:Signature` child.
    pub signature: &'a Element,
    /// The `ds:SignedInfo` inside the signature.
    pub signed_info: &'a Element,
    /// `SignatureMethod`.
    pub signature_algorithm: SignatureAlgorithm,
    /// `CanonicalizationMethod` keeps comments.
    pub c14n_with_comments: bool,
    /// `InclusiveNamespaces` prefixes of the `CanonicalizationMethod`.
    pub c14n_prefixes: Vec<String>,
    /// `DigestMethod` of the single reference.
    pub digest_algorithm: HashAlgorithm,
    /// `InclusiveNamespaces` prefixes of the reference's C14N transform.
    pub reference_prefixes: Vec<String>,
    /// Decoded `DigestValue`.
    pub digest_value: Vec<u8>,
    /// Decoded `SignatureValue`.
    pub signature_value: Vec<u8>,
}

impl<'a> SignedObject<'a> {
    /// Returns the `ds:Signature` child of `object`, if any.
    #[must_use]
    pub fn signature_of(object: &Element) -> Option<&Element> {
        object.child(XMLDSIG_NS, "Signature")
    }

    /// Reads and checks the enveloped signature of `object`.
    ///
    /// `is_document_root` tells whether `object` is the root of its document,
    /// the only case in which an empty reference URI is acceptable.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MissingSignature`] if `object` carries no
    /// signature and [`SamlError::InvalidSignatureFormat`] for any profile
    /// violation.
    pub fn locate(
        object: &'a Element,
        is_document_root: bool,
        policy: SignaturePolicy,
    ) -> SamlResult<Self> {
        let mut signatures = object.children_named(XMLDSIG_NS, "Signature");
        let signature = signatures.next().ok_or(SamlError::MissingSignature)?;
        if signatures.next().is_some() {
            return Err(format_error("more than one Signature on the signed element"));
        }

        let signed_info = only_child(signature, "SignedInfo")?;

        let c14n_method = only_child(signed_info, "CanonicalizationMethod")?;
        let c14n_uri = algorithm(c14n_method)?;
        let c14n_with_comments = exclusive_c14n(c14n_uri).ok_or_else(|| {
            format_error(&format!("canonicalization method {c14n_uri} not allowed"))
        })?;
        let c14n_prefixes = inclusive_prefixes(c14n_method);

        let signature_uri = algorithm(only_child(signed_info, "SignatureMethod")?)?;
        let signature_algorithm = signature_algorithm_from_uri(signature_uri)
            .filter(|alg| policy.permits_signature(*alg))
            .ok_or_else(|| {
                format_error(&format!("signature method {signature_uri} not allowed"))
            })?;

        let mut references = signed_info.children_named(XMLDSIG_NS, "Reference");
        let reference = references
            .next()
            .ok_or_else(|| format_error("SignedInfo has no Reference"))?;
        if references.next().is_some() {
            return Err(format_error("SignedInfo has more than one Reference"));
        }
        check_reference_uri(reference, object, is_document_root)?;
        let reference_prefixes = check_transforms(reference)?;

        let digest_uri = algorithm(only_child(reference, "DigestMethod")?)?;
        let digest_algorithm = digest_algorithm_from_uri(digest_uri)
            .filter(|alg| policy.permits_digest(*alg))
            .ok_or_else(|| format_error(&format!("digest method {digest_uri} not allowed")))?;

        let digest_value = decode_value(only_child(reference, "DigestValue")?, "DigestValue")?;
        let signature_value =
            decode_value(only_child(signature, "SignatureValue")?, "SignatureValue")?;

        Ok(Self {
            object,
            signature,
            signed_info,
            signature_algorithm,
            c14n_with_comments,
            c14n_prefixes,
            digest_algorithm,
            reference_prefixes,
            digest_value,
            signature_value,
        })
    }
}

fn check_reference_uri(
    reference: &Element,
    object: &Element,
    is_document_root: bool,
) -> SamlResult<()> {
    let uri = reference.attr("URI").unwrap_or_default();
    match (uri.strip_prefix('#'), object.id()) {
        (Some(target), Some(id)) if target == id => Ok(()),
        (Some(target), _) => Err(format_error(&format!(
            "Reference URI #{target} does not point at the signed element"
        ))),
        (None, None) if uri.is_empty() && is_document_root => Ok(()),
        (None, _) if uri.is_empty() => Err(format_error(
            "empty Reference URI is only allowed on a document root without ID",
        )),
        (None, _) => Err(format_error(&format!("Reference URI {uri} is not same-document"))),
    }
}

/// Requires exactly the enveloped-signature and exclusive C14N transforms and
/// returns the C14N transform's inclusive prefixes.
fn check_transforms(reference: &Element) -> SamlResult<Vec<String>> {
    let transforms: Vec<&Element> = reference
        .child(XMLDSIG_NS, "Transforms")
        .map(|t| t.children_named(XMLDSIG_NS, "Transform").collect())
        .unwrap_or_default();
    if transforms.len() > 2 {
        return Err(format_error("too many Reference transforms"));
    }

    let mut enveloped = false;
    let mut c14n_prefixes = None;
    for transform in transforms {
        let uri = algorithm(transform)?;
        if uri == transform_algorithms::ENVELOPED_SIGNATURE && !enveloped {
            enveloped = true;
        } else if exclusive_c14n(uri).is_some() && c14n_prefixes.is_none() {
            c14n_prefixes = Some(inclusive_prefixes(transform));
        } else {
            return Err(format_error(&format!("transform {uri} not allowed")));
        }
    }

    if !enveloped {
        return Err(format_error("enveloped-signature transform missing"));
    }
    c14n_prefixes.ok_or_else(|| format_error("exclusive canonicalization transform missing"))
}

fn inclusive_prefixes(method: &Element) -> Vec<String> {
    method
        .child(EXC_C14N_NS, "InclusiveNamespaces")
        .and_then(|ns| ns.attr("PrefixList"))
        .map(|list| list.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn only_child<'e>(parent: &'e Element, local: &'static str) -> SamlResult<&'e Element> {
    let mut found = parent.children_named(XMLDSIG_NS, local);
    match (found.next(), found.next()) {
        (Some(child), None) => Ok(child),
        (None, _) => Err(format_error(&format!("{} has no {local}", parent.local))),
        (Some(_), Some(_)) => Err(format_error(&format!(
            "{} has more than one {local}",
            parent.local
        ))),
    }
}

fn algorithm(method: &Element) -> SamlResult<&str> {
    method
        .attr("Algorithm")
        .ok_or_else(|| format_error(&format!("{} has no Algorithm", method.local)))
}

fn decode_value(el: &Element, what: &str) -> SamlResult<Vec<u8>> {
    let value = STANDARD
        .decode(strip_whitespace(&el.text()))
        .map_err(|e| format_error(&format!("{what} is not base64: {e}")))?;
    if value.is_empty() {
        return Err(format_error(&format!("{what} is empty")));
    }
    Ok(value)
}

fn format_error(msg: &str) -> SamlError {
    SamlError::InvalidSignatureFormat(msg.to_string())
}
