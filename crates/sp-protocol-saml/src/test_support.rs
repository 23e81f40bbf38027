//! Fixtures shared by unit tests: fixture keys, a signer over the crate's
//! own canonicalization, and an XML-Enc encryptor with a pre-wrapped key.

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockEncryptMut, KeyIvInit};
use sp_crypto::{certificate_der_from_pem, sha256, DecryptionKey, VerificationKey};

use crate::metadata::{Credential, CredentialUsage, TrustAnchor};
use crate::types::{
    digest_algorithms, encryption_algorithms, signature_algorithms, transform_algorithms,
    SAML_NS, XMLDSIG_NS, XMLENC_NS,
};
use crate::xml::{self, Element, ExclusiveC14n, Node};

pub(crate) const IDP_A_KEY: &[u8] = include_bytes!("../../../tests/integration/fixtures/idp-a-key.pk8");
const IDP_A_CERT: &[u8] = include_bytes!("../../../tests/integration/fixtures/idp-a-cert.pem");
const IDP_B_CERT: &[u8] = include_bytes!("../../../tests/integration/fixtures/idp-b-cert.pem");
const SP_KEY: &[u8] = include_bytes!("../../../tests/integration/fixtures/sp-key.pk8");
const WRAPPED_K128: &str = include_str!("../../../tests/integration/fixtures/wrapped-aes128-oaep.b64");

pub(crate) const ASSERTION: &str = r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="a1" Version="2.0" IssueInstant="2024-01-01T00:00:00.000Z"><saml:Issuer>idp-a</saml:Issuer><saml:Subject><saml:NameID>user-42</saml:NameID></saml:Subject><saml:AttributeStatement><saml:Attribute Name="mail"><saml:AttributeValue>user@example.org</saml:AttributeValue></saml:Attribute></saml:AttributeStatement></saml:Assertion>"#;

pub(crate) fn sp_key() -> DecryptionKey {
    DecryptionKey::from_bytes(SP_KEY).unwrap()
}

fn trust(entity_id: &str, cert_pem: &[u8]) -> TrustAnchor {
    let der = certificate_der_from_pem(cert_pem).unwrap();
    TrustAnchor::new(
        entity_id,
        vec![Credential {
            usage: CredentialUsage::Signing,
            key: VerificationKey::from_certificate_der(&der).unwrap(),
        }],
    )
}

pub(crate) fn idp_a_trust() -> TrustAnchor {
    trust("idp-a", IDP_A_CERT)
}

pub(crate) fn idp_b_trust() -> TrustAnchor {
    trust("idp-b", IDP_B_CERT)
}

/// Metadata document for an IdP using the idp-a certificate.
pub(crate) fn idp_metadata(entity_id: &str) -> String {
    let cert = STANDARD.encode(certificate_der_from_pem(IDP_A_CERT).unwrap());
    format!(
        r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" entityID="{entity_id}">
  <md:IDPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
    <md:KeyDescriptor use="signing"><ds:KeyInfo><ds:X509Data><ds:X509Certificate>{cert}</ds:X509Certificate></ds:X509Data></ds:KeyInfo></md:KeyDescriptor>
    <md:SingleLogoutService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example/slo"/>
    <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example/sso"/>
  </md:IDPSSODescriptor>
</md:EntityDescriptor>"#
    )
}

/// Signs the element with `ID="id"` using the idp-a key.
pub(crate) fn sign(xml_text: &str, id: &str) -> String {
    sign_with(xml_text, id, IDP_A_KEY)
}

/// Inserts an enveloped RSA-SHA256 signature after the element's Issuer.
pub(crate) fn sign_with(xml_text: &str, id: &str, pkcs8: &[u8]) -> String {
    let mut root = xml::parse(xml_text).unwrap();
    let digest = {
        let object = find_by_id(&root, id);
        let scope = root.scope_of(object).unwrap();
        STANDARD.encode(sha256(
            ExclusiveC14n::new().canonicalize(object, &scope).as_bytes(),
        ))
    };
    let object = find_by_id_mut(&mut root, id).unwrap();
    let at = object.child_position(SAML_NS, "Issuer").map_or(0, |i| i + 1);
    object
        .children
        .insert(at, Node::Element(signature_template(id, &digest)));

    let mut root = xml::parse(&root.to_xml()).unwrap();
    let value = {
        let signed_info = find_by_id(&root, id)
            .child(XMLDSIG_NS, "Signature")
            .and_then(|s| s.child(XMLDSIG_NS, "SignedInfo"))
            .unwrap();
        let scope = root.scope_of(signed_info).unwrap();
        let c14n = ExclusiveC14n::new().canonicalize(signed_info, &scope);
        let key = RsaKeyPair::from_pkcs8(pkcs8).unwrap();
        let mut sig = vec![0; key.public_modulus_len()];
        key.sign(&RSA_PKCS1_SHA256, &SystemRandom::new(), c14n.as_bytes(), &mut sig)
            .unwrap();
        STANDARD.encode(sig)
    };
    let signature_value = find_by_id_mut(&mut root, id)
        .and_then(|o| o.child_mut(XMLDSIG_NS, "Signature"))
        .and_then(|s| s.child_mut(XMLDSIG_NS, "SignatureValue"))
        .unwrap();
    signature_value.children = vec![Node::Text(value)];
    root.to_xml()
}

fn signature_template(id: &str, digest: &str) -> Element {
    let ds = |local: &str| Element::new("ds", local, XMLDSIG_NS);
    let reference = ds("Reference")
        .with_attr("URI", format!("#{id}"))
        .with_child(
            ds("Transforms")
                .with_child(ds("Transform").with_attr("Algorithm", transform_algorithms::ENVELOPED_SIGNATURE))
                .with_child(ds("Transform").with_attr("Algorithm", transform_algorithms::EXCLUSIVE_C14N)),
        )
        .with_child(ds("DigestMethod").with_attr("Algorithm", digest_algorithms::SHA256))
        .with_child(ds("DigestValue").with_text(digest));
    ds("Signature")
        .with_ns_decl("ds", XMLDSIG_NS)
        .with_child(
            ds("SignedInfo")
                .with_child(ds("CanonicalizationMethod").with_attr("Algorithm", transform_algorithms::EXCLUSIVE_C14N))
                .with_child(ds("SignatureMethod").with_attr("Algorithm", signature_algorithms::RSA_SHA256))
                .with_child(reference),
        )
        .with_child(ds("SignatureValue"))
}

fn find_by_id<'e>(root: &'e Element, id: &str) -> &'e Element {
    root.descendants()
        .into_iter()
        .find(|e| e.id() == Some(id))
        .unwrap()
}

fn find_by_id_mut<'e>(el: &'e mut Element, id: &str) -> Option<&'e mut Element> {
    if el.id() == Some(id) {
        return Some(el);
    }
    for child in el.child_elements_mut() {
        if let Some(found) = find_by_id_mut(child, id) {
            return Some(found);
        }
    }
    None
}

/// AES-128-CBC over `plaintext` with the content key wrapped in the
/// `wrapped-aes128-oaep.b64` fixture, as an `xenc:EncryptedData` element.
pub(crate) fn encrypted_data(plaintext: &str) -> String {
    let key: [u8; 16] = std::array::from_fn(|i| i as u8);
    let iv: [u8; 16] = std::array::from_fn(|i| 0xa0 + i as u8);
    let ciphertext = cbc::Encryptor::<aes::Aes128>::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    let cipher_value = STANDARD.encode([iv.as_slice(), &ciphertext].concat());
    format!(
        r#"<xenc:EncryptedData xmlns:xenc="{XMLENC_NS}" Type="{}"><xenc:EncryptionMethod Algorithm="{}"/><ds:KeyInfo xmlns:ds="{XMLDSIG_NS}"><xenc:EncryptedKey><xenc:EncryptionMethod Algorithm="{}"><ds:DigestMethod Algorithm="{}"/></xenc:EncryptionMethod><xenc:CipherData><xenc:CipherValue>{}</xenc:CipherValue></xenc:CipherData></xenc:EncryptedKey></ds:KeyInfo><xenc:CipherData><xenc:CipherValue>{cipher_value}</xenc:CipherValue></xenc:CipherData></xenc:EncryptedData>"#,
        encryption_algorithms::TYPE_ELEMENT,
        encryption_algorithms::AES128_CBC,
        encryption_algorithms::RSA_OAEP_MGF1P,
        digest_algorithms::SHA1,
        WRAPPED_K128.trim(),
    )
}

/// Wraps `inner` in a Response issued by `issuer`.
pub(crate) fn response(issuer: &str, inner: &str) -> String {
    format!(
        r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="r1" Version="2.0" IssueInstant="2024-01-01T00:00:00.000Z"><saml:Issuer>{issuer}</saml:Issuer><samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status>{inner}</samlp:Response>"#
    )
}
