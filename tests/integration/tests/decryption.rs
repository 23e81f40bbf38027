//! Assertion decryption and the combined validate-then-decrypt action.

use sp_protocol_saml::types::{SAML_NS, XMLENC_NS};
use sp_protocol_saml::xml::{self, Element};
use sp_server::ActionRequest;

use crate::common::{error_code, ok, response, Fixture, Signer, Wrapping, ASSERTION};

const NAME_ID: &str = r#"<saml:NameID xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" Format="urn:oasis:names:tc:SAML:2.0:nameid-format:persistent">user-42</saml:NameID>"#;

const MAIL: &str = r#"<saml:Attribute xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" Name="mail"><saml:AttributeValue>user@example.org</saml:AttributeValue></saml:Attribute>"#;

const ROLE: &str = r#"<saml:Attribute xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" Name="role"><saml:AttributeValue>admin</saml:AttributeValue></saml:Attribute>"#;

/// An assertion whose subject and part of whose attributes are encrypted.
fn assertion_with_encrypted_parts(wrapping: Wrapping) -> String {
    format!(
        r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="a2" Version="2.0" IssueInstant="2024-01-01T00:00:00.000Z"><saml:Issuer>idp-a</saml:Issuer><saml:Subject>{}<saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer"/></saml:Subject><saml:AttributeStatement><saml:Attribute Name="cn"><saml:AttributeValue>User</saml:AttributeValue></saml:Attribute>{}{}</saml:AttributeStatement></saml:Assertion>"#,
        wrapping.encrypt_into("EncryptedID", NAME_ID),
        wrapping.encrypt_into("EncryptedAttribute", MAIL),
        wrapping.encrypt_into_detached("EncryptedAttribute", ROLE),
    )
}

fn decrypt(xml: &str) -> ActionRequest {
    ActionRequest::new("decrypt-assertion").with_response(xml)
}

fn attribute_names(assertion: &Element) -> Vec<String> {
    assertion
        .child(SAML_NS, "AttributeStatement")
        .unwrap()
        .child_elements()
        .map(|a| a.attr("Name").unwrap_or_default().to_string())
        .collect()
}

fn assert_normalized(assertion_xml: &str) {
    let assertion = xml::parse(assertion_xml).unwrap();
    assert!(assertion.is(SAML_NS, "Assertion"));
    assert!(!assertion_xml.contains("EncryptedID"));
    assert!(!assertion_xml.contains("EncryptedAttribute"));
    assert!(assertion
        .descendants()
        .iter()
        .all(|e| e.ns.as_deref() != Some(XMLENC_NS)));

    assert!(!assertion_xml.contains("xmlns:xenc"));
    assert!(!assertion_xml.contains("xmlns:samlp"));

    let subject = assertion.child(SAML_NS, "Subject").unwrap();
    let first = subject.child_elements().next().unwrap();
    assert!(first.is(SAML_NS, "NameID"));
    assert_eq!(first.text(), "user-42");

    assert_eq!(attribute_names(&assertion), ["cn", "mail", "role"]);
}

/// Every supported key transport and content cipher combination decrypts,
/// and the result carries no encrypted parts.
#[test]
fn test_decrypt_normalizes_assertion() {
    let dispatcher = Fixture::new().dispatcher();
    for wrapping in [
        Wrapping::OaepAes128Cbc,
        Wrapping::Rsa15Aes256Gcm,
        Wrapping::OaepSha256Aes256Gcm,
    ] {
        let inner = wrapping.encrypt_into(
            "EncryptedAssertion",
            &assertion_with_encrypted_parts(wrapping),
        );
        let assertion = ok(&dispatcher, &decrypt(&response("idp-a", &inner)))
            .assertion
            .unwrap_or_else(|| panic!("{wrapping:?}: no assertion"));
        assert_normalized(&assertion);
    }
}

/// The EncryptedKey may sit next to the EncryptedData instead of inside it.
#[test]
fn test_decrypt_detached_key() {
    let dispatcher = Fixture::new().dispatcher();
    let inner = Wrapping::OaepAes128Cbc.encrypt_into_detached("EncryptedAssertion", ASSERTION);
    let assertion = ok(&dispatcher, &decrypt(&response("idp-a", &inner)))
        .assertion
        .unwrap();
    assert!(assertion.contains("user@example.org"));
}

/// The decrypted assertion is standalone XML even when its prefixes were
/// declared only on the enclosing Response.
#[test]
fn test_decrypted_assertion_is_self_contained() {
    let dispatcher = Fixture::new().dispatcher();
    let bare = ASSERTION.replace(
        r#" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion""#,
        "",
    );
    let inner = Wrapping::OaepAes128Cbc.encrypt_into("EncryptedAssertion", &bare);
    let assertion = ok(&dispatcher, &decrypt(&response("idp-a", &inner)))
        .assertion
        .unwrap();
    let parsed = xml::parse(&assertion).unwrap();
    assert!(parsed.is(SAML_NS, "Assertion"));
}

/// Exactly one EncryptedAssertion is required.
#[test]
fn test_encrypted_assertion_count() {
    let dispatcher = Fixture::new().dispatcher();
    assert_eq!(
        error_code(&dispatcher, &decrypt(&response("idp-a", ASSERTION))),
        "missing_encrypted_assertion"
    );

    let one = Wrapping::OaepAes128Cbc.encrypt_into("EncryptedAssertion", ASSERTION);
    let two = response("idp-a", &format!("{one}{one}"));
    assert_eq!(
        error_code(&dispatcher, &decrypt(&two)),
        "missing_encrypted_assertion"
    );
}

/// Without an SP key nothing decrypts.
#[test]
fn test_decrypt_without_key() {
    let dispatcher = Fixture::without_key().dispatcher();
    let inner = Wrapping::OaepAes128Cbc.encrypt_into("EncryptedAssertion", ASSERTION);
    assert_eq!(
        error_code(&dispatcher, &decrypt(&response("idp-a", &inner))),
        "decryption_failed"
    );
}

/// Decrypted content of the wrong element type is refused.
#[test]
fn test_decrypted_type_is_checked() {
    let dispatcher = Fixture::new().dispatcher();
    let inner = Wrapping::OaepAes128Cbc.encrypt_into("EncryptedAssertion", NAME_ID);
    assert_eq!(
        error_code(&dispatcher, &decrypt(&response("idp-a", &inner))),
        "decryption_failed"
    );
}

/// Signed Response carrying an encrypted assertion: validated, then
/// decrypted.
#[test]
fn test_validate_and_decrypt_signed_response() {
    let dispatcher = Fixture::new().dispatcher();
    let inner = Wrapping::OaepAes128Cbc.encrypt_into(
        "EncryptedAssertion",
        &assertion_with_encrypted_parts(Wrapping::OaepAes128Cbc),
    );
    let signed = Signer::idp_a().sign(&response("idp-a", &inner), "r1");

    let output = ok(
        &dispatcher,
        &ActionRequest::new("validate-signature-decrypt").with_response(&signed),
    );
    assert_eq!(output.valid, Some(true));
    assert_normalized(&output.assertion.unwrap());
}

/// Signature inside the encrypted assertion: the assertion is decrypted to
/// find it.
#[test]
fn test_validate_and_decrypt_signed_assertion() {
    let dispatcher = Fixture::new().dispatcher();
    let signed_assertion = Signer::idp_a().sign(ASSERTION, "a1");
    let inner = Wrapping::Rsa15Aes256Gcm.encrypt_into("EncryptedAssertion", &signed_assertion);
    let xml = response("idp-a", &inner);

    assert_eq!(
        ok(
            &dispatcher,
            &ActionRequest::new("validate-signature").with_response(&xml)
        )
        .valid,
        Some(true)
    );

    let output = ok(
        &dispatcher,
        &ActionRequest::new("validate-signature-decrypt").with_response(&xml),
    );
    assert_eq!(output.valid, Some(true));
    assert!(output.assertion.unwrap().contains("user-42"));
}

/// An invalid signature yields `valid=false` and no assertion.
#[test]
fn test_validate_and_decrypt_invalid() {
    let dispatcher = Fixture::new().dispatcher();
    let inner = Wrapping::OaepAes128Cbc.encrypt_into("EncryptedAssertion", ASSERTION);
    let signed = Signer::idp_b().sign(&response("idp-a", &inner), "r1");

    let output = ok(
        &dispatcher,
        &ActionRequest::new("validate-signature-decrypt").with_response(&signed),
    );
    assert_eq!(output.valid, Some(false));
    assert_eq!(output.assertion, None);
}

/// A signed plaintext assertion does not vouch for an encrypted one beside
/// it, so nothing is decrypted and no assertion is returned.
#[test]
fn test_validate_and_decrypt_refuses_unsigned_sibling() {
    let dispatcher = Fixture::new().dispatcher();
    let forged = ASSERTION
        .replace("ID=\"a1\"", "ID=\"evil\"")
        .replace("user-42", "admin");
    let inner = format!(
        "{}{}",
        Signer::idp_a().sign(ASSERTION, "a1"),
        Wrapping::OaepAes128Cbc.encrypt_into("EncryptedAssertion", &forged)
    );

    assert_eq!(
        error_code(
            &dispatcher,
            &ActionRequest::new("validate-signature-decrypt")
                .with_response(&response("idp-a", &inner))
        ),
        "invalid_request"
    );
}
